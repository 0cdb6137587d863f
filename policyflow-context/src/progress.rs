use serde::Serialize;

/// Completion of a run, derived from the number of completed steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(completed: usize, total: usize) -> Self {
        Self {
            completed: completed.min(total),
            total,
        }
    }

    /// Percentage in `0.0..=100.0`. An empty run reports 0.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    /// Percentage rounded the way it is shown to users
    pub fn rounded(&self) -> u8 {
        self.percent().round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.rounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::of(0, 3).rounded(), 0);
        assert_eq!(Progress::of(1, 3).rounded(), 33);
        assert_eq!(Progress::of(2, 3).rounded(), 67);
        assert_eq!(Progress::of(3, 3).rounded(), 100);
        assert!(Progress::of(3, 3).is_complete());
        assert_eq!(Progress::of(2, 5).percent(), 40.0);
    }

    #[test]
    fn test_progress_empty_and_clamped() {
        assert_eq!(Progress::of(0, 0).percent(), 0.0);
        assert!(!Progress::of(0, 0).is_complete());
        assert_eq!(Progress::of(7, 4), Progress::of(4, 4));
        assert_eq!(Progress::of(1, 4).to_string(), "25%");
    }
}
