use policyflow_core::{OperationFuture, OperationOutcome, StepInput, StepOperation};
use rand::Rng;
use std::time::Duration;

/// How long a simulated call takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    None,
    Fixed(Duration),
    /// Uniformly random between `min` and `max`
    Jitter { min: Duration, max: Duration },
}

impl Delay {
    /// 2–4 seconds, the pace of the placeholder calls used before the
    /// Genova endpoints were wired up
    pub fn placeholder() -> Self {
        Delay::Jitter {
            min: Duration::from_millis(2000),
            max: Duration::from_millis(4000),
        }
    }

    pub fn sample(&self) -> Duration {
        match *self {
            Delay::None => Duration::ZERO,
            Delay::Fixed(d) => d,
            Delay::Jitter { min, max } if max > min => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(ms as u64)
            }
            Delay::Jitter { min, .. } => min,
        }
    }
}

/// Waits, then returns a canned outcome
#[derive(Debug, Clone)]
pub struct SimulatedOperation {
    delay: Delay,
    outcome: OperationOutcome,
}

impl SimulatedOperation {
    pub fn new(outcome: OperationOutcome) -> Self {
        Self {
            delay: Delay::None,
            outcome,
        }
    }

    pub fn succeeding(message: impl Into<String>) -> Self {
        Self::new(OperationOutcome::ok(message))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(OperationOutcome::failed(message))
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }
}

impl StepOperation for SimulatedOperation {
    fn invoke(&self, input: StepInput) -> OperationFuture {
        let delay = self.delay.sample();
        let outcome = self.outcome.clone();
        Box::pin(async move {
            tracing::debug!(trace_id = %input.trace_id, step = %input.step_id, delay_ms = delay.as_millis() as u64, "simulated call");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(outcome)
        })
    }
}

/// Succeeds immediately; for steps with no remote counterpart
#[derive(Debug, Clone)]
pub struct AcknowledgeOperation {
    message: String,
}

impl AcknowledgeOperation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl StepOperation for AcknowledgeOperation {
    fn invoke(&self, input: StepInput) -> OperationFuture {
        let message = self.message.clone();
        Box::pin(async move {
            tracing::debug!(trace_id = %input.trace_id, step = %input.step_id, "acknowledged");
            Ok(OperationOutcome::ok(message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_sampling() {
        assert_eq!(Delay::None.sample(), Duration::ZERO);
        assert_eq!(
            Delay::Fixed(Duration::from_millis(5)).sample(),
            Duration::from_millis(5)
        );
        for _ in 0..20 {
            let d = Delay::placeholder().sample();
            assert!(d >= Duration::from_millis(2000) && d <= Duration::from_millis(4000));
        }
        let collapsed = Delay::Jitter {
            min: Duration::from_millis(9),
            max: Duration::from_millis(3),
        };
        assert_eq!(collapsed.sample(), Duration::from_millis(9));
    }

    #[tokio::test]
    async fn test_simulated_operation_returns_outcome() {
        let op = SimulatedOperation::failing("card declined")
            .with_delay(Delay::Fixed(Duration::from_millis(1)));
        let outcome = op.invoke(StepInput::new("f", "s")).await.unwrap();
        assert_eq!(outcome, OperationOutcome::failed("card declined"));

        let ack = AcknowledgeOperation::new("linked");
        let outcome = ack.invoke(StepInput::new("f", "s")).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("linked"));
    }
}
