//! # PolicyFlow Logger
//!
//! Tracing setup and run summaries for PolicyFlow

use policyflow_context::{Notification, NotificationLevel, RunObserver, RunSnapshot, StepStatus};
use policyflow_core::RunReport;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`
pub fn init_tracing() -> Result<(), TryInitError> {
    init_tracing_with("info", LogFormat::Pretty)
}

/// Initialize tracing with a fallback level and output format. `RUST_LOG`
/// still takes precedence when set.
pub fn init_tracing_with(level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    }
}

/// Logs run reports and follows runs as an observer
#[derive(Debug, Default, Clone)]
pub struct RunLogger;

impl RunLogger {
    pub fn new() -> Self {
        Self
    }

    /// Log the outcome of a run
    pub fn log_summary(&self, report: &RunReport) {
        let count = |status: StepStatus| {
            report
                .statuses
                .iter()
                .filter(|(_, s)| *s == status)
                .count()
        };

        info!(
            trace_id = %report.trace_id,
            flow = %report.flow_id,
            total_steps = report.statuses.len(),
            completed = count(StepStatus::Completed),
            failed = count(StepStatus::Error),
            pending = count(StepStatus::Pending),
            progress = report.progress.rounded(),
            artifact = ?report.result_artifact,
            "Flow run summary"
        );

        if let Some((step, message)) = report.failure() {
            error!(trace_id = %report.trace_id, step = %step, "Flow halted: {}", message);
        }
    }

    /// Log the status and duration of every step
    pub fn log_step_details(&self, report: &RunReport) {
        for ((step_id, status), (_, duration)) in
            report.statuses.iter().zip(&report.step_durations)
        {
            let duration_ms = duration.map(|d| d.as_millis()).unwrap_or_default();
            match status {
                StepStatus::Completed => {
                    info!(trace_id = %report.trace_id, step = %step_id, duration_ms, "Step completed")
                }
                StepStatus::Error => {
                    error!(trace_id = %report.trace_id, step = %step_id, duration_ms, "Step failed")
                }
                StepStatus::Pending => {
                    debug!(trace_id = %report.trace_id, step = %step_id, "Step not reached")
                }
                StepStatus::InProgress => {
                    warn!(trace_id = %report.trace_id, step = %step_id, "Step still in progress")
                }
            }
        }
    }
}

impl RunObserver for RunLogger {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        debug!(
            trace_id = %snapshot.trace_id,
            flow = %snapshot.flow_id,
            active = ?snapshot.in_progress(),
            progress = snapshot.progress.rounded(),
            "run updated"
        );
    }

    fn on_notification(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => info!("{}", notification.message),
            NotificationLevel::Error => error!(step = ?notification.step_id, "{}", notification.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyflow_core::prelude::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log lines for assertions
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_logger_reports_run_outcome() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let logger = RunLogger::new();
        let flow = FlowDescriptor::builder("logged")
            .step("a", "A", "", |_input| async move { Ok(OperationOutcome::ok("ok")) })
            .step("b", "B", "", |_input| async move {
                Ok(OperationOutcome::failed("card declined"))
            })
            .step("c", "C", "", |_input| async move { Ok(OperationOutcome::ok("ok")) })
            .build()
            .unwrap();

        let report = StepRunner::new()
            .observe(Arc::new(logger.clone()))
            .run(&flow, HashMap::new())
            .await
            .unwrap();
        logger.log_summary(&report);
        logger.log_step_details(&report);

        let output = captured.text();
        assert!(output.contains("Flow run summary"), "{output}");
        assert!(output.contains("completed=1"), "{output}");
        assert!(output.contains("failed=1"), "{output}");
        assert!(output.contains("Flow halted: card declined"), "{output}");
        assert!(output.contains("Step completed"), "{output}");
        assert!(output.contains("Step failed"), "{output}");
        assert!(output.contains("Step not reached"), "{output}");
        assert!(output.contains("run updated"), "{output}");
    }

    #[test]
    fn test_log_format_defaults_to_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
