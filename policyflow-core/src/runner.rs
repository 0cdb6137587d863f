use crate::{FlowDescriptor, OperationOutcome, StepDescriptor, StepInput};
use anyhow::{anyhow, Result};
use policyflow_context::{
    FlowRun, Notification, Progress, RunObserver, RunPhase, SharedRun, StepStatus,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Message used when a failed outcome carries no message of its own
pub const GENERIC_FAILURE: &str = "API call failed";

/// Runner configuration
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Upper bound for a single operation. `None` waits indefinitely.
    pub step_timeout: Option<Duration>,
}

impl RunnerConfig {
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

/// Final state of a run, returned once it completes or halts
#[derive(Debug, Clone)]
pub struct RunReport {
    pub trace_id: String,
    pub flow_id: String,
    pub phase: RunPhase,
    pub statuses: Vec<(String, StepStatus)>,
    pub progress: Progress,
    pub result_artifact: Option<String>,
    pub step_durations: Vec<(String, Option<Duration>)>,
}

impl RunReport {
    fn from_run(run: &FlowRun) -> Self {
        Self {
            trace_id: run.trace_id.clone(),
            flow_id: run.flow_id.clone(),
            phase: run.phase().clone(),
            statuses: run
                .steps()
                .iter()
                .map(|s| (s.step_id.clone(), s.status))
                .collect(),
            progress: run.progress(),
            result_artifact: run.result_artifact().map(str::to_owned),
            step_durations: run
                .steps()
                .iter()
                .map(|s| (s.step_id.clone(), s.duration()))
                .collect(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    pub fn failure(&self) -> Option<(&str, &str)> {
        match &self.phase {
            RunPhase::Failed { step_id, message } => Some((step_id, message)),
            _ => None,
        }
    }
}

/// Executes the steps of a flow strictly in order.
///
/// Each operation is awaited to completion before the next step starts. The
/// first failure halts the run: later steps stay `Pending`, earlier steps
/// stay `Completed`, nothing is retried or rolled back.
#[derive(Clone, Default)]
pub struct StepRunner {
    config: RunnerConfig,
    observers: Vec<Arc<dyn RunObserver>>,
}

impl StepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
        }
    }

    /// Registers an observer that sees every transition
    pub fn observe(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Creates the run state with every step `Pending` and publishes it
    pub fn prepare(&self, flow: &FlowDescriptor, params: HashMap<String, Value>) -> SharedRun {
        let run = FlowRun::new(flow.id.clone(), flow.step_ids()).with_params(params);
        self.publish(&run);
        Arc::new(Mutex::new(run))
    }

    /// Prepares and executes a run of `flow`
    pub async fn run(
        &self,
        flow: &FlowDescriptor,
        params: HashMap<String, Value>,
    ) -> Result<RunReport> {
        let run = self.prepare(flow, params);
        self.run_prepared(flow, run).await
    }

    /// Executes a run created by [`prepare`](Self::prepare). The lock is never
    /// held while an operation is in flight, so readers can inspect the run
    /// at any time.
    #[tracing::instrument(level = "info", skip(self, flow, run), fields(flow = %flow.id, steps = flow.len()))]
    pub async fn run_prepared(&self, flow: &FlowDescriptor, run: SharedRun) -> Result<RunReport> {
        let trace_id = run.lock().await.trace_id.clone();
        tracing::info!(trace_id = %trace_id, flow = %flow.id, "flow run starting");

        for (index, step) in flow.steps().iter().enumerate() {
            let input = {
                let mut guard = run.lock().await;
                guard.start_step(index)?;
                self.publish(&guard);
                StepInput {
                    trace_id: guard.trace_id.clone(),
                    flow_id: guard.flow_id.clone(),
                    step_id: step.id.clone(),
                    params: guard.params().clone(),
                    prior_outputs: guard.ordered_outputs(),
                }
            };

            let result = self.invoke(step, input).await;

            let mut guard = run.lock().await;
            match result {
                Ok(outcome) if outcome.success => {
                    let artifact = outcome.artifact();
                    guard.complete_step(index, outcome.message, outcome.data)?;

                    if guard.phase() == &RunPhase::Completed {
                        if let Some(artifact) = artifact {
                            guard.attach_artifact(artifact)?;
                        }
                        let notification =
                            Notification::success(format!("{} complete", flow.title));
                        guard.notify(notification.clone());
                        self.publish(&guard);
                        self.announce(&notification);
                    } else {
                        self.publish(&guard);
                    }
                }
                failed => {
                    let message = failure_message(&step.id, failed);
                    guard.fail_step(index, message.clone())?;
                    self.publish(&guard);
                    self.announce(&Notification::error(step.id.clone(), message));
                    break;
                }
            }
        }

        let guard = run.lock().await;
        let report = RunReport::from_run(&guard);
        match &report.phase {
            RunPhase::Completed => {
                tracing::info!(trace_id = %trace_id, flow = %flow.id, artifact = ?report.result_artifact, "flow run completed")
            }
            RunPhase::Failed { step_id, message } => {
                tracing::warn!(trace_id = %trace_id, flow = %flow.id, step = %step_id, error = %message, "flow run halted")
            }
            RunPhase::Running => {
                return Err(anyhow!("flow '{}' ended while still running", flow.id));
            }
        }
        Ok(report)
    }

    async fn invoke(&self, step: &StepDescriptor, input: StepInput) -> Result<OperationOutcome> {
        let call = step.operation().invoke(input);
        match self.config.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("step {} timed out after {:?}", step.id, limit)),
            },
            None => call.await,
        }
    }

    fn publish(&self, run: &FlowRun) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = run.snapshot();
        for observer in &self.observers {
            observer.on_snapshot(&snapshot);
        }
    }

    fn announce(&self, notification: &Notification) {
        for observer in &self.observers {
            observer.on_notification(notification);
        }
    }
}

fn failure_message(step_id: &str, result: Result<OperationOutcome>) -> String {
    match result {
        Ok(outcome) => outcome
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        Err(e) => {
            let message = e.to_string();
            if message.trim().is_empty() {
                format!("Failed to complete {step_id}. Please try again.")
            } else {
                message
            }
        }
    }
}
