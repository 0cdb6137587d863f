use crate::Progress;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Status of a single step within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::InProgress => "In Progress",
            StepStatus::Completed => "Completed",
            StepStatus::Error => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepState {
    pub step_id: String,
    pub status: StepStatus,
    pub message: Option<String>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl StepState {
    fn pending(step_id: String) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            message: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}

/// Overall phase of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunPhase {
    Running,
    Completed,
    Failed { step_id: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient user-facing message (a toast, in UI terms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub message: String,
}

impl Notification {
    pub fn error(step_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            step_id: Some(step_id.into()),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            step_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSnapshot {
    pub id: String,
    pub status: StepStatus,
}

/// Immutable view of a run, published after every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub trace_id: String,
    pub flow_id: String,
    pub steps: Vec<StepSnapshot>,
    pub progress: Progress,
    pub phase: RunPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_artifact: Option<String>,
}

impl RunSnapshot {
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }

    pub fn in_progress(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::InProgress)
            .map(|s| s.id.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("step index {index} is out of range for flow '{flow_id}'")]
    UnknownStep { flow_id: String, index: usize },

    #[error("run of flow '{flow_id}' has already finished")]
    RunFinished { flow_id: String },

    #[error("step '{requested}' cannot start while '{active}' is in progress")]
    StepAlreadyActive { requested: String, active: String },

    #[error("step '{step_id}' cannot start before '{blocking}' has completed")]
    OutOfOrder { step_id: String, blocking: String },

    #[error("step '{step_id}' is {status:?}, expected {expected:?}")]
    UnexpectedStatus {
        step_id: String,
        status: StepStatus,
        expected: StepStatus,
    },

    #[error("result artifact can only be attached to a completed run")]
    ArtifactBeforeCompletion,
}

/// State machine of one flow execution.
///
/// Only the step runner mutates a `FlowRun`; every transition method checks
/// the ordering invariants and refuses anything that would break them.
#[derive(Debug, Clone)]
pub struct FlowRun {
    pub trace_id: String,
    pub flow_id: String,
    steps: Vec<StepState>,
    phase: RunPhase,
    result_artifact: Option<String>,
    notifications: Vec<Notification>,
    params: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
}

impl FlowRun {
    /// Creates a run with every step `Pending`
    pub fn new<I, S>(flow_id: impl Into<String>, step_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new_with_trace_id(Uuid::new_v4().to_string(), flow_id, step_ids)
    }

    pub fn new_with_trace_id<I, S>(
        trace_id: impl Into<String>,
        flow_id: impl Into<String>,
        step_ids: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trace_id: trace_id.into(),
            flow_id: flow_id.into(),
            steps: step_ids
                .into_iter()
                .map(|id| StepState::pending(id.into()))
                .collect(),
            phase: RunPhase::Running,
            result_artifact: None,
            notifications: Vec::new(),
            params: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn steps(&self) -> &[StepState] {
        &self.steps
    }

    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }

    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|s| s.step_id == step_id)
            .map(|s| s.status)
    }

    pub fn active_step(&self) -> Option<&StepState> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::InProgress)
    }

    pub fn progress(&self) -> Progress {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        Progress::of(completed, self.steps.len())
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.phase, RunPhase::Running)
    }

    pub fn result_artifact(&self) -> Option<&str> {
        self.result_artifact.as_deref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    /// Output payload recorded by a completed step
    pub fn output(&self, step_id: &str) -> Option<&Value> {
        self.outputs.get(step_id)
    }

    /// Outputs of completed steps, in step order
    pub fn ordered_outputs(&self) -> Vec<(String, Value)> {
        self.steps
            .iter()
            .filter_map(|s| {
                self.outputs
                    .get(&s.step_id)
                    .map(|v| (s.step_id.clone(), v.clone()))
            })
            .collect()
    }

    pub fn start_step(&mut self, index: usize) -> Result<(), TransitionError> {
        if self.is_finished() {
            return Err(TransitionError::RunFinished {
                flow_id: self.flow_id.clone(),
            });
        }
        let step_id = self.step_id_at(index)?;

        if let Some(active) = self.active_step() {
            return Err(TransitionError::StepAlreadyActive {
                requested: step_id,
                active: active.step_id.clone(),
            });
        }
        if let Some(blocking) = self.steps[..index]
            .iter()
            .find(|s| s.status != StepStatus::Completed)
        {
            return Err(TransitionError::OutOfOrder {
                step_id,
                blocking: blocking.step_id.clone(),
            });
        }
        self.expect_status(index, StepStatus::Pending)?;

        let step = &mut self.steps[index];
        step.status = StepStatus::InProgress;
        step.started_at = Some(Instant::now());

        tracing::info!(trace_id = %self.trace_id, flow = %self.flow_id, step = %step_id, "step starting");
        Ok(())
    }

    /// Marks the in-progress step completed and records its output. Completing
    /// the last step moves the run to [`RunPhase::Completed`].
    pub fn complete_step(
        &mut self,
        index: usize,
        message: Option<String>,
        output: Option<Value>,
    ) -> Result<(), TransitionError> {
        let step_id = self.step_id_at(index)?;
        self.expect_status(index, StepStatus::InProgress)?;

        let step = &mut self.steps[index];
        step.status = StepStatus::Completed;
        step.message = message;
        step.finished_at = Some(Instant::now());
        let duration = step.duration().unwrap_or_default();

        if let Some(output) = output {
            self.outputs.insert(step_id.clone(), output);
        }

        let progress = self.progress();
        tracing::info!(
            trace_id = %self.trace_id,
            flow = %self.flow_id,
            step = %step_id,
            duration_ms = duration.as_millis() as u64,
            progress = progress.rounded(),
            "step completed"
        );

        if progress.is_complete() {
            self.phase = RunPhase::Completed;
        }
        Ok(())
    }

    /// Marks the in-progress step as failed and halts the run
    pub fn fail_step(
        &mut self,
        index: usize,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        let step_id = self.step_id_at(index)?;
        self.expect_status(index, StepStatus::InProgress)?;
        let message = message.into();

        let step = &mut self.steps[index];
        step.status = StepStatus::Error;
        step.message = Some(message.clone());
        step.finished_at = Some(Instant::now());
        let duration = step.duration().unwrap_or_default();

        tracing::error!(
            trace_id = %self.trace_id,
            flow = %self.flow_id,
            step = %step_id,
            duration_ms = duration.as_millis() as u64,
            error = %message,
            "step failed"
        );

        self.phase = RunPhase::Failed {
            step_id: step_id.clone(),
            message: message.clone(),
        };
        self.notifications.push(Notification::error(step_id, message));
        Ok(())
    }

    pub fn attach_artifact(&mut self, artifact: impl Into<String>) -> Result<(), TransitionError> {
        if self.phase != RunPhase::Completed {
            return Err(TransitionError::ArtifactBeforeCompletion);
        }
        self.result_artifact = Some(artifact.into());
        Ok(())
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            trace_id: self.trace_id.clone(),
            flow_id: self.flow_id.clone(),
            steps: self
                .steps
                .iter()
                .map(|s| StepSnapshot {
                    id: s.step_id.clone(),
                    status: s.status,
                })
                .collect(),
            progress: self.progress(),
            phase: self.phase.clone(),
            result_artifact: self.result_artifact.clone(),
        }
    }

    fn step_id_at(&self, index: usize) -> Result<String, TransitionError> {
        self.steps
            .get(index)
            .map(|s| s.step_id.clone())
            .ok_or_else(|| TransitionError::UnknownStep {
                flow_id: self.flow_id.clone(),
                index,
            })
    }

    fn expect_status(&self, index: usize, expected: StepStatus) -> Result<(), TransitionError> {
        let step = &self.steps[index];
        if step.status != expected {
            return Err(TransitionError::UnexpectedStatus {
                step_id: step.step_id.clone(),
                status: step.status,
                expected,
            });
        }
        Ok(())
    }
}
