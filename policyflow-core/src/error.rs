use thiserror::Error;

/// Problems found while assembling flows and registries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("flow id must not be empty")]
    EmptyFlowId,

    #[error("flow '{flow_id}' has a step with an empty id")]
    EmptyStepId { flow_id: String },

    #[error("flow '{flow_id}' must contain at least one step")]
    EmptyFlow { flow_id: String },

    #[error("flow '{flow_id}' declares step '{step_id}' more than once")]
    DuplicateStep { flow_id: String, step_id: String },

    #[error("flow '{flow_id}' is already registered")]
    DuplicateFlow { flow_id: String },

    #[error("unknown operation '{operation}'")]
    UnknownOperation { operation: String },
}
