//! # PolicyFlow Core
//!
//! Flow and step descriptors, the operation contract, the flow registry and
//! the sequential step runner.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod flow;
mod operation;
mod registry;
mod runner;


pub use error::DefinitionError;
pub use flow::{FlowDescriptor, FlowDescriptorBuilder, StepDescriptor};
pub use operation::{
    operation_fn, OperationCatalog, OperationFuture, OperationOutcome, StepInput, StepOperation,
};
pub use registry::{FlowRegistry, FlowSelection};
pub use runner::{RunReport, RunnerConfig, StepRunner, GENERIC_FAILURE};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        operation_fn, FlowDescriptor, FlowRegistry, FlowSelection, OperationCatalog,
        OperationOutcome, RunReport, RunnerConfig, StepInput, StepOperation, StepRunner,
    };
    pub use policyflow_context::{
        FlowRun, HistoryObserver, Notification, Progress, RunObserver, RunPhase, RunSnapshot,
        SharedRun, StepStatus, WatchObserver,
    };
}
