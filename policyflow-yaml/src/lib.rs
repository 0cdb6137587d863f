//! # PolicyFlow YAML
//!
//! Flow definitions loaded from YAML/JSON and built against an
//! [`OperationCatalog`](policyflow_core::OperationCatalog).

mod config;
mod expression;
mod loader;

pub use config::{FlowDefinition, FlowsConfig, StepDefinition};
pub use expression::EnvInterpolator;
pub use loader::FlowLoader;

/// Prelude module for YAML functionality
pub mod prelude {
    pub use crate::{EnvInterpolator, FlowLoader, FlowsConfig};
}
