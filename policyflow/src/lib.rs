//! # PolicyFlow
//!
//! Runs multi-step policy preparation flows one step at a time, reporting
//! every status change and halting on the first failure.
//!
//! ## Features
//!
//! - `yaml` (default): flow definitions loaded from YAML/JSON files
//! - `http` (default): the Genova HTTP client
//!
//! ## Quick Start
//!
//! ```rust
//! use policyflow::prelude::*;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = motor::registry(&motor::simulated_catalog(Delay::None))?;
//!
//!     match registry.select("motor-policy-renewal") {
//!         FlowSelection::Ready(flow) => {
//!             let report = StepRunner::new().run(&flow, HashMap::new()).await?;
//!             assert!(report.is_success());
//!         }
//!         FlowSelection::Invalid { requested } => println!("Invalid Flow: {requested}"),
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod motor;

pub use policyflow_context as context;
pub use policyflow_core::*;
pub use policyflow_logger as logger;
pub use policyflow_runtime as runtime;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use policyflow_yaml as yaml;

/// Prelude module for easy imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::motor;
    pub use policyflow_core::prelude::*;
    pub use policyflow_logger::{init_tracing, RunLogger};
    pub use policyflow_runtime::{Delay, GenovaApi, GenovaConfig, SimulatedOperation};

    #[cfg(feature = "http")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http")))]
    pub use policyflow_runtime::GenovaClient;

    #[cfg(feature = "yaml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
    pub use policyflow_yaml::prelude::*;
}
