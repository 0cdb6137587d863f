//! # PolicyFlow Context
//!
//! Run state, progress reporting and observers for PolicyFlow step runs

mod observer;
mod progress;
mod run;

pub use observer::{HistoryObserver, RunObserver, WatchObserver};
pub use progress::Progress;
pub use run::{
    FlowRun, Notification, NotificationLevel, RunPhase, RunSnapshot, StepSnapshot, StepState,
    StepStatus, TransitionError,
};

use std::sync::Arc;
use tokio::sync::Mutex;

/// A run shared between the runner (single writer) and its readers
pub type SharedRun = Arc<Mutex<FlowRun>>;
