//! Clock-agnostic deferred-action scheduling and periodic monitor orchestration.
//!
//! The `scheduling` module holds the leaf primitives (a deadline queue and lazy deadline and
//! interval generators). The `monitor` module builds a registry of self-rescheduling polling
//! tasks on top of them, which a host drives by sleeping for `time_to_wait()` and calling
//! `blink()`.
use std::fmt::Display;

use thiserror::Error;

pub mod clock;
pub mod monitor;
pub mod scheduling;

pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{Period, Registry};
pub use scheduling::{
    deadlines::{generate_deadlines, Deadlines},
    intervals::{generate_intervals, local_stopwatch, rate, Intervals},
    queue::DeadlineQueue,
    Timestamp,
};

/// Error returned by monitor and notify callables.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from misusing the registry API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("Already watching {label}")]
    DuplicateWatch { label: String },
    #[error("Watch period must be greater than zero")]
    InvalidPeriod,
}

/// Step of a watch's polling cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Monitor,
    Notify,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Monitor => write!(f, "monitor"),
            Stage::Notify => write!(f, "notify"),
        }
    }
}

/// Failure of a single polling cycle. Caught at the watch boundary and logged, never
/// propagated out of `blink()`.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("monitor failed: {0}")]
    Monitor(#[source] TaskError),
    #[error("notify failed: {0}")]
    Notify(#[source] TaskError),
    #[error("{stage} panicked: {message}")]
    Panicked { stage: Stage, message: String },
}

impl TaskFailure {
    pub fn stage(&self) -> Stage {
        match self {
            TaskFailure::Monitor(_) => Stage::Monitor,
            TaskFailure::Notify(_) => Stage::Notify,
            TaskFailure::Panicked { stage, .. } => *stage,
        }
    }
}
