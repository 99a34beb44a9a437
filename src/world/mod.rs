//! Reconstruction of blueprints into the live world.
//!
//! The host simulation supplies an `EntityHost`; destinations are
//! registered in a `TargetRegistry`; `ApplyScheduler` does the rebuilding
//! across ticks.

pub mod apply;
pub mod host;
pub mod targets;

use thiserror::Error;

pub use apply::{
    world_pose, ApplyDriver, ApplyOptions, ApplyReport, ApplyScheduler, ApplyState, StepOutcome,
};
pub use host::{EntityHost, StagedMarker, StateApplyError};
pub use targets::{ApplyLease, ApplyTarget, SpatialConstraint, TargetHandle, TargetRegistry};

/// Failure to start an apply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("target no longer exists")]
    TargetNotFound,
    #[error("target '{0}' is already being rebuilt")]
    TargetBusy(String),
    #[error("apply was already started")]
    AlreadyStarted,
}
