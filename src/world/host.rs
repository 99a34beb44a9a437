//! The host simulation's spawning capability.

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::blueprints::EntityIdentifier;

/// Opaque state blob could not be applied to a spawned instance
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to apply instance state: {0}")]
pub struct StateApplyError(pub String);

/// Tag attached to staged instances so activation can find them later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMarker {
    /// Name of the blueprint being rebuilt
    pub blueprint: String,
    /// Index of the object within the blueprint
    pub index: usize,
}

/// Entity lifecycle operations provided by the host simulation
pub trait EntityHost {
    /// Resolved spawnable definition
    type Template;
    /// Handle to a live instance
    type Instance;

    /// Look up a template by identifier
    fn resolve(&self, id: &EntityIdentifier) -> Option<Self::Template>;

    /// Instantiate a template at a world pose
    fn spawn(&mut self, template: &Self::Template, position: Vec3, rotation: Quat)
        -> Self::Instance;

    /// Restore persisted instance state
    fn apply_state(
        &mut self,
        instance: &Self::Instance,
        state: &[u8],
    ) -> Result<(), StateApplyError>;

    /// Strip an instance down to an inert placeholder
    fn make_staged(&mut self, instance: &Self::Instance, marker: StagedMarker);

    /// Remove an instance from the world
    fn destroy(&mut self, instance: Self::Instance);
}
