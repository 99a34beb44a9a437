//! Bounded blueprint collections carried by players or placed in the world.

pub mod carried;

use thiserror::Error;

use crate::blueprints::{BlueprintRoot, ValidationError};

pub use carried::{CarriedCollection, OverflowPolicy};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectionError {
    #[error("collection is full ({0} blueprints)")]
    Full(usize),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Add/remove access to a collection owned by someone else
pub trait ForeignCollection {
    /// Add a blueprint; returns whatever had to be evicted to make room
    fn add(&mut self, blueprint: BlueprintRoot) -> Result<Option<BlueprintRoot>, CollectionError>;

    /// Remove the first blueprint with this name
    fn delete(&mut self, name: &str) -> Option<BlueprintRoot>;

    fn blueprints(&self) -> &[BlueprintRoot];
}
