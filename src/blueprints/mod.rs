//! Blueprint data model
//!
//! A blueprint is a named capture of entity placements relative to a local
//! frame. This module holds the model itself, template identifiers,
//! coordinate normalization and capture from a live arrangement.

pub mod capture;
pub mod identifier;
pub mod normalize;
pub mod schema;

pub use capture::{
    capture, CameraParams, CaptureSource, CircularArea, FixedVolume, LiveEntity, PreviewRenderer,
};
pub use identifier::{stable_hash, EntityIdentifier};
pub use normalize::CoordinateNormalizer;
pub use schema::{BlueprintObject, BlueprintRoot, ValidationError};
