use thiserror::Error;

use crate::blueprints::ValidationError;
use crate::codec::binary::DecodeError;
use crate::codec::text::TextError;
use crate::codec::transport::TransportError;
use crate::codec::ImportError;
use crate::collection::CollectionError;
use crate::storage::StorageError;
use crate::world::ApplyError;

#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Text format error: {0}")]
    Text(#[from] TextError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlueprintError>;
