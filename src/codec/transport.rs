//! Compressed blob for carrying blueprint lists over the network or inside
//! an item.
//!
//! Before compression the blob is a bitcode-encoded list of lean native
//! binary documents (no icon or previews). The whole buffer is
//! LZ4-compressed with its uncompressed size prepended.

use thiserror::Error;

use super::binary::{self, BinaryOptions, DecodeError};
use crate::blueprints::BlueprintRoot;

/// Refuse blobs that claim to inflate past this size.
pub const MAX_UNCOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Failure to unpack a transport blob
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("blob declares {0} bytes uncompressed, over the limit")]
    TooLarge(usize),
    #[error("decompression failed: {0}")]
    Decompress(String),
    #[error("malformed blueprint list: {0}")]
    Malformed(String),
    #[error("blueprint {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
}

impl From<bitcode::Error> for TransportError {
    fn from(e: bitcode::Error) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

/// Ordered list of blueprints as sent over the wire
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlueprintList(pub Vec<BlueprintRoot>);

impl BlueprintList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_blob(&self) -> Vec<u8> {
        pack(&self.0)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, TransportError> {
        unpack(blob).map(BlueprintList)
    }
}

/// Serialize and compress a list of blueprints
pub fn pack(roots: &[BlueprintRoot]) -> Vec<u8> {
    let documents: Vec<Vec<u8>> = roots
        .iter()
        .map(|root| binary::encode(root, BinaryOptions::LEAN))
        .collect();
    lz4_flex::compress_prepend_size(&bitcode::encode(&documents))
}

/// Decompress and decode a list of blueprints, preserving order
///
/// One bad entry fails the whole blob.
pub fn unpack(blob: &[u8]) -> Result<Vec<BlueprintRoot>, TransportError> {
    if blob.len() >= 4 {
        let declared = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
        if declared > MAX_UNCOMPRESSED_SIZE {
            return Err(TransportError::TooLarge(declared));
        }
    }
    let raw = lz4_flex::decompress_size_prepended(blob)
        .map_err(|e| TransportError::Decompress(e.to_string()))?;

    let documents: Vec<Vec<u8>> = bitcode::decode(&raw)?;
    documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            binary::decode(document).map_err(|source| TransportError::Decode { index, source })
        })
        .collect()
}
