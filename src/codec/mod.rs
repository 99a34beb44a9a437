//! Blueprint file formats
//!
//! Two native formats (compact binary and TOML text) that round-trip the
//! full model, two read-only legacy text dialects, and the compressed
//! transport blob. Files are dispatched by extension.

pub mod binary;
pub mod planbuild;
pub mod text;
pub mod transport;
pub mod vbuild;

use glam::Vec3;
use std::path::Path;
use thiserror::Error;

use crate::blueprints::BlueprintRoot;
use crate::core::math::{normalized_quat, quat_to_euler};
use crate::core::{BlueprintConfig, BlueprintError};

pub use binary::{BinaryOptions, DecodeError};
pub use text::TextError;

/// Failure to import a legacy dialect document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("line {0}: empty template name")]
    EmptyName(usize),
    #[error("line {0}: preview image is not valid base64")]
    InvalidPreview(usize),
    #[error("document is not valid UTF-8")]
    InvalidUtf8,
}

/// On-disk blueprint formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlueprintFormat {
    /// Native compact binary
    Binary,
    /// Native TOML text
    Text,
    /// Legacy dialect A (read-only)
    PlanBuild,
    /// Legacy dialect B (read-only)
    VBuild,
}

impl BlueprintFormat {
    pub const ALL: [BlueprintFormat; 4] = [
        BlueprintFormat::Binary,
        BlueprintFormat::Text,
        BlueprintFormat::PlanBuild,
        BlueprintFormat::VBuild,
    ];

    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            BlueprintFormat::Binary => "bpb",
            BlueprintFormat::Text => "bpt",
            BlueprintFormat::PlanBuild => "blueprint",
            BlueprintFormat::VBuild => "vbuild",
        }
    }

    /// Detect the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Whether blueprints can be written in this format
    pub fn is_writable(self) -> bool {
        matches!(self, BlueprintFormat::Binary | BlueprintFormat::Text)
    }

    pub fn is_legacy(self) -> bool {
        !self.is_writable()
    }
}

/// Decode a single document
///
/// `name_hint` names blueprints from formats without a name field. Legacy
/// imports come back normalized. Nothing is validated here.
pub fn read_bytes(
    format: BlueprintFormat,
    bytes: &[u8],
    name_hint: &str,
    config: &BlueprintConfig,
) -> Result<BlueprintRoot, BlueprintError> {
    match format {
        BlueprintFormat::Binary => Ok(binary::decode(bytes)?),
        BlueprintFormat::Text => Ok(text::decode(as_utf8(bytes)?)?),
        BlueprintFormat::PlanBuild => Ok(planbuild::import(as_utf8(bytes)?, config)?),
        BlueprintFormat::VBuild => Ok(vbuild::import(as_utf8(bytes)?, name_hint)?),
    }
}

/// Encode a document in a native format
pub fn write_bytes(root: &BlueprintRoot, format: BlueprintFormat) -> Result<Vec<u8>, BlueprintError> {
    match format {
        BlueprintFormat::Binary => Ok(binary::encode(root, BinaryOptions::FULL)),
        BlueprintFormat::Text => Ok(text::encode(root)?.into_bytes()),
        legacy => Err(BlueprintError::UnsupportedFormat(format!(
            "{} is import-only",
            legacy.extension()
        ))),
    }
}

/// Read a blueprint file, dispatching on its extension
///
/// The returned blueprint remembers `path` as its storage location.
pub fn read_file(path: &Path, config: &BlueprintConfig) -> Result<BlueprintRoot, BlueprintError> {
    let format = BlueprintFormat::from_path(path)
        .ok_or_else(|| BlueprintError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut root = read_bytes(format, &bytes, &stem, config)?;
    root.storage_location = Some(path.to_path_buf());
    Ok(root)
}

/// Write a blueprint in the native format implied by `path`'s extension
pub fn write_file(path: &Path, root: &BlueprintRoot) -> Result<(), BlueprintError> {
    let format = BlueprintFormat::from_path(path)
        .ok_or_else(|| BlueprintError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = write_bytes(root, format)?;
    crate::storage::atomic_write(path, &bytes)?;
    Ok(())
}

fn as_utf8(bytes: &[u8]) -> Result<&str, ImportError> {
    std::str::from_utf8(bytes).map_err(|_| ImportError::InvalidUtf8)
}

/// Parse a decimal number the same way regardless of locale
pub(crate) fn parse_f32(field: &str, line: usize) -> Result<f32, ImportError> {
    let trimmed = field.trim();
    trimmed
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ImportError::InvalidNumber {
            line,
            value: trimmed.to_string(),
        })
}

/// Normalize a stored quaternion and convert it to Euler degrees
pub(crate) fn quaternion_to_rotation(x: f32, y: f32, z: f32, w: f32, line: usize) -> Vec3 {
    match normalized_quat(x, y, z, w) {
        Some(rotation) => quat_to_euler(rotation),
        None => {
            tracing::warn!("Degenerate rotation on line {}, using identity", line);
            Vec3::ZERO
        }
    }
}
