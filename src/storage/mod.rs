//! On-disk blueprint library.
//!
//! Blueprints live under one root directory as `<name>.<ext>` files. Writes
//! and deletes run on tokio's blocking pool from detached snapshots; batch
//! scanning runs there too and hands its report back over a channel.

pub mod atomic_write;
pub mod scan;
pub mod store;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::blueprints::ValidationError;
use crate::codec::TextError;

pub use atomic_write::atomic_write;
pub use scan::{scan_directory, ScanFailure, ScanReport, ScanService};
pub use store::BlueprintStore;

/// Name used when a blueprint name sanitizes to nothing
const FALLBACK_FILE_NAME: &str = "blueprint";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a writable blueprint format")]
    NotWritable(String),

    #[error("encoding failed: {0}")]
    Encode(#[from] TextError),

    #[error("refusing to store invalid blueprint: {0}")]
    Invalid(#[from] ValidationError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Turn a blueprint name into a portable file stem
///
/// Path separators, reserved punctuation and control characters become `_`;
/// trailing dots and spaces are dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Same directory and extension, new file stem from `name`
pub fn rederive_location(location: &Path, name: &str) -> PathBuf {
    let stem = sanitize_file_name(name);
    let file_name = match location.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    };
    match location.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// First path in `dir` named `stem.ext`, `stem (1).ext`, `stem (2).ext`, ...
/// that `taken` does not report as used
pub fn unique_location(dir: &Path, stem: &str, ext: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !taken(&candidate) {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{} ({}).{}", stem, n, ext));
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
