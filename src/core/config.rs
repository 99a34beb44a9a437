//! Blueprint system configuration with documented constants
//!
//! Every tunable used by capture, apply, storage and the carried collections
//! lives here. Values can be loaded from a TOML file; missing keys fall back
//! to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::blueprints::EntityIdentifier;

/// Configuration for the blueprint subsystems
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    // === APPLY ===
    /// Number of entities the apply scheduler processes before yielding
    ///
    /// This is the frame budget knob. At 50, a 1000 piece blueprint is
    /// rebuilt over 20 simulation frames.
    pub entities_per_step: usize,

    /// Whether reconstruction spawns staged (inert) instances by default
    ///
    /// Staged instances are stripped down to a placeholder and tagged so a
    /// later activation pass can fully materialize them.
    pub staged_by_default: bool,

    /// Entity kinds whose instance state is captured and re-applied
    ///
    /// Each entry is a template name, or a template hash written as an
    /// integer string such as `"-1432251016"`.
    pub stateful_kinds: Vec<String>,

    // === COLLECTIONS ===
    /// Capacity of a personal carried collection (rejects when full)
    pub owned_capacity: usize,

    /// Capacity of a shared kiosk-like collection (evicts oldest when full)
    pub shared_capacity: usize,

    // === STORAGE ===
    /// Include native binary files when scanning the blueprint directory
    pub scan_binary_files: bool,

    /// Include native text files when scanning the blueprint directory
    pub scan_text_files: bool,

    /// Include legacy dialect files when scanning the blueprint directory
    pub scan_legacy_files: bool,

    // === IMPORT ===
    /// Log legacy pieces sitting exactly on the origin
    ///
    /// A `(0, 0, 0)` position in a legacy export usually means the exporter
    /// failed to read the piece transform.
    pub warn_on_zero_position: bool,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            entities_per_step: 50,
            staged_by_default: false,
            stateful_kinds: Vec::new(),

            owned_capacity: 3,
            shared_capacity: 10,

            scan_binary_files: true,
            scan_text_files: true,
            scan_legacy_files: false,

            warn_on_zero_position: true,
        }
    }
}

impl BlueprintConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load and validate a config file, falling back to defaults for missing keys
    pub fn load(path: &Path) -> crate::core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            crate::core::BlueprintError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate().map_err(crate::core::BlueprintError::Config)?;
        Ok(config)
    }

    /// Identifiers of the entity kinds that carry state
    pub fn stateful_identifiers(&self) -> ahash::AHashSet<EntityIdentifier> {
        self.stateful_kinds
            .iter()
            .map(|kind| match kind.parse::<i32>() {
                Ok(hash) => EntityIdentifier::from_hash(hash),
                Err(_) => EntityIdentifier::from(kind.as_str()),
            })
            .collect()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.entities_per_step == 0 {
            return Err("entities_per_step must be at least 1".into());
        }

        if self.owned_capacity == 0 || self.shared_capacity == 0 {
            return Err("Collection capacities must be positive".into());
        }

        if !self.scan_binary_files && !self.scan_text_files && !self.scan_legacy_files {
            return Err("At least one file kind must be scanned".into());
        }

        Ok(())
    }
}
