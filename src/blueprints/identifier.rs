//! Template identifiers for placed entities.
//!
//! Some formats only store a numeric hash of the template name, others keep
//! the name itself. `EntityIdentifier` carries either form; the numeric hash
//! is always available and is what equality and hashing are defined on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference to a spawnable entity template
#[derive(Debug, Clone)]
pub enum EntityIdentifier {
    /// Only the stable hash is known
    Hash(i32),
    /// The original template name, with its hash computed on construction
    Name { name: String, hash: i32 },
}

/// Stable 32-bit string hash matching the host's template lookup key.
///
/// Operates on UTF-16 code units and two interleaved accumulators, stopping
/// at the first NUL. The result never depends on locale or platform.
pub fn stable_hash(text: &str) -> i32 {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut hash1: i32 = 5381;
    let mut hash2: i32 = hash1;

    let mut i = 0;
    while i < units.len() && units[i] != 0 {
        hash1 = (hash1 << 5).wrapping_add(hash1) ^ i32::from(units[i]);
        if i == units.len() - 1 || units[i + 1] == 0 {
            break;
        }
        hash2 = (hash2 << 5).wrapping_add(hash2) ^ i32::from(units[i + 1]);
        i += 2;
    }

    hash1.wrapping_add(hash2.wrapping_mul(1_566_083_941))
}

impl EntityIdentifier {
    /// Build an identifier from a template name
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = stable_hash(&name);
        EntityIdentifier::Name { name, hash }
    }

    /// Build an identifier from a precomputed hash
    pub fn from_hash(hash: i32) -> Self {
        EntityIdentifier::Hash(hash)
    }

    /// Numeric lookup key
    pub fn as_hash(&self) -> i32 {
        match self {
            EntityIdentifier::Hash(hash) => *hash,
            EntityIdentifier::Name { hash, .. } => *hash,
        }
    }

    /// True when the original name is preserved
    pub fn is_string(&self) -> bool {
        matches!(self, EntityIdentifier::Name { .. })
    }

    /// Original template name, if known
    pub fn name(&self) -> Option<&str> {
        match self {
            EntityIdentifier::Hash(_) => None,
            EntityIdentifier::Name { name, .. } => Some(name),
        }
    }
}

impl PartialEq for EntityIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.as_hash() == other.as_hash()
    }
}

impl Eq for EntityIdentifier {}

impl Hash for EntityIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_hash().hash(state);
    }
}

impl From<&str> for EntityIdentifier {
    fn from(name: &str) -> Self {
        EntityIdentifier::from_name(name)
    }
}

impl From<String> for EntityIdentifier {
    fn from(name: String) -> Self {
        EntityIdentifier::from_name(name)
    }
}

impl From<i32> for EntityIdentifier {
    fn from(hash: i32) -> Self {
        EntityIdentifier::Hash(hash)
    }
}

impl From<&EntityIdentifier> for i32 {
    fn from(id: &EntityIdentifier) -> Self {
        id.as_hash()
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityIdentifier::Hash(hash) => write!(f, "{}", hash),
            EntityIdentifier::Name { name, .. } => f.write_str(name),
        }
    }
}

// Text form is a bare scalar: an integer when the rendered identifier parses
// as an i32, a string otherwise. A name that looks numeric therefore reads back
// as a hash.
impl Serialize for EntityIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let rendered = self.to_string();
        match rendered.parse::<i32>() {
            Ok(number) => serializer.serialize_i32(number),
            Err(_) => serializer.serialize_str(&rendered),
        }
    }
}

impl<'de> Deserialize<'de> for EntityIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct IdentifierVisitor;

        impl<'de> Visitor<'de> for IdentifierVisitor {
            type Value = EntityIdentifier;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a template name or a 32-bit template hash")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i32::try_from(value)
                    .map(EntityIdentifier::Hash)
                    .map_err(|_| E::custom(format!("template hash {} out of range", value)))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i32::try_from(value)
                    .map(EntityIdentifier::Hash)
                    .map_err(|_| E::custom(format!("template hash {} out of range", value)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EntityIdentifier::from_name(value))
            }
        }

        deserializer.deserialize_any(IdentifierVisitor)
    }
}
