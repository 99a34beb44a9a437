//! Native structured text format (TOML).
//!
//! Human-inspectable and lossless apart from one known ambiguity: identifiers
//! are bare scalars, so a template name that parses as an integer reads back
//! as a hash. Fields holding their default value are left out on write;
//! vectors are tables with labeled components so new components can be added
//! later without breaking old files.
//!
//! ```toml
//! name = "Shed"
//! author = "Builder"
//!
//! [[objects]]
//! id = "wood_floor"
//!
//! [[objects]]
//! id = -1432251016
//! [objects.position]
//! y = 1.0
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blueprints::{BlueprintObject, BlueprintRoot, EntityIdentifier};

/// Failure to read or write the text format
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TextError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("serialize error: {0}")]
    Serialize(String),
}

impl From<toml::de::Error> for TextError {
    fn from(e: toml::de::Error) -> Self {
        TextError::Parse(e.to_string())
    }
}

impl From<toml::ser::Error> for TextError {
    fn from(e: toml::ser::Error) -> Self {
        TextError::Serialize(e.to_string())
    }
}

/// Labeled vector components, zero components omitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct Vector {
    #[serde(default, skip_serializing_if = "is_zero")]
    x: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    y: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    z: f32,
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

impl Vector {
    fn is_zero(&self) -> bool {
        is_zero(&self.x) && is_zero(&self.y) && is_zero(&self.z)
    }
}

impl From<Vec3> for Vector {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vector> for Vec3 {
    fn from(v: Vector) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

// Scalars come before tables so the TOML layout stays flat.
#[derive(Debug, Serialize, Deserialize)]
struct TextDocument {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    icon: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "base64_list")]
    previews: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    box_rotation: Vector,
    #[serde(default)]
    objects: Vec<TextObject>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextObject {
    id: EntityIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    state: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_template: Option<String>,
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    position: Vector,
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    rotation: Vector,
}

/// Write a blueprint as TOML text
pub fn encode(root: &BlueprintRoot) -> Result<String, TextError> {
    let document = TextDocument {
        name: root.name.clone(),
        author: root.author.clone(),
        description: root.description.clone(),
        category: root.category.clone(),
        icon: root.icon.clone(),
        previews: root.previews.clone(),
        box_rotation: root.box_rotation.into(),
        objects: root
            .objects
            .iter()
            .map(|o| TextObject {
                id: o.id.clone(),
                state: o.state.clone(),
                source_template: o.source_template_name.clone(),
                position: o.relative_position.into(),
                rotation: o.relative_rotation.into(),
            })
            .collect(),
    };
    Ok(toml::to_string(&document)?)
}

/// Parse a blueprint from TOML text
///
/// The result is not validated; an empty name or object list parses fine.
pub fn decode(text: &str) -> Result<BlueprintRoot, TextError> {
    let document: TextDocument = toml::from_str(text)?;
    Ok(BlueprintRoot {
        name: document.name,
        author: document.author,
        description: document.description,
        icon: document.icon,
        box_rotation: document.box_rotation.into(),
        objects: document
            .objects
            .into_iter()
            .map(|o| BlueprintObject {
                id: o.id,
                relative_position: o.position.into(),
                relative_rotation: o.rotation.into(),
                state: o.state,
                source_template_name: o.source_template,
            })
            .collect(),
        previews: document.previews,
        category: document.category,
        storage_location: None,
    })
}

mod base64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod base64_list {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(value.iter().map(|bytes| STANDARD.encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .collect()
    }
}
