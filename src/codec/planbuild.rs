//! Legacy dialect A: semicolon-delimited pieces with a `#Key:Value` header.
//!
//! ```text
//! #Name:Shed
//! #Creator:Builder
//! #Description:"A small shed"
//! #Pieces
//! wood_floor;Building;1.0;0.0;2.0;0;0;0;1
//! ```
//!
//! Piece lines are `name;category;posX;posY;posZ;rotX;rotY;rotZ;rotW`. Any
//! fields after the quaternion are ignored. `#SnapPoints` and `#Terrain`
//! sections are skipped. Import is all-or-nothing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use glam::Vec3;

use super::{parse_f32, quaternion_to_rotation, ImportError};
use crate::blueprints::{BlueprintObject, BlueprintRoot, CoordinateNormalizer, EntityIdentifier};
use crate::core::BlueprintConfig;

const PIECE_FIELDS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Pieces,
    Skipped,
}

/// Parse without normalizing; positions are exactly as written
pub fn parse(text: &str, config: &BlueprintConfig) -> Result<BlueprintRoot, ImportError> {
    let mut root = BlueprintRoot::default();
    let mut section = Section::Header;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(directive) = line.strip_prefix('#') {
            section = match directive.split_once(':') {
                Some((key, value)) => {
                    apply_header(&mut root, key.trim(), value.trim(), line_no)?;
                    section
                }
                None => match directive.trim() {
                    "Pieces" => Section::Pieces,
                    other => {
                        tracing::debug!("Skipping legacy section '{}' at line {}", other, line_no);
                        Section::Skipped
                    }
                },
            };
            continue;
        }

        match section {
            Section::Pieces => root.objects.push(parse_piece(line, line_no, config)?),
            Section::Header | Section::Skipped => {}
        }
    }

    Ok(root)
}

/// Parse and recenter on the centroid
pub fn import(text: &str, config: &BlueprintConfig) -> Result<BlueprintRoot, ImportError> {
    let mut root = parse(text, config)?;
    CoordinateNormalizer::centroid(&mut root.objects);
    Ok(root)
}

fn apply_header(
    root: &mut BlueprintRoot,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ImportError> {
    match key {
        "Name" => root.name = value.to_string(),
        "Creator" => root.author = non_empty(value),
        "Description" => root.description = non_empty(value.trim_matches('"')),
        "Category" => root.category = non_empty(value),
        "Preview" => {
            let image = STANDARD
                .decode(value)
                .map_err(|_| ImportError::InvalidPreview(line_no))?;
            root.previews.push(image);
        }
        other => tracing::debug!("Ignoring legacy header '{}' at line {}", other, line_no),
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_piece(
    line: &str,
    line_no: usize,
    config: &BlueprintConfig,
) -> Result<BlueprintObject, ImportError> {
    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() < PIECE_FIELDS {
        return Err(ImportError::FieldCount {
            line: line_no,
            expected: PIECE_FIELDS,
            found: fields.len(),
        });
    }

    let name = fields[0].trim();
    if name.is_empty() {
        return Err(ImportError::EmptyName(line_no));
    }

    let number = |i: usize| parse_f32(fields[i], line_no);
    let position = Vec3::new(number(2)?, number(3)?, number(4)?);
    let rotation =
        quaternion_to_rotation(number(5)?, number(6)?, number(7)?, number(8)?, line_no);

    if config.warn_on_zero_position && position == Vec3::ZERO {
        tracing::warn!(
            "Legacy piece '{}' at line {} sits exactly on the origin",
            name,
            line_no
        );
    }

    Ok(BlueprintObject::new(
        EntityIdentifier::from_name(name),
        position,
        rotation,
    ))
}
