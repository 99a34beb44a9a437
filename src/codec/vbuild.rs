//! Legacy dialect B: space-delimited pieces, no header.
//!
//! Each line is `name rotX rotY rotZ rotW posX posY posZ`; note the rotation
//! comes first. The file carries no metadata, so the blueprint name is
//! supplied by the caller (usually the file stem).

use glam::Vec3;

use super::{parse_f32, quaternion_to_rotation, ImportError};
use crate::blueprints::{BlueprintObject, BlueprintRoot, CoordinateNormalizer, EntityIdentifier};

const PIECE_FIELDS: usize = 8;

/// Parse without normalizing
pub fn parse(text: &str, name: &str) -> Result<BlueprintRoot, ImportError> {
    let mut root = BlueprintRoot::new(name);

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < PIECE_FIELDS {
            return Err(ImportError::FieldCount {
                line: line_no,
                expected: PIECE_FIELDS,
                found: fields.len(),
            });
        }

        let number = |i: usize| parse_f32(fields[i], line_no);
        let rotation =
            quaternion_to_rotation(number(1)?, number(2)?, number(3)?, number(4)?, line_no);
        let position = Vec3::new(number(5)?, number(6)?, number(7)?);

        root.objects.push(BlueprintObject::new(
            EntityIdentifier::from_name(fields[0]),
            position,
            rotation,
        ));
    }

    Ok(root)
}

/// Parse and recenter on the centroid
pub fn import(text: &str, name: &str) -> Result<BlueprintRoot, ImportError> {
    let mut root = parse(text, name)?;
    CoordinateNormalizer::centroid(&mut root.objects);
    Ok(root)
}
