//! Blueprint data model.
//!
//! A `BlueprintRoot` is a named, ordered list of `BlueprintObject` placements
//! expressed relative to the blueprint's local frame (`box_rotation`), plus
//! metadata and preview images. Validation is separate from construction so
//! freshly parsed documents can be inspected before they are rejected.

use glam::Vec3;
use std::path::PathBuf;
use thiserror::Error;

use super::identifier::EntityIdentifier;

/// Reasons a well-formed blueprint is refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("blueprint name is empty")]
    EmptyName,
    #[error("blueprint '{0}' contains no entities")]
    NoObjects(String),
    #[error("entity {index} of blueprint '{name}' has a non-finite transform")]
    NonFiniteTransform { name: String, index: usize },
}

/// One placed entity relative to the blueprint frame
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintObject {
    pub id: EntityIdentifier,
    pub relative_position: Vec3,
    /// Euler angles in degrees
    pub relative_rotation: Vec3,
    /// Host-serialized instance state, opaque to this crate
    pub state: Option<Vec<u8>>,
    /// Name of the template this was captured from, when it differs from `id`
    pub source_template_name: Option<String>,
}

impl BlueprintObject {
    pub fn new(id: impl Into<EntityIdentifier>, position: Vec3, rotation: Vec3) -> Self {
        Self {
            id: id.into(),
            relative_position: position,
            relative_rotation: rotation,
            state: None,
            source_template_name: None,
        }
    }

    pub fn with_state(mut self, state: Vec<u8>) -> Self {
        self.state = Some(state);
        self
    }

    fn is_finite(&self) -> bool {
        self.relative_position.is_finite() && self.relative_rotation.is_finite()
    }
}

/// A complete blueprint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlueprintRoot {
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Encoded icon image
    pub icon: Option<Vec<u8>>,
    /// Capture-time reference frame, Euler degrees
    pub box_rotation: Vec3,
    /// Placement order, bottom to top for live captures
    pub objects: Vec<BlueprintObject>,
    /// Encoded preview images
    pub previews: Vec<Vec<u8>>,
    pub category: Option<String>,
    /// Backing file, if this blueprint has been stored
    pub storage_location: Option<PathBuf>,
}

impl BlueprintRoot {
    /// Create an empty blueprint
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check the invariants required before a blueprint enters a collection
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.objects.is_empty() {
            return Err(ValidationError::NoObjects(self.name.clone()));
        }
        if let Some(index) = self.objects.iter().position(|o| !o.is_finite()) {
            return Err(ValidationError::NonFiniteTransform {
                name: self.name.clone(),
                index,
            });
        }
        Ok(())
    }

    /// Rename, moving the derived storage location along with the name
    ///
    /// Only the path is re-derived; moving the backing file is up to the store.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        if let Some(location) = self.storage_location.take() {
            self.storage_location = Some(crate::storage::rederive_location(&location, &self.name));
        }
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category.filter(|c| !c.trim().is_empty());
    }

    pub fn set_icon(&mut self, icon: Vec<u8>) {
        self.icon = Some(icon);
    }

    pub fn set_previews(&mut self, previews: Vec<Vec<u8>>) {
        self.previews = previews;
    }

    /// Detached copy for background work while `self` keeps being mutated
    pub fn snapshot(&self) -> BlueprintRoot {
        self.clone()
    }

    /// Number of placed entities
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bounds of the relative positions, `None` for an empty blueprint
    pub fn extent(&self) -> Option<crate::core::Aabb> {
        let mut positions = self.objects.iter().map(|o| o.relative_position);
        let first = positions.next()?;
        Some(positions.fold(crate::core::Aabb::from_point(first), |acc, p| {
            acc.union(&crate::core::Aabb::from_point(p))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blueprint() -> BlueprintRoot {
        let mut root = BlueprintRoot::new("Shed");
        root.objects.push(BlueprintObject::new(
            "wood_floor",
            Vec3::ZERO,
            Vec3::ZERO,
        ));
        root.objects.push(BlueprintObject::new(
            "wood_wall",
            Vec3::new(0.0, 1.0, 2.0),
            Vec3::new(0.0, 90.0, 0.0),
        ));
        root
    }

    #[test]
    fn test_valid_blueprint() {
        assert!(make_blueprint().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut root = make_blueprint();
        root.name = "  ".to_string();
        assert_eq!(root.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_no_objects_rejected() {
        let root = BlueprintRoot::new("Empty");
        assert!(matches!(root.validate(), Err(ValidationError::NoObjects(_))));
    }

    #[test]
    fn test_nan_position_rejected() {
        let mut root = make_blueprint();
        root.objects[1].relative_position.x = f32::NAN;
        assert!(matches!(
            root.validate(),
            Err(ValidationError::NonFiniteTransform { index: 1, .. })
        ));
    }

    #[test]
    fn test_rename_moves_storage_location() {
        let mut root = make_blueprint();
        root.storage_location = Some(PathBuf::from("/data/blueprints/sheds/Shed.bpb"));

        root.rename("Big Shed");

        assert_eq!(root.name, "Big Shed");
        assert_eq!(
            root.storage_location,
            Some(PathBuf::from("/data/blueprints/sheds/Big Shed.bpb"))
        );
    }

    #[test]
    fn test_blank_category_cleared() {
        let mut root = make_blueprint();
        root.set_category(Some("Farm".to_string()));
        assert_eq!(root.category.as_deref(), Some("Farm"));
        root.set_category(Some("".to_string()));
        assert!(root.category.is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut root = make_blueprint();
        let snapshot = root.snapshot();
        root.objects.clear();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_extent() {
        let extent = make_blueprint().extent().unwrap();
        assert_eq!(extent.max, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(extent.min, Vec3::ZERO);
    }
}
