//! Capture of a live arrangement into a blueprint.
//!
//! A `CaptureSource` decides which live entities belong to the capture and
//! where the capture is anchored. Captured positions are stored relative to
//! the anchor and then recentered on the union of the entities' bounds.

use glam::{Quat, Vec2, Vec3};

use super::identifier::EntityIdentifier;
use super::normalize::CoordinateNormalizer;
use super::schema::{BlueprintObject, BlueprintRoot, ValidationError};
use crate::core::math::{euler_to_quat, quat_to_euler};
use crate::core::{Aabb, BlueprintConfig};
use crate::world::SpatialConstraint;

/// A live entity as reported by the host
#[derive(Debug, Clone)]
pub struct LiveEntity {
    pub id: EntityIdentifier,
    /// Template name when the host knows it separately from `id`
    pub template_name: Option<String>,
    pub position: Vec3,
    pub rotation: Quat,
    /// World-space visual extent
    pub bounds: Aabb,
    /// Host-serialized instance state
    pub state: Option<Vec<u8>>,
}

/// Camera placement for one preview image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub focus: Vec3,
    pub distance: f32,
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
}

/// External thumbnail renderer
pub trait PreviewRenderer {
    /// Render one encoded image per camera
    fn render(&mut self, entities: &[LiveEntity], cameras: &[CameraParams]) -> Vec<Vec<u8>>;
}

/// Region of the world a blueprint is captured from
pub trait CaptureSource: SpatialConstraint {
    /// Reference start point positions are first expressed against
    fn anchor(&self) -> Vec3;

    /// Capture frame rotation in Euler degrees
    fn frame_rotation(&self) -> Vec3;

    /// Preview cameras framing the captured bounds
    fn cameras(&self, bounds: &Aabb) -> Vec<CameraParams> {
        let distance = bounds.size().length().max(1.0) * 1.5;
        [45.0, 135.0, 225.0, 315.0]
            .into_iter()
            .map(|yaw| CameraParams {
                focus: bounds.center(),
                distance,
                yaw_degrees: yaw + self.frame_rotation().y,
                pitch_degrees: 30.0,
            })
            .collect()
    }
}

/// Vertical cylinder around a center point
#[derive(Debug, Clone, Copy)]
pub struct CircularArea {
    pub center: Vec3,
    pub radius: f32,
    /// Facing of the capturing player, Euler degrees
    pub facing: Vec3,
}

impl SpatialConstraint for CircularArea {
    fn is_within(&self, position: Vec3) -> bool {
        let offset = Vec2::new(position.x - self.center.x, position.z - self.center.z);
        offset.length_squared() <= self.radius * self.radius
    }
}

impl CaptureSource for CircularArea {
    fn anchor(&self) -> Vec3 {
        self.center
    }

    fn frame_rotation(&self) -> Vec3 {
        self.facing
    }
}

/// Oriented box
#[derive(Debug, Clone, Copy)]
pub struct FixedVolume {
    pub center: Vec3,
    pub half_extents: Vec3,
    /// Euler degrees
    pub rotation: Vec3,
}

impl SpatialConstraint for FixedVolume {
    fn is_within(&self, position: Vec3) -> bool {
        let local = euler_to_quat(self.rotation).inverse() * (position - self.center);
        local.abs().cmple(self.half_extents).all()
    }
}

impl CaptureSource for FixedVolume {
    fn anchor(&self) -> Vec3 {
        self.center
    }

    fn frame_rotation(&self) -> Vec3 {
        self.rotation
    }

    fn cameras(&self, bounds: &Aabb) -> Vec<CameraParams> {
        let distance = (self.half_extents.length() * 3.0).max(1.0);
        vec![CameraParams {
            focus: bounds.center(),
            distance,
            yaw_degrees: self.rotation.y + 45.0,
            pitch_degrees: 35.0,
        }]
    }
}

/// Capture every entity the source contains into a new blueprint
///
/// Entities are ordered bottom to top. State is kept only for kinds listed
/// in `config.stateful_kinds`.
pub fn capture(
    name: impl Into<String>,
    source: &dyn CaptureSource,
    entities: &[LiveEntity],
    config: &BlueprintConfig,
    renderer: Option<&mut dyn PreviewRenderer>,
) -> Result<BlueprintRoot, ValidationError> {
    let stateful = config.stateful_identifiers();

    let mut selected: Vec<&LiveEntity> = entities
        .iter()
        .filter(|e| source.is_within(e.position))
        .collect();
    selected.sort_by(|a, b| a.bounds.min.y.total_cmp(&b.bounds.min.y));

    let start = source.anchor();
    let mut objects: Vec<BlueprintObject> = selected
        .iter()
        .map(|entity| BlueprintObject {
            id: entity.id.clone(),
            relative_position: entity.position - start,
            relative_rotation: quat_to_euler(entity.rotation),
            state: entity
                .state
                .clone()
                .filter(|_| stateful.contains(&entity.id)),
            source_template_name: entity.template_name.clone(),
        })
        .collect();

    let bounds: Vec<Aabb> = selected.iter().map(|e| e.bounds).collect();
    CoordinateNormalizer::bounds(&mut objects, &bounds, start);

    let mut root = BlueprintRoot::new(name);
    root.box_rotation = source.frame_rotation();
    root.objects = objects;

    if let (Some(renderer), Some(total)) = (renderer, Aabb::union_all(&bounds)) {
        let owned: Vec<LiveEntity> = selected.iter().map(|e| (*e).clone()).collect();
        root.previews = renderer.render(&owned, &source.cameras(&total));
    }

    root.validate()?;
    tracing::info!(
        "Captured blueprint '{}' with {} entities",
        root.name,
        root.objects.len()
    );
    Ok(root)
}
