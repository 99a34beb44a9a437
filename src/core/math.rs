//! Rotation conventions and bounding volumes

use glam::{EulerRot, Quat, Vec3};

/// Host Euler order: roll (Z) first, then pitch (X), then yaw (Y).
const HOST_EULER: EulerRot = EulerRot::YXZ;

/// Convert Euler angles in degrees (x = pitch, y = yaw, z = roll) to a rotation
pub fn euler_to_quat(degrees: Vec3) -> Quat {
    Quat::from_euler(
        HOST_EULER,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

/// Convert a rotation back to Euler angles in degrees
pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(HOST_EULER);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Normalize a raw quaternion read from an external file
///
/// Returns `None` for a zero-length or non-finite quaternion.
pub fn normalized_quat(x: f32, y: f32, z: f32, w: f32) -> Option<Quat> {
    let raw = Quat::from_xyzw(x, y, z, w);
    let length_sq = raw.length_squared();
    if !length_sq.is_finite() || length_sq <= f32::EPSILON {
        return None;
    }
    Some(raw.normalize())
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Degenerate box around a single point
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Union of a set of boxes, `None` when the iterator is empty
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Option<Aabb> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<Aabb>, b| match acc {
                Some(total) => Some(total.union(b)),
                None => Some(*b),
            })
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-3, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_euler_round_trip() {
        let angles = Vec3::new(10.0, 45.0, -20.0);
        assert_vec3_near(quat_to_euler(euler_to_quat(angles)), angles);
    }

    #[test]
    fn test_yaw_rotates_forward_to_right() {
        let rotation = euler_to_quat(Vec3::new(0.0, 90.0, 0.0));
        assert_vec3_near(rotation * Vec3::Z, Vec3::X);
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        assert!(normalized_quat(0.0, 0.0, 0.0, 0.0).is_none());
        let q = normalized_quat(0.0, 0.0, 0.0, 2.0).unwrap();
        assert!((q.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::from_center_extents(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center_extents(Vec3::new(4.0, 0.0, 0.0), Vec3::ONE);
        let total = Aabb::union_all([&a, &b]).unwrap();
        assert_vec3_near(total.center(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(total.min.y, -1.0);
        assert!(total.contains(Vec3::new(4.5, 0.5, 0.0)));
        assert!(Aabb::union_all(std::iter::empty()).is_none());
    }
}
