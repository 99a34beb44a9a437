//! Anchor-independent recentering of captured placements.
//!
//! After normalization the horizontal center of a blueprint sits at the
//! origin and its lowest point at `y = 0`, so it rebuilds identically no
//! matter where it was captured or imported from.

use glam::Vec3;

use super::schema::BlueprintObject;
use crate::core::Aabb;

/// Recenters relative coordinates
pub struct CoordinateNormalizer;

impl CoordinateNormalizer {
    /// Center on the mean position and drop the lowest object to `y = 0`
    ///
    /// Used when only object positions are known (legacy imports). Running it
    /// again on centered data changes nothing.
    pub fn centroid(objects: &mut [BlueprintObject]) {
        if objects.is_empty() {
            return;
        }

        let sum: Vec3 = objects.iter().map(|o| o.relative_position).sum();
        let mean = sum / objects.len() as f32;
        for object in objects.iter_mut() {
            object.relative_position -= mean;
        }

        let min_y = objects
            .iter()
            .map(|o| o.relative_position.y)
            .fold(f32::INFINITY, f32::min);
        for object in objects.iter_mut() {
            object.relative_position.y -= min_y;
        }
    }

    /// Center on the union of the captured entities' bounds
    ///
    /// `objects` must hold positions relative to `start`, and `bounds` are the
    /// world-space extents of the same entities. The horizontal offset is the
    /// bounds center relative to `start`; the vertical offset puts the bottom
    /// of the bounds at `y = 0`. Not re-runnable: a second call with the same
    /// bounds shifts everything again.
    pub fn bounds(objects: &mut [BlueprintObject], bounds: &[Aabb], start: Vec3) {
        let Some(total) = Aabb::union_all(bounds) else {
            return;
        };

        let offset = Self::bounds_offset(&total, start);
        for object in objects.iter_mut() {
            object.relative_position -= offset;
        }
    }

    fn bounds_offset(total: &Aabb, start: Vec3) -> Vec3 {
        let mut offset = total.center() - start;
        offset.y = total.min.y - start.y;
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects_at(positions: &[Vec3]) -> Vec<BlueprintObject> {
        positions
            .iter()
            .map(|p| BlueprintObject::new("piece", *p, Vec3::ZERO))
            .collect()
    }

    fn positions(objects: &[BlueprintObject]) -> Vec<Vec3> {
        objects.iter().map(|o| o.relative_position).collect()
    }

    #[test]
    fn test_centroid_centers_and_grounds() {
        let mut objects = objects_at(&[
            Vec3::new(10.0, 5.0, 10.0),
            Vec3::new(12.0, 7.0, 14.0),
        ]);

        CoordinateNormalizer::centroid(&mut objects);

        assert_eq!(
            positions(&objects),
            vec![Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 2.0, 2.0)]
        );
    }

    #[test]
    fn test_centroid_idempotent() {
        let mut objects = objects_at(&[
            Vec3::new(3.0, 1.0, -4.0),
            Vec3::new(-2.0, 8.0, 0.5),
            Vec3::new(7.0, 2.0, 9.0),
        ]);

        CoordinateNormalizer::centroid(&mut objects);
        let once = positions(&objects);
        CoordinateNormalizer::centroid(&mut objects);

        for (a, b) in once.iter().zip(positions(&objects)) {
            assert!((*a - b).length() < 1e-4);
        }
    }

    #[test]
    fn test_centroid_empty_is_noop() {
        let mut objects: Vec<BlueprintObject> = Vec::new();
        CoordinateNormalizer::centroid(&mut objects);
        assert!(objects.is_empty());
    }

    #[test]
    fn test_bounds_mode() {
        let start = Vec3::new(100.0, 10.0, 100.0);
        let world = [Vec3::new(102.0, 11.0, 100.0), Vec3::new(106.0, 11.0, 100.0)];
        let bounds: Vec<Aabb> = world
            .iter()
            .map(|p| Aabb::from_center_extents(*p, Vec3::ONE))
            .collect();
        let mut objects = objects_at(&world.map(|p| p - start));

        CoordinateNormalizer::bounds(&mut objects, &bounds, start);

        // Union spans x 101..107 (center 104), bottom at y = 10.
        assert_eq!(
            positions(&objects),
            vec![Vec3::new(-2.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0)]
        );
    }

    #[test]
    fn test_bounds_without_extents_is_noop() {
        let mut objects = objects_at(&[Vec3::ONE]);
        CoordinateNormalizer::bounds(&mut objects, &[], Vec3::ZERO);
        assert_eq!(positions(&objects), vec![Vec3::ONE]);
    }
}
