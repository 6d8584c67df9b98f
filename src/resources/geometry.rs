use glam::{Affine3A, Vec3};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Axis-aligned bounding box in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Builds the box enclosing a point set. Empty input yields a zero box.
    #[must_use]
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            let v = Vec3::from_array(*p);
            min = min.min(v);
            max = max.max(v);
        }
        if points.is_empty() {
            return Self {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            };
        }
        Self { min, max }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corner points of the box.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mx.x, mn.y, mx.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mx.y, mx.z),
        ]
    }

    /// Transforms all eight corners and re-encloses them.
    #[must_use]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in self.corners() {
            let v = transform.transform_point3(corner);
            min = min.min(v);
            max = max.max(v);
        }
        Self { min, max }
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let center = self.center();
        BoundingSphere {
            center,
            radius: (self.max - center).length(),
        }
    }
}

/// Bounding sphere in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    /// Applies an affine transform, scaling the radius by the largest axis
    /// scale so the result still encloses the transformed geometry.
    #[must_use]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let center = transform.transform_point3(self.center);
        let scale = transform
            .matrix3
            .x_axis
            .length()
            .max(transform.matrix3.y_axis.length())
            .max(transform.matrix3.z_axis.length());
        Self {
            center,
            radius: self.radius * scale,
        }
    }
}

#[derive(Debug)]
struct GeometryData {
    positions: Vec<[f32; 3]>,
    indices: Option<Vec<u32>>,
}

/// CPU-side mesh geometry.
///
/// Vertex data lives behind a lock so the owner can release ("dispose") the
/// backing buffers while handles to the geometry are still outstanding;
/// the resolver probes for this before reusing cached results.
#[derive(Debug)]
pub struct Geometry {
    pub uuid: Uuid,
    pub name: String,
    data: RwLock<Option<Arc<GeometryData>>>,
    vertex_count: u32,
    index_count: u32,
    bounding_box: Aabb,
}

impl Geometry {
    #[must_use]
    pub fn new(name: impl Into<String>, positions: Vec<[f32; 3]>, indices: Option<Vec<u32>>) -> Self {
        let bounding_box = Aabb::from_points(&positions);
        let vertex_count = positions.len() as u32;
        let index_count = indices.as_ref().map_or(0, |i| i.len() as u32);
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            data: RwLock::new(Some(Arc::new(GeometryData { positions, indices }))),
            vertex_count,
            index_count,
            bounding_box,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_box.bounding_sphere()
    }

    /// Whether the vertex buffers are still resident.
    #[must_use]
    pub fn has_backing_data(&self) -> bool {
        self.data.read().is_some()
    }

    /// Releases the CPU-side buffers. Metadata (counts, bounds) survives.
    pub fn dispose(&self) {
        *self.data.write() = None;
    }

    /// Reads the position buffer, if still resident.
    #[must_use]
    pub fn positions(&self) -> Option<Vec<[f32; 3]>> {
        self.data.read().as_ref().map(|d| d.positions.clone())
    }

    /// Reads the index buffer, if present and resident.
    #[must_use]
    pub fn indices(&self) -> Option<Vec<u32>> {
        self.data.read().as_ref().and_then(|d| d.indices.clone())
    }

    /// Triangle count, honoring indexed and non-indexed geometry.
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        if self.index_count > 0 {
            self.index_count / 3
        } else {
            self.vertex_count / 3
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_from_points() {
        let aabb = Aabb::from_points(&[[0.0, -1.0, 2.0], [3.0, 1.0, -2.0]]);
        assert_eq!(aabb.min, Vec3::new(0.0, -1.0, -2.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 2.0));
    }

    #[test]
    fn dispose_releases_buffers_but_keeps_metadata() {
        let geo = Geometry::new("g", vec![[0.0; 3], [1.0; 3], [2.0; 3]], None);
        assert!(geo.has_backing_data());
        geo.dispose();
        assert!(!geo.has_backing_data());
        assert_eq!(geo.vertex_count(), 3);
        assert!(geo.positions().is_none());
    }

    #[test]
    fn sphere_transform_scales_radius() {
        let sphere = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let scaled = sphere.transformed(&Affine3A::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        assert!((scaled.radius - 2.0).abs() < 1e-6);
    }
}
