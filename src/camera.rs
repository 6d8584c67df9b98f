//! Camera state the host hands to the evaluator each frame.

use glam::{Mat4, Vec3, Vec4};

use crate::resources::geometry::BoundingSphere;

/// A snapshot of the rendering camera for one frame.
///
/// The host fills this in from whatever camera type its rendering library
/// uses; the evaluator only ever reads it.
#[derive(Debug, Clone)]
pub struct CameraState {
    pub projection_matrix: Mat4,
    pub view_matrix: Mat4,
    /// Vertical field of view in radians (perspective only).
    pub fov_y: f32,
    pub aspect: f32,
    pub is_perspective: bool,
    view_projection: Mat4,
    frustum: Frustum,
}

impl CameraState {
    #[must_use]
    pub fn new(projection_matrix: Mat4, view_matrix: Mat4, fov_y: f32, aspect: f32) -> Self {
        let view_projection = projection_matrix * view_matrix;
        Self {
            projection_matrix,
            view_matrix,
            fov_y,
            aspect,
            is_perspective: true,
            view_projection,
            frustum: Frustum::from_matrix(view_projection),
        }
    }

    #[must_use]
    pub fn orthographic(projection_matrix: Mat4, view_matrix: Mat4, aspect: f32) -> Self {
        let view_projection = projection_matrix * view_matrix;
        Self {
            projection_matrix,
            view_matrix,
            fov_y: 0.0,
            aspect,
            is_perspective: false,
            view_projection,
            frustum: Frustum::from_matrix(view_projection),
        }
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Camera position in world space, recovered from the view matrix.
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        let inv = self.view_matrix.inverse();
        inv.w_axis.truncate()
    }
}

/// View frustum as six planes, extracted with the Gribb-Hartmann method.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        // Left:   row4 + row1
        planes[0] = rows[3] + rows[0];
        // Right:  row4 - row1
        planes[1] = rows[3] - rows[0];
        // Bottom: row4 + row2
        planes[2] = rows[3] + rows[1];
        // Top:    row4 - row2
        planes[3] = rows[3] - rows[1];
        // Near/Far for a [0, 1] clip-space depth range.
        planes[4] = rows[2];
        planes[5] = rows[3] - rows[2];

        // Normalize
        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            let dist = plane.x * center.x + plane.y * center.y + plane.z * center.z + plane.w;
            if dist < -radius {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn intersects(&self, sphere: &BoundingSphere) -> bool {
        self.intersects_sphere(sphere.center, sphere.radius)
    }
}
