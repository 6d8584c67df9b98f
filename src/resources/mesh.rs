use glam::Affine3A;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{GeometryHandle, MaterialHandle};

/// A displayed object: geometry, materials, and a world transform.
///
/// The geometry handle is the swap target for mesh LOD changes; fields sit
/// behind locks because swaps complete on the async runtime while the host
/// render loop reads them.
#[derive(Debug)]
pub struct Mesh {
    pub uuid: Uuid,
    pub name: String,
    geometry: RwLock<GeometryHandle>,
    materials: RwLock<Vec<MaterialHandle>>,
    world_matrix: RwLock<Affine3A>,
}

impl Mesh {
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: GeometryHandle, materials: Vec<MaterialHandle>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            geometry: RwLock::new(geometry),
            materials: RwLock::new(materials),
            world_matrix: RwLock::new(Affine3A::IDENTITY),
        }
    }

    #[must_use]
    pub fn geometry(&self) -> GeometryHandle {
        *self.geometry.read()
    }

    pub fn set_geometry(&self, geometry: GeometryHandle) {
        *self.geometry.write() = geometry;
    }

    #[must_use]
    pub fn materials(&self) -> Vec<MaterialHandle> {
        self.materials.read().clone()
    }

    pub fn set_materials(&self, materials: Vec<MaterialHandle>) {
        *self.materials.write() = materials;
    }

    #[must_use]
    pub fn world_matrix(&self) -> Affine3A {
        *self.world_matrix.read()
    }

    pub fn set_world_matrix(&self, matrix: Affine3A) {
        *self.world_matrix.write() = matrix;
    }
}
