//! The crate's host-agnostic resource model.
//!
//! The host rendering library is treated as an opaque data source, so the
//! crate carries its own lightweight geometry/texture/material/mesh types:
//! just enough surface for the evaluator to measure and the resolver to
//! swap. Resources are stored in slot-map storages and addressed by
//! strongly-typed handles; all LOD bookkeeping is kept in external maps,
//! never on the resources themselves.

pub mod geometry;
pub mod material;
pub mod mesh;
pub mod storage;
pub mod texture;

use std::sync::Arc;

use slotmap::new_key_type;

use geometry::Geometry;
use material::Material;
use mesh::Mesh;
use storage::AssetStorage;
use texture::Texture;

// Strongly-typed handles
new_key_type! {
    pub struct GeometryHandle;
    pub struct MaterialHandle;
    pub struct TextureHandle;
    pub struct MeshHandle;
}

/// Shared storage for all resource kinds.
///
/// One `ResourcePool` exists per running application; it is the explicit
/// context object passed (by cheap clone) to the resolver, registry and
/// evaluator instead of hidden global state.
#[derive(Clone)]
pub struct ResourcePool {
    pub geometries: Arc<AssetStorage<GeometryHandle, Geometry>>,
    pub materials: Arc<AssetStorage<MaterialHandle, Material>>,
    pub textures: Arc<AssetStorage<TextureHandle, Texture>>,
    pub meshes: Arc<AssetStorage<MeshHandle, Mesh>>,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            geometries: Arc::new(AssetStorage::new()),
            materials: Arc::new(AssetStorage::new()),
            textures: Arc::new(AssetStorage::new()),
            meshes: Arc::new(AssetStorage::new()),
        }
    }
}
