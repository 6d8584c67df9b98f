//! Bookkeeping for registered LOD resources.
//!
//! All state lives in external maps keyed by resource UUIDs and descriptor
//! ids; nothing is ever written onto the host's resource instances. One
//! registry exists per [`crate::LodResolver`] and is shared behind an `Arc`.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use crate::descriptor::LodDescriptor;
use crate::resources::{GeometryHandle, TextureHandle};

/// Runtime association between a resource instance and its descriptor.
///
/// Created at registration, `level` is updated whenever a new variant is
/// applied, and the record dies with the resource.
#[derive(Debug, Clone)]
pub struct LodBinding {
    /// Base location of the asset this resource was loaded from. Variant
    /// URIs resolve relative to it.
    pub source_url: String,
    pub descriptor_id: String,
    /// The variant level the resource currently represents.
    pub level: usize,
    /// For grouped mesh resources, which subpart this geometry is.
    pub subpart_index: Option<usize>,
}

/// Original resources as first loaded, kept as a degradation fallback.
#[derive(Debug, Clone)]
pub enum LowresEntry {
    Texture(TextureHandle),
    Geometries(Vec<GeometryHandle>),
}

/// Pixel bounds of one texture LOD level, aggregated across slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureLevelBounds {
    pub min_height: u32,
    pub max_height: u32,
}

/// Aggregated texture LOD bounds across a material's slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureLodRange {
    pub min_level_count: usize,
    pub max_level_count: usize,
    /// Smallest declared variant edge across all slots, in pixels.
    pub min_height: u32,
    /// Largest declared variant edge across all slots, in pixels.
    pub max_height: u32,
    /// Per-level bounds, index 0 being the highest-detail level.
    pub levels: Vec<TextureLevelBounds>,
}

#[derive(Default)]
struct RegistryInner {
    descriptors: FxHashMap<String, LodDescriptor>,
    bindings: FxHashMap<Uuid, LodBinding>,
    lowres: FxHashMap<String, LowresEntry>,
    // Descriptors already warned about for a missing variant URI.
    missing_uri_logged: FxHashSet<String>,
    // Mesh uuid -> most recently requested mesh level (ordering token).
    requested_mesh_level: FxHashMap<Uuid, usize>,
    // (material uuid, slot name) -> last applied texture level.
    slot_levels: FxHashMap<(Uuid, String), usize>,
    // Mesh uuid -> original full-detail geometry for hit testing.
    raycast_fallback: FxHashMap<Uuid, GeometryHandle>,
    // Material uuid -> cached aggregate over its slots' descriptors.
    texture_ranges: FxHashMap<Uuid, TextureLodRange>,
}

/// Maps loaded resources to their descriptors, levels and fallbacks.
#[derive(Default)]
pub struct LodRegistry {
    inner: RwLock<RegistryInner>,
}

impl LodRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Descriptors
    // ------------------------------------------------------------------

    /// Stores a descriptor, or extends the stored one if the new copy
    /// declares more variants.
    pub fn add_descriptor(&self, descriptor: LodDescriptor) {
        let mut inner = self.inner.write();
        match inner.descriptors.get(&descriptor.id) {
            Some(existing) if existing.level_count() >= descriptor.level_count() => {}
            _ => {
                inner.descriptors.insert(descriptor.id.clone(), descriptor);
            }
        }
    }

    #[must_use]
    pub fn descriptor(&self, id: &str) -> Option<LodDescriptor> {
        self.inner.read().descriptors.get(id).cloned()
    }

    #[must_use]
    pub fn descriptor_count(&self) -> usize {
        self.inner.read().descriptors.len()
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    pub fn bind(&self, resource: Uuid, binding: LodBinding) {
        self.inner.write().bindings.insert(resource, binding);
    }

    #[must_use]
    pub fn binding(&self, resource: Uuid) -> Option<LodBinding> {
        self.inner.read().bindings.get(&resource).cloned()
    }

    /// Updates the applied level of a bound resource. No-op if untracked.
    pub fn set_applied_level(&self, resource: Uuid, level: usize) {
        if let Some(binding) = self.inner.write().bindings.get_mut(&resource) {
            binding.level = level;
        }
    }

    pub fn remove_binding(&self, resource: Uuid) {
        self.inner.write().bindings.remove(&resource);
    }

    // ------------------------------------------------------------------
    // Lowres cache
    // ------------------------------------------------------------------

    /// Records the original texture for a descriptor. First write wins;
    /// the cache is never evicted.
    pub fn set_lowres_texture(&self, descriptor_id: &str, texture: TextureHandle) {
        let mut inner = self.inner.write();
        inner
            .lowres
            .entry(descriptor_id.to_owned())
            .or_insert(LowresEntry::Texture(texture));
    }

    /// Appends an original geometry subpart for a descriptor.
    pub fn push_lowres_geometry(&self, descriptor_id: &str, geometry: GeometryHandle) {
        let mut inner = self.inner.write();
        match inner
            .lowres
            .entry(descriptor_id.to_owned())
            .or_insert_with(|| LowresEntry::Geometries(Vec::new()))
        {
            LowresEntry::Geometries(list) => list.push(geometry),
            LowresEntry::Texture(_) => {}
        }
    }

    #[must_use]
    pub fn lowres(&self, descriptor_id: &str) -> Option<LowresEntry> {
        self.inner.read().lowres.get(descriptor_id).cloned()
    }

    // ------------------------------------------------------------------
    // Ordering tokens and staleness guards
    // ------------------------------------------------------------------

    /// Stamps the most recently requested mesh level for an object.
    pub fn set_requested_mesh_level(&self, mesh: Uuid, level: usize) {
        self.inner.write().requested_mesh_level.insert(mesh, level);
    }

    #[must_use]
    pub fn requested_mesh_level(&self, mesh: Uuid) -> Option<usize> {
        self.inner.read().requested_mesh_level.get(&mesh).copied()
    }

    /// Last texture level applied to a material slot.
    #[must_use]
    pub fn slot_level(&self, material: Uuid, slot: &str) -> Option<usize> {
        self.inner
            .read()
            .slot_levels
            .get(&(material, slot.to_owned()))
            .copied()
    }

    pub fn set_slot_level(&self, material: Uuid, slot: &str, level: usize) {
        self.inner
            .write()
            .slot_levels
            .insert((material, slot.to_owned()), level);
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Returns true the first time a descriptor is reported, so a missing
    /// variant URI is logged once rather than every frame.
    pub fn mark_missing_uri(&self, descriptor_id: &str) -> bool {
        self.inner
            .write()
            .missing_uri_logged
            .insert(descriptor_id.to_owned())
    }

    // ------------------------------------------------------------------
    // Raycast fallback
    // ------------------------------------------------------------------

    /// Captures the original geometry of a mesh so hit-testing can stay
    /// precise after the displayed geometry is swapped to a coarser one.
    pub fn set_raycast_fallback(&self, mesh: Uuid, geometry: GeometryHandle) {
        let mut inner = self.inner.write();
        inner.raycast_fallback.entry(mesh).or_insert(geometry);
    }

    #[must_use]
    pub fn raycast_fallback(&self, mesh: Uuid) -> Option<GeometryHandle> {
        self.inner.read().raycast_fallback.get(&mesh).copied()
    }

    // ------------------------------------------------------------------
    // Texture range cache
    // ------------------------------------------------------------------

    #[must_use]
    pub fn cached_texture_range(&self, material: Uuid) -> Option<TextureLodRange> {
        self.inner.read().texture_ranges.get(&material).cloned()
    }

    pub fn cache_texture_range(&self, material: Uuid, range: TextureLodRange) {
        self.inner.write().texture_ranges.insert(material, range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LodVariant;

    fn descriptor(id: &str, count: usize) -> LodDescriptor {
        LodDescriptor {
            id: id.into(),
            variants: (0..count)
                .map(|i| LodVariant {
                    uri: format!("lod{i}.glb"),
                    content_hash: None,
                    width: None,
                    height: None,
                    vertex_count: None,
                    index_count: None,
                    densities: None,
                    density: None,
                })
                .collect(),
        }
    }

    #[test]
    fn add_descriptor_keeps_richer_copy() {
        let registry = LodRegistry::new();
        registry.add_descriptor(descriptor("d", 3));
        registry.add_descriptor(descriptor("d", 1));
        assert_eq!(registry.descriptor("d").unwrap().level_count(), 3);
        registry.add_descriptor(descriptor("d", 5));
        assert_eq!(registry.descriptor("d").unwrap().level_count(), 5);
    }

    #[test]
    fn missing_uri_logged_once_per_descriptor() {
        let registry = LodRegistry::new();
        assert!(registry.mark_missing_uri("d"));
        assert!(!registry.mark_missing_uri("d"));
        assert!(registry.mark_missing_uri("e"));
    }

    #[test]
    fn lowres_first_texture_wins() {
        let registry = LodRegistry::new();
        let pool = crate::resources::ResourcePool::new();
        let t1 = pool.textures.add(crate::resources::texture::Texture::new(
            "t1",
            crate::resources::texture::Image::new(1, 1, Some(vec![0; 4])),
        ));
        let t2 = pool.textures.add(crate::resources::texture::Texture::new(
            "t2",
            crate::resources::texture::Image::new(1, 1, Some(vec![0; 4])),
        ));
        registry.set_lowres_texture("d", t1);
        registry.set_lowres_texture("d", t2);
        match registry.lowres("d").unwrap() {
            LowresEntry::Texture(handle) => assert_eq!(handle, t1),
            LowresEntry::Geometries(_) => panic!("expected texture entry"),
        }
    }

    #[test]
    fn lowres_geometries_keep_subpart_order() {
        let registry = LodRegistry::new();
        let pool = crate::resources::ResourcePool::new();
        let g0 = pool
            .geometries
            .add(crate::resources::geometry::Geometry::new("g0", vec![[0.0; 3]], None));
        let g1 = pool
            .geometries
            .add(crate::resources::geometry::Geometry::new("g1", vec![[0.0; 3]], None));
        registry.push_lowres_geometry("d", g0);
        registry.push_lowres_geometry("d", g1);
        match registry.lowres("d").unwrap() {
            LowresEntry::Geometries(list) => assert_eq!(list, vec![g0, g1]),
            LowresEntry::Texture(_) => panic!("expected geometry entry"),
        }
    }
}
