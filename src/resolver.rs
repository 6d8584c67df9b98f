//! Variant resolution: the path from "show level N of this resource" to a
//! live, swapped-in resource.
//!
//! The resolver owns the registry, the caches and the load queue. All
//! failures are caught here, logged, and represented as a memoized `None`
//! so a broken variant is attempted once and the display keeps whatever
//! resource it already has.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::descriptor::LodDescriptor;
use crate::loader::{AssetFetcher, GltfVariantLoader, VariantLoader};
use crate::observer::ObserverSet;
use crate::queue::LoadQueue;
use crate::registry::{LodBinding, LodRegistry, LowresEntry, TextureLevelBounds, TextureLodRange};
use crate::resources::material::GLYPH_ATLAS_SLOT;
use crate::resources::{GeometryHandle, MaterialHandle, MeshHandle, ResourcePool, TextureHandle};

/// Default bound on concurrent variant fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// The resource(s) a resolution produced.
#[derive(Debug, Clone)]
pub enum ResolvedVariant {
    Texture(TextureHandle),
    /// One geometry per subpart, in container declaration order.
    Geometries(Vec<GeometryHandle>),
}

/// One texture slot the resolver swapped (or produced, for bare-texture
/// targets).
#[derive(Debug, Clone)]
pub struct SlotSwap {
    pub material: Option<MaterialHandle>,
    pub slot: Option<String>,
    pub texture: TextureHandle,
    pub level: usize,
}

/// What [`LodResolver::apply_texture_level`] operates on.
#[derive(Debug, Clone)]
pub enum TextureLodTarget {
    /// Every texture slot of every material of the mesh.
    Mesh(MeshHandle),
    /// Every texture slot of the given materials.
    Materials(Vec<MaterialHandle>),
    /// A single texture, outside any material.
    Texture(TextureHandle),
}

type SharedResolution = Shared<BoxFuture<'static, Option<ResolvedVariant>>>;

enum VariantKind {
    Container,
    PlainTexture,
}

struct ResolverInner {
    pool: ResourcePool,
    registry: LodRegistry,
    queue: LoadQueue,
    fetcher: AssetFetcher,
    loader: Arc<dyn VariantLoader>,
    observers: ObserverSet,
    // (variant url, descriptor id) -> in-flight or settled resolution.
    resolution_cache: Mutex<FxHashMap<(String, String), SharedResolution>>,
}

/// Fetches, caches and deduplicates LOD variant loads.
///
/// Cheap to clone; all clones share the same registry, caches and queue.
#[derive(Clone)]
pub struct LodResolver {
    inner: Arc<ResolverInner>,
}

impl LodResolver {
    #[must_use]
    pub fn new(pool: ResourcePool) -> Self {
        Self::with_loader(pool, Arc::new(GltfVariantLoader::new()))
    }

    #[must_use]
    pub fn with_loader(pool: ResourcePool, loader: Arc<dyn VariantLoader>) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                pool,
                registry: LodRegistry::new(),
                queue: LoadQueue::new(DEFAULT_MAX_CONCURRENT),
                fetcher: AssetFetcher::new(),
                loader,
                observers: ObserverSet::new(),
                resolution_cache: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &ResourcePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn registry(&self) -> &LodRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn queue(&self) -> &LoadQueue {
        &self.inner.queue
    }

    #[must_use]
    pub fn observers(&self) -> &ObserverSet {
        &self.inner.observers
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a texture loaded at `level` from the asset at
    /// `source_url` as an instance of `descriptor`.
    pub fn register_texture(
        &self,
        source_url: &str,
        texture: TextureHandle,
        descriptor: &LodDescriptor,
        level: usize,
    ) {
        let Some(tex) = self.inner.pool.textures.get(texture) else {
            return;
        };
        self.inner.registry.add_descriptor(descriptor.clone());
        self.inner.registry.bind(
            tex.uuid,
            LodBinding {
                source_url: source_url.to_owned(),
                descriptor_id: descriptor.id.clone(),
                level,
                subpart_index: None,
            },
        );
        self.inner.registry.set_lowres_texture(&descriptor.id, texture);
        self.inner
            .observers
            .each(|obs| obs.on_resource_registered(&descriptor.id));
    }

    /// Registers a mesh's displayed geometry as an instance of
    /// `descriptor`. For meshes starting below the highest level the
    /// original geometry is also captured for precise hit-testing later.
    pub fn register_mesh(
        &self,
        source_url: &str,
        mesh: MeshHandle,
        geometry: GeometryHandle,
        descriptor: &LodDescriptor,
        level: usize,
        subpart_index: Option<usize>,
    ) {
        let Some(geo) = self.inner.pool.geometries.get(geometry) else {
            return;
        };
        self.inner.registry.add_descriptor(descriptor.clone());
        self.inner.registry.bind(
            geo.uuid,
            LodBinding {
                source_url: source_url.to_owned(),
                descriptor_id: descriptor.id.clone(),
                level,
                subpart_index,
            },
        );
        self.inner
            .registry
            .push_lowres_geometry(&descriptor.id, geometry);
        if level > 0 {
            if let Some(mesh_obj) = self.inner.pool.meshes.get(mesh) {
                self.inner
                    .registry
                    .set_raycast_fallback(mesh_obj.uuid, geometry);
            }
        }
        self.inner
            .observers
            .each(|obs| obs.on_resource_registered(&descriptor.id));
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolves the geometry for `level` of a tracked geometry's
    /// descriptor. Untracked geometries resolve to `None`; levels beyond
    /// the variant list degrade to the originally-loaded geometry.
    pub async fn resolve_mesh_level(
        &self,
        geometry: GeometryHandle,
        level: usize,
    ) -> Option<GeometryHandle> {
        let geo = self.inner.pool.geometries.get(geometry)?;
        let binding = self.inner.registry.binding(geo.uuid)?;
        let descriptor = self.inner.registry.descriptor(&binding.descriptor_id)?;
        let subpart = binding.subpart_index.unwrap_or(0);

        if degrades_to_lowres(&descriptor, level) {
            return match self.inner.registry.lowres(&binding.descriptor_id)? {
                LowresEntry::Geometries(list) => list.get(subpart).copied(),
                LowresEntry::Texture(_) => None,
            };
        }

        let url = self.variant_url(&binding, &descriptor, level)?;
        let resolved = self
            .resolve_cached(url, binding.descriptor_id.clone(), level, &VariantKind::Container)
            .await?;
        match resolved {
            ResolvedVariant::Geometries(list) => {
                let handle = list.get(subpart).copied();
                if handle.is_none() {
                    log::warn!(
                        "variant of '{}' has no subpart {subpart}",
                        binding.descriptor_id
                    );
                }
                handle
            }
            ResolvedVariant::Texture(_) => None,
        }
    }

    /// Resolves the texture for `level` of a tracked texture's
    /// descriptor. Presentation settings of the currently-displayed
    /// texture are copied onto the resolved one so a swap is seamless.
    pub async fn resolve_texture_level(
        &self,
        texture: TextureHandle,
        level: usize,
    ) -> Option<TextureHandle> {
        let tex = self.inner.pool.textures.get(texture)?;
        let binding = self.inner.registry.binding(tex.uuid)?;
        let descriptor = self.inner.registry.descriptor(&binding.descriptor_id)?;

        if degrades_to_lowres(&descriptor, level) {
            return match self.inner.registry.lowres(&binding.descriptor_id)? {
                LowresEntry::Texture(handle) => Some(handle),
                LowresEntry::Geometries(_) => None,
            };
        }

        let url = self.variant_url(&binding, &descriptor, level)?;
        let kind = if is_container_uri(&url) {
            VariantKind::Container
        } else {
            VariantKind::PlainTexture
        };
        let resolved = self
            .resolve_cached(url, binding.descriptor_id.clone(), level, &kind)
            .await?;
        match resolved {
            ResolvedVariant::Texture(handle) => {
                if handle != texture {
                    if let Some(new_tex) = self.inner.pool.textures.get(handle) {
                        new_tex.copy_settings(&tex);
                    }
                }
                Some(handle)
            }
            ResolvedVariant::Geometries(_) => None,
        }
    }

    /// Resolves the variant URL for `level`, logging a missing URI once
    /// per descriptor.
    fn variant_url(
        &self,
        binding: &LodBinding,
        descriptor: &LodDescriptor,
        level: usize,
    ) -> Option<String> {
        let variant = descriptor.variant(level).filter(|v| !v.uri.is_empty());
        let Some(variant) = variant else {
            if self.inner.registry.mark_missing_uri(&descriptor.id) {
                log::warn!("descriptor '{}' has no URI for level {level}", descriptor.id);
            }
            return None;
        };
        let url = crate::utils::resolve_url(Some(&binding.source_url), &variant.uri);
        Some(crate::utils::append_content_hash(
            &url,
            variant.content_hash.as_deref(),
        ))
    }

    /// The dedup core: at most one in-flight fetch per
    /// `(url, descriptor id)`, settled results memoized, disposed results
    /// invalidated and refetched.
    async fn resolve_cached(
        &self,
        url: String,
        descriptor_id: String,
        level: usize,
        kind: &VariantKind,
    ) -> Option<ResolvedVariant> {
        let key = (url.clone(), descriptor_id.clone());
        loop {
            // Check-then-populate happens under one lock so two callers
            // can never both miss.
            let (shared, created) = {
                let mut cache = self.inner.resolution_cache.lock();
                match cache.get(&key) {
                    Some(existing) => (existing.clone(), false),
                    None => {
                        let fut =
                            self.fetch_future(url.clone(), descriptor_id.clone(), level, kind);
                        cache.insert(key.clone(), fut.clone());
                        (fut, true)
                    }
                }
            };

            let result = shared.clone().await;
            match result {
                // A memoized failure is permanent; do not retry.
                None => return None,
                Some(resolved) => {
                    if created || self.is_live(&resolved) {
                        return Some(resolved);
                    }
                    // The cached resource was disposed by its owner.
                    // Invalidate (only if the entry is still ours) and
                    // fetch again.
                    let mut cache = self.inner.resolution_cache.lock();
                    if cache.get(&key).is_some_and(|e| e.ptr_eq(&shared)) {
                        log::debug!("cached variant {url} was disposed, refetching");
                        cache.remove(&key);
                    }
                }
            }
        }
    }

    /// Builds the shared fetch future for one variant. Queue admission is
    /// awaited inside the future so a declined admission memoizes as a
    /// permanent `None` for this attempt, exactly like a fetch failure.
    fn fetch_future(
        &self,
        url: String,
        descriptor_id: String,
        level: usize,
        kind: &VariantKind,
    ) -> SharedResolution {
        let resolver = self.clone();
        match kind {
            VariantKind::Container => async move {
                let Some(_permit) = resolver.inner.queue.request_slot(url.clone()).await else {
                    return None;
                };
                let loaded = resolver
                    .inner
                    .loader
                    .load_container(&resolver.inner.fetcher, &url, &descriptor_id)
                    .await;
                match loaded {
                    Ok(container) => resolver.adopt_container(&url, &descriptor_id, level, container),
                    Err(err) => {
                        log::warn!("failed to load variant {url}: {err}");
                        None
                    }
                }
            }
            .boxed()
            .shared(),
            VariantKind::PlainTexture => async move {
                let Some(_permit) = resolver.inner.queue.request_slot(url.clone()).await else {
                    return None;
                };
                let loaded = resolver
                    .inner
                    .loader
                    .load_plain_texture(&resolver.inner.fetcher, &url)
                    .await;
                match loaded {
                    Ok(texture) => {
                        let uuid = texture.uuid;
                        let handle = resolver.inner.pool.textures.add(texture);
                        resolver.inner.registry.bind(
                            uuid,
                            LodBinding {
                                source_url: url,
                                descriptor_id,
                                level,
                                subpart_index: None,
                            },
                        );
                        Some(ResolvedVariant::Texture(handle))
                    }
                    Err(err) => {
                        log::warn!("failed to load variant {url}: {err}");
                        None
                    }
                }
            }
            .boxed()
            .shared(),
        }
    }

    /// Adopts freshly-parsed container resources into the pool, tagging
    /// each with a binding so it can itself be resolved further.
    fn adopt_container(
        &self,
        url: &str,
        descriptor_id: &str,
        level: usize,
        container: crate::loader::LoadedContainer,
    ) -> Option<ResolvedVariant> {
        if let Some(descriptor) = container.descriptor {
            self.inner.registry.add_descriptor(descriptor);
        }

        if let Some(texture) = container.texture {
            let uuid = texture.uuid;
            let handle = self.inner.pool.textures.add(texture);
            self.inner.registry.bind(
                uuid,
                LodBinding {
                    source_url: url.to_owned(),
                    descriptor_id: descriptor_id.to_owned(),
                    level,
                    subpart_index: None,
                },
            );
            return Some(ResolvedVariant::Texture(handle));
        }

        if container.geometries.is_empty() {
            log::warn!("container {url} held no usable entry for '{descriptor_id}'");
            return None;
        }

        let mut handles = Vec::with_capacity(container.geometries.len());
        for (subpart, geometry) in container.geometries.into_iter().enumerate() {
            let uuid = geometry.uuid;
            let handle = self.inner.pool.geometries.add(geometry);
            self.inner.registry.bind(
                uuid,
                LodBinding {
                    source_url: url.to_owned(),
                    descriptor_id: descriptor_id.to_owned(),
                    level,
                    subpart_index: Some(subpart),
                },
            );
            handles.push(handle);
        }
        Some(ResolvedVariant::Geometries(handles))
    }

    fn is_live(&self, resolved: &ResolvedVariant) -> bool {
        match resolved {
            ResolvedVariant::Texture(handle) => self
                .inner
                .pool
                .textures
                .get(*handle)
                .is_some_and(|t| t.has_backing_data()),
            ResolvedVariant::Geometries(handles) => handles.iter().all(|h| {
                self.inner
                    .pool
                    .geometries
                    .get(*h)
                    .is_some_and(|g| g.has_backing_data())
            }),
        }
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    /// Requests `level` for a mesh and swaps its geometry once resolved.
    ///
    /// A request token is stamped before resolving; a resolution that
    /// completes after a newer request superseded it is silently
    /// discarded, so the most recently requested level always wins.
    pub async fn apply_mesh_level(&self, mesh: MeshHandle, level: usize) -> Option<GeometryHandle> {
        let mesh_obj = self.inner.pool.meshes.get(mesh)?;
        self.inner
            .registry
            .set_requested_mesh_level(mesh_obj.uuid, level);
        self.inner
            .observers
            .each(|obs| obs.on_before_fetch_mesh_level(&self.inner.pool, mesh, level));

        let current = mesh_obj.geometry();
        let resolved = self.resolve_mesh_level(current, level).await?;

        if self.inner.registry.requested_mesh_level(mesh_obj.uuid) != Some(level) {
            // Superseded while loading.
            return None;
        }
        if resolved != current {
            mesh_obj.set_geometry(resolved);
            if let Some(geo) = self.inner.pool.geometries.get(resolved) {
                self.inner.registry.set_applied_level(geo.uuid, level);
            }
        }
        Some(resolved)
    }

    /// Requests `level` for every texture slot of the target and swaps
    /// each slot once its resolution completes. Returns the slots whose
    /// displayed texture actually changed.
    ///
    /// Slots carry their own request tokens: a slot is only written if its
    /// most recent request is still this level, so concurrent upgrades and
    /// downgrades settle on whichever was requested last. Glyph-atlas
    /// slots are never swapped.
    pub async fn apply_texture_level(&self, target: &TextureLodTarget, level: usize) -> Vec<SlotSwap> {
        match target {
            TextureLodTarget::Mesh(mesh) => {
                let Some(mesh_obj) = self.inner.pool.meshes.get(*mesh) else {
                    return Vec::new();
                };
                self.apply_to_materials(&mesh_obj.materials(), level).await
            }
            TextureLodTarget::Materials(materials) => {
                self.apply_to_materials(materials, level).await
            }
            TextureLodTarget::Texture(texture) => {
                match self.resolve_texture_level(*texture, level).await {
                    Some(handle) => vec![SlotSwap {
                        material: None,
                        slot: None,
                        texture: handle,
                        level,
                    }],
                    None => Vec::new(),
                }
            }
        }
    }

    async fn apply_to_materials(
        &self,
        materials: &[MaterialHandle],
        level: usize,
    ) -> Vec<SlotSwap> {
        let mut slot_jobs = Vec::new();
        for &material in materials {
            let Some(mat) = self.inner.pool.materials.get(material) else {
                continue;
            };
            for slot in mat.slots() {
                if slot.name == GLYPH_ATLAS_SLOT {
                    continue;
                }
                self.inner
                    .registry
                    .set_slot_level(mat.uuid, &slot.name, level);
                slot_jobs.push((material, mat.uuid, slot));
            }
        }

        let resolutions = futures::future::join_all(slot_jobs.iter().map(|(_, _, slot)| {
            self.resolve_texture_level(slot.texture, level)
        }))
        .await;

        let mut swaps = Vec::new();
        for ((material, mat_uuid, slot), resolved) in slot_jobs.into_iter().zip(resolutions) {
            let Some(handle) = resolved else { continue };
            // Stale if a newer request re-stamped the slot meanwhile.
            if self.inner.registry.slot_level(mat_uuid, &slot.name) != Some(level) {
                continue;
            }
            // A resolution landing on the displayed texture is a no-op
            // and is not reported as a swap.
            if handle == slot.texture {
                continue;
            }
            if let Some(mat) = self.inner.pool.materials.get(material) {
                mat.swap_slot_texture(&slot.name, handle);
            }
            swaps.push(SlotSwap {
                material: Some(material),
                slot: Some(slot.name),
                texture: handle,
                level,
            });
        }
        swaps
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Whether the target has any LOD data, or data for a specific level.
    #[must_use]
    pub fn has_lod_level(&self, target: &TextureLodTarget, level: Option<usize>) -> bool {
        let check = |uuid: uuid::Uuid| -> bool {
            let Some(binding) = self.inner.registry.binding(uuid) else {
                return false;
            };
            let Some(descriptor) = self.inner.registry.descriptor(&binding.descriptor_id) else {
                return false;
            };
            match level {
                Some(level) => level < descriptor.level_count(),
                None => descriptor.level_count() > 0,
            }
        };
        match target {
            TextureLodTarget::Texture(texture) => self
                .inner
                .pool
                .textures
                .get(*texture)
                .is_some_and(|t| check(t.uuid)),
            TextureLodTarget::Materials(materials) => materials.iter().any(|&m| {
                self.inner.pool.materials.get(m).is_some_and(|mat| {
                    mat.slots().iter().any(|slot| {
                        self.inner
                            .pool
                            .textures
                            .get(slot.texture)
                            .is_some_and(|t| check(t.uuid))
                    })
                })
            }),
            TextureLodTarget::Mesh(mesh) => {
                let Some(mesh_obj) = self.inner.pool.meshes.get(*mesh) else {
                    return false;
                };
                let geometry_has = self
                    .inner
                    .pool
                    .geometries
                    .get(mesh_obj.geometry())
                    .is_some_and(|g| check(g.uuid));
                geometry_has
                    || self
                        .has_lod_level(&TextureLodTarget::Materials(mesh_obj.materials()), level)
            }
        }
    }

    /// Aggregated texture LOD bounds across the given materials' slots.
    /// Per-material results are cached by material UUID.
    #[must_use]
    pub fn material_texture_lod_range(&self, materials: &[MaterialHandle]) -> TextureLodRange {
        let mut total = empty_range();
        let mut any = false;
        for &material in materials {
            let Some(mat) = self.inner.pool.materials.get(material) else {
                continue;
            };
            let range = if let Some(cached) = self.inner.registry.cached_texture_range(mat.uuid) {
                cached
            } else {
                let computed = self.compute_texture_range(&mat.slots());
                self.inner
                    .registry
                    .cache_texture_range(mat.uuid, computed.clone());
                computed
            };
            if range.max_level_count == 0 {
                continue;
            }
            any = true;
            merge_range(&mut total, &range);
        }
        if any { total } else { TextureLodRange::default() }
    }

    fn compute_texture_range(
        &self,
        slots: &[crate::resources::material::TextureSlot],
    ) -> TextureLodRange {
        let mut range = empty_range();
        let mut any = false;
        for slot in slots {
            let Some(tex) = self.inner.pool.textures.get(slot.texture) else {
                continue;
            };
            let Some(binding) = self.inner.registry.binding(tex.uuid) else {
                continue;
            };
            let Some(descriptor) = self.inner.registry.descriptor(&binding.descriptor_id) else {
                continue;
            };
            if descriptor.level_count() == 0 {
                continue;
            }
            any = true;
            range.min_level_count = range.min_level_count.min(descriptor.level_count());
            range.max_level_count = range.max_level_count.max(descriptor.level_count());
            if range.levels.len() < descriptor.level_count() {
                range
                    .levels
                    .resize(descriptor.level_count(), TextureLevelBounds::default());
            }
            for (i, variant) in descriptor.variants.iter().enumerate() {
                if let Some(edge) = variant.max_edge() {
                    range.min_height = range.min_height.min(edge);
                    range.max_height = range.max_height.max(edge);
                    let bounds = &mut range.levels[i];
                    bounds.max_height = bounds.max_height.max(edge);
                    bounds.min_height = if bounds.min_height == 0 {
                        edge
                    } else {
                        bounds.min_height.min(edge)
                    };
                }
            }
        }
        if any { range } else { TextureLodRange::default() }
    }

    /// The descriptor driving a mesh's geometry LOD, if it is tracked.
    #[must_use]
    pub fn mesh_descriptor(&self, mesh: MeshHandle) -> Option<LodDescriptor> {
        let mesh_obj = self.inner.pool.meshes.get(mesh)?;
        let geo = self.inner.pool.geometries.get(mesh_obj.geometry())?;
        let binding = self.inner.registry.binding(geo.uuid)?;
        self.inner.registry.descriptor(&binding.descriptor_id)
    }
}

fn empty_range() -> TextureLodRange {
    TextureLodRange {
        min_level_count: usize::MAX,
        max_level_count: 0,
        min_height: u32::MAX,
        max_height: 0,
        levels: Vec::new(),
    }
}

fn merge_range(total: &mut TextureLodRange, range: &TextureLodRange) {
    total.min_level_count = total.min_level_count.min(range.min_level_count);
    total.max_level_count = total.max_level_count.max(range.max_level_count);
    total.min_height = total.min_height.min(range.min_height);
    total.max_height = total.max_height.max(range.max_height);
    if total.levels.len() < range.levels.len() {
        total
            .levels
            .resize(range.levels.len(), TextureLevelBounds::default());
    }
    for (bounds, incoming) in total.levels.iter_mut().zip(&range.levels) {
        bounds.max_height = bounds.max_height.max(incoming.max_height);
        bounds.min_height = if bounds.min_height == 0 {
            incoming.min_height
        } else {
            bounds.min_height.min(incoming.min_height)
        };
    }
}

/// Levels past the variant list, or any nonzero level of a single-variant
/// descriptor, degrade to the originally-loaded resource without a fetch.
fn degrades_to_lowres(descriptor: &LodDescriptor, level: usize) -> bool {
    level > 0 && (level >= descriptor.level_count() || descriptor.level_count() == 1)
}

fn is_container_uri(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url);
    let path = path.to_ascii_lowercase();
    path.ends_with(".glb") || path.ends_with(".gltf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_uri_detection_ignores_query() {
        assert!(is_container_uri("https://x.com/a.glb?v=123"));
        assert!(is_container_uri("scene.GLTF"));
        assert!(!is_container_uri("tex_lod1.webp"));
    }

    #[test]
    fn degradation_rule() {
        let single = LodDescriptor {
            id: "s".into(),
            variants: vec![crate::descriptor::LodVariant {
                uri: "a.glb".into(),
                content_hash: None,
                width: None,
                height: None,
                vertex_count: None,
                index_count: None,
                densities: None,
                density: None,
            }],
        };
        assert!(degrades_to_lowres(&single, 1));
        assert!(degrades_to_lowres(&single, 99));
        assert!(!degrades_to_lowres(&single, 0));

        let triple = LodDescriptor {
            id: "t".into(),
            variants: (0..3)
                .map(|i| crate::descriptor::LodVariant {
                    uri: format!("{i}.glb"),
                    content_hash: None,
                    width: None,
                    height: None,
                    vertex_count: None,
                    index_count: None,
                    densities: None,
                    density: None,
                })
                .collect(),
        };
        assert!(!degrades_to_lowres(&triple, 2));
        assert!(degrades_to_lowres(&triple, 3));
        assert!(degrades_to_lowres(&triple, 99));
    }
}
