//! Per-frame LOD evaluation and the explicit frame-driver callback.
//!
//! The host render loop calls [`LodsManager::after_render`] once per
//! rendered pass. Main-canvas passes advance the frame clock and, at a
//! throttled cadence, evaluate every visible mesh: screen coverage,
//! visibility and mesh density decide a target mesh level and texture
//! level, and changed targets are handed to the resolver.

use std::sync::Arc;

use glam::{Affine3A, Vec3, Vec4Swizzles};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::camera::CameraState;
use crate::group::LoadGroup;
use crate::registry::TextureLodRange;
use crate::resolver::{LodResolver, TextureLodTarget};
use crate::resources::geometry::Aabb;
use crate::resources::{MeshHandle, ResourcePool};
use crate::runtime;
use crate::utils::{FpsCounter, Timer};

/// Level assigned to objects outside the view frustum. Beyond any real
/// variant list, so the resolver degrades it to the original resource.
pub const OUT_OF_VIEW_LEVEL: usize = 99;

/// Default desired triangle density: max triangles on screen when a mesh
/// fills it.
pub const DEFAULT_TARGET_DENSITY: f64 = 200_000.0;

const MAX_UPDATE_INTERVAL: u32 = 10;
const LOW_FPS: f32 = 40.0;
const HIGH_FPS: f32 = 60.0;
const WARMUP_FRAMES: u32 = 2;
const FEW_VERTICES: u32 = 100;
const WIDE_FOV_RADIANS: f32 = 70.0 * std::f32::consts::PI / 180.0;

/// What kind of render pass just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassKind {
    /// The visible canvas. The only pass kind that updates LODs.
    MainCanvas,
    OffscreenTarget,
    ShadowMap,
    CubeMap,
    /// Full-screen post-processing blit.
    PostProcessBlit,
}

/// Canvas and screen metrics for the pass.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub canvas_height: f32,
    pub screen_height: f32,
    pub device_pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            canvas_height: 1080.0,
            screen_height: 1080.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Static facts about the device and hosting context.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceProfile {
    /// Data-saver connections skip 2048px-and-up texture levels.
    pub low_bandwidth: bool,
    /// Constrained (mobile-class) devices skip levels above 4096px.
    pub constrained: bool,
    /// Document-embedded viewers double the desired texture pixel size.
    pub embedded_viewer: bool,
    /// Immersive (XR) rendering enables centrality dampening at wide
    /// fields of view.
    pub immersive: bool,
}

/// Evaluation cadence in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateInterval {
    /// Adapts to the measured frame rate.
    Auto,
    /// Evaluate every `n` frames.
    Fixed(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodKind {
    Mesh,
    Texture,
}

/// Fired after a level swap completed on a displayed object.
#[derive(Debug, Clone, Copy)]
pub struct LodChangedEvent {
    pub kind: LodKind,
    pub level: usize,
    pub target: MeshHandle,
}

/// One finished render pass, as reported by the host.
pub struct RenderFrame<'a> {
    pub pass: RenderPassKind,
    pub camera: &'a CameraState,
    pub viewport: Viewport,
    /// Meshes drawn by this pass, any order.
    pub meshes: &'a [MeshHandle],
}

type ChangedListener = Box<dyn Fn(&LodChangedEvent) + Send + Sync>;

struct LodState {
    frames: u32,
    last_mesh_level: Option<usize>,
    last_texture_level: Option<usize>,
    last_coverage: f32,
    last_centrality: f32,
    last_volume: Vec3,
}

impl LodState {
    fn new() -> Self {
        Self {
            frames: 0,
            last_mesh_level: None,
            last_texture_level: None,
            last_coverage: 0.0,
            last_centrality: 1.0,
            last_volume: Vec3::ZERO,
        }
    }
}

/// Latest evaluation facts for one mesh, for debug overlays.
#[derive(Debug, Clone, Copy)]
pub struct LodStateSnapshot {
    pub mesh_level: Option<usize>,
    pub texture_level: Option<usize>,
    /// Screen fraction the mesh covered, after centrality dampening.
    pub coverage: f32,
    /// Projected screen-space extents, one fraction per axis.
    pub screenspace_volume: Vec3,
}

struct ManagerInner {
    enabled: bool,
    pause: bool,
    target_density: f64,
    update_interval: UpdateInterval,
    current_interval: u32,
    device: DeviceProfile,
    frame: u64,
    timer: Timer,
    fps: FpsCounter,
    lod_states: FxHashMap<Uuid, LodState>,
    groups: Vec<LoadGroup>,
}

/// Drives LOD evaluation from the host render loop.
pub struct LodsManager {
    resolver: LodResolver,
    inner: Mutex<ManagerInner>,
    listeners: Arc<RwLock<Vec<ChangedListener>>>,
}

impl LodsManager {
    #[must_use]
    pub fn new(resolver: LodResolver) -> Self {
        Self {
            resolver,
            inner: Mutex::new(ManagerInner {
                enabled: false,
                pause: false,
                target_density: DEFAULT_TARGET_DENSITY,
                update_interval: UpdateInterval::Auto,
                current_interval: 1,
                device: DeviceProfile::default(),
                frame: 0,
                timer: Timer::new(),
                fps: FpsCounter::new(),
                lod_states: FxHashMap::default(),
                groups: Vec::new(),
            }),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &LodResolver {
        &self.resolver
    }

    pub fn enable(&self) {
        self.inner.lock().enabled = true;
    }

    pub fn disable(&self) {
        self.inner.lock().enabled = false;
    }

    pub fn set_pause(&self, pause: bool) {
        self.inner.lock().pause = pause;
    }

    pub fn set_target_density(&self, density: f64) {
        self.inner.lock().target_density = density;
    }

    pub fn set_update_interval(&self, interval: UpdateInterval) {
        self.inner.lock().update_interval = interval;
    }

    pub fn set_device_profile(&self, device: DeviceProfile) {
        self.inner.lock().device = device;
    }

    /// Registers a listener fired after every completed level swap.
    pub fn on_changed(&self, listener: impl Fn(&LodChangedEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    /// Latest evaluation snapshot for a mesh. `None` until the mesh has
    /// been observed at least once.
    #[must_use]
    pub fn state_snapshot(&self, mesh: MeshHandle) -> Option<LodStateSnapshot> {
        let uuid = self.resolver.pool().meshes.get(mesh)?.uuid;
        let inner = self.inner.lock();
        let state = inner.lod_states.get(&uuid)?;
        Some(LodStateSnapshot {
            mesh_level: state.last_mesh_level,
            texture_level: state.last_texture_level,
            coverage: state.last_coverage,
            screenspace_volume: state.last_volume,
        })
    }

    /// Registers a group to capture the loads issued by upcoming
    /// evaluations. Finished groups are dropped automatically.
    pub fn add_group(&self, group: LoadGroup) {
        self.inner.lock().groups.push(group);
    }

    /// The host calls this after every render pass.
    ///
    /// Main-canvas passes advance the frame clock; other pass kinds
    /// (offscreen targets, shadow maps, cube maps, post-process blits)
    /// never update LODs.
    pub fn after_render(&self, frame: &RenderFrame<'_>) {
        let mut inner = self.inner.lock();
        if frame.pass != RenderPassKind::MainCanvas {
            return;
        }

        inner.frame += 1;
        inner.timer.tick();
        let delta = inner.timer.dt_seconds();
        let fps = inner.fps.push_delta(delta);

        // Capture windows are measured in rendered frames; groups and
        // queued admissions keep advancing while evaluation is off.
        self.resolver.queue().tick();
        for group in &inner.groups {
            group.update();
        }
        inner.groups.retain(|g| !g.is_finished());

        if !inner.enabled || inner.pause {
            return;
        }

        inner.current_interval = match inner.update_interval {
            UpdateInterval::Auto => next_auto_interval(inner.current_interval, fps),
            UpdateInterval::Fixed(n) => n.max(1),
        };
        if inner.frame % u64::from(inner.current_interval) != 0 {
            return;
        }

        let target_density = inner.target_density;
        let device = inner.device;
        for &mesh in frame.meshes {
            self.evaluate_mesh(&mut inner, mesh, frame.camera, frame.viewport, target_density, device);
        }
    }

    fn evaluate_mesh(
        &self,
        inner: &mut ManagerInner,
        mesh: MeshHandle,
        camera: &CameraState,
        viewport: Viewport,
        target_density: f64,
        device: DeviceProfile,
    ) {
        let pool = self.resolver.pool().clone();
        let Some(mesh_obj) = pool.meshes.get(mesh) else {
            return;
        };
        let state = inner
            .lod_states
            .entry(mesh_obj.uuid)
            .or_insert_with(LodState::new);

        // Let transforms and bounds settle before the first evaluation.
        if state.frames < WARMUP_FRAMES {
            state.frames += 1;
            return;
        }
        state.frames += 1;

        self.resolver
            .observers()
            .each(|obs| obs.on_before_evaluate(&pool, mesh));

        let texture_range = self
            .resolver
            .material_texture_lod_range(&mesh_obj.materials());
        let targets = self.calculate_levels(
            &pool,
            mesh,
            camera,
            viewport,
            target_density,
            device,
            &texture_range,
            state,
        );

        if let Some(level) = targets.mesh {
            if state.last_mesh_level != Some(level) {
                self.spawn_mesh_apply(&inner.groups, mesh_obj.uuid, mesh, level);
            }
        }
        if let Some(level) = targets.texture {
            if state.last_texture_level != Some(level) {
                self.spawn_texture_apply(&inner.groups, mesh_obj.uuid, mesh, level);
            }
        }

        self.resolver.observers().each(|obs| {
            obs.on_after_evaluate(
                &pool,
                mesh,
                targets.mesh.unwrap_or(0),
                targets.texture.unwrap_or(0),
            );
        });

        if targets.mesh.is_some() {
            state.last_mesh_level = targets.mesh;
        }
        if targets.texture.is_some() {
            state.last_texture_level = targets.texture;
        }
    }

    fn spawn_mesh_apply(&self, groups: &[LoadGroup], source: Uuid, mesh: MeshHandle, level: usize) {
        let resolver = self.resolver.clone();
        let listeners = Arc::clone(&self.listeners);
        let load = async move {
            let before = resolver.pool().meshes.get(mesh).map(|m| m.geometry());
            let applied = resolver.apply_mesh_level(mesh, level).await;
            if applied.is_some() && applied != before {
                let event = LodChangedEvent {
                    kind: LodKind::Mesh,
                    level,
                    target: mesh,
                };
                for listener in listeners.read().iter() {
                    listener(&event);
                }
            }
        };
        dispatch_load(groups, source, load);
    }

    fn spawn_texture_apply(
        &self,
        groups: &[LoadGroup],
        source: Uuid,
        mesh: MeshHandle,
        level: usize,
    ) {
        let resolver = self.resolver.clone();
        let listeners = Arc::clone(&self.listeners);
        let load = async move {
            let swaps = resolver
                .apply_texture_level(&TextureLodTarget::Mesh(mesh), level)
                .await;
            if !swaps.is_empty() {
                let event = LodChangedEvent {
                    kind: LodKind::Texture,
                    level,
                    target: mesh,
                };
                for listener in listeners.read().iter() {
                    listener(&event);
                }
            }
        };
        dispatch_load(groups, source, load);
    }

    fn calculate_levels(
        &self,
        pool: &ResourcePool,
        mesh: MeshHandle,
        camera: &CameraState,
        viewport: Viewport,
        target_density: f64,
        device: DeviceProfile,
        texture_range: &TextureLodRange,
        state: &mut LodState,
    ) -> LodTargets {
        let Some(mesh_obj) = pool.meshes.get(mesh) else {
            return LodTargets::none();
        };
        let Some(geometry) = pool.geometries.get(mesh_obj.geometry()) else {
            return LodTargets::none();
        };

        let mesh_descriptor = self.resolver.mesh_descriptor(mesh);
        let has_mesh_lods = mesh_descriptor
            .as_ref()
            .is_some_and(|d| d.level_count() > 0);
        let has_texture_lods =
            texture_range.max_level_count > 0 && texture_range.min_level_count != usize::MAX;

        if !has_mesh_lods && !has_texture_lods {
            return LodTargets {
                mesh: Some(0),
                texture: Some(0),
            };
        }

        let world_matrix = mesh_obj.world_matrix();
        let world_sphere = geometry.bounding_sphere().transformed(&world_matrix);
        if !camera.frustum().intersects(&world_sphere) {
            return LodTargets {
                mesh: Some(OUT_OF_VIEW_LEVEL),
                texture: Some(OUT_OF_VIEW_LEVEL),
            };
        }

        let mut mesh_target = if has_mesh_lods {
            None
        } else {
            Some(0)
        };

        if camera.is_perspective {
            // Small nearby decorative detail keeps full quality.
            if geometry.vertex_count() < FEW_VERTICES
                && world_sphere.contains_point(camera.world_position())
            {
                return LodTargets {
                    mesh: Some(0),
                    texture: Some(0),
                };
            }

            let world_box = geometry.bounding_box().transformed(&world_matrix);
            if camera_inside_box(camera, &world_box) {
                return LodTargets {
                    mesh: Some(0),
                    texture: Some(0),
                };
            }

            let ndc_box = project_box(camera, &world_box);

            state.last_centrality = if device.immersive && camera.fov_y > WIDE_FOV_RADIANS {
                centrality_falloff(&ndc_box)
            } else {
                1.0
            };

            // NDC spans -1..1; halve for coverage as a screen fraction.
            let mut size = ndc_box.size() * 0.5;
            if viewport.screen_height > 0.0 && viewport.canvas_height > 0.0 {
                size *= viewport.canvas_height / viewport.screen_height;
            }
            size.x *= camera.aspect;

            // Depth coverage approximated from the view-space box,
            // rescaled into screen-space proportions.
            let view_box = world_box.transformed(&Affine3A::from_mat4(camera.view_matrix));
            let view_size = view_box.size();
            let max_view = view_size.x.max(view_size.y);
            let max_screen = size.x.max(size.y);
            if max_view != 0.0 && max_screen != 0.0 {
                size.z = view_size.z / max_view * max_screen;
            }

            state.last_volume = size;
            state.last_coverage =
                size.x.max(size.y).max(size.z) * state.last_centrality;

            if let Some(descriptor) = &mesh_descriptor {
                if state.last_coverage > 0.0 {
                    let subpart = pool
                        .geometries
                        .get(mesh_obj.geometry())
                        .and_then(|g| self.resolver.registry().binding(g.uuid))
                        .and_then(|b| b.subpart_index)
                        .unwrap_or(0);
                    let mut selected = None;
                    for (level, variant) in descriptor.variants.iter().enumerate() {
                        let Some(density) = variant.density_for(subpart) else {
                            continue;
                        };
                        if density / f64::from(state.last_coverage) < target_density {
                            selected = Some(level);
                            break;
                        }
                    }
                    // Nothing meets the density target at this coverage;
                    // fall back to the worst available variant.
                    mesh_target = Some(selected.unwrap_or(descriptor.lowest_level()));
                }
            }
        }

        let mesh_result = mesh_target.or(state.last_mesh_level);

        let texture_result = if has_texture_lods {
            if state.last_texture_level.is_none() {
                // First evaluation: load the best allowed resolution right
                // away rather than flashing the embedded placeholder.
                highest_allowed_texture_level(texture_range, device)
            } else {
                let mut factor = state.last_coverage * 2.0;
                if device.embedded_viewer {
                    factor *= 2.0;
                }
                let screen_size = viewport.canvas_height / viewport.device_pixel_ratio.max(0.01);
                let pixel_size = screen_size * factor;
                let mut selected = None;
                for (level, bounds) in texture_range.levels.iter().enumerate().rev() {
                    if !texture_level_allowed(bounds.max_height, device) {
                        continue;
                    }
                    if bounds.max_height as f32 > pixel_size {
                        selected = Some(level);
                        break;
                    }
                }
                // Wanting more pixels than any variant offers means the
                // best allowed level is the right answer.
                selected.or_else(|| highest_allowed_texture_level(texture_range, device))
            }
        } else {
            Some(0)
        };

        LodTargets {
            mesh: mesh_result,
            texture: texture_result,
        }
    }
}

/// Runs a load once while letting every open group count it.
fn dispatch_load<F>(groups: &[LoadGroup], source: Uuid, load: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let captors: Vec<LoadGroup> = groups
        .iter()
        .filter(|group| group.capture(source))
        .cloned()
        .collect();
    if captors.is_empty() {
        runtime::spawn(load);
    } else {
        runtime::spawn(async move {
            load.await;
            for group in &captors {
                group.settle(source);
            }
        });
    }
}

struct LodTargets {
    mesh: Option<usize>,
    texture: Option<usize>,
}

impl LodTargets {
    fn none() -> Self {
        Self {
            mesh: None,
            texture: None,
        }
    }
}

/// Widens the interval while the frame rate is low, narrows it while the
/// frame rate is comfortably high.
fn next_auto_interval(current: u32, fps: f32) -> u32 {
    if fps < LOW_FPS && current < MAX_UPDATE_INTERVAL {
        current + 1
    } else if fps >= HIGH_FPS && current > 1 {
        current - 1
    } else {
        current
    }
}

fn texture_level_allowed(max_height: u32, device: DeviceProfile) -> bool {
    if device.low_bandwidth && max_height >= 2048 {
        return false;
    }
    if device.constrained && max_height > 4096 {
        return false;
    }
    true
}

fn highest_allowed_texture_level(
    range: &TextureLodRange,
    device: DeviceProfile,
) -> Option<usize> {
    (0..range.levels.len())
        .find(|&level| texture_level_allowed(range.levels[level].max_height, device))
}

/// True when the projected bottom-center of the box lands behind the
/// near plane, meaning the camera is inside or the box wraps around it.
fn camera_inside_box(camera: &CameraState, world_box: &Aabb) -> bool {
    let center = world_box.center();
    let probe = Vec3::new(center.x, center.y, world_box.min.z);
    let clip = camera.view_projection() * probe.extend(1.0);
    if clip.w.abs() < f32::EPSILON {
        return false;
    }
    (clip.z / clip.w) < 0.0
}

/// Projects a world-space box into normalized device coordinates.
fn project_box(camera: &CameraState, world_box: &Aabb) -> Aabb {
    let vp = camera.view_projection();
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for corner in world_box.corners() {
        let clip = vp * corner.extend(1.0);
        let w = if clip.w.abs() < f32::EPSILON { 1.0 } else { clip.w };
        let ndc = clip.xyz() / w;
        min = min.min(ndc);
        max = max.max(ndc);
    }
    Aabb::new(min, max)
}

/// Cubic falloff penalizing boxes far from the screen center. Tuned for
/// wide-field-of-view immersive rendering where projection inflates
/// peripheral coverage.
fn centrality_falloff(ndc_box: &Aabb) -> f32 {
    const ENLARGEMENT: f32 = 2.0;
    const CENTER_BOOST: f32 = 1.5;

    let min = ndc_box.min;
    let max = ndc_box.max;
    let center_x = (min.x + max.x) * 0.5;
    let center_y = (min.y + max.y) * 0.5;
    let min_x = (min.x - center_x) * ENLARGEMENT + center_x;
    let min_y = (min.y - center_y) * ENLARGEMENT + center_y;
    let max_x = (max.x - center_x) * ENLARGEMENT + center_x;
    let max_y = (max.y - center_y) * ENLARGEMENT + center_y;

    let x_centrality = if min_x < 0.0 && max_x > 0.0 {
        0.0
    } else {
        min.x.abs().min(max.x.abs())
    };
    let y_centrality = if min_y < 0.0 && max_y > 0.0 {
        0.0
    } else {
        min.y.abs().min(max.y.abs())
    };
    let centrality = x_centrality.max(y_centrality);

    (CENTER_BOOST - centrality).powi(3)
}
