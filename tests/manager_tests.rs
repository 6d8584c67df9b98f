//! Manager Tests
//!
//! Tests for:
//! - Frame driving: only main-canvas passes advance and evaluate
//! - Warmup: meshes are left alone for their first frames
//! - Frustum culling: off-screen meshes trigger no fetches
//! - Density-based mesh level selection and change events
//! - Low-bandwidth texture filtering
//! - Load group capture across an evaluation window

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use glam::{Affine3A, Mat4, Vec3};
use parking_lot::Mutex;
use tokio::task::yield_now;

use gltf_progressive::errors::Result;
use gltf_progressive::loader::{AssetFetcher, LoadedContainer, VariantLoader};
use gltf_progressive::{
    CameraState, DeviceProfile, Geometry, GroupOptions, Image, LoadGroup, LodChangedEvent,
    LodDescriptor, LodKind, LodResolver, LodVariant, LodsManager, Material, Mesh, MeshHandle,
    RenderFrame, RenderPassKind, ResourcePool, SlotKind, Texture, UpdateInterval, Viewport,
};

const SOURCE_URL: &str = "https://assets.example/scene.glb";

// ============================================================================
// Mock loader
// ============================================================================

#[derive(Default)]
struct RecordingLoader {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl VariantLoader for RecordingLoader {
    fn load_container<'a>(
        &'a self,
        _fetcher: &'a AssetFetcher,
        url: &'a str,
        _descriptor_id: &'a str,
    ) -> BoxFuture<'a, Result<LoadedContainer>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_owned());
            Ok(LoadedContainer {
                texture: None,
                geometries: vec![cube_geometry(url)],
                descriptor: None,
            })
        }
        .boxed()
    }

    fn load_plain_texture<'a>(
        &'a self,
        _fetcher: &'a AssetFetcher,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Texture>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_owned());
            Ok(Texture::new(url, Image::new(4, 4, Some(vec![0; 64]))))
        }
        .boxed()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn cube_geometry(name: &str) -> Geometry {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
    ];
    Geometry::new(name, positions, None)
}

/// Variants from best to worst: the first is far too dense to ever be
/// picked for a small on-screen object, the rest qualify easily.
fn dense_descriptor(id: &str) -> LodDescriptor {
    LodDescriptor {
        id: id.to_owned(),
        variants: vec![
            LodVariant {
                uri: format!("{id}_lod0.glb"),
                densities: Some(vec![1.0e9]),
                ..LodVariant::default()
            },
            LodVariant {
                uri: format!("{id}_lod1.glb"),
                densities: Some(vec![1000.0]),
                ..LodVariant::default()
            },
            LodVariant {
                uri: format!("{id}_lod2.glb"),
                densities: Some(vec![10.0]),
                ..LodVariant::default()
            },
        ],
    }
}

struct Fixture {
    pool: ResourcePool,
    manager: LodsManager,
    loader: Arc<RecordingLoader>,
}

fn fixture() -> Fixture {
    let pool = ResourcePool::new();
    let loader = Arc::new(RecordingLoader::default());
    let resolver = LodResolver::with_loader(pool.clone(), loader.clone());
    let manager = LodsManager::new(resolver);
    manager.enable();
    manager.set_update_interval(UpdateInterval::Fixed(1));
    Fixture {
        pool,
        manager,
        loader,
    }
}

impl Fixture {
    fn tracked_mesh_at(&self, id: &str, position: Vec3) -> MeshHandle {
        let geometry = self.pool.geometries.add(cube_geometry(id));
        let mesh = self.pool.meshes.add(Mesh::new(id, geometry, Vec::new()));
        self.pool
            .meshes
            .get(mesh)
            .unwrap()
            .set_world_matrix(Affine3A::from_translation(position));
        let descriptor = dense_descriptor(id);
        self.manager
            .resolver()
            .register_mesh(SOURCE_URL, mesh, geometry, &descriptor, 0, None);
        mesh
    }

    fn render_frames(&self, camera: &CameraState, meshes: &[MeshHandle], count: usize) {
        for _ in 0..count {
            self.manager.after_render(&RenderFrame {
                pass: RenderPassKind::MainCanvas,
                camera,
                viewport: Viewport::default(),
                meshes,
            });
        }
    }
}

fn camera() -> CameraState {
    let fov = 60f32.to_radians();
    let projection = Mat4::perspective_rh(fov, 1.0, 0.1, 1000.0);
    CameraState::new(projection, Mat4::IDENTITY, fov, 1.0)
}

async fn settle() {
    for _ in 0..30 {
        yield_now().await;
    }
}

// ============================================================================
// Frame driving
// ============================================================================

#[tokio::test]
async fn non_canvas_passes_never_evaluate() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    for pass in [
        RenderPassKind::ShadowMap,
        RenderPassKind::OffscreenTarget,
        RenderPassKind::CubeMap,
        RenderPassKind::PostProcessBlit,
    ] {
        for _ in 0..5 {
            fx.manager.after_render(&RenderFrame {
                pass,
                camera: &camera,
                viewport: Viewport::default(),
                meshes: &[mesh],
            });
        }
    }
    settle().await;
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn meshes_are_left_alone_during_warmup() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    fx.render_frames(&camera, &[mesh], 2);
    settle().await;
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 0);

    fx.render_frames(&camera, &[mesh], 1);
    settle().await;
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_manager_does_nothing() {
    let fx = fixture();
    fx.manager.disable();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    fx.render_frames(&camera, &[mesh], 10);
    settle().await;
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn offscreen_meshes_trigger_no_fetches() {
    let fx = fixture();
    let camera = camera();
    // Behind the camera.
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, 10.0));
    let original = fx.pool.meshes.get(mesh).unwrap().geometry();

    fx.render_frames(&camera, &[mesh], 6);
    settle().await;

    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fx.pool.meshes.get(mesh).unwrap().geometry(), original);
}

// ============================================================================
// Level selection
// ============================================================================

#[tokio::test]
async fn small_onscreen_meshes_pick_a_matching_density() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    let events: Arc<Mutex<Vec<LodChangedEvent>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let events = Arc::clone(&events);
        fx.manager.on_changed(move |event| events.lock().push(*event));
    }

    fx.render_frames(&camera, &[mesh], 3);
    settle().await;

    // A unit cube 10 units away covers a few percent of the screen, so
    // the dense full-detail variant is skipped and level 1 qualifies.
    let urls = fx.loader.urls.lock().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("lod1"));

    let mesh_obj = fx.pool.meshes.get(mesh).unwrap();
    let displayed = fx.pool.geometries.get(mesh_obj.geometry()).unwrap();
    assert!(displayed.name.contains("lod1"));

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, LodKind::Mesh);
    assert_eq!(events[0].level, 1);
    assert_eq!(events[0].target, mesh);
}

#[tokio::test]
async fn stable_views_fetch_each_level_once() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    fx.render_frames(&camera, &[mesh], 10);
    settle().await;
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Texture filtering
// ============================================================================

#[tokio::test]
async fn low_bandwidth_devices_never_fetch_large_textures() {
    let fx = fixture();
    fx.manager.set_device_profile(DeviceProfile {
        low_bandwidth: true,
        ..DeviceProfile::default()
    });
    let camera = camera();

    let geometry = fx.pool.geometries.add(cube_geometry("wall"));
    let texture = fx
        .pool
        .textures
        .add(Texture::new("wall", Image::new(4, 4, Some(vec![0; 64]))));
    let material = fx.pool.materials.add(Material::new("wall"));
    fx.pool
        .materials
        .get(material)
        .unwrap()
        .set_slot("map", SlotKind::Standard, texture);
    let mesh = fx
        .pool
        .meshes
        .add(Mesh::new("wall", geometry, vec![material]));
    fx.pool
        .meshes
        .get(mesh)
        .unwrap()
        .set_world_matrix(Affine3A::from_translation(Vec3::new(0.0, 0.0, -2.0)));

    let descriptor = LodDescriptor {
        id: "wall".to_owned(),
        variants: [4096u32, 2048, 1024, 512]
            .iter()
            .map(|edge| LodVariant {
                uri: format!("wall_{edge}.webp"),
                width: Some(*edge),
                height: Some(*edge),
                ..LodVariant::default()
            })
            .collect(),
    };
    fx.manager
        .resolver()
        .register_texture(SOURCE_URL, texture, &descriptor, 3);

    // Plenty of frames, including the close-up first evaluation that
    // would normally boost straight to the largest variant.
    fx.render_frames(&camera, &[mesh], 10);
    settle().await;

    let urls = fx.loader.urls.lock().clone();
    assert!(!urls.is_empty());
    for url in &urls {
        assert!(
            !url.contains("4096") && !url.contains("2048"),
            "fetched oversized texture {url}"
        );
    }
}

// ============================================================================
// Load groups
// ============================================================================

#[tokio::test]
async fn groups_capture_loads_issued_during_their_window() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    let group = LoadGroup::new(GroupOptions {
        window_from_first_capture: true,
        ..GroupOptions::default()
    });
    fx.manager.add_group(group.clone());

    fx.render_frames(&camera, &[mesh], 6);
    settle().await;

    let result = group.ready().await;
    assert!(!result.cancelled);
    assert_eq!(result.awaited_count, 1);
    assert_eq!(result.resolved_count, 1);
}

#[tokio::test]
async fn loads_count_toward_every_open_group() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    let first = LoadGroup::new(GroupOptions {
        window_from_first_capture: true,
        ..GroupOptions::default()
    });
    let second = LoadGroup::new(GroupOptions {
        window_from_first_capture: true,
        ..GroupOptions::default()
    });
    fx.manager.add_group(first.clone());
    fx.manager.add_group(second.clone());

    fx.render_frames(&camera, &[mesh], 6);
    settle().await;

    for group in [first, second] {
        let result = group.ready().await;
        assert!(!result.cancelled);
        assert_eq!(result.awaited_count, 1);
        assert_eq!(result.resolved_count, 1);
    }
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 1, "shared load runs once");
}

#[tokio::test]
async fn paused_managers_still_advance_group_windows() {
    let fx = fixture();
    fx.manager.set_pause(true);
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));

    let group = LoadGroup::new(GroupOptions::default());
    fx.manager.add_group(group.clone());

    fx.render_frames(&camera, &[mesh], 3);
    settle().await;

    let result = group.ready().await;
    assert!(!result.cancelled);
    assert_eq!(result.awaited_count, 0);
    assert_eq!(fx.loader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn group_windows_elapse_in_frames_not_evaluation_ticks() {
    let fx = fixture();
    fx.manager.set_update_interval(UpdateInterval::Fixed(10));
    let camera = camera();

    let group = LoadGroup::new(GroupOptions::default());
    fx.manager.add_group(group.clone());

    // Two rendered frames elapse the window even though neither frame
    // qualifies for evaluation at this interval.
    fx.render_frames(&camera, &[], 2);
    settle().await;

    let result = group.ready().await;
    assert!(!result.cancelled);
    assert_eq!(result.awaited_count, 0);
}

// ============================================================================
// Debug snapshots
// ============================================================================

#[tokio::test]
async fn evaluation_snapshots_expose_coverage_and_volume() {
    let fx = fixture();
    let camera = camera();
    let mesh = fx.tracked_mesh_at("statue", Vec3::new(0.0, 0.0, -10.0));
    assert!(fx.manager.state_snapshot(mesh).is_none());

    fx.render_frames(&camera, &[mesh], 3);
    settle().await;

    let snapshot = fx.manager.state_snapshot(mesh).unwrap();
    assert_eq!(snapshot.mesh_level, Some(1));
    assert!(snapshot.coverage > 0.0);
    assert!(snapshot.screenspace_volume.max_element() > 0.0);
}
