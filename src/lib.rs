//! Progressive LOD streaming for glTF assets.
//!
//! This crate decides, frame by frame, which resolution variant of each
//! on-screen mesh and texture should be displayed, fetches the chosen
//! variant asynchronously without stalling rendering, and swaps it in once
//! ready. A usable low-detail asset is shown immediately and refined to
//! full detail as bandwidth and visibility justify it, while concurrent
//! network activity stays bounded and redundant fetches are deduplicated.
//!
//! # Overview
//!
//! - [`LodResolver`] maps registered resources to their LOD descriptors and
//!   fetches/caches/deduplicates variant loads.
//! - [`LodsManager`] hooks into the host render loop through an explicit
//!   per-frame callback and computes target detail levels from screen-space
//!   coverage, visibility and mesh density.
//! - [`LoadQueue`] bounds how many variant fetches are in flight at once.
//! - [`LoadGroup`] batches a window of in-flight loads so a caller can wait
//!   for "settled" visual quality after a scene change.
//!
//! The host rendering library is consumed as an opaque data source: the
//! crate carries its own lightweight resource model ([`resources`]) and the
//! host invokes [`LodsManager::after_render`] with camera state and the
//! visible mesh list each frame.

pub mod camera;
pub mod descriptor;
pub mod errors;
pub mod group;
pub mod loader;
pub mod manager;
pub mod observer;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod resources;
pub mod runtime;
pub mod utils;
pub mod worker;

pub use camera::{CameraState, Frustum};
pub use descriptor::{EXTENSION_NAME, LodDescriptor, LodVariant};
pub use errors::{ProgressiveError, Result};
pub use group::{GroupOptions, GroupResult, LoadGroup};
pub use loader::{AssetFetcher, GltfVariantLoader, LoadedContainer, VariantLoader};
pub use manager::{
    DeviceProfile, LodChangedEvent, LodKind, LodStateSnapshot, LodsManager, RenderFrame,
    RenderPassKind, UpdateInterval, Viewport,
};
pub use observer::{LodObserver, ObserverSet};
pub use queue::{LoadQueue, SlotPermit};
pub use registry::{LodBinding, LodRegistry, TextureLevelBounds, TextureLodRange};
pub use resolver::{LodResolver, ResolvedVariant, SlotSwap, TextureLodTarget};
pub use resources::{
    GeometryHandle, MaterialHandle, MeshHandle, ResourcePool, TextureHandle,
    geometry::{Aabb, BoundingSphere, Geometry},
    material::{Material, SlotKind, TextureSlot},
    mesh::Mesh,
    texture::{ColorSpace, FilterMode, Image, Texture, TextureSampler, WrapMode},
};
pub use worker::{
    DecoderConfig, GeometryPayload, LoaderRequest, LoaderResponse, LoaderWorker, TexturePayload,
};
