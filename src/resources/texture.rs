use glam::Vec2;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

// Global image id generator (u64 for cheap map lookups).
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Texture coordinate wrapping behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Texel sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Color space the pixel data is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

/// Sampler settings carried alongside a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: WrapMode,
    pub address_mode_v: WrapMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub anisotropy: u8,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: WrapMode::Repeat,
            address_mode_v: WrapMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            anisotropy: 1,
        }
    }
}

#[derive(Debug)]
struct ImageInner {
    id: u64,
    uuid: Uuid,
    width: u32,
    height: u32,
    // RGBA8 pixel content; `None` once disposed.
    data: RwLock<Option<Vec<u8>>>,
    version: AtomicU64,
}

/// Shared pixel storage for textures.
///
/// Cloning an `Image` shares the same pixels; disposing releases them for
/// every clone, which is exactly what the resolver's disposed-entry probe
/// detects.
#[derive(Debug, Clone)]
pub struct Image(Arc<ImageInner>);

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Image {}

impl Image {
    #[must_use]
    pub fn new(width: u32, height: u32, data: Option<Vec<u8>>) -> Self {
        Self(Arc::new(ImageInner {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            uuid: Uuid::new_v4(),
            width,
            height,
            data: RwLock::new(data),
            version: AtomicU64::new(1),
        }))
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0.uuid
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    pub fn update_data(&self, new_data: Vec<u8>) {
        *self.0.data.write() = Some(new_data);
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.0.data.read().is_some()
    }

    /// Releases the pixel content.
    pub fn dispose(&self) {
        *self.0.data.write() = None;
    }

    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.0.data.read().clone()
    }
}

/// A texture: shared pixel content plus presentation settings.
///
/// The settings (sampler, color space, uv transform, flip) are the
/// "interchangeable" part: when the resolver swaps in a higher-detail
/// variant it copies these from the currently displayed texture so the
/// swap is visually seamless.
#[derive(Debug)]
pub struct Texture {
    pub uuid: Uuid,
    pub name: String,
    pub image: Image,
    pub sampler: RwLock<TextureSampler>,
    pub color_space: RwLock<ColorSpace>,
    pub flip_y: RwLock<bool>,
    pub generate_mipmaps: RwLock<bool>,
    pub offset: RwLock<Vec2>,
    pub repeat: RwLock<Vec2>,
}

impl Texture {
    #[must_use]
    pub fn new(name: impl Into<String>, image: Image) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            image,
            sampler: RwLock::new(TextureSampler::default()),
            color_space: RwLock::new(ColorSpace::Srgb),
            flip_y: RwLock::new(false),
            generate_mipmaps: RwLock::new(true),
            offset: RwLock::new(Vec2::ZERO),
            repeat: RwLock::new(Vec2::ONE),
        }
    }

    /// Copies the interchangeable presentation settings from another
    /// texture onto this one (wrap mode, filtering, color space, uv
    /// transform, flip, mipmap generation, anisotropy).
    pub fn copy_settings(&self, source: &Texture) {
        *self.sampler.write() = *source.sampler.read();
        *self.color_space.write() = *source.color_space.read();
        *self.flip_y.write() = *source.flip_y.read();
        *self.generate_mipmaps.write() = *source.generate_mipmaps.read();
        *self.offset.write() = *source.offset.read();
        *self.repeat.write() = *source.repeat.read();
    }

    /// Whether the pixel content is still resident.
    #[must_use]
    pub fn has_backing_data(&self) -> bool {
        self.image.has_data()
    }
}
