//! Fetching and parsing of LOD variant assets.
//!
//! A variant is either a plain media URI (an image file) or a composite
//! glTF container holding the target resource alongside unrelated entries.
//! [`AssetFetcher`] reads raw bytes from disk or over HTTP; the
//! [`VariantLoader`] turns those bytes into live resources, locating the
//! container entry whose embedded descriptor id matches the request.

use base64::Engine as _;
use futures::future::BoxFuture;

use crate::descriptor::{EXTENSION_NAME, LodDescriptor};
use crate::errors::{ProgressiveError, Result};
use crate::resources::geometry::Geometry;
use crate::resources::texture::{FilterMode, Image, Texture, TextureSampler, WrapMode};
use crate::utils::resolve_url;

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
use std::sync::{Arc, OnceLock};

/// Reads raw asset bytes from the local filesystem or over HTTP.
///
/// URIs starting with `http(s)://` go through a lazily-built shared HTTP
/// client; anything else is treated as a filesystem path (with any
/// cache-busting query suffix stripped).
#[derive(Clone, Default)]
pub struct AssetFetcher {
    #[cfg(all(feature = "http", not(target_arch = "wasm32")))]
    client: Arc<OnceLock<reqwest::Client>>,
}

impl AssetFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(all(feature = "http", not(target_arch = "wasm32")))]
    fn client(&self) -> Result<reqwest::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let _ = self.client.set(client.clone());
        Ok(self.client.get().cloned().unwrap_or(client))
    }

    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            #[cfg(all(feature = "http", not(target_arch = "wasm32")))]
            {
                let resp = self.client()?.get(uri).send().await?;
                if !resp.status().is_success() {
                    return Err(ProgressiveError::HttpResponse {
                        status: resp.status().as_u16(),
                    });
                }
                Ok(resp.bytes().await?.to_vec())
            }
            #[cfg(not(all(feature = "http", not(target_arch = "wasm32"))))]
            {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "remote URIs require the `http` feature",
                )
                .into())
            }
        } else {
            // Cache-busting queries only matter to HTTP caches.
            let path = uri.split('?').next().unwrap_or(uri);
            Ok(tokio::fs::read(path).await?)
        }
    }
}

/// The resources extracted from one container for one descriptor id.
pub struct LoadedContainer {
    /// Set when the matching entry is a texture.
    pub texture: Option<Texture>,
    /// Set when the matching entry is a mesh; one geometry per subpart,
    /// in declaration order.
    pub geometries: Vec<Geometry>,
    /// The descriptor found on the matching entry, when the container
    /// declares one (containers may extend the known variant list).
    pub descriptor: Option<LodDescriptor>,
}

/// Parses variant payloads into live resources.
pub trait VariantLoader: Send + Sync {
    /// Fetches and parses a composite container, extracting the entry
    /// matching `descriptor_id`.
    fn load_container<'a>(
        &'a self,
        fetcher: &'a AssetFetcher,
        url: &'a str,
        descriptor_id: &'a str,
    ) -> BoxFuture<'a, Result<LoadedContainer>>;

    /// Fetches and decodes a plain image URI into a texture.
    fn load_plain_texture<'a>(
        &'a self,
        fetcher: &'a AssetFetcher,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Texture>>;
}

/// [`VariantLoader`] for glTF/GLB containers.
#[derive(Default)]
pub struct GltfVariantLoader;

impl GltfVariantLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves all buffers of a parsed container: the GLB binary chunk,
    /// embedded data URIs, and sibling files relative to the container's
    /// own URL.
    async fn load_buffers(
        fetcher: &AssetFetcher,
        gltf: &gltf::Gltf,
        container_url: &str,
    ) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    let blob = gltf.blob.as_deref().ok_or_else(|| {
                        ProgressiveError::UnresolvedBuffer("missing GLB binary chunk".into())
                    })?;
                    buffer_data.push(blob.to_vec());
                }
                gltf::buffer::Source::Uri(uri) => {
                    if let Some(data) = decode_data_uri(uri)? {
                        buffer_data.push(data);
                    } else {
                        let url = resolve_url(Some(container_url), uri);
                        buffer_data.push(fetcher.read_bytes(&url).await?);
                    }
                }
            }
        }
        Ok(buffer_data)
    }

    fn extract_geometries(
        mesh: &gltf::Mesh<'_>,
        buffers: &[Vec<u8>],
        descriptor_id: &str,
    ) -> Result<Vec<Geometry>> {
        let mut geometries = Vec::new();
        for (subpart, primitive) in mesh.primitives().enumerate() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| {
                    ProgressiveError::Gltf(format!(
                        "primitive {subpart} of '{descriptor_id}' has no positions"
                    ))
                })?
                .collect();
            let indices = reader.read_indices().map(|i| i.into_u32().collect());
            let name = mesh
                .name()
                .map_or_else(|| descriptor_id.to_owned(), str::to_owned);
            geometries.push(Geometry::new(name, positions, indices));
        }
        Ok(geometries)
    }

    async fn extract_texture(
        fetcher: &AssetFetcher,
        texture: &gltf::Texture<'_>,
        buffers: &[Vec<u8>],
        container_url: &str,
    ) -> Result<Texture> {
        let bytes: Vec<u8> = match texture.source().source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = buffers.get(view.buffer().index()).ok_or_else(|| {
                    ProgressiveError::UnresolvedBuffer(format!(
                        "image buffer {} missing",
                        view.buffer().index()
                    ))
                })?;
                let end = view.offset() + view.length();
                buffer
                    .get(view.offset()..end)
                    .ok_or_else(|| {
                        ProgressiveError::UnresolvedBuffer(format!(
                            "image view out of bounds ({}..{end})",
                            view.offset()
                        ))
                    })?
                    .to_vec()
            }
            gltf::image::Source::Uri { uri, .. } => {
                if let Some(data) = decode_data_uri(uri)? {
                    data
                } else {
                    let url = resolve_url(Some(container_url), uri);
                    fetcher.read_bytes(&url).await?
                }
            }
        };

        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        let image = Image::new(width, height, Some(decoded.into_raw()));
        let name = texture.name().unwrap_or_default().to_owned();
        let out = Texture::new(name, image);
        *out.sampler.write() = convert_sampler(&texture.sampler());
        Ok(out)
    }
}

impl VariantLoader for GltfVariantLoader {
    fn load_container<'a>(
        &'a self,
        fetcher: &'a AssetFetcher,
        url: &'a str,
        descriptor_id: &'a str,
    ) -> BoxFuture<'a, Result<LoadedContainer>> {
        Box::pin(async move {
            let bytes = fetcher.read_bytes(url).await?;
            let gltf = gltf::Gltf::from_slice(&bytes)?;

            // Meshes first. The matching entry carries the requested
            // descriptor id in its extension table.
            if let Some(mesh) = gltf
                .meshes()
                .find(|m| entry_descriptor(m.extensions()).is_some_and(|d| d.id == descriptor_id))
            {
                let descriptor = entry_descriptor(mesh.extensions());
                let buffers = Self::load_buffers(fetcher, &gltf, url).await?;
                let geometries = Self::extract_geometries(&mesh, &buffers, descriptor_id)?;
                return Ok(LoadedContainer {
                    texture: None,
                    geometries,
                    descriptor,
                });
            }

            if let Some(texture) = gltf
                .textures()
                .find(|t| entry_descriptor(t.extensions()).is_some_and(|d| d.id == descriptor_id))
            {
                let descriptor = entry_descriptor(texture.extensions());
                let buffers = Self::load_buffers(fetcher, &gltf, url).await?;
                let out = Self::extract_texture(fetcher, &texture, &buffers, url).await?;
                return Ok(LoadedContainer {
                    texture: Some(out),
                    geometries: Vec::new(),
                    descriptor,
                });
            }

            Err(ProgressiveError::DescriptorNotInContainer(
                descriptor_id.to_owned(),
            ))
        })
    }

    fn load_plain_texture<'a>(
        &'a self,
        fetcher: &'a AssetFetcher,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Texture>> {
        Box::pin(async move {
            let bytes = fetcher.read_bytes(url).await?;
            let decoded = image::load_from_memory(&bytes)?.to_rgba8();
            let (width, height) = decoded.dimensions();
            let image = Image::new(width, height, Some(decoded.into_raw()));
            let name = url.rsplit('/').next().unwrap_or(url).to_owned();
            Ok(Texture::new(name, image))
        })
    }
}

/// Parses the LOD descriptor out of an entry's extension table, if any.
fn entry_descriptor(
    extensions: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Option<LodDescriptor> {
    let value = extensions?.get(EXTENSION_NAME)?;
    match serde_json::from_value(value.clone()) {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            log::warn!("malformed {EXTENSION_NAME} extension: {err}");
            None
        }
    }
}

/// Decodes a base64 `data:` URI, or returns `None` for other schemes.
fn decode_data_uri(uri: &str) -> Result<Option<Vec<u8>>> {
    if !uri.starts_with("data:") {
        return Ok(None);
    }
    let payload = uri
        .split_once(";base64,")
        .map(|(_, data)| data)
        .ok_or_else(|| ProgressiveError::DataUri(format!("unsupported data URI: {uri}")))?;
    let data = base64::engine::general_purpose::STANDARD.decode(payload)?;
    Ok(Some(data))
}

fn convert_sampler(sampler: &gltf::texture::Sampler<'_>) -> TextureSampler {
    use gltf::texture::{MagFilter, MinFilter, WrappingMode};

    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => WrapMode::ClampToEdge,
        WrappingMode::MirroredRepeat => WrapMode::MirroredRepeat,
        WrappingMode::Repeat => WrapMode::Repeat,
    };

    TextureSampler {
        address_mode_u: wrap(sampler.wrap_s()),
        address_mode_v: wrap(sampler.wrap_t()),
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => FilterMode::Nearest,
            _ => FilterMode::Linear,
        },
        min_filter: match sampler.min_filter() {
            Some(MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear) => {
                FilterMode::Nearest
            }
            _ => FilterMode::Linear,
        },
        anisotropy: 1,
    }
}
