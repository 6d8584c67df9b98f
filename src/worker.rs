//! Background loader with a message-based handoff.
//!
//! The host may move fetch and container parsing off its main thread.
//! Requests and responses are plain serializable messages correlated by
//! URI; responses carry raw buffers plus computed bounds, from which the
//! main thread reconstructs live resources (one copy per transfer, no
//! shared mutable state across threads).

use serde::{Deserialize, Serialize};

use crate::errors::{ProgressiveError, Result};
use crate::loader::AssetFetcher;
use crate::resources::geometry::{Aabb, Geometry};
use crate::resources::texture::{Image, Texture};
use crate::runtime;

/// Tuning for the worker-side decoders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoderConfig {
    /// When set, only container entries carrying this descriptor id are
    /// extracted; otherwise the whole container is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_id: Option<String>,
    /// Whether image entries are decoded to pixels. Disable when only
    /// geometry is wanted.
    #[serde(default = "default_true")]
    pub decode_images: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            descriptor_id: None,
            decode_images: true,
        }
    }
}

/// Main thread to worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LoaderRequest {
    Load {
        uri: String,
        #[serde(default, rename = "decoderConfig")]
        decoder_config: DecoderConfig,
    },
}

/// Raw geometry data as transferred from the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryPayload {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl GeometryPayload {
    /// Reconstructs a live geometry on the receiving side.
    #[must_use]
    pub fn into_geometry(self) -> Geometry {
        Geometry::new(self.name, self.positions, self.indices)
    }
}

/// Raw RGBA8 texture data as transferred from the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TexturePayload {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TexturePayload {
    /// Reconstructs a live texture on the receiving side.
    #[must_use]
    pub fn into_texture(self) -> Texture {
        Texture::new(self.name, Image::new(self.width, self.height, Some(self.pixels)))
    }
}

/// Worker to main thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LoaderResponse {
    Loaded {
        uri: String,
        geometries: Vec<GeometryPayload>,
        textures: Vec<TexturePayload>,
    },
    Failed {
        uri: String,
        error: String,
    },
}

/// A background loader task plus the channels to talk to it.
///
/// One request produces exactly one response carrying the same URI.
pub struct LoaderWorker {
    requests: flume::Sender<LoaderRequest>,
    responses: flume::Receiver<LoaderResponse>,
}

impl LoaderWorker {
    /// Starts the worker loop on the shared runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = flume::unbounded::<LoaderRequest>();
        let (resp_tx, resp_rx) = flume::unbounded::<LoaderResponse>();
        runtime::spawn(async move {
            let fetcher = AssetFetcher::new();
            while let Ok(request) = req_rx.recv_async().await {
                let LoaderRequest::Load {
                    uri,
                    decoder_config,
                } = request;
                let response = match load_container_payloads(&fetcher, &uri, &decoder_config).await
                {
                    Ok((geometries, textures)) => LoaderResponse::Loaded {
                        uri,
                        geometries,
                        textures,
                    },
                    Err(err) => {
                        log::warn!("worker failed to load {uri}: {err}");
                        LoaderResponse::Failed {
                            uri,
                            error: err.to_string(),
                        }
                    }
                };
                if resp_tx.send_async(response).await.is_err() {
                    break;
                }
            }
        });
        Self {
            requests: req_tx,
            responses: resp_rx,
        }
    }

    pub fn request(&self, request: LoaderRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| ProgressiveError::WorkerDisconnected)
    }

    pub async fn next_response(&self) -> Result<LoaderResponse> {
        self.responses
            .recv_async()
            .await
            .map_err(|_| ProgressiveError::WorkerDisconnected)
    }
}

/// Worker-side parse: whole container (or one descriptor's entries) into
/// transferable payloads.
async fn load_container_payloads(
    fetcher: &AssetFetcher,
    uri: &str,
    config: &DecoderConfig,
) -> Result<(Vec<GeometryPayload>, Vec<TexturePayload>)> {
    use crate::descriptor::LodDescriptor;

    let bytes = fetcher.read_bytes(uri).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf.blob.as_deref().ok_or_else(|| {
                    ProgressiveError::UnresolvedBuffer("missing GLB binary chunk".into())
                })?;
                buffers.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(buffer_uri) => {
                let url = crate::utils::resolve_url(Some(uri), buffer_uri);
                buffers.push(fetcher.read_bytes(&url).await?);
            }
        }
    }

    let wanted = |extensions: Option<&serde_json::Map<String, serde_json::Value>>| -> bool {
        match &config.descriptor_id {
            None => true,
            Some(id) => extensions
                .and_then(|m| m.get(crate::descriptor::EXTENSION_NAME))
                .and_then(|v| serde_json::from_value::<LodDescriptor>(v.clone()).ok())
                .is_some_and(|d| &d.id == id),
        }
    };

    let mut geometries = Vec::new();
    for mesh in gltf.meshes() {
        if !wanted(mesh.extensions()) {
            continue;
        }
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let indices = reader.read_indices().map(|i| i.into_u32().collect());
            let bounds = Aabb::from_points(&positions);
            geometries.push(GeometryPayload {
                name: mesh.name().unwrap_or_default().to_owned(),
                positions,
                indices,
                bounds_min: bounds.min.to_array(),
                bounds_max: bounds.max.to_array(),
            });
        }
    }

    let mut textures = Vec::new();
    if config.decode_images {
        for texture in gltf.textures() {
            if !wanted(texture.extensions()) {
                continue;
            }
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
                gltf::image::Source::Uri { uri: image_uri, .. } => {
                    let url = crate::utils::resolve_url(Some(uri), image_uri);
                    fetcher.read_bytes(&url).await?
                }
            };
            let decoded = image::load_from_memory(&bytes)?.to_rgba8();
            let (width, height) = decoded.dimensions();
            textures.push(TexturePayload {
                name: texture.name().unwrap_or_default().to_owned(),
                width,
                height,
                pixels: decoded.into_raw(),
            });
        }
    }

    Ok((geometries, textures))
}
