//! LOD descriptor model as it appears in an asset's extension table.
//!
//! Every mesh or texture that ships progressive variants carries one
//! descriptor under the [`EXTENSION_NAME`] key. Variants are ordered from
//! highest detail at index 0 to lowest detail at the end.

use serde::{Deserialize, Serialize};

/// Extension table key carrying a [`LodDescriptor`].
pub const EXTENSION_NAME: &str = "EXT_progressive_lods";

/// One loadable variant of a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LodVariant {
    /// Location of the asset containing this variant, relative to the
    /// declaring asset's base location.
    pub uri: String,
    /// Appended as a cache-busting query parameter when fetching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_count: Option<u32>,
    /// Triangle density per mesh subpart (primitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub densities: Option<Vec<f64>>,
    /// Older assets carry a single density for the whole mesh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
}

impl LodVariant {
    /// Density for a given subpart, falling back to the legacy
    /// whole-mesh value when the per-subpart array is missing or short.
    #[must_use]
    pub fn density_for(&self, subpart: usize) -> Option<f64> {
        if let Some(densities) = &self.densities {
            if let Some(d) = densities.get(subpart) {
                return Some(*d);
            }
        }
        self.density
    }

    /// Larger texture edge in pixels, when dimensions are declared.
    #[must_use]
    pub fn max_edge(&self) -> Option<u32> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(w.max(h)),
            (Some(w), None) => Some(w),
            (None, Some(h)) => Some(h),
            (None, None) => None,
        }
    }
}

/// Descriptor for one progressive resource, embedded in the asset that
/// declares it. Variant index 0 is the highest level of detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodDescriptor {
    /// Stable id shared by all assets that contain variants of this
    /// resource.
    pub id: String,
    pub variants: Vec<LodVariant>,
}

impl LodDescriptor {
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.variants.len()
    }

    /// The lowest-detail level index, or 0 for an empty descriptor.
    #[must_use]
    pub fn lowest_level(&self) -> usize {
        self.variants.len().saturating_sub(1)
    }

    #[must_use]
    pub fn variant(&self, level: usize) -> Option<&LodVariant> {
        self.variants.get(level)
    }

    /// Clamp a requested level into the available range.
    #[must_use]
    pub fn clamp_level(&self, level: usize) -> usize {
        level.min(self.lowest_level())
    }
}
