use parking_lot::RwLock;
use uuid::Uuid;

use super::TextureHandle;

/// Which kind of binding point a texture slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A standard material property (base color, normal map, ...).
    Standard,
    /// A custom shader uniform carrying a texture.
    ShaderUniform,
}

/// One texture-bearing slot of a material.
#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub name: String,
    pub kind: SlotKind,
    pub texture: TextureHandle,
}

/// Slot name used for glyph atlases. Text rendering depends on the exact
/// atlas the glyph UVs were generated from, so these slots are exempt from
/// LOD swaps.
pub const GLYPH_ATLAS_SLOT: &str = "glyphMap";

/// A material: a named, ordered set of texture slots.
///
/// Standard slots and custom shader-uniform slots live in the same list;
/// the resolver treats both the same way when swapping texture levels.
#[derive(Debug)]
pub struct Material {
    pub uuid: Uuid,
    pub name: String,
    slots: RwLock<Vec<TextureSlot>>,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            slots: RwLock::new(Vec::new()),
        }
    }

    pub fn set_slot(&self, name: impl Into<String>, kind: SlotKind, texture: TextureHandle) {
        let name = name.into();
        let mut slots = self.slots.write();
        if let Some(slot) = slots.iter_mut().find(|s| s.name == name) {
            slot.texture = texture;
            slot.kind = kind;
        } else {
            slots.push(TextureSlot {
                name,
                kind,
                texture,
            });
        }
    }

    #[must_use]
    pub fn slot(&self, name: &str) -> Option<TextureSlot> {
        self.slots.read().iter().find(|s| s.name == name).cloned()
    }

    /// Snapshot of all texture slots in declaration order.
    #[must_use]
    pub fn slots(&self) -> Vec<TextureSlot> {
        self.slots.read().clone()
    }

    /// Replaces the texture of a named slot. Returns false if the slot does
    /// not exist.
    pub fn swap_slot_texture(&self, name: &str, texture: TextureHandle) -> bool {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.iter_mut().find(|s| s.name == name) {
            slot.texture = texture;
            true
        } else {
            false
        }
    }
}
