//! Morphs and their sub-morph entries.
//!
//! A morph keeps one [`ObjectArray`] per sub-kind. Only the array matching
//! [`MorphType`] is serialized; the others stay empty in practice.

use crate::util::{Quat, Vec3, Vec4};

use super::array::{model_object, ObjectArray};
use super::names::LocalizedName;
use super::{BoneId, MaterialId, MorphId, MorphItemId, RigidBodyId, VertexId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MorphCategory {
    Base,
    Eyebrow,
    Eye,
    Lip,
    #[default]
    Other,
}

impl MorphCategory {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Base),
            1 => Some(Self::Eyebrow),
            2 => Some(Self::Eye),
            3 => Some(Self::Lip),
            4 => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Eyebrow => 1,
            Self::Eye => 2,
            Self::Lip => 3,
            Self::Other => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MorphType {
    Group,
    #[default]
    Vertex,
    Bone,
    Texture,
    Uva1,
    Uva2,
    Uva3,
    Uva4,
    Material,
    Flip,
    Impulse,
}

impl MorphType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Group,
            1 => Self::Vertex,
            2 => Self::Bone,
            3 => Self::Texture,
            4 => Self::Uva1,
            5 => Self::Uva2,
            6 => Self::Uva3,
            7 => Self::Uva4,
            8 => Self::Material,
            9 => Self::Flip,
            10 => Self::Impulse,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Group => 0,
            Self::Vertex => 1,
            Self::Bone => 2,
            Self::Texture => 3,
            Self::Uva1 => 4,
            Self::Uva2 => 5,
            Self::Uva3 => 6,
            Self::Uva4 => 7,
            Self::Material => 8,
            Self::Flip => 9,
            Self::Impulse => 10,
        }
    }

    /// Texture and additional-uv morphs share the uv item layout.
    pub fn is_uv(self) -> bool {
        matches!(self, Self::Texture | Self::Uva1 | Self::Uva2 | Self::Uva3 | Self::Uva4)
    }

    /// Whether the type is only valid in PMX 2.1.
    pub fn requires_v21(self) -> bool {
        matches!(self, Self::Flip | Self::Impulse)
    }
}

// ============================================================================
// Sub-morph entries
// ============================================================================

#[derive(Debug, Clone)]
pub struct MorphGroup {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub morph: Option<MorphId>,
    pub weight: f32,
}

model_object!(MorphGroup, MorphItemId, "MorphGroup");

impl MorphGroup {
    pub fn new(morph: Option<MorphId>, weight: f32) -> Self {
        Self { id: MorphItemId::next(), index: None, morph, weight }
    }
}

#[derive(Debug, Clone)]
pub struct MorphFlip {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub morph: Option<MorphId>,
    pub weight: f32,
}

model_object!(MorphFlip, MorphItemId, "MorphFlip");

impl MorphFlip {
    pub fn new(morph: Option<MorphId>, weight: f32) -> Self {
        Self { id: MorphItemId::next(), index: None, morph, weight }
    }
}

#[derive(Debug, Clone)]
pub struct MorphVertex {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub vertex: Option<VertexId>,
    pub position: Vec3,
}

model_object!(MorphVertex, MorphItemId, "MorphVertex");

impl MorphVertex {
    pub fn new(vertex: Option<VertexId>, position: Vec3) -> Self {
        Self { id: MorphItemId::next(), index: None, vertex, position }
    }
}

#[derive(Debug, Clone)]
pub struct MorphBone {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub bone: Option<BoneId>,
    pub translation: Vec3,
    pub orientation: Quat,
}

model_object!(MorphBone, MorphItemId, "MorphBone");

impl MorphBone {
    pub fn new(bone: Option<BoneId>) -> Self {
        Self {
            id: MorphItemId::next(),
            index: None,
            bone,
            translation: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MorphUv {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub vertex: Option<VertexId>,
    pub position: Vec4,
}

model_object!(MorphUv, MorphItemId, "MorphUv");

impl MorphUv {
    pub fn new(vertex: Option<VertexId>, position: Vec4) -> Self {
        Self { id: MorphItemId::next(), index: None, vertex, position }
    }
}

/// Blend operation of a material morph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialMorphOperation {
    #[default]
    Multiply,
    Add,
}

impl MaterialMorphOperation {
    pub fn from_u8(value: u8) -> Self {
        if value == 1 {
            Self::Add
        } else {
            Self::Multiply
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Multiply => 0,
            Self::Add => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MorphMaterial {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    /// Target material; `None` applies to every material.
    pub material: Option<MaterialId>,
    pub operation: MaterialMorphOperation,
    pub diffuse_color: Vec3,
    pub diffuse_opacity: f32,
    pub specular_color: Vec3,
    pub specular_power: f32,
    pub ambient_color: Vec3,
    pub edge_color: Vec3,
    pub edge_opacity: f32,
    pub edge_size: f32,
    pub diffuse_texture_blend: Vec4,
    pub sphere_map_texture_blend: Vec4,
    pub toon_texture_blend: Vec4,
}

model_object!(MorphMaterial, MorphItemId, "MorphMaterial");

impl MorphMaterial {
    /// Create an item that leaves the material unchanged under `operation`.
    pub fn new(material: Option<MaterialId>, operation: MaterialMorphOperation) -> Self {
        let neutral = match operation {
            MaterialMorphOperation::Multiply => 1.0,
            MaterialMorphOperation::Add => 0.0,
        };
        Self {
            id: MorphItemId::next(),
            index: None,
            material,
            operation,
            diffuse_color: Vec3::splat(neutral),
            diffuse_opacity: neutral,
            specular_color: Vec3::splat(neutral),
            specular_power: neutral,
            ambient_color: Vec3::splat(neutral),
            edge_color: Vec3::splat(neutral),
            edge_opacity: neutral,
            edge_size: neutral,
            diffuse_texture_blend: Vec4::splat(neutral),
            sphere_map_texture_blend: Vec4::splat(neutral),
            toon_texture_blend: Vec4::splat(neutral),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MorphImpulse {
    pub(crate) id: MorphItemId,
    pub(crate) index: Option<usize>,
    pub rigid_body: Option<RigidBodyId>,
    pub is_local: bool,
    pub velocity: Vec3,
    pub torque: Vec3,
}

model_object!(MorphImpulse, MorphItemId, "MorphImpulse");

impl MorphImpulse {
    pub fn new(rigid_body: Option<RigidBodyId>) -> Self {
        Self {
            id: MorphItemId::next(),
            index: None,
            rigid_body,
            is_local: false,
            velocity: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }
}

// ============================================================================
// Morph
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MorphItems {
    pub groups: ObjectArray<MorphGroup>,
    pub flips: ObjectArray<MorphFlip>,
    pub vertices: ObjectArray<MorphVertex>,
    pub bones: ObjectArray<MorphBone>,
    pub uvs: ObjectArray<MorphUv>,
    pub materials: ObjectArray<MorphMaterial>,
    pub impulses: ObjectArray<MorphImpulse>,
}

impl MorphItems {
    /// Deep copy with fresh item identities.
    pub fn duplicate(&self) -> Self {
        Self {
            groups: self.groups.duplicate(),
            flips: self.flips.duplicate(),
            vertices: self.vertices.duplicate(),
            bones: self.bones.duplicate(),
            uvs: self.uvs.duplicate(),
            materials: self.materials.duplicate(),
            impulses: self.impulses.duplicate(),
        }
    }

    /// Number of entries stored for a morph type.
    pub fn len_for(&self, morph_type: MorphType) -> usize {
        match morph_type {
            MorphType::Group => self.groups.len(),
            MorphType::Flip => self.flips.len(),
            MorphType::Vertex => self.vertices.len(),
            MorphType::Bone => self.bones.len(),
            MorphType::Material => self.materials.len(),
            MorphType::Impulse => self.impulses.len(),
            _ => self.uvs.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Morph {
    pub(crate) id: MorphId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub category: MorphCategory,
    pub morph_type: MorphType,
    pub items: MorphItems,
}

model_object!(Morph, MorphId, "Morph", |this| {
    this.items = this.items.duplicate();
});

impl Default for Morph {
    fn default() -> Self {
        Self {
            id: MorphId::next(),
            index: None,
            name: LocalizedName::default(),
            category: MorphCategory::default(),
            morph_type: MorphType::default(),
            items: MorphItems::default(),
        }
    }
}

impl Morph {
    /// Create an unlinked morph of a type.
    pub fn new(morph_type: MorphType) -> Self {
        Self { morph_type, ..Self::default() }
    }

    /// Number of sub-morph entries of the morph's own type.
    pub fn num_items(&self) -> usize {
        self.items.len_for(self.morph_type)
    }

    /// Copy every field of `other` and deep-copy its entries, keeping identity.
    pub fn copy_from(&mut self, other: &Morph) {
        self.name = other.name.clone();
        self.category = other.category;
        self.morph_type = other.morph_type;
        self.items = other.items.duplicate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelObject;

    #[test]
    fn test_morph_type_codes() {
        for code in 0..=10u8 {
            let ty = MorphType::from_u8(code).unwrap();
            assert_eq!(ty.as_u8(), code);
        }
        assert!(MorphType::from_u8(11).is_none());
        assert!(MorphType::Uva3.is_uv());
        assert!(MorphType::Impulse.requires_v21());
    }

    #[test]
    fn test_copy_from_renews_items() {
        let mut source = Morph::new(MorphType::Group);
        source.items.groups.push(MorphGroup::new(None, 0.5)).unwrap();
        let mut copy = Morph::new(MorphType::Vertex);
        copy.copy_from(&source);
        assert_eq!(copy.morph_type, MorphType::Group);
        assert_eq!(copy.num_items(), 1);
        assert_ne!(copy.items.groups[0].id(), source.items.groups[0].id());
        assert_ne!(copy.id(), source.id());
    }
}
