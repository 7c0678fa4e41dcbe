//! Materials and textures.
//!
//! A material owns a contiguous run of the model's shared vertex-index
//! sequence. Runs are implicit: a material's offset is the sum of the
//! `num_vertex_indices` of every material before it.

use crate::util::Vec3;

use super::array::model_object;
use super::names::LocalizedName;
use super::{MaterialId, TextureId};

/// Material render flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialFlags(pub u8);

impl MaterialFlags {
    pub const CULLING_DISABLED: u8 = 0x01;
    pub const CASTING_SHADOW: u8 = 0x02;
    pub const CASTING_SHADOW_MAP: u8 = 0x04;
    pub const SHADOW_MAP: u8 = 0x08;
    pub const EDGE: u8 = 0x10;
    pub const VERTEX_COLOR: u8 = 0x20;
    pub const POINT_DRAW: u8 = 0x40;
    pub const LINE_DRAW: u8 = 0x80;

    #[inline]
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// Sphere map blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SphereMapType {
    #[default]
    None,
    Multiply,
    Add,
    SubTexture,
}

impl SphereMapType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Multiply,
            2 => Self::Add,
            3 => Self::SubTexture,
            _ => Self::None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Multiply => 1,
            Self::Add => 2,
            Self::SubTexture => 3,
        }
    }
}

/// Toon texture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToonTexture {
    /// One of the ten shared toon textures.
    Shared(u8),
    /// A texture of the model.
    Texture(Option<TextureId>),
}

impl Default for ToonTexture {
    fn default() -> Self {
        Self::Shared(0)
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub(crate) id: MaterialId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub diffuse_color: Vec3,
    pub diffuse_opacity: f32,
    pub specular_color: Vec3,
    pub specular_power: f32,
    pub ambient_color: Vec3,
    pub flags: MaterialFlags,
    pub edge_color: Vec3,
    pub edge_opacity: f32,
    pub edge_size: f32,
    pub diffuse_texture: Option<TextureId>,
    pub sphere_map_texture: Option<TextureId>,
    pub sphere_map_type: SphereMapType,
    pub toon: ToonTexture,
    pub clob: String,
    pub num_vertex_indices: usize,
}

model_object!(Material, MaterialId, "Material");

impl Default for Material {
    fn default() -> Self {
        Self {
            id: MaterialId::next(),
            index: None,
            name: LocalizedName::default(),
            diffuse_color: Vec3::ONE,
            diffuse_opacity: 1.0,
            specular_color: Vec3::ZERO,
            specular_power: 1.0,
            ambient_color: Vec3::splat(0.5),
            flags: MaterialFlags::default(),
            edge_color: Vec3::ZERO,
            edge_opacity: 1.0,
            edge_size: 1.0,
            diffuse_texture: None,
            sphere_map_texture: None,
            sphere_map_type: SphereMapType::None,
            toon: ToonTexture::default(),
            clob: String::new(),
            num_vertex_indices: 0,
        }
    }
}

impl Material {
    /// Create an unlinked material.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every stored field of `other`, keeping this material's identity.
    ///
    /// Texture references are copied as-is and must be re-pointed when the
    /// source belongs to another document.
    pub fn copy_from(&mut self, other: &Material) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub(crate) id: TextureId,
    pub(crate) index: Option<usize>,
    pub path: String,
}

model_object!(Texture, TextureId, "Texture");

impl Texture {
    /// Create an unlinked texture reference.
    pub fn new(path: impl Into<String>) -> Self {
        Self { id: TextureId::next(), index: None, path: path.into() }
    }
}
