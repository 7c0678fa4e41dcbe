//! Skinned vertices.

use crate::util::{Vec2, Vec3, Vec4};

use super::array::model_object;
use super::{BoneId, MaterialId, SoftBodyId, VertexId};

/// Skinning deformation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexType {
    #[default]
    Bdef1,
    Bdef2,
    Bdef4,
    Sdef,
    Qdef,
}

impl VertexType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bdef1),
            1 => Some(Self::Bdef2),
            2 => Some(Self::Bdef4),
            3 => Some(Self::Sdef),
            4 => Some(Self::Qdef),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Bdef1 => 0,
            Self::Bdef2 => 1,
            Self::Bdef4 => 2,
            Self::Sdef => 3,
            Self::Qdef => 4,
        }
    }

    /// Number of bone slots the type uses.
    pub fn num_bones(self) -> usize {
        match self {
            Self::Bdef1 => 1,
            Self::Bdef2 | Self::Sdef => 2,
            Self::Bdef4 | Self::Qdef => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub(crate) id: VertexId,
    pub(crate) index: Option<usize>,
    pub origin: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub additional_uv: [Vec4; 4],
    pub vertex_type: VertexType,
    pub bones: [Option<BoneId>; 4],
    pub weights: [f32; 4],
    pub sdef_c: Vec3,
    pub sdef_r0: Vec3,
    pub sdef_r1: Vec3,
    pub edge_size: f32,
    // runtime-only, rebuilt from the index buffer and soft body pins
    pub(crate) material: Option<MaterialId>,
    pub(crate) soft_body: Option<SoftBodyId>,
}

model_object!(Vertex, VertexId, "Vertex");

impl Default for Vertex {
    fn default() -> Self {
        Self {
            id: VertexId::next(),
            index: None,
            origin: Vec3::ZERO,
            normal: Vec3::Y,
            uv: Vec2::ZERO,
            additional_uv: [Vec4::ZERO; 4],
            vertex_type: VertexType::Bdef1,
            bones: [None; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
            sdef_c: Vec3::ZERO,
            sdef_r0: Vec3::ZERO,
            sdef_r1: Vec3::ZERO,
            edge_size: 1.0,
            material: None,
            soft_body: None,
        }
    }
}

impl Vertex {
    /// Create an unlinked vertex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Material whose face range references this vertex.
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Soft body pinning this vertex.
    pub fn soft_body(&self) -> Option<SoftBodyId> {
        self.soft_body
    }

    /// Bind to a single bone with full weight.
    pub fn set_bdef1(&mut self, bone: Option<BoneId>) {
        self.vertex_type = VertexType::Bdef1;
        self.bones = [bone, None, None, None];
        self.weights = [1.0, 0.0, 0.0, 0.0];
    }

    /// Bones actually used by the skinning type.
    pub fn used_bones(&self) -> &[Option<BoneId>] {
        &self.bones[..self.vertex_type.num_bones()]
    }

    /// Copy every stored field of `other`, keeping this vertex's identity.
    pub fn copy_from(&mut self, other: &Vertex) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
    }
}
