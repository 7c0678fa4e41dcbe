//! Soft bodies (PMX 2.1).

use super::array::{model_object, ObjectArray};
use super::names::LocalizedName;
use super::{MaterialId, RigidBodyId, SoftBodyAnchorId, SoftBodyId, VertexId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftBodyShape {
    #[default]
    TriMesh,
    Rope,
}

impl SoftBodyShape {
    pub fn from_u8(value: u8) -> Self {
        if value == 1 {
            Self::Rope
        } else {
            Self::TriMesh
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::TriMesh => 0,
            Self::Rope => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftBodyAeroModel {
    #[default]
    VertexPoint,
    VertexTwoSided,
    VertexOneSided,
    FaceTwoSided,
    FaceOneSided,
}

impl SoftBodyAeroModel {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::VertexTwoSided,
            2 => Self::VertexOneSided,
            3 => Self::FaceTwoSided,
            4 => Self::FaceOneSided,
            _ => Self::VertexPoint,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::VertexPoint => 0,
            Self::VertexTwoSided => 1,
            Self::VertexOneSided => 2,
            Self::FaceTwoSided => 3,
            Self::FaceOneSided => 4,
        }
    }
}

/// Simulation coefficients written in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftBodyConfig {
    pub velocity_correction_factor: f32,
    pub damping_coefficient: f32,
    pub drag_coefficient: f32,
    pub lift_coefficient: f32,
    pub pressure_coefficient: f32,
    pub volume_conversation_coefficient: f32,
    pub dynamic_friction_coefficient: f32,
    pub pose_matching_coefficient: f32,
    pub rigid_contact_hardness: f32,
    pub kinetic_contact_hardness: f32,
    pub soft_contact_hardness: f32,
    pub anchor_hardness: f32,
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        Self {
            velocity_correction_factor: 1.0,
            damping_coefficient: 0.0,
            drag_coefficient: 0.0,
            lift_coefficient: 0.0,
            pressure_coefficient: 0.0,
            volume_conversation_coefficient: 0.0,
            dynamic_friction_coefficient: 0.2,
            pose_matching_coefficient: 0.0,
            rigid_contact_hardness: 1.0,
            kinetic_contact_hardness: 0.1,
            soft_contact_hardness: 1.0,
            anchor_hardness: 0.7,
        }
    }
}

impl SoftBodyConfig {
    pub fn to_array(&self) -> [f32; 12] {
        [
            self.velocity_correction_factor,
            self.damping_coefficient,
            self.drag_coefficient,
            self.lift_coefficient,
            self.pressure_coefficient,
            self.volume_conversation_coefficient,
            self.dynamic_friction_coefficient,
            self.pose_matching_coefficient,
            self.rigid_contact_hardness,
            self.kinetic_contact_hardness,
            self.soft_contact_hardness,
            self.anchor_hardness,
        ]
    }

    pub fn from_array(v: [f32; 12]) -> Self {
        Self {
            velocity_correction_factor: v[0],
            damping_coefficient: v[1],
            drag_coefficient: v[2],
            lift_coefficient: v[3],
            pressure_coefficient: v[4],
            volume_conversation_coefficient: v[5],
            dynamic_friction_coefficient: v[6],
            pose_matching_coefficient: v[7],
            rigid_contact_hardness: v[8],
            kinetic_contact_hardness: v[9],
            soft_contact_hardness: v[10],
            anchor_hardness: v[11],
        }
    }
}

/// Cluster hardness and impulse split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftBodyCluster {
    pub soft_vs_rigid_hardness: f32,
    pub soft_vs_kinetic_hardness: f32,
    pub soft_vs_soft_hardness: f32,
    pub soft_vs_rigid_impulse_split: f32,
    pub soft_vs_kinetic_impulse_split: f32,
    pub soft_vs_soft_impulse_split: f32,
}

impl Default for SoftBodyCluster {
    fn default() -> Self {
        Self {
            soft_vs_rigid_hardness: 0.1,
            soft_vs_kinetic_hardness: 1.0,
            soft_vs_soft_hardness: 0.5,
            soft_vs_rigid_impulse_split: 0.5,
            soft_vs_kinetic_impulse_split: 0.5,
            soft_vs_soft_impulse_split: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftBodyIterations {
    pub velocity: i32,
    pub positions: i32,
    pub drift: i32,
    pub cluster: i32,
}

impl Default for SoftBodyIterations {
    fn default() -> Self {
        Self { velocity: 0, positions: 1, drift: 0, cluster: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftBodyStiffness {
    pub linear: f32,
    pub angular: f32,
    pub volume: f32,
}

impl Default for SoftBodyStiffness {
    fn default() -> Self {
        Self { linear: 1.0, angular: 1.0, volume: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct SoftBodyAnchor {
    pub(crate) id: SoftBodyAnchorId,
    pub(crate) index: Option<usize>,
    pub rigid_body: Option<RigidBodyId>,
    pub vertex: Option<VertexId>,
    pub is_near_enabled: bool,
}

model_object!(SoftBodyAnchor, SoftBodyAnchorId, "SoftBodyAnchor");

impl SoftBodyAnchor {
    pub fn new(rigid_body: Option<RigidBodyId>, vertex: Option<VertexId>) -> Self {
        Self {
            id: SoftBodyAnchorId::next(),
            index: None,
            rigid_body,
            vertex,
            is_near_enabled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoftBody {
    pub(crate) id: SoftBodyId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub shape: SoftBodyShape,
    pub material: Option<MaterialId>,
    pub collision_group: u8,
    pub collision_mask: u16,
    pub flags: u8,
    pub bending_constraints_distance: i32,
    pub cluster_count: i32,
    pub total_mass: f32,
    pub collision_margin: f32,
    pub aero_model: SoftBodyAeroModel,
    pub config: SoftBodyConfig,
    pub cluster: SoftBodyCluster,
    pub iterations: SoftBodyIterations,
    pub stiffness: SoftBodyStiffness,
    pub anchors: ObjectArray<SoftBodyAnchor>,
    /// Positions in the vertex sequence.
    pub pinned_vertex_indices: Vec<u32>,
}

model_object!(SoftBody, SoftBodyId, "SoftBody", |this| {
    this.anchors = this.anchors.duplicate();
});

impl Default for SoftBody {
    fn default() -> Self {
        Self {
            id: SoftBodyId::next(),
            index: None,
            name: LocalizedName::default(),
            shape: SoftBodyShape::TriMesh,
            material: None,
            collision_group: 0,
            collision_mask: 0xffff,
            flags: 0,
            bending_constraints_distance: 2,
            cluster_count: 0,
            total_mass: 1.0,
            collision_margin: 0.05,
            aero_model: SoftBodyAeroModel::default(),
            config: SoftBodyConfig::default(),
            cluster: SoftBodyCluster::default(),
            iterations: SoftBodyIterations::default(),
            stiffness: SoftBodyStiffness::default(),
            anchors: ObjectArray::new(),
            pinned_vertex_indices: Vec::new(),
        }
    }
}

impl SoftBody {
    /// Create an unlinked soft body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy scalars and deep-copy anchors; references are copied raw.
    pub fn copy_from(&mut self, other: &SoftBody) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
        self.anchors = other.anchors.duplicate();
    }
}
