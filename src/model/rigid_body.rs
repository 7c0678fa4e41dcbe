//! Rigid bodies.

use crate::util::Vec3;

use super::array::model_object;
use super::names::LocalizedName;
use super::{BoneId, RigidBodyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigidBodyShape {
    #[default]
    Sphere,
    Box,
    Capsule,
}

impl RigidBodyShape {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Sphere),
            1 => Some(Self::Box),
            2 => Some(Self::Capsule),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Sphere => 0,
            Self::Box => 1,
            Self::Capsule => 2,
        }
    }
}

/// How the body and its bone drive each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigidBodyTransformType {
    #[default]
    FromBoneToSimulation,
    FromSimulationToBone,
    FromBoneOrientationAndSimulationToBone,
}

impl RigidBodyTransformType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::FromBoneToSimulation),
            1 => Some(Self::FromSimulationToBone),
            2 => Some(Self::FromBoneOrientationAndSimulationToBone),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::FromBoneToSimulation => 0,
            Self::FromSimulationToBone => 1,
            Self::FromBoneOrientationAndSimulationToBone => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) id: RigidBodyId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub bone: Option<BoneId>,
    pub collision_group: u8,
    pub collision_mask: u16,
    pub shape: RigidBodyShape,
    pub size: Vec3,
    pub origin: Vec3,
    /// Euler angles in radians.
    pub orientation: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    pub transform_type: RigidBodyTransformType,
}

model_object!(RigidBody, RigidBodyId, "RigidBody");

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            id: RigidBodyId::next(),
            index: None,
            name: LocalizedName::default(),
            bone: None,
            collision_group: 0,
            collision_mask: 0xffff,
            shape: RigidBodyShape::Sphere,
            size: Vec3::ONE,
            origin: Vec3::ZERO,
            orientation: Vec3::ZERO,
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            restitution: 0.0,
            friction: 0.5,
            transform_type: RigidBodyTransformType::FromBoneToSimulation,
        }
    }
}

impl RigidBody {
    /// Create an unlinked rigid body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy_from(&mut self, other: &RigidBody) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
    }
}
