//! Joints between rigid bodies.

use crate::util::Vec3;

use super::array::model_object;
use super::names::LocalizedName;
use super::{JointId, RigidBodyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointType {
    #[default]
    Generic6DofSpring,
    Generic6Dof,
    Point2Point,
    ConeTwist,
    Slider,
    Hinge,
}

impl JointType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Generic6DofSpring),
            1 => Some(Self::Generic6Dof),
            2 => Some(Self::Point2Point),
            3 => Some(Self::ConeTwist),
            4 => Some(Self::Slider),
            5 => Some(Self::Hinge),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Generic6DofSpring => 0,
            Self::Generic6Dof => 1,
            Self::Point2Point => 2,
            Self::ConeTwist => 3,
            Self::Slider => 4,
            Self::Hinge => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) id: JointId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub joint_type: JointType,
    pub rigid_body_a: Option<RigidBodyId>,
    pub rigid_body_b: Option<RigidBodyId>,
    pub origin: Vec3,
    /// Euler angles in radians.
    pub orientation: Vec3,
    pub linear_lower_limit: Vec3,
    pub linear_upper_limit: Vec3,
    pub angular_lower_limit: Vec3,
    pub angular_upper_limit: Vec3,
    pub linear_stiffness: Vec3,
    pub angular_stiffness: Vec3,
}

model_object!(Joint, JointId, "Joint");

impl Default for Joint {
    fn default() -> Self {
        Self {
            id: JointId::next(),
            index: None,
            name: LocalizedName::default(),
            joint_type: JointType::default(),
            rigid_body_a: None,
            rigid_body_b: None,
            origin: Vec3::ZERO,
            orientation: Vec3::ZERO,
            linear_lower_limit: Vec3::ZERO,
            linear_upper_limit: Vec3::ZERO,
            angular_lower_limit: Vec3::ZERO,
            angular_upper_limit: Vec3::ZERO,
            linear_stiffness: Vec3::ZERO,
            angular_stiffness: Vec3::ZERO,
        }
    }
}

impl Joint {
    /// Create an unlinked joint.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy_from(&mut self, other: &Joint) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
    }
}
