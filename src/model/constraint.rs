//! IK constraints and their joints.

use crate::util::Vec3;

use super::array::{model_object, ModelObject, ObjectArray};
use super::{BoneId, ConstraintId, ConstraintJointId};

/// One link of an IK chain.
#[derive(Debug, Clone)]
pub struct ConstraintJoint {
    pub(crate) id: ConstraintJointId,
    pub(crate) index: Option<usize>,
    pub bone: Option<BoneId>,
    pub has_angle_limit: bool,
    pub lower_limit: Vec3,
    pub upper_limit: Vec3,
}

model_object!(ConstraintJoint, ConstraintJointId, "ConstraintJoint");

impl ConstraintJoint {
    /// Create an unlinked joint for a bone.
    pub fn new(bone: Option<BoneId>) -> Self {
        Self {
            id: ConstraintJointId::next(),
            index: None,
            bone,
            has_angle_limit: false,
            lower_limit: Vec3::ZERO,
            upper_limit: Vec3::ZERO,
        }
    }
}

/// IK constraint owned by its target bone.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub(crate) id: ConstraintId,
    pub(crate) index: Option<usize>,
    /// The IK bone owning this constraint; the effector is pulled toward it.
    pub target_bone: Option<BoneId>,
    pub effector_bone: Option<BoneId>,
    pub num_iterations: i32,
    /// Per-iteration angle limit in radians.
    pub angle_limit: f32,
    pub joints: ObjectArray<ConstraintJoint>,
}

model_object!(Constraint, ConstraintId, "Constraint", |this| {
    this.joints = this.joints.duplicate();
});

impl Default for Constraint {
    fn default() -> Self {
        Self {
            id: ConstraintId::next(),
            index: None,
            target_bone: None,
            effector_bone: None,
            num_iterations: 40,
            angle_limit: 2.0f32.to_radians(),
            joints: ObjectArray::new(),
        }
    }
}

impl Constraint {
    /// Create an unlinked constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy scalars and deep-copy joints; bone references are copied raw.
    pub fn copy_from(&mut self, other: &Constraint) {
        self.target_bone = other.target_bone;
        self.effector_bone = other.effector_bone;
        self.num_iterations = other.num_iterations;
        self.angle_limit = other.angle_limit;
        self.joints = other.joints.duplicate();
    }

    /// Find the joint driving a bone.
    pub fn joint_for_bone(&self, bone: BoneId) -> Option<&ConstraintJoint> {
        self.joints.iter().find(|j| j.bone == Some(bone))
    }

    /// Bones referenced by joints, in chain order.
    pub fn joint_bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.joints.iter().filter_map(|j| j.bone)
    }

    pub(crate) fn joint_ids(&self) -> Vec<ConstraintJointId> {
        self.joints.iter().map(ModelObject::id).collect()
    }
}
