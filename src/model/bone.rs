//! Bones.

use crate::util::Vec3;

use super::array::model_object;
use super::names::LocalizedName;
use super::{BoneId, ConstraintId};

/// Japanese first-language names that get the unit-X knee constraint.
pub const KNEE_BONE_NAMES: [&str; 2] = ["左ひざ", "右ひざ"];

/// Name given to the root parent bone.
pub const ROOT_PARENT_BONE_NAME: &str = "全ての親";

/// Bone flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoneFlags(pub u16);

impl BoneFlags {
    pub const HAS_DESTINATION_BONE: u16 = 0x0001;
    pub const ROTATABLE: u16 = 0x0002;
    pub const MOVABLE: u16 = 0x0004;
    pub const VISIBLE: u16 = 0x0008;
    pub const USER_HANDLEABLE: u16 = 0x0010;
    pub const HAS_CONSTRAINT: u16 = 0x0020;
    pub const HAS_LOCAL_INHERENT: u16 = 0x0080;
    pub const HAS_INHERENT_ORIENTATION: u16 = 0x0100;
    pub const HAS_INHERENT_TRANSLATION: u16 = 0x0200;
    pub const HAS_FIXED_AXIS: u16 = 0x0400;
    pub const HAS_LOCAL_AXES: u16 = 0x0800;
    pub const AFFECTED_BY_PHYSICS: u16 = 0x1000;
    pub const HAS_EXTERNAL_PARENT: u16 = 0x2000;

    #[inline]
    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn set(&mut self, bit: u16, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// Where a bone points to: another bone or a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoneDestination {
    Bone(Option<BoneId>),
    Offset(Vec3),
}

impl Default for BoneDestination {
    fn default() -> Self {
        Self::Offset(Vec3::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub(crate) id: BoneId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub origin: Vec3,
    pub parent_bone: Option<BoneId>,
    pub stage_index: i32,
    pub flags: BoneFlags,
    pub destination: BoneDestination,
    pub inherent_parent_bone: Option<BoneId>,
    pub inherent_coefficient: f32,
    pub fixed_axis: Vec3,
    pub local_x_axis: Vec3,
    pub local_z_axis: Vec3,
    pub external_parent_key: i32,
    pub constraint: Option<ConstraintId>,
}

model_object!(Bone, BoneId, "Bone");

impl Default for Bone {
    fn default() -> Self {
        Self {
            id: BoneId::next(),
            index: None,
            name: LocalizedName::default(),
            origin: Vec3::ZERO,
            parent_bone: None,
            stage_index: 0,
            flags: BoneFlags(
                BoneFlags::ROTATABLE | BoneFlags::VISIBLE | BoneFlags::USER_HANDLEABLE,
            ),
            destination: BoneDestination::default(),
            inherent_parent_bone: None,
            inherent_coefficient: 1.0,
            fixed_axis: Vec3::ZERO,
            local_x_axis: Vec3::X,
            local_z_axis: Vec3::Z,
            external_parent_key: 0,
            constraint: None,
        }
    }
}

impl Bone {
    /// Create an unlinked bone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bone this bone points at, when the destination is a bone.
    pub fn target_bone(&self) -> Option<BoneId> {
        match self.destination {
            BoneDestination::Bone(id) => id,
            BoneDestination::Offset(_) => None,
        }
    }

    pub fn is_rotatable(&self) -> bool {
        self.flags.contains(BoneFlags::ROTATABLE)
    }

    pub fn is_movable(&self) -> bool {
        self.flags.contains(BoneFlags::MOVABLE)
    }

    pub fn is_visible(&self) -> bool {
        self.flags.contains(BoneFlags::VISIBLE)
    }

    pub fn is_user_handleable(&self) -> bool {
        self.flags.contains(BoneFlags::USER_HANDLEABLE)
    }

    pub fn has_inherent_orientation(&self) -> bool {
        self.flags.contains(BoneFlags::HAS_INHERENT_ORIENTATION)
    }

    pub fn has_inherent_translation(&self) -> bool {
        self.flags.contains(BoneFlags::HAS_INHERENT_TRANSLATION)
    }

    pub fn has_inherent(&self) -> bool {
        self.has_inherent_orientation() || self.has_inherent_translation()
    }

    pub fn has_fixed_axis(&self) -> bool {
        self.flags.contains(BoneFlags::HAS_FIXED_AXIS)
    }

    pub fn has_local_axes(&self) -> bool {
        self.flags.contains(BoneFlags::HAS_LOCAL_AXES)
    }

    pub fn has_external_parent(&self) -> bool {
        self.flags.contains(BoneFlags::HAS_EXTERNAL_PARENT)
    }

    pub fn is_affected_by_physics(&self) -> bool {
        self.flags.contains(BoneFlags::AFFECTED_BY_PHYSICS)
    }

    /// Visible, handleable and either movable or rotatable.
    pub fn is_selectable(&self) -> bool {
        self.is_visible() && self.is_user_handleable() && (self.is_movable() || self.is_rotatable())
    }

    /// Knee bones solve around the local X axis only.
    pub fn has_unit_x_constraint(&self) -> bool {
        KNEE_BONE_NAMES.contains(&self.name.first())
    }

    /// Copy every stored field of `other`, keeping this bone's identity.
    ///
    /// Bone references are copied raw. The owned constraint is not shared:
    /// the copy starts without one.
    pub fn copy_from(&mut self, other: &Bone) {
        let (id, index) = (self.id, self.index);
        *self = other.clone();
        self.id = id;
        self.index = index;
        self.constraint = None;
    }

    /// Flags as written to disk, with the derived bits recomputed.
    pub fn encoded_flags(&self) -> u16 {
        let mut flags = self.flags;
        flags.set(
            BoneFlags::HAS_DESTINATION_BONE,
            matches!(self.destination, BoneDestination::Bone(_)),
        );
        flags.set(BoneFlags::HAS_CONSTRAINT, self.constraint.is_some());
        flags.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knee_detection_by_name() {
        let mut bone = Bone::new();
        bone.name.japanese = "左ひざ".into();
        assert!(bone.has_unit_x_constraint());
        bone.name.japanese = "左足".into();
        bone.name.english = "左ひざ".into();
        assert!(!bone.has_unit_x_constraint());
    }

    #[test]
    fn test_encoded_flags() {
        let mut bone = Bone::new();
        bone.destination = BoneDestination::Bone(None);
        bone.constraint = Some(ConstraintId::next());
        let flags = BoneFlags(bone.encoded_flags());
        assert!(flags.contains(BoneFlags::HAS_DESTINATION_BONE));
        assert!(flags.contains(BoneFlags::HAS_CONSTRAINT));
    }
}
