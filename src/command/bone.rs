//! Bone commands.
//!
//! Plain create, delete and move go through the shared object commands;
//! this module adds the bone-specific ways of creating one and editing
//! constraint joints.

use super::object::CreateCommand;
use super::{new_object_name, CommandContext, UndoCommand};
use crate::model::{
    Bone, BoneDestination, BoneId, ConstraintId, ConstraintJoint, ConstraintJointId, Model,
    ModelObject, Mutable,
};
use crate::util::{Error, Result, Vec3};

/// Japanese suffix of a destination bone.
pub const DESTINATION_SUFFIX_JAPANESE: &str = "先";
/// English suffix of a destination bone.
pub const DESTINATION_SUFFIX_ENGLISH: &str = "D";
pub const STAGING_PARENT_SUFFIX: &str = "+";
pub const STAGING_CHILD_SUFFIX: &str = "-";

fn resolve_bone(model: &Model, id: BoneId) -> Result<&Bone> {
    model.bones.get(id).ok_or_else(|| Error::not_found(format!("Bone {:?}", id)))
}

/// Owning handle over a copy of `base` with a fresh identity.
fn copy_of(base: &Bone) -> Mutable<'static, Bone> {
    let mut bone: Mutable<'static, Bone> = Mutable::create();
    bone.copy_with(base, Bone::copy_from);
    bone
}

// ============================================================================
// Create
// ============================================================================

/// New bone named `新規{n}` / `NewBone{n}`, inserted at `at` (appended when `None`).
///
/// With a `base` every stored field except the name and constraint is copied.
pub fn create_bone(model: &Model, at: Option<usize>, base: Option<BoneId>) -> Result<CreateCommand<Bone>> {
    let mut bone = match base {
        Some(base) => copy_of(resolve_bone(model, base)?),
        None => Mutable::owned(Bone::new()),
    };
    bone.name = new_object_name("Bone", model.bones.len() + 1);
    Ok(CreateCommand::owned(bone, at))
}

/// New bone appended at `origin`.
pub fn create_bone_at(model: &Model, origin: Vec3) -> CreateCommand<Bone> {
    let mut bone = Bone::new();
    bone.name = new_object_name("Bone", model.bones.len() + 1);
    bone.origin = origin;
    CreateCommand::new(bone, None)
}

/// Point a bone's destination resolves to.
pub fn destination_point(model: &Model, bone: &Bone) -> Vec3 {
    match bone.destination {
        BoneDestination::Bone(target) => model.bones.resolve(target).map_or(bone.origin, |t| t.origin),
        BoneDestination::Offset(offset) => bone.origin + offset,
    }
}

/// Child of `base` placed at its destination point, right after it.
///
/// Named after the base bone with `先` (Japanese) and `D` (English) appended.
pub fn create_destination_bone(model: &Model, base: BoneId) -> Result<CreateCommand<Bone>> {
    let base_bone = resolve_bone(model, base)?;
    let mut bone = copy_of(base_bone);
    bone.parent_bone = Some(base);
    bone.origin = destination_point(model, base_bone);
    bone.destination = BoneDestination::Offset(Vec3::ZERO);
    bone.name.japanese.push_str(DESTINATION_SUFFIX_JAPANESE);
    bone.name.english.push_str(DESTINATION_SUFFIX_ENGLISH);
    let at = base_bone.index().map(|i| i + 1);
    Ok(CreateCommand::owned(bone, at))
}

// ============================================================================
// Staging bones
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    /// Between the base bone and its first child.
    Parent,
    /// Between the base bone and its parent.
    Child,
}

/// Insert a copy of a bone into its own parent chain.
pub struct StagingBoneCommand {
    create: CreateCommand<Bone>,
    staging: Staging,
    base: BoneId,
    base_parent: Option<BoneId>,
    /// First child of the base bone, re-parented to the staging bone.
    adopted: Option<BoneId>,
}

impl StagingBoneCommand {
    pub fn new(model: &Model, base: BoneId, staging: Staging) -> Result<Self> {
        let base_bone = resolve_bone(model, base)?;
        let index = base_bone.index().unwrap_or(0);
        let mut bone = copy_of(base_bone);
        let (at, adopted) = match staging {
            Staging::Parent => {
                bone.name.append_suffix(STAGING_PARENT_SUFFIX);
                bone.parent_bone = Some(base);
                (index + 1, model.child_bones(base).first().copied())
            }
            Staging::Child => {
                bone.name.append_suffix(STAGING_CHILD_SUFFIX);
                bone.parent_bone = base_bone.parent_bone;
                (index, None)
            }
        };
        Ok(Self {
            create: CreateCommand::owned(bone, Some(at)),
            staging,
            base,
            base_parent: base_bone.parent_bone,
            adopted,
        })
    }

    /// Id of the staging bone.
    pub fn id(&self) -> BoneId {
        self.create.id()
    }

    fn set_parent(model: &mut Model, bone: BoneId, parent: Option<BoneId>) {
        if let Some(bone) = model.bones.get_mut(bone) {
            bone.parent_bone = parent;
        }
    }
}

impl UndoCommand for StagingBoneCommand {
    fn name(&self) -> &'static str {
        match self.staging {
            Staging::Parent => "CreateBoneAsStagingParent",
            Staging::Child => "CreateBoneAsStagingChild",
        }
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        self.create.redo(cx)?;
        let id = self.id();
        match self.staging {
            Staging::Parent => {
                if let Some(child) = self.adopted {
                    Self::set_parent(cx.model, child, Some(id));
                }
            }
            Staging::Child => Self::set_parent(cx.model, self.base, Some(id)),
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        match self.staging {
            Staging::Parent => {
                if let Some(child) = self.adopted {
                    Self::set_parent(cx.model, child, Some(self.base));
                }
            }
            Staging::Child => Self::set_parent(cx.model, self.base, self.base_parent),
        }
        self.create.undo(cx)
    }
}

// ============================================================================
// Constraint joints
// ============================================================================

/// Append one joint per bone to a constraint.
///
/// Bones the constraint already has a joint for are skipped.
pub struct AddBonesToConstraintCommand {
    constraint: ConstraintId,
    pending: Vec<ConstraintJoint>,
    joints: Vec<ConstraintJointId>,
}

impl AddBonesToConstraintCommand {
    pub fn new(model: &Model, constraint: ConstraintId, bones: &[BoneId]) -> Result<Self> {
        let target = model
            .constraints
            .get(constraint)
            .ok_or_else(|| Error::not_found(format!("Constraint {:?}", constraint)))?;
        let mut pending: Vec<ConstraintJoint> = Vec::new();
        for &bone in bones {
            resolve_bone(model, bone)?;
            let known = target.joint_for_bone(bone).is_some()
                || pending.iter().any(|j| j.bone == Some(bone));
            if !known {
                pending.push(ConstraintJoint::new(Some(bone)));
            }
        }
        let joints = pending.iter().map(ModelObject::id).collect();
        Ok(Self { constraint, pending, joints })
    }

    /// Number of joints the command adds.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

impl UndoCommand for AddBonesToConstraintCommand {
    fn name(&self) -> &'static str {
        "AddBonesToConstraint"
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let constraint = cx
            .model
            .constraints
            .get_mut(self.constraint)
            .ok_or_else(|| Error::not_found(format!("Constraint {:?}", self.constraint)))?;
        for joint in self.pending.drain(..) {
            constraint.joints.push(joint)?;
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let constraint = cx
            .model
            .constraints
            .get_mut(self.constraint)
            .ok_or_else(|| Error::not_found(format!("Constraint {:?}", self.constraint)))?;
        for &joint in &self.joints {
            self.pending.push(constraint.joints.remove(joint)?);
        }
        Ok(())
    }
}
