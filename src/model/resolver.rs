//! Repointing cross-references when an object is deleted or merged.
//!
//! Each `replace_*_references` visits every field that can hold a reference
//! to the given kind, rewrites matches and returns the list of sites it
//! touched. Feeding that list to the matching `restore_*_references` puts
//! the original id back, which is how delete commands undo.

use super::{
    BoneDestination, BoneId, ConstraintId, ConstraintJointId, JointId, LabelId, LabelItemId,
    LabelTarget, MaterialId, Model, MorphId, MorphItemId, RigidBodyId, SoftBodyAnchorId,
    SoftBodyId, VertexId,
};

// ============================================================================
// Bones
// ============================================================================

/// A field holding a bone reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneSite {
    VertexBone { vertex: VertexId, slot: usize },
    Parent(BoneId),
    InherentParent(BoneId),
    Destination(BoneId),
    ConstraintTarget(ConstraintId),
    ConstraintEffector(ConstraintId),
    ConstraintJoint { constraint: ConstraintId, joint: ConstraintJointId },
    MorphBone { morph: MorphId, item: MorphItemId },
    LabelItem { label: LabelId, item: LabelItemId },
    RigidBody(RigidBodyId),
}

/// Point every reference to `from` at `to`.
pub fn replace_bone_references(model: &mut Model, from: BoneId, to: Option<BoneId>) -> Vec<BoneSite> {
    let mut sites = Vec::new();
    for vertex in model.vertices.iter_mut() {
        for slot in 0..vertex.bones.len() {
            if vertex.bones[slot] == Some(from) {
                vertex.bones[slot] = to;
                sites.push(BoneSite::VertexBone { vertex: vertex.id, slot });
            }
        }
    }
    for bone in model.bones.iter_mut() {
        if bone.parent_bone == Some(from) {
            bone.parent_bone = to;
            sites.push(BoneSite::Parent(bone.id));
        }
        if bone.inherent_parent_bone == Some(from) {
            bone.inherent_parent_bone = to;
            sites.push(BoneSite::InherentParent(bone.id));
        }
        if bone.destination == BoneDestination::Bone(Some(from)) {
            bone.destination = BoneDestination::Bone(to);
            sites.push(BoneSite::Destination(bone.id));
        }
    }
    for constraint in model.constraints.iter_mut() {
        if constraint.target_bone == Some(from) {
            constraint.target_bone = to;
            sites.push(BoneSite::ConstraintTarget(constraint.id));
        }
        if constraint.effector_bone == Some(from) {
            constraint.effector_bone = to;
            sites.push(BoneSite::ConstraintEffector(constraint.id));
        }
        let constraint_id = constraint.id;
        for joint in constraint.joints.iter_mut() {
            if joint.bone == Some(from) {
                joint.bone = to;
                sites.push(BoneSite::ConstraintJoint { constraint: constraint_id, joint: joint.id });
            }
        }
    }
    for morph in model.morphs.iter_mut() {
        let morph_id = morph.id;
        for item in morph.items.bones.iter_mut() {
            if item.bone == Some(from) {
                item.bone = to;
                sites.push(BoneSite::MorphBone { morph: morph_id, item: item.id });
            }
        }
    }
    for label in model.labels.iter_mut() {
        let label_id = label.id;
        for item in label.items.iter_mut() {
            if item.target == LabelTarget::Bone(Some(from)) {
                item.target = LabelTarget::Bone(to);
                sites.push(BoneSite::LabelItem { label: label_id, item: item.id });
            }
        }
    }
    for rigid_body in model.rigid_bodies.iter_mut() {
        if rigid_body.bone == Some(from) {
            rigid_body.bone = to;
            sites.push(BoneSite::RigidBody(rigid_body.id));
        }
    }
    tracing::debug!(?from, ?to, sites = sites.len(), "bone references replaced");
    sites
}

/// Write `bone` back into every recorded site.
pub fn restore_bone_references(model: &mut Model, sites: &[BoneSite], bone: BoneId) {
    let value = Some(bone);
    for site in sites {
        match *site {
            BoneSite::VertexBone { vertex, slot } => {
                if let Some(v) = model.vertices.get_mut(vertex) {
                    v.bones[slot] = value;
                }
            }
            BoneSite::Parent(id) => {
                if let Some(b) = model.bones.get_mut(id) {
                    b.parent_bone = value;
                }
            }
            BoneSite::InherentParent(id) => {
                if let Some(b) = model.bones.get_mut(id) {
                    b.inherent_parent_bone = value;
                }
            }
            BoneSite::Destination(id) => {
                if let Some(b) = model.bones.get_mut(id) {
                    b.destination = BoneDestination::Bone(value);
                }
            }
            BoneSite::ConstraintTarget(id) => {
                if let Some(c) = model.constraints.get_mut(id) {
                    c.target_bone = value;
                }
            }
            BoneSite::ConstraintEffector(id) => {
                if let Some(c) = model.constraints.get_mut(id) {
                    c.effector_bone = value;
                }
            }
            BoneSite::ConstraintJoint { constraint, joint } => {
                if let Some(j) = model
                    .constraints
                    .get_mut(constraint)
                    .and_then(|c| c.joints.get_mut(joint))
                {
                    j.bone = value;
                }
            }
            BoneSite::MorphBone { morph, item } => {
                if let Some(i) = model
                    .morphs
                    .get_mut(morph)
                    .and_then(|m| m.items.bones.get_mut(item))
                {
                    i.bone = value;
                }
            }
            BoneSite::LabelItem { label, item } => {
                if let Some(i) = model.labels.get_mut(label).and_then(|l| l.items.get_mut(item)) {
                    i.target = LabelTarget::Bone(value);
                }
            }
            BoneSite::RigidBody(id) => {
                if let Some(r) = model.rigid_bodies.get_mut(id) {
                    r.bone = value;
                }
            }
        }
    }
}

// ============================================================================
// Morphs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphSite {
    Group { morph: MorphId, item: MorphItemId },
    Flip { morph: MorphId, item: MorphItemId },
    LabelItem { label: LabelId, item: LabelItemId },
}

pub fn replace_morph_references(model: &mut Model, from: MorphId, to: Option<MorphId>) -> Vec<MorphSite> {
    let mut sites = Vec::new();
    for morph in model.morphs.iter_mut() {
        let morph_id = morph.id;
        for item in morph.items.groups.iter_mut() {
            if item.morph == Some(from) {
                item.morph = to;
                sites.push(MorphSite::Group { morph: morph_id, item: item.id });
            }
        }
        for item in morph.items.flips.iter_mut() {
            if item.morph == Some(from) {
                item.morph = to;
                sites.push(MorphSite::Flip { morph: morph_id, item: item.id });
            }
        }
    }
    for label in model.labels.iter_mut() {
        let label_id = label.id;
        for item in label.items.iter_mut() {
            if item.target == LabelTarget::Morph(Some(from)) {
                item.target = LabelTarget::Morph(to);
                sites.push(MorphSite::LabelItem { label: label_id, item: item.id });
            }
        }
    }
    tracing::debug!(?from, ?to, sites = sites.len(), "morph references replaced");
    sites
}

pub fn restore_morph_references(model: &mut Model, sites: &[MorphSite], morph: MorphId) {
    let value = Some(morph);
    for site in sites {
        match *site {
            MorphSite::Group { morph, item } => {
                if let Some(i) = model.morphs.get_mut(morph).and_then(|m| m.items.groups.get_mut(item)) {
                    i.morph = value;
                }
            }
            MorphSite::Flip { morph, item } => {
                if let Some(i) = model.morphs.get_mut(morph).and_then(|m| m.items.flips.get_mut(item)) {
                    i.morph = value;
                }
            }
            MorphSite::LabelItem { label, item } => {
                if let Some(i) = model.labels.get_mut(label).and_then(|l| l.items.get_mut(item)) {
                    i.target = LabelTarget::Morph(value);
                }
            }
        }
    }
}

// ============================================================================
// Materials
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSite {
    MorphMaterial { morph: MorphId, item: MorphItemId },
    SoftBody(SoftBodyId),
}

/// Point material references at `to`.
///
/// Material morph items whose target is `None` apply to every material and
/// are left alone. Vertex links are runtime data and are rebuilt instead.
pub fn replace_material_references(
    model: &mut Model,
    from: MaterialId,
    to: Option<MaterialId>,
) -> Vec<MaterialSite> {
    let mut sites = Vec::new();
    for morph in model.morphs.iter_mut() {
        let morph_id = morph.id;
        for item in morph.items.materials.iter_mut() {
            if item.material == Some(from) {
                item.material = to;
                sites.push(MaterialSite::MorphMaterial { morph: morph_id, item: item.id });
            }
        }
    }
    for soft_body in model.soft_bodies.iter_mut() {
        if soft_body.material == Some(from) {
            soft_body.material = to;
            sites.push(MaterialSite::SoftBody(soft_body.id));
        }
    }
    tracing::debug!(?from, ?to, sites = sites.len(), "material references replaced");
    sites
}

pub fn restore_material_references(model: &mut Model, sites: &[MaterialSite], material: MaterialId) {
    let value = Some(material);
    for site in sites {
        match *site {
            MaterialSite::MorphMaterial { morph, item } => {
                if let Some(i) = model
                    .morphs
                    .get_mut(morph)
                    .and_then(|m| m.items.materials.get_mut(item))
                {
                    i.material = value;
                }
            }
            MaterialSite::SoftBody(id) => {
                if let Some(s) = model.soft_bodies.get_mut(id) {
                    s.material = value;
                }
            }
        }
    }
}

// ============================================================================
// Rigid bodies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodySite {
    JointA(JointId),
    JointB(JointId),
    SoftBodyAnchor { soft_body: SoftBodyId, anchor: SoftBodyAnchorId },
    MorphImpulse { morph: MorphId, item: MorphItemId },
}

pub fn replace_rigid_body_references(
    model: &mut Model,
    from: RigidBodyId,
    to: Option<RigidBodyId>,
) -> Vec<RigidBodySite> {
    let mut sites = Vec::new();
    for joint in model.joints.iter_mut() {
        if joint.rigid_body_a == Some(from) {
            joint.rigid_body_a = to;
            sites.push(RigidBodySite::JointA(joint.id));
        }
        if joint.rigid_body_b == Some(from) {
            joint.rigid_body_b = to;
            sites.push(RigidBodySite::JointB(joint.id));
        }
    }
    for soft_body in model.soft_bodies.iter_mut() {
        let soft_body_id = soft_body.id;
        for anchor in soft_body.anchors.iter_mut() {
            if anchor.rigid_body == Some(from) {
                anchor.rigid_body = to;
                sites.push(RigidBodySite::SoftBodyAnchor { soft_body: soft_body_id, anchor: anchor.id });
            }
        }
    }
    for morph in model.morphs.iter_mut() {
        let morph_id = morph.id;
        for item in morph.items.impulses.iter_mut() {
            if item.rigid_body == Some(from) {
                item.rigid_body = to;
                sites.push(RigidBodySite::MorphImpulse { morph: morph_id, item: item.id });
            }
        }
    }
    tracing::debug!(?from, ?to, sites = sites.len(), "rigid body references replaced");
    sites
}

pub fn restore_rigid_body_references(model: &mut Model, sites: &[RigidBodySite], rigid_body: RigidBodyId) {
    let value = Some(rigid_body);
    for site in sites {
        match *site {
            RigidBodySite::JointA(id) => {
                if let Some(j) = model.joints.get_mut(id) {
                    j.rigid_body_a = value;
                }
            }
            RigidBodySite::JointB(id) => {
                if let Some(j) = model.joints.get_mut(id) {
                    j.rigid_body_b = value;
                }
            }
            RigidBodySite::SoftBodyAnchor { soft_body, anchor } => {
                if let Some(a) = model
                    .soft_bodies
                    .get_mut(soft_body)
                    .and_then(|s| s.anchors.get_mut(anchor))
                {
                    a.rigid_body = value;
                }
            }
            RigidBodySite::MorphImpulse { morph, item } => {
                if let Some(i) = model
                    .morphs
                    .get_mut(morph)
                    .and_then(|m| m.items.impulses.get_mut(item))
                {
                    i.rigid_body = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bone, Joint, Label, LabelItem, ModelObject, RigidBody, Vertex};

    #[test]
    fn test_bone_references_null_and_restore() {
        let mut model = Model::new();
        let parent = Bone::new();
        let parent_id = parent.id();
        model.bones.push(parent).unwrap();
        let mut child = Bone::new();
        child.parent_bone = Some(parent_id);
        model.bones.push(child).unwrap();
        let mut vertex = Vertex::new();
        vertex.set_bdef1(Some(parent_id));
        model.vertices.push(vertex).unwrap();
        let mut label = Label::new();
        label.items.push(LabelItem::with_bone(parent_id)).unwrap();
        model.labels.push(label).unwrap();

        let sites = replace_bone_references(&mut model, parent_id, None);
        assert_eq!(sites.len(), 3);
        assert_eq!(model.bones[1].parent_bone, None);
        assert_eq!(model.vertices[0].bones[0], None);
        assert_eq!(model.labels[0].items[0].target, LabelTarget::Bone(None));

        restore_bone_references(&mut model, &sites, parent_id);
        assert_eq!(model.bones[1].parent_bone, Some(parent_id));
        assert_eq!(model.vertices[0].bones[0], Some(parent_id));
        assert!(model.labels[0].contains_bone(parent_id));
    }

    #[test]
    fn test_rigid_body_references_on_joints() {
        let mut model = Model::new();
        let a = RigidBody::new();
        let b = RigidBody::new();
        let (a_id, b_id) = (a.id(), b.id());
        model.rigid_bodies.push(a).unwrap();
        model.rigid_bodies.push(b).unwrap();
        let mut joint = Joint::new();
        joint.rigid_body_a = Some(a_id);
        joint.rigid_body_b = Some(b_id);
        model.joints.push(joint).unwrap();

        let sites = replace_rigid_body_references(&mut model, b_id, Some(a_id));
        assert_eq!(sites, vec![RigidBodySite::JointB(model.joints[0].id())]);
        assert_eq!(model.joints[0].rigid_body_b, Some(a_id));
        restore_rigid_body_references(&mut model, &sites, b_id);
        assert_eq!(model.joints[0].rigid_body_b, Some(b_id));
    }
}
