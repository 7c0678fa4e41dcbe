//! Whole-model editing helpers.

use std::collections::HashMap;

use super::resolver::{
    replace_bone_references, replace_material_references, replace_morph_references,
    replace_rigid_body_references,
};
use super::{
    Bone, BoneDestination, BoneFlags, BoneId, Constraint, ConstraintJoint, Label, LabelItem,
    LocalizedName, Model, ModelObject, NamedObject, ObjectArray, ROOT_LABEL_NAME,
    ROOT_PARENT_BONE_NAME,
};
use crate::util::{Error, Result, Vec3};

/// Name of the bone made by [`create_constraint_chain`].
pub const CONSTRAINT_CHAIN_BONE_NAME: &str = "Constraint";
/// Iterations of a new constraint chain.
pub const CONSTRAINT_CHAIN_ITERATIONS: i32 = 16;

/// `(duplicate, survivor)` pairs grouped by canonical name, first occurrence wins.
pub fn duplicate_pairs<T: NamedObject>(array: &ObjectArray<T>) -> Vec<(T::Id, T::Id)> {
    let mut first: HashMap<String, T::Id> = HashMap::new();
    let mut pairs = Vec::new();
    for object in array {
        match first.get(&object.canonical_name()) {
            Some(&survivor) => pairs.push((object.id(), survivor)),
            None => {
                first.insert(object.canonical_name(), object.id());
            }
        }
    }
    pairs
}

/// Merge bones sharing a canonical name. Returns the number removed.
pub fn merge_all_duplicate_bones(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.bones);
    for &(duplicate, survivor) in &pairs {
        let parent = model.bones.get(duplicate).and_then(|b| b.parent_bone);
        replace_bone_references(model, duplicate, Some(survivor));
        if let Some(bone) = model.bones.get_mut(survivor) {
            // a duplicate parent would now point at itself
            if bone.parent_bone == Some(survivor) {
                bone.parent_bone = parent.filter(|&p| p != duplicate && p != survivor);
            }
            if bone.inherent_parent_bone == Some(survivor) {
                bone.inherent_parent_bone = None;
            }
        }
        let removed = model.bones.remove(duplicate)?;
        if let Some(constraint) = removed.constraint {
            model.constraints.remove(constraint)?;
        }
        model.extensions.unbind(duplicate);
    }
    if !pairs.is_empty() {
        tracing::info!(removed = pairs.len(), "merged duplicate bones");
    }
    Ok(pairs.len())
}

/// Merge materials sharing a canonical name.
///
/// The duplicate's faces move to the end of the survivor's run.
pub fn merge_all_duplicate_materials(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.materials);
    for &(duplicate, survivor) in &pairs {
        let range = model
            .material_range(duplicate)
            .ok_or_else(|| Error::not_found(format!("Material {:?}", duplicate)))?;
        if range.end > model.vertex_indices.len() {
            return Err(Error::IndexOutOfBounds { index: range.end, count: model.vertex_indices.len() });
        }
        let run: Vec<u32> = model.vertex_indices.drain(range).collect();
        let end = model
            .material_range(survivor)
            .ok_or_else(|| Error::not_found(format!("Material {:?}", survivor)))?
            .end;
        let count = run.len();
        model.vertex_indices.splice(end..end, run);
        if let Some(material) = model.materials.get_mut(survivor) {
            material.num_vertex_indices += count;
        }
        replace_material_references(model, duplicate, Some(survivor));
        model.materials.remove(duplicate)?;
        model.extensions.unbind(duplicate);
    }
    if !pairs.is_empty() {
        model.rebuild_vertex_links();
    }
    Ok(pairs.len())
}

pub fn merge_all_duplicate_morphs(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.morphs);
    for &(duplicate, survivor) in &pairs {
        replace_morph_references(model, duplicate, Some(survivor));
        model.morphs.remove(duplicate)?;
        model.extensions.unbind(duplicate);
    }
    Ok(pairs.len())
}

/// Merge labels sharing a canonical name; items missing from the survivor are appended.
pub fn merge_all_duplicate_labels(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.labels);
    for &(duplicate, survivor) in &pairs {
        let removed = model.labels.remove(duplicate)?;
        model.extensions.unbind(duplicate);
        let label = model
            .labels
            .get_mut(survivor)
            .ok_or_else(|| Error::not_found(format!("Label {:?}", survivor)))?;
        for item in removed.items.iter() {
            if !label.items.iter().any(|existing| existing.target == item.target) {
                label.items.push(LabelItem::new(item.target))?;
            }
        }
    }
    Ok(pairs.len())
}

pub fn merge_all_duplicate_rigid_bodies(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.rigid_bodies);
    for &(duplicate, survivor) in &pairs {
        replace_rigid_body_references(model, duplicate, Some(survivor));
        model.rigid_bodies.remove(duplicate)?;
        model.extensions.unbind(duplicate);
    }
    Ok(pairs.len())
}

pub fn merge_all_duplicate_joints(model: &mut Model) -> Result<usize> {
    let pairs = duplicate_pairs(&model.joints);
    for &(duplicate, _) in &pairs {
        model.joints.remove(duplicate)?;
        model.extensions.unbind(duplicate);
    }
    Ok(pairs.len())
}

/// Insert a `全ての親` bone at the top of the hierarchy.
///
/// Every bone without a parent is re-parented to it and it becomes the first
/// item of the special root label, which is created when missing.
pub fn create_root_parent_bone(model: &mut Model) -> Result<BoneId> {
    let mut bone = Bone::new();
    bone.name = LocalizedName::new(ROOT_PARENT_BONE_NAME, "root");
    bone.flags = BoneFlags(
        BoneFlags::ROTATABLE | BoneFlags::MOVABLE | BoneFlags::VISIBLE | BoneFlags::USER_HANDLEABLE,
    );
    bone.destination = BoneDestination::Bone(model.bones.id_at(0));
    let root = bone.id();
    for existing in model.bones.iter_mut() {
        if existing.parent_bone.is_none() {
            existing.parent_bone = Some(root);
        }
    }
    model.bones.insert(bone, Some(0))?;

    let label_id = match model.labels.iter().find(|l| l.is_root()) {
        Some(label) => label.id(),
        None => {
            let mut label = Label::new();
            label.name = LocalizedName::new(ROOT_LABEL_NAME, ROOT_LABEL_NAME);
            label.is_special = true;
            let id = label.id();
            model.labels.insert(label, Some(0))?;
            id
        }
    };
    if let Some(label) = model.labels.get_mut(label_id) {
        label.items.insert(LabelItem::with_bone(root), Some(0))?;
    }
    tracing::info!("root parent bone created");
    Ok(root)
}

/// Recompute vertex normals from the faces using them.
///
/// A vertex gets the normalized sum of its faces' unit normals. Degenerate
/// faces are skipped, and a vertex without a usable face keeps its normal.
/// Returns the number of vertices updated.
pub fn normalize_all_vertices(model: &mut Model) -> usize {
    let count = model.vertices.len();
    let mut sums = vec![Vec3::ZERO; count];
    for face in model.vertex_indices.chunks_exact(3) {
        let corners = [face[0] as usize, face[1] as usize, face[2] as usize];
        if corners.iter().any(|&i| i >= count) {
            continue;
        }
        let [v0, v1, v2] = corners.map(|i| model.vertices[i].origin);
        let normal = (v1 - v0).cross(v2 - v1).normalize();
        if !normal.is_finite() {
            continue;
        }
        for i in corners {
            sums[i] += normal;
        }
    }
    let mut updated = 0;
    for (index, sum) in sums.into_iter().enumerate() {
        if sum.length() > 0.0 {
            if let Some(vertex) = model.vertices.at_mut(index) {
                vertex.normal = sum.normalize();
                updated += 1;
            }
        }
    }
    tracing::debug!(updated, "vertex normals recomputed");
    updated
}

/// Append a bone driving a new constraint over `bones`.
///
/// The bones are ordered by descending index: the last one becomes the
/// effector, the others become joints with zero limits. The new bone is the
/// constraint's target. At least two bones are needed.
pub fn create_constraint_chain(model: &mut Model, bones: &[BoneId]) -> Result<BoneId> {
    let mut positions = bones
        .iter()
        .map(|&id| {
            model
                .bones
                .position(id)
                .ok_or_else(|| Error::not_found(format!("Bone {:?}", id)))
        })
        .collect::<Result<Vec<_>>>()?;
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    if positions.len() < 2 {
        return Err(Error::invalid("constraint chain needs at least two bones"));
    }
    let chain: Vec<BoneId> = positions.iter().filter_map(|&p| model.bones.id_at(p)).collect();

    let mut bone = Bone::new();
    bone.name = LocalizedName::new(CONSTRAINT_CHAIN_BONE_NAME, CONSTRAINT_CHAIN_BONE_NAME);
    let bone_id = bone.id();
    let mut constraint = Constraint::new();
    constraint.angle_limit = 0.0;
    constraint.num_iterations = CONSTRAINT_CHAIN_ITERATIONS;
    constraint.target_bone = Some(bone_id);
    constraint.effector_bone = chain.first().copied();
    for &joint_bone in &chain[1..] {
        let mut joint = ConstraintJoint::new(Some(joint_bone));
        joint.lower_limit = Vec3::ZERO;
        joint.upper_limit = Vec3::ZERO;
        constraint.joints.push(joint)?;
    }
    bone.constraint = Some(constraint.id());
    model.constraints.push(constraint)?;
    model.bones.push(bone)?;
    tracing::info!(joints = chain.len() - 1, "constraint chain created");
    Ok(bone_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Material, Morph, MorphGroup, MorphType, RigidBody, Vertex};

    fn named_bone(name: &str) -> Bone {
        let mut bone = Bone::new();
        bone.name.japanese = name.into();
        bone
    }

    #[test]
    fn test_merge_duplicate_bones_repoints_references() {
        let mut model = Model::new();
        let survivor = named_bone("腕");
        let duplicate = named_bone("腕");
        let (survivor_id, duplicate_id) = (survivor.id(), duplicate.id());
        model.bones.push(survivor).unwrap();
        model.bones.push(duplicate).unwrap();
        let mut child = named_bone("ひじ");
        child.parent_bone = Some(duplicate_id);
        let child_id = child.id();
        model.bones.push(child).unwrap();
        let mut vertex = Vertex::new();
        vertex.set_bdef1(Some(duplicate_id));
        model.vertices.push(vertex).unwrap();
        let mut body = RigidBody::new();
        body.bone = Some(duplicate_id);
        model.rigid_bodies.push(body).unwrap();

        assert_eq!(merge_all_duplicate_bones(&mut model).unwrap(), 1);
        assert_eq!(model.bones.iter().filter(|b| b.name.japanese == "腕").count(), 1);
        assert_eq!(model.bones.get(child_id).unwrap().parent_bone, Some(survivor_id));
        assert_eq!(model.vertices[0].bones[0], Some(survivor_id));
        assert_eq!(model.rigid_bodies[0].bone, Some(survivor_id));
        assert_eq!(model.bones.get(child_id).unwrap().index(), Some(1));
    }

    #[test]
    fn test_unnamed_bones_are_not_merged() {
        let mut model = Model::new();
        model.bones.push(Bone::new()).unwrap();
        model.bones.push(Bone::new()).unwrap();
        assert_eq!(merge_all_duplicate_bones(&mut model).unwrap(), 0);
        assert_eq!(model.bones.len(), 2);
    }

    #[test]
    fn test_merge_duplicate_materials_moves_faces() {
        let mut model = Model::new();
        for (name, count) in [("a", 3), ("b", 3), ("a", 3)] {
            let mut material = Material::new();
            material.name.japanese = name.into();
            material.num_vertex_indices = count;
            model.materials.push(material).unwrap();
        }
        model.vertex_indices = (0..9).collect();
        assert_eq!(merge_all_duplicate_materials(&mut model).unwrap(), 1);
        assert_eq!(model.materials.len(), 2);
        assert_eq!(model.materials[0].num_vertex_indices, 6);
        assert_eq!(model.vertex_indices, vec![0, 1, 2, 6, 7, 8, 3, 4, 5]);
        assert!(model.has_consistent_material_ranges());
    }

    #[test]
    fn test_merge_duplicate_morphs_repoints_groups() {
        let mut model = Model::new();
        let mut first = Morph::new(MorphType::Vertex);
        first.name.japanese = "あ".into();
        let first_id = first.id();
        let mut second = Morph::new(MorphType::Vertex);
        second.name.japanese = "あ".into();
        let second_id = second.id();
        let mut group = Morph::new(MorphType::Group);
        group.name.japanese = "group".into();
        group.items.groups.push(MorphGroup::new(Some(second_id), 1.0)).unwrap();
        model.morphs.push(first).unwrap();
        model.morphs.push(second).unwrap();
        model.morphs.push(group).unwrap();

        assert_eq!(merge_all_duplicate_morphs(&mut model).unwrap(), 1);
        assert_eq!(model.morphs[1].items.groups[0].morph, Some(first_id));
    }

    #[test]
    fn test_normalize_all_vertices() {
        let mut model = Model::new();
        for origin in [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::splat(5.0)] {
            let mut vertex = Vertex::new();
            vertex.origin = origin;
            vertex.normal = Vec3::Y;
            model.vertices.push(vertex).unwrap();
        }
        // the second face has no area
        model.vertex_indices = vec![0, 1, 2, 3, 3, 3];
        assert_eq!(normalize_all_vertices(&mut model), 3);
        for i in 0..3 {
            assert!((model.vertices[i].normal - Vec3::Z).length() < 1e-6);
        }
        assert_eq!(model.vertices[3].normal, Vec3::Y);
    }

    #[test]
    fn test_create_constraint_chain() {
        let mut model = Model::new();
        let mut ids = Vec::new();
        for name in ["右足", "右ひざ", "右足首"] {
            let bone = named_bone(name);
            ids.push(bone.id());
            model.bones.push(bone).unwrap();
        }
        let driver = create_constraint_chain(&mut model, &[ids[0], ids[2], ids[1]]).unwrap();
        assert_eq!(model.bones[3].id(), driver);
        assert_eq!(model.bones[3].name.english, CONSTRAINT_CHAIN_BONE_NAME);
        let constraint = model.constraints.resolve(model.bones[3].constraint).unwrap();
        assert_eq!(constraint.target_bone, Some(driver));
        assert_eq!(constraint.effector_bone, Some(ids[2]));
        assert_eq!(constraint.num_iterations, CONSTRAINT_CHAIN_ITERATIONS);
        let joints: Vec<_> = constraint.joints.iter().map(|j| j.bone).collect();
        assert_eq!(joints, vec![Some(ids[1]), Some(ids[0])]);
        assert!(constraint.joints.iter().all(|j| j.upper_limit == Vec3::ZERO));

        assert!(create_constraint_chain(&mut model, &[ids[0]]).is_err());
        assert_eq!(model.bones.len(), 4);
    }

    #[test]
    fn test_create_root_parent_bone() {
        let mut model = Model::new();
        let center = named_bone("センター");
        let center_id = center.id();
        model.bones.push(center).unwrap();
        let root = create_root_parent_bone(&mut model).unwrap();
        assert_eq!(model.bones[0].id(), root);
        assert_eq!(model.bones[0].target_bone(), Some(center_id));
        assert_eq!(model.bones.get(center_id).unwrap().parent_bone, Some(root));
        assert_eq!(model.bones[0].parent_bone, None);
        let label = model.root_label().unwrap();
        assert_eq!(label.items[0].target.bone(), Some(root));
    }
}
