//! Morph commands.

use std::fmt;

use super::object::CreateCommand;
use super::{new_object_name, CommandContext, UndoCommand};
use crate::model::{
    BoneId, MaterialId, MaterialMorphOperation, Model, ModelObject, Morph, MorphBone,
    MorphCategory, MorphFlip, MorphGroup, MorphId, MorphImpulse, MorphItemId, MorphItems,
    MorphMaterial, MorphType, MorphUv, MorphVertex, Mutable, ObjectArray, RigidBodyId, VertexId,
};
use crate::solver::BoneStates;
use crate::util::{is_null, Error, Quat, Result, Vec3, Vec4, EPSILON};

// ============================================================================
// Create
// ============================================================================

/// New morph named `新規{n}` / `NewMorph{n}`, inserted at `at` (appended when `None`).
pub fn create_morph(model: &Model, at: Option<usize>, morph_type: MorphType) -> CreateCommand<Morph> {
    let mut morph = Morph::new(morph_type);
    morph.name = new_object_name("Morph", model.morphs.len() + 1);
    CreateCommand::new(morph, at)
}

/// New morph deep-copied from `base`, named like [`create_morph`].
pub fn create_morph_from(model: &Model, at: Option<usize>, base: MorphId) -> Result<CreateCommand<Morph>> {
    let base = model
        .morphs
        .get(base)
        .ok_or_else(|| Error::not_found(format!("Morph {:?}", base)))?;
    let mut morph = Mutable::owned(Morph::new(base.morph_type));
    morph.copy_with(base, Morph::copy_from);
    morph.name = new_object_name("Morph", model.morphs.len() + 1);
    Ok(CreateCommand::owned(morph, at))
}

/// Vertex morph moving each vertex of `model` onto the same-position vertex of `target`.
///
/// Vertices are paired by position in their sequences. Only vertices that
/// actually move get an entry. Both languages are named `name`.
pub fn vertex_morph_from_model(model: &Model, target: &Model, name: &str) -> Result<CreateCommand<Morph>> {
    let mut morph = Morph::new(MorphType::Vertex);
    morph.name.japanese = name.to_owned();
    morph.name.english = name.to_owned();
    morph.category = MorphCategory::Other;
    for (vertex, shape) in model.vertices.iter().zip(target.vertices.iter()) {
        let delta = shape.origin - vertex.origin;
        if delta != Vec3::ZERO {
            morph.items.vertices.push(MorphVertex::new(Some(vertex.id()), delta))?;
        }
    }
    Ok(CreateCommand::new(morph, None))
}

/// Bone morph holding the pose of every bone that left its rest pose.
///
/// Each entry keeps the local translation and orientation from `pose`.
/// Both languages are named `name`.
pub fn bone_morph_from_pose(model: &Model, pose: &BoneStates, name: &str) -> Result<CreateCommand<Morph>> {
    let mut morph = Morph::new(MorphType::Bone);
    morph.name.japanese = name.to_owned();
    morph.name.english = name.to_owned();
    morph.category = MorphCategory::Other;
    for bone in &model.bones {
        let Some(state) = pose.get(bone.id()) else { continue };
        let moved = !is_null(state.local_translation, EPSILON);
        let turned = !state.local_orientation.abs_diff_eq(Quat::IDENTITY, EPSILON);
        if moved || turned {
            let mut item = MorphBone::new(Some(bone.id()));
            item.translation = state.local_translation;
            item.orientation = state.local_orientation;
            morph.items.bones.push(item)?;
        }
    }
    tracing::debug!(bones = morph.items.bones.len(), "bone morph from pose");
    Ok(CreateCommand::new(morph, None))
}

// ============================================================================
// Item kinds
// ============================================================================

/// One kind of sub-morph entry, built for a single target object.
pub trait MorphItemKind: ModelObject<Id = MorphItemId> + 'static {
    type Target: Copy + PartialEq + fmt::Debug;

    const NAME: &'static str;

    /// Whether a morph of `morph_type` holds entries of this kind.
    fn accepts(morph_type: MorphType) -> bool;

    fn items(items: &MorphItems) -> &ObjectArray<Self>;

    fn items_mut(items: &mut MorphItems) -> &mut ObjectArray<Self>;

    fn target(&self) -> Option<Self::Target>;

    fn for_target(target: Self::Target) -> Self;

    /// Whether `target` may be added at all.
    fn is_valid_target(_model: &Model, _target: Self::Target) -> bool {
        true
    }
}

macro_rules! morph_item_kind {
    ($item:ty, $target:ty, $name:literal, $field:ident, $slot:ident, |$ty:ident| $accepts:expr, |$t:ident| $build:expr) => {
        impl MorphItemKind for $item {
            type Target = $target;
            const NAME: &'static str = $name;

            fn accepts($ty: MorphType) -> bool {
                $accepts
            }

            fn items(items: &MorphItems) -> &ObjectArray<Self> {
                &items.$field
            }

            fn items_mut(items: &mut MorphItems) -> &mut ObjectArray<Self> {
                &mut items.$field
            }

            fn target(&self) -> Option<$target> {
                self.$slot
            }

            fn for_target($t: $target) -> Self {
                $build
            }
        }
    };
}

morph_item_kind!(MorphVertex, VertexId, "AddVertexToMorph", vertices, vertex,
    |ty| ty == MorphType::Vertex, |t| MorphVertex::new(Some(t), Vec3::ZERO));
morph_item_kind!(MorphUv, VertexId, "AddUvToMorph", uvs, vertex,
    |ty| ty.is_uv(), |t| MorphUv::new(Some(t), Vec4::ZERO));
morph_item_kind!(MorphBone, BoneId, "AddBoneToMorph", bones, bone,
    |ty| ty == MorphType::Bone, |t| MorphBone::new(Some(t)));
morph_item_kind!(MorphMaterial, MaterialId, "AddMaterialToMorph", materials, material,
    |ty| ty == MorphType::Material, |t| MorphMaterial::new(Some(t), MaterialMorphOperation::default()));
morph_item_kind!(MorphFlip, MorphId, "AddFlipToMorph", flips, morph,
    |ty| ty == MorphType::Flip, |t| MorphFlip::new(Some(t), 1.0));
morph_item_kind!(MorphImpulse, RigidBodyId, "AddRigidBodyToMorph", impulses, rigid_body,
    |ty| ty == MorphType::Impulse, |t| MorphImpulse::new(Some(t)));

impl MorphItemKind for MorphGroup {
    type Target = MorphId;
    const NAME: &'static str = "AddGroupToMorph";

    fn accepts(morph_type: MorphType) -> bool {
        morph_type == MorphType::Group
    }

    fn items(items: &MorphItems) -> &ObjectArray<Self> {
        &items.groups
    }

    fn items_mut(items: &mut MorphItems) -> &mut ObjectArray<Self> {
        &mut items.groups
    }

    fn target(&self) -> Option<MorphId> {
        self.morph
    }

    fn for_target(target: MorphId) -> Self {
        MorphGroup::new(Some(target), 1.0)
    }

    /// Group morphs do not nest.
    fn is_valid_target(model: &Model, target: MorphId) -> bool {
        model.morphs.get(target).is_some_and(|m| m.morph_type != MorphType::Group)
    }
}

// ============================================================================
// Add items
// ============================================================================

/// Append one entry per target to a morph.
///
/// Fails when the morph's type does not hold entries of kind `T`. Targets
/// that are invalid for the kind (a group morph inside a group) or already
/// present are skipped.
pub struct AddMorphItemsCommand<T: MorphItemKind> {
    morph: MorphId,
    pending: Vec<T>,
    items: Vec<MorphItemId>,
}

impl<T: MorphItemKind> AddMorphItemsCommand<T> {
    pub fn new(model: &Model, morph: MorphId, targets: &[T::Target]) -> Result<Self> {
        let owner = model
            .morphs
            .get(morph)
            .ok_or_else(|| Error::not_found(format!("Morph {:?}", morph)))?;
        if !T::accepts(owner.morph_type) {
            return Err(Error::invalid(format!(
                "{} does not apply to a {:?} morph",
                T::NAME,
                owner.morph_type
            )));
        }
        let mut pending: Vec<T> = Vec::new();
        for &target in targets {
            let known = T::items(&owner.items).iter().any(|i| i.target() == Some(target))
                || pending.iter().any(|i| i.target() == Some(target));
            if !known && T::is_valid_target(model, target) {
                pending.push(T::for_target(target));
            }
        }
        let items = pending.iter().map(ModelObject::id).collect();
        Ok(Self { morph, pending, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn items_mut<'m>(&self, model: &'m mut Model) -> Result<&'m mut ObjectArray<T>> {
        model
            .morphs
            .get_mut(self.morph)
            .map(|m| T::items_mut(&mut m.items))
            .ok_or_else(|| Error::not_found(format!("Morph {:?}", self.morph)))
    }
}

impl<T: MorphItemKind> UndoCommand for AddMorphItemsCommand<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let items = self.items_mut(cx.model)?;
        for item in self.pending.drain(..) {
            items.push(item)?;
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let items = self.items_mut(cx.model)?;
        for &id in &self.items {
            self.pending.push(items.remove(id)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::{DeleteCommand, MoveCommand, MoveDirection};
    use crate::model::{Bone, Label, LabelItem, Vertex};

    fn morphs() -> (Harness, Vec<MorphId>) {
        let mut harness = Harness::new(Model::new());
        let mut ids = Vec::new();
        for ty in [MorphType::Group, MorphType::Vertex, MorphType::Bone] {
            let mut command = create_morph(&harness.model, None, ty);
            ids.push(command.id());
            harness.redo(&mut command);
        }
        (harness, ids)
    }

    #[test]
    fn test_create_morph_by_type_and_copy() {
        let (mut harness, ids) = morphs();
        assert_eq!(harness.model.morphs[2].name.japanese, "新規3");
        assert_eq!(harness.model.morphs[2].morph_type, MorphType::Bone);

        harness.model.morphs.at_mut(0).unwrap().items.groups.push(MorphGroup::new(Some(ids[1]), 0.5)).unwrap();
        let mut command = create_morph_from(&harness.model, Some(0), ids[0]).unwrap();
        harness.redo(&mut command);
        let copy = &harness.model.morphs[0];
        assert_eq!(copy.name.english, "NewMorph4");
        assert_eq!(copy.morph_type, MorphType::Group);
        assert_eq!(copy.items.groups[0].morph, Some(ids[1]));
    }

    #[test]
    fn test_add_group_items_skips_groups() {
        let (mut harness, ids) = morphs();
        let mut command =
            AddMorphItemsCommand::<MorphGroup>::new(&harness.model, ids[0], &[ids[0], ids[1], ids[2], ids[1]])
                .unwrap();
        assert_eq!(command.len(), 2);
        harness.redo(&mut command);
        assert_eq!(harness.model.morphs[0].num_items(), 2);
        harness.undo(&mut command);
        assert_eq!(harness.model.morphs[0].num_items(), 0);
    }

    #[test]
    fn test_add_items_checks_morph_type() {
        let (harness, ids) = morphs();
        let result = AddMorphItemsCommand::<MorphImpulse>::new(&harness.model, ids[2], &[RigidBodyId::next()]);
        assert!(matches!(result, Err(Error::InvalidStructure(_))));
        let bone = BoneId::next();
        let command = AddMorphItemsCommand::<MorphBone>::new(&harness.model, ids[2], &[bone]).unwrap();
        assert_eq!(command.len(), 1);
    }

    #[test]
    fn test_vertex_morph_from_model() {
        let mut base = Model::new();
        let mut target = Model::new();
        for x in [0.0, 1.0] {
            let mut vertex = Vertex::new();
            vertex.origin = Vec3::new(x, 0.0, 0.0);
            base.vertices.push(vertex.clone()).unwrap();
            vertex.origin.y = x;
            target.vertices.push(vertex).unwrap();
        }
        let mut harness = Harness::new(base);
        let mut command = vertex_morph_from_model(&harness.model, &target, "smile").unwrap();
        harness.redo(&mut command);
        let morph = &harness.model.morphs[0];
        assert_eq!(morph.items.vertices.len(), 1);
        assert_eq!(morph.items.vertices[0].position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(morph.items.vertices[0].vertex, Some(harness.model.vertices[1].id()));
    }

    #[test]
    fn test_bone_morph_from_pose() {
        let mut model = Model::new();
        let mut bone_ids = Vec::new();
        for name in ["首", "頭", "目"] {
            let mut bone = Bone::new();
            bone.name.japanese = name.into();
            bone_ids.push(bone.id());
            model.bones.push(bone).unwrap();
        }
        let mut pose = BoneStates::new(&model);
        pose.get_mut(bone_ids[0]).local_orientation = Quat::from_rotation_y(0.5);
        pose.get_mut(bone_ids[2]).local_translation = Vec3::new(0.0, 0.1, 0.0);

        let mut harness = Harness::new(model);
        let mut command = bone_morph_from_pose(&harness.model, &pose, "nod").unwrap();
        harness.redo(&mut command);
        let morph = &harness.model.morphs[0];
        assert_eq!(morph.morph_type, MorphType::Bone);
        assert_eq!(morph.category, MorphCategory::Other);
        assert_eq!(morph.name.english, "nod");
        let targets: Vec<_> = morph.items.bones.iter().map(|b| b.bone).collect();
        assert_eq!(targets, vec![Some(bone_ids[0]), Some(bone_ids[2])]);
        assert_eq!(morph.items.bones[0].orientation, Quat::from_rotation_y(0.5));
        assert_eq!(morph.items.bones[1].translation, Vec3::new(0.0, 0.1, 0.0));

        harness.undo(&mut command);
        assert!(harness.model.morphs.is_empty());
    }

    #[test]
    fn test_delete_morph_nulls_group_and_label_items() {
        let (mut harness, ids) = morphs();
        harness.model.morphs.at_mut(0).unwrap().items.groups.push(MorphGroup::new(Some(ids[2]), 1.0)).unwrap();
        let mut label = Label::new();
        label.items.push(LabelItem::with_morph(ids[2])).unwrap();
        harness.model.labels.push(label).unwrap();

        let mut command = DeleteCommand::<Morph>::new(ids[2]);
        harness.redo(&mut command);
        assert_eq!(harness.model.morphs[0].items.groups[0].morph, None);
        assert_eq!(harness.model.labels[0].items[0].target.morph(), None);
        harness.undo(&mut command);
        assert_eq!(harness.model.morphs[0].items.groups[0].morph, Some(ids[2]));
        assert_eq!(harness.model.labels[0].items[0].target.morph(), Some(ids[2]));

        let mut command = MoveCommand::<Morph>::new(ids[2], MoveDirection::Top);
        harness.redo(&mut command);
        assert_eq!(harness.model.morphs.ids(), vec![ids[2], ids[0], ids[1]]);
    }
}
