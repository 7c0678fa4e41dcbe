//! Label commands.

use super::object::{reference, CreateCommand};
use super::{new_object_name, CommandContext, UndoCommand};
use crate::model::{
    BoneId, Label, LabelId, LabelItem, LabelItemId, LabelTarget, LocalizedName, Model,
    ModelObject, MorphId, ObjectArray,
};
use crate::util::{Error, Result};

/// New label named `新規{n}` / `NewLabel{n}`, appended.
pub fn create_label(model: &Model) -> CreateCommand<Label> {
    let mut label = Label::new();
    label.name = new_object_name("Label", model.labels.len() + 1);
    CreateCommand::new(label, None)
}

/// New label holding `bones` in sequence order, named `Label{n}` after its index.
pub fn create_label_from_bones(model: &Model, bones: &[BoneId]) -> Result<CreateCommand<Label>> {
    label_from(model, &model.bones, bones, |b| LabelTarget::Bone(Some(b)))
}

/// New label holding `morphs` in sequence order, named like [`create_label_from_bones`].
pub fn create_label_from_morphs(model: &Model, morphs: &[MorphId]) -> Result<CreateCommand<Label>> {
    label_from(model, &model.morphs, morphs, |m| LabelTarget::Morph(Some(m)))
}

fn label_from<T: ModelObject>(
    model: &Model,
    array: &ObjectArray<T>,
    ids: &[T::Id],
    target: impl Fn(T::Id) -> LabelTarget,
) -> Result<CreateCommand<Label>> {
    let mut positions = ids
        .iter()
        .map(|&id| {
            array
                .position(id)
                .ok_or_else(|| Error::not_found(format!("{} {:?}", T::KIND, id)))
        })
        .collect::<Result<Vec<_>>>()?;
    positions.sort_unstable();
    positions.dedup();

    let mut label = Label::new();
    let name = format!("Label{}", model.labels.len());
    label.name = LocalizedName::new(name.clone(), name);
    for id in positions.into_iter().filter_map(|p| array.id_at(p)) {
        label.items.push(LabelItem::new(target(id)))?;
    }
    Ok(CreateCommand::new(label, None))
}

/// Append bone or morph items to a label.
///
/// Targets the label already contains are skipped.
pub struct AddLabelItemsCommand {
    label: LabelId,
    name: &'static str,
    pending: Vec<LabelItem>,
    items: Vec<LabelItemId>,
}

impl AddLabelItemsCommand {
    pub fn bones(model: &Model, label: LabelId, bones: &[BoneId]) -> Result<Self> {
        let targets = bones.iter().map(|&b| LabelTarget::Bone(Some(b)));
        Self::new(model, label, "AddBoneToLabel", targets)
    }

    pub fn morphs(model: &Model, label: LabelId, morphs: &[MorphId]) -> Result<Self> {
        let targets = morphs.iter().map(|&m| LabelTarget::Morph(Some(m)));
        Self::new(model, label, "AddMorphToLabel", targets)
    }

    fn new(
        model: &Model,
        label: LabelId,
        name: &'static str,
        targets: impl Iterator<Item = LabelTarget>,
    ) -> Result<Self> {
        let owner = model
            .labels
            .get(label)
            .ok_or_else(|| Error::not_found(format!("Label {:?}", label)))?;
        let mut pending: Vec<LabelItem> = Vec::new();
        for target in targets {
            let known = owner.items.iter().chain(pending.iter()).any(|i| i.target == target);
            if !known {
                pending.push(LabelItem::new(target));
            }
        }
        let items = pending.iter().map(ModelObject::id).collect();
        Ok(Self { label, name, pending, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl UndoCommand for AddLabelItemsCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let mut label = reference::<Label>(cx.model, self.label)?;
        for item in self.pending.drain(..) {
            label.items.push(item)?;
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let mut label = reference::<Label>(cx.model, self.label)?;
        for &id in &self.items {
            self.pending.push(label.items.remove(id)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::{DeleteCommand, MoveCommand, MoveDirection};
    use crate::model::{Bone, Morph, MorphType};

    #[test]
    fn test_label_create_and_items() {
        let mut harness = Harness::new(Model::new());
        let bone = Bone::new();
        let bone_id = bone.id();
        harness.model.bones.push(bone).unwrap();

        let mut create = create_label(&harness.model);
        let label = create.id();
        harness.redo(&mut create);
        assert_eq!(harness.model.labels[0].name.japanese, "新規1");

        let mut add = AddLabelItemsCommand::bones(&harness.model, label, &[bone_id, bone_id]).unwrap();
        assert_eq!(add.len(), 1);
        harness.redo(&mut add);
        assert!(harness.model.labels[0].contains_bone(bone_id));
        let again = AddLabelItemsCommand::bones(&harness.model, label, &[bone_id]).unwrap();
        assert!(again.is_empty());
        harness.undo(&mut add);
        assert!(harness.model.labels[0].items.is_empty());

        let morph = MorphId::next();
        let mut add = AddLabelItemsCommand::morphs(&harness.model, label, &[morph]).unwrap();
        harness.redo(&mut add);
        assert!(harness.model.labels[0].contains_morph(morph));
    }

    #[test]
    fn test_label_from_bones_sorted() {
        let mut harness = Harness::new(Model::new());
        let mut ids = Vec::new();
        for _ in 0..3 {
            let bone = Bone::new();
            ids.push(bone.id());
            harness.model.bones.push(bone).unwrap();
        }
        harness.model.labels.push(Label::new()).unwrap();

        let mut create = create_label_from_bones(&harness.model, &[ids[2], ids[0], ids[2]]).unwrap();
        harness.redo(&mut create);
        let label = &harness.model.labels[1];
        assert_eq!(label.name.japanese, "Label1");
        assert_eq!(label.name.english, "Label1");
        let targets: Vec<_> = label.items.iter().map(|i| i.target.bone()).collect();
        assert_eq!(targets, vec![Some(ids[0]), Some(ids[2])]);

        harness.undo(&mut create);
        assert_eq!(harness.model.labels.len(), 1);
        assert!(create_label_from_bones(&harness.model, &[Bone::new().id()]).is_err());
    }

    #[test]
    fn test_label_from_morphs() {
        let mut harness = Harness::new(Model::new());
        let morph = Morph::new(MorphType::Vertex);
        let morph_id = morph.id();
        harness.model.morphs.push(morph).unwrap();
        let mut create = create_label_from_morphs(&harness.model, &[morph_id]).unwrap();
        harness.redo(&mut create);
        assert_eq!(harness.model.labels[0].name.japanese, "Label0");
        assert_eq!(harness.model.labels[0].items[0].target.morph(), Some(morph_id));
    }

    #[test]
    fn test_label_delete_and_move() {
        let mut harness = Harness::new(Model::new());
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut create = create_label(&harness.model);
            ids.push(create.id());
            harness.redo(&mut create);
        }
        let mut bottom = MoveCommand::<Label>::new(ids[0], MoveDirection::Bottom);
        harness.redo(&mut bottom);
        assert_eq!(harness.model.labels.ids(), vec![ids[1], ids[2], ids[0]]);

        let mut delete = DeleteCommand::<Label>::from_index(&harness.model, 0).unwrap();
        harness.redo(&mut delete);
        assert_eq!(harness.model.labels.ids(), vec![ids[2], ids[0]]);
        harness.undo(&mut delete);
        harness.undo(&mut bottom);
        assert_eq!(harness.model.labels.ids(), ids);
    }
}
