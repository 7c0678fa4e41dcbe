//! Create, delete and move shared by every named object kind.

use super::{CommandContext, UndoCommand};
use crate::model::{
    resolver, Bone, BoneSite, Constraint, DetachedRecords, Label, Model, ModelObject, Morph,
    MorphSite, Mutable, NamedObject, ObjectArray, ObjectId,
};
use crate::util::{Error, Result};

// ============================================================================
// Object kinds
// ============================================================================

/// Command names of one object kind.
#[derive(Debug, Clone, Copy)]
pub struct CommandNames {
    pub create: &'static str,
    pub delete: &'static str,
    pub move_up: &'static str,
    pub move_down: &'static str,
    pub move_to_top: &'static str,
    pub move_to_bottom: &'static str,
}

/// A named kind stored in its own top-level sequence of the model.
pub trait DocumentObject: NamedObject + 'static {
    const NAMES: CommandNames;

    fn object_id(id: Self::Id) -> ObjectId;

    fn sequence(model: &Model) -> &ObjectArray<Self>;

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self>;

    /// Runs after the object entered the document.
    fn on_linked(_cx: &mut CommandContext<'_>, _id: Self::Id) -> Result<()> {
        Ok(())
    }

    /// Runs before the object leaves the document.
    fn on_unlinked(_cx: &mut CommandContext<'_>, _id: Self::Id) {}

    /// Recompute runtime data derived from this kind's sequence.
    fn refresh(_model: &mut Model) {}
}

/// Kinds whose deletion has to detach references held by other objects.
pub trait Deletable: DocumentObject {
    /// Whatever `detach` changed, enough for `reattach` to undo it.
    type Sites: Default;

    fn detach(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<Self::Sites>;

    fn reattach(cx: &mut CommandContext<'_>, sites: Self::Sites, id: Self::Id) -> Result<()>;
}

macro_rules! command_names {
    ($kind:literal) => {
        CommandNames {
            create: concat!("Create", $kind),
            delete: concat!("Delete", $kind),
            move_up: concat!("Move", $kind, "Up"),
            move_down: concat!("Move", $kind, "Down"),
            move_to_top: concat!("Move", $kind, "ToTop"),
            move_to_bottom: concat!("Move", $kind, "ToBottom"),
        }
    };
}
pub(crate) use command_names;

/// Refresh derived data and tell the observer positions changed.
pub(crate) fn structure_changed<T: DocumentObject>(cx: &mut CommandContext<'_>) {
    T::refresh(cx.model);
    cx.model.rebuild_name_caches();
    cx.observer.rebuild_all_tracks();
}

fn missing<T: ModelObject>(id: T::Id) -> Error {
    Error::not_found(format!("{} {:?}", T::KIND, id))
}

/// Reference handle over an object already in the document.
pub fn reference<T: DocumentObject>(model: &mut Model, id: T::Id) -> Result<Mutable<'_, T>> {
    T::sequence_mut(model)
        .get_mut(id)
        .map(Mutable::reference)
        .ok_or_else(|| missing::<T>(id))
}

// ============================================================================
// Create
// ============================================================================

/// Insert a new object. Undo takes it back out and keeps it for redo.
///
/// While unlinked the object sits in an owning [`Mutable`] handle.
pub struct CreateCommand<T: DocumentObject> {
    id: T::Id,
    at: Option<usize>,
    pending: Option<Mutable<'static, T>>,
    records: DetachedRecords,
}

impl<T: DocumentObject> CreateCommand<T> {
    /// Insert `object` at `at`, or append when `None`.
    pub fn new(object: T, at: Option<usize>) -> Self {
        Self::owned(Mutable::owned(object), at)
    }

    /// Insert the object held by an owning handle.
    pub fn owned(handle: Mutable<'static, T>, at: Option<usize>) -> Self {
        Self { id: handle.id(), at, pending: Some(handle), records: DetachedRecords::default() }
    }

    /// Id of the object this command creates.
    pub fn id(&self) -> T::Id {
        self.id
    }
}

impl<T: DocumentObject> UndoCommand for CreateCommand<T> {
    fn name(&self) -> &'static str {
        T::NAMES.create
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let handle = self
            .pending
            .take()
            .ok_or_else(|| Error::already_exists(format!("{} {:?}", T::KIND, self.id)))?;
        let position = handle.insert_into(T::sequence_mut(cx.model), self.at)?;
        let records = std::mem::take(&mut self.records);
        cx.model.extensions.restore(T::object_id(self.id), records);
        T::on_linked(cx, self.id)?;
        structure_changed::<T>(cx);
        tracing::debug!(kind = T::KIND, position, "created");
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        T::on_unlinked(cx, self.id);
        let object = T::sequence_mut(cx.model).remove(self.id)?;
        self.records = cx.model.extensions.take(T::object_id(self.id));
        self.pending = Some(Mutable::owned(object));
        cx.observer.clear_active_if_equals(T::object_id(self.id));
        structure_changed::<T>(cx);
        Ok(())
    }
}

// ============================================================================
// Delete
// ============================================================================

/// Remove an object and null every reference to it.
pub struct DeleteCommand<T: Deletable> {
    id: T::Id,
    index: usize,
    removed: Option<T>,
    sites: T::Sites,
    records: DetachedRecords,
}

impl<T: Deletable> DeleteCommand<T> {
    pub fn new(id: T::Id) -> Self {
        Self {
            id,
            index: 0,
            removed: None,
            sites: T::Sites::default(),
            records: DetachedRecords::default(),
        }
    }

    /// Delete the object currently at `index`.
    pub fn from_index(model: &Model, index: usize) -> Result<Self> {
        let sequence = T::sequence(model);
        let id = sequence
            .id_at(index)
            .ok_or(Error::IndexOutOfBounds { index, count: sequence.len() })?;
        Ok(Self::new(id))
    }
}

impl<T: Deletable> UndoCommand for DeleteCommand<T> {
    fn name(&self) -> &'static str {
        T::NAMES.delete
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let index = T::sequence(cx.model).position(self.id).ok_or_else(|| missing::<T>(self.id))?;
        self.sites = T::detach(cx, self.id)?;
        T::on_unlinked(cx, self.id);
        self.records = cx.model.extensions.take(T::object_id(self.id));
        let object = T::sequence_mut(cx.model).remove(self.id)?;
        self.index = index;
        self.removed = Some(object);
        cx.observer.clear_active_if_equals(T::object_id(self.id));
        structure_changed::<T>(cx);
        tracing::debug!(kind = T::KIND, index, "deleted");
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let object = self.removed.take().ok_or_else(|| missing::<T>(self.id))?;
        T::sequence_mut(cx.model).insert(object, Some(self.index))?;
        let records = std::mem::take(&mut self.records);
        cx.model.extensions.restore(T::object_id(self.id), records);
        T::on_linked(cx, self.id)?;
        let sites = std::mem::take(&mut self.sites);
        T::reattach(cx, sites, self.id)?;
        structure_changed::<T>(cx);
        Ok(())
    }
}

// ============================================================================
// Move
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
    Top,
    Bottom,
}

impl MoveDirection {
    /// Target position of an element at `from` in a sequence of `len`.
    pub fn target(self, from: usize, len: usize) -> usize {
        let last = len.saturating_sub(1);
        match self {
            Self::Up => from.saturating_sub(1),
            Self::Down => (from + 1).min(last),
            Self::Top => 0,
            Self::Bottom => last,
        }
    }
}

/// Move an object inside its sequence. Moving past either end is a no-op.
pub struct MoveCommand<T: DocumentObject> {
    id: T::Id,
    direction: MoveDirection,
    from: Option<usize>,
}

impl<T: DocumentObject> MoveCommand<T> {
    pub fn new(id: T::Id, direction: MoveDirection) -> Self {
        Self { id, direction, from: None }
    }
}

impl<T: DocumentObject> UndoCommand for MoveCommand<T> {
    fn name(&self) -> &'static str {
        match self.direction {
            MoveDirection::Up => T::NAMES.move_up,
            MoveDirection::Down => T::NAMES.move_down,
            MoveDirection::Top => T::NAMES.move_to_top,
            MoveDirection::Bottom => T::NAMES.move_to_bottom,
        }
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let sequence = T::sequence_mut(cx.model);
        let from = sequence.position(self.id).ok_or_else(|| missing::<T>(self.id))?;
        let to = self.direction.target(from, sequence.len());
        self.from = Some(from);
        if to != from {
            sequence.move_to(from, to)?;
            structure_changed::<T>(cx);
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let Some(from) = self.from.take() else {
            return Ok(());
        };
        let sequence = T::sequence_mut(cx.model);
        let current = sequence.position(self.id).ok_or_else(|| missing::<T>(self.id))?;
        if current != from {
            sequence.move_to(current, from)?;
            structure_changed::<T>(cx);
        }
        Ok(())
    }
}

// ============================================================================
// Bone, Morph, Label
// ============================================================================

impl DocumentObject for Bone {
    const NAMES: CommandNames = command_names!("Bone");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.bones
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.bones
    }
}

/// What deleting a bone took out of the document.
#[derive(Default)]
pub struct BoneDeletion {
    sites: Vec<BoneSite>,
    constraint: Option<(usize, Constraint, DetachedRecords)>,
}

impl Deletable for Bone {
    type Sites = BoneDeletion;

    fn detach(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<BoneDeletion> {
        let sites = resolver::replace_bone_references(cx.model, id, None);
        let owned = cx.model.bones.get(id).and_then(|b| b.constraint);
        let constraint = match owned.and_then(|c| cx.model.constraints.position(c).map(|i| (c, i))) {
            Some((constraint_id, index)) => {
                let records = cx.model.extensions.take(constraint_id);
                let constraint = cx.model.constraints.remove(constraint_id)?;
                Some((index, constraint, records))
            }
            None => None,
        };
        Ok(BoneDeletion { sites, constraint })
    }

    fn reattach(cx: &mut CommandContext<'_>, deletion: BoneDeletion, id: Self::Id) -> Result<()> {
        // Constraint sites point into the owned constraint, so it goes back first.
        if let Some((index, constraint, records)) = deletion.constraint {
            let constraint_id = constraint.id();
            cx.model.constraints.insert(constraint, Some(index))?;
            cx.model.extensions.restore(constraint_id, records);
        }
        resolver::restore_bone_references(cx.model, &deletion.sites, id);
        Ok(())
    }
}

impl DocumentObject for Morph {
    const NAMES: CommandNames = command_names!("Morph");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.morphs
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.morphs
    }
}

impl Deletable for Morph {
    type Sites = Vec<MorphSite>;

    fn detach(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<Vec<MorphSite>> {
        Ok(resolver::replace_morph_references(cx.model, id, None))
    }

    fn reattach(cx: &mut CommandContext<'_>, sites: Vec<MorphSite>, id: Self::Id) -> Result<()> {
        resolver::restore_morph_references(cx.model, &sites, id);
        Ok(())
    }
}

impl DocumentObject for Label {
    const NAMES: CommandNames = command_names!("Label");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.labels
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.labels
    }
}

impl Deletable for Label {
    type Sites = ();

    fn detach(_cx: &mut CommandContext<'_>, _id: Self::Id) -> Result<()> {
        Ok(())
    }

    fn reattach(_cx: &mut CommandContext<'_>, _sites: (), _id: Self::Id) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::Selection;
    use crate::model::LocalizedName;

    #[test]
    fn test_delete_selected_bone_clears_selection() {
        let mut harness = Harness::new(Model::new());
        let bone = Bone::new();
        let bone_id = bone.id();
        harness.model.bones.push(bone).unwrap();
        harness.selection = Selection::with_active(bone_id);

        let mut delete = DeleteCommand::<Bone>::new(bone_id);
        harness.redo(&mut delete);
        assert!(harness.selection.active.is_none());
        assert_eq!(harness.selection.track_rebuilds, 1);
        harness.undo(&mut delete);
        assert_eq!(harness.model.bones.ids(), vec![bone_id]);
        assert_eq!(harness.selection.track_rebuilds, 2);
    }

    #[test]
    fn test_create_from_owned_handle() {
        let mut harness = Harness::new(Model::new());
        let mut source = Bone::new();
        source.name = LocalizedName::new("頭", "head");
        harness.model.bones.push(source.clone()).unwrap();

        let mut handle = Mutable::<Bone>::create();
        handle.copy_with(&source, Bone::copy_from);
        let mut create = CreateCommand::owned(handle, Some(0));
        let id = create.id();
        assert_ne!(id, source.id());
        harness.redo(&mut create);
        assert_eq!(harness.model.bones.position(id), Some(0));
        assert_eq!(harness.model.bones[0].name.english, "head");

        harness.undo(&mut create);
        assert!(!harness.model.bones.contains(id));
        harness.redo(&mut create);
        assert!(harness.model.bones.contains(id));
    }

    #[test]
    fn test_reference_handle_edits_in_place() {
        let mut model = Model::new();
        let bone = Bone::new();
        let id = bone.id();
        model.bones.push(bone).unwrap();
        {
            let mut handle = reference::<Bone>(&mut model, id).unwrap();
            assert!(!handle.is_owned());
            handle.name.japanese = "首".into();
        }
        assert_eq!(model.bones[0].name.japanese, "首");
        assert!(reference::<Bone>(&mut model, Bone::new().id()).is_err());
    }
}
