//! Reversible document edits.
//!
//! Every structural edit is an [`UndoCommand`]. A command holds only the
//! ids it needs to find its target plus whatever it detached from the
//! document, so it can be replayed after [`Model::reload`] (which keeps ids).
//! [`UndoStack`] runs commands and keeps the undo/redo history.
//!
//! ## Modules
//!
//! - `object` - create/delete/move shared by every named kind
//! - `material` - create, delete with run splicing, move, copy from another model
//! - `bone` - create variants, constraint joints
//! - `morph` - create, from another model or a pose, add sub-morph entries
//! - `label` - create, from a bone or morph selection, add bone/morph items
//! - `physics` - rigid body, joint and soft body hooks, intermediate joints
//! - `batch` - several commands as one history entry
//! - `stack` - the undo stack

mod batch;
mod bone;
mod label;
mod material;
mod morph;
mod object;
mod physics;
mod stack;

pub use batch::*;
pub use bone::*;
pub use label::*;
pub use material::*;
pub use morph::*;
pub use object::*;
pub use physics::*;
pub use stack::*;

use crate::model::{LocalizedName, Model, ObjectId};
use crate::physics::PhysicsEngine;
use crate::util::Result;

/// Japanese prefix of generated object names.
pub const NEW_OBJECT_PREFIX: &str = "新規";

/// A reversible edit.
pub trait UndoCommand {
    /// Stable command name.
    fn name(&self) -> &'static str;

    /// Apply (or re-apply) the edit.
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()>;

    /// Revert the edit.
    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()>;
}

/// Selection and track state outside the document.
pub trait DocumentObserver {
    /// Drop the active selection when it points at `object`.
    fn clear_active_if_equals(&mut self, object: ObjectId);

    /// Recompute anything indexed by object position.
    fn rebuild_all_tracks(&mut self);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl DocumentObserver for NullObserver {
    fn clear_active_if_equals(&mut self, _object: ObjectId) {}

    fn rebuild_all_tracks(&mut self) {}
}

/// Minimal selection model: one active object and a rebuild counter.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub active: Option<ObjectId>,
    pub track_rebuilds: usize,
}

impl Selection {
    pub fn with_active(object: impl Into<ObjectId>) -> Self {
        Self { active: Some(object.into()), track_rebuilds: 0 }
    }
}

impl DocumentObserver for Selection {
    fn clear_active_if_equals(&mut self, object: ObjectId) {
        if self.active == Some(object) {
            self.active = None;
        }
    }

    fn rebuild_all_tracks(&mut self) {
        self.track_rebuilds += 1;
    }
}

/// Everything a command touches while it runs.
pub struct CommandContext<'a> {
    pub model: &'a mut Model,
    pub observer: &'a mut dyn DocumentObserver,
    pub physics: &'a mut dyn PhysicsEngine,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        model: &'a mut Model,
        observer: &'a mut dyn DocumentObserver,
        physics: &'a mut dyn PhysicsEngine,
    ) -> Self {
        Self { model, observer, physics }
    }
}

/// `新規{n}` / `New{Kind}{n}` for the object about to become the `n`th.
pub fn new_object_name(kind: &str, n: usize) -> LocalizedName {
    LocalizedName::new(format!("{}{}", NEW_OBJECT_PREFIX, n), format!("New{}{}", kind, n))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::physics::NullPhysicsEngine;

    /// Model plus the collaborators a command needs.
    pub struct Harness {
        pub model: Model,
        pub selection: Selection,
        pub physics: NullPhysicsEngine,
    }

    impl Harness {
        pub fn new(model: Model) -> Self {
            Self { model, selection: Selection::default(), physics: NullPhysicsEngine::new() }
        }

        pub fn cx(&mut self) -> CommandContext<'_> {
            CommandContext::new(&mut self.model, &mut self.selection, &mut self.physics)
        }

        pub fn redo(&mut self, command: &mut dyn UndoCommand) {
            command.redo(&mut self.cx()).unwrap();
        }

        pub fn undo(&mut self, command: &mut dyn UndoCommand) {
            command.undo(&mut self.cx()).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bone, ModelObject};

    #[test]
    fn test_selection_clears_matching_only() {
        let bone = Bone::new();
        let other = Bone::new();
        let mut selection = Selection::with_active(bone.id());
        selection.clear_active_if_equals(other.id().into());
        assert!(selection.active.is_some());
        selection.clear_active_if_equals(bone.id().into());
        assert!(selection.active.is_none());
    }

    #[test]
    fn test_new_object_name() {
        let name = new_object_name("Bone", 3);
        assert_eq!(name.japanese, "新規3");
        assert_eq!(name.english, "NewBone3");
    }
}
