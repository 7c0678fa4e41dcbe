//! Composite commands.

use super::{CommandContext, UndoCommand};
use crate::util::Result;

/// Several commands applied and reverted as one history entry.
///
/// Redo runs the commands in order, undo runs them in reverse. When one of
/// them fails part way, the ones already run are rolled back before the
/// error is returned.
pub struct BatchCommand {
    name: &'static str,
    commands: Vec<Box<dyn UndoCommand>>,
}

impl BatchCommand {
    pub fn new(name: &'static str, commands: Vec<Box<dyn UndoCommand>>) -> Self {
        Self { name, commands }
    }

    /// Wrap `commands` only when there is more than one; `None` when empty.
    pub fn combine(name: &'static str, mut commands: Vec<Box<dyn UndoCommand>>) -> Option<Box<dyn UndoCommand>> {
        match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(Box::new(Self::new(name, commands))),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl UndoCommand for BatchCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        for i in 0..self.commands.len() {
            if let Err(error) = self.commands[i].redo(cx) {
                for command in self.commands[..i].iter_mut().rev() {
                    if let Err(rollback) = command.undo(cx) {
                        tracing::warn!(command = command.name(), %rollback, "batch rollback failed");
                    }
                }
                return Err(error);
            }
        }
        tracing::debug!(commands = self.commands.len(), "batch applied");
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let count = self.commands.len();
        for i in (0..count).rev() {
            if let Err(error) = self.commands[i].undo(cx) {
                for command in self.commands[i + 1..].iter_mut() {
                    if let Err(rollback) = command.redo(cx) {
                        tracing::warn!(command = command.name(), %rollback, "batch rollback failed");
                    }
                }
                return Err(error);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::{create_bone, create_label, create_rigid_body, DeleteCommand, UndoStack};
    use crate::model::{Bone, Model, ModelObject};

    #[test]
    fn test_batch_is_one_history_entry() {
        let mut harness = Harness::new(Model::new());
        let bone = create_bone(&harness.model, None, None).unwrap();
        let label = create_label(&harness.model);
        let commands: Vec<Box<dyn UndoCommand>> = vec![Box::new(bone), Box::new(label)];
        let batch = BatchCommand::new("CreateBoneWithLabel", commands);
        assert_eq!(batch.len(), 2);

        let mut stack = UndoStack::default();
        stack.push(Box::new(batch), &mut harness.cx()).unwrap();
        assert_eq!(harness.model.bones.len(), 1);
        assert_eq!(harness.model.labels.len(), 1);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.undo_name(), Some("CreateBoneWithLabel"));

        assert!(stack.undo(&mut harness.cx()).unwrap());
        assert!(harness.model.bones.is_empty());
        assert!(harness.model.labels.is_empty());
        assert!(stack.redo(&mut harness.cx()).unwrap());
        assert_eq!(harness.model.bones.len(), 1);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut harness = Harness::new(Model::new());
        let body = create_rigid_body(&harness.model);
        let missing = DeleteCommand::<Bone>::new(Bone::new().id());
        let commands: Vec<Box<dyn UndoCommand>> = vec![Box::new(body), Box::new(missing)];
        let mut batch = BatchCommand::new("Broken", commands);
        assert!(batch.redo(&mut harness.cx()).is_err());
        assert!(harness.model.rigid_bodies.is_empty());
        assert_eq!(harness.physics.live_count(), 0);
    }

    #[test]
    fn test_combine() {
        let model = Model::new();
        assert!(BatchCommand::combine("Empty", Vec::new()).is_none());
        let single: Vec<Box<dyn UndoCommand>> = vec![Box::new(create_label(&model))];
        let single = BatchCommand::combine("Single", single).unwrap();
        assert_eq!(single.name(), "CreateLabel");
        let pair: Vec<Box<dyn UndoCommand>> =
            vec![Box::new(create_label(&model)), Box::new(create_rigid_body(&model))];
        assert_eq!(BatchCommand::combine("Pair", pair).unwrap().name(), "Pair");
    }
}
