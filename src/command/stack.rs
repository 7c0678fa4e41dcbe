//! Bounded undo/redo history.

use super::{CommandContext, UndoCommand};
use crate::util::Result;

/// Default number of commands kept for undo.
pub const DEFAULT_UNDO_LIMIT: usize = 256;

/// Undo/redo history of executed commands.
pub struct UndoStack {
    undo: Vec<Box<dyn UndoCommand>>,
    redo: Vec<Box<dyn UndoCommand>>,
    limit: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo", &self.undo.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("redo", &self.redo.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("limit", &self.limit)
            .finish()
    }
}

impl UndoStack {
    /// Stack keeping at most `limit` undoable commands (at least one).
    pub fn new(limit: usize) -> Self {
        Self { undo: Vec::new(), redo: Vec::new(), limit: limit.max(1) }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Execute a command and record it. Clears the redo history.
    ///
    /// A command whose first execution fails is not recorded.
    pub fn push(&mut self, mut command: Box<dyn UndoCommand>, cx: &mut CommandContext<'_>) -> Result<()> {
        command.redo(cx)?;
        tracing::debug!(command = command.name(), "executed");
        self.redo.clear();
        self.undo.push(command);
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
        Ok(())
    }

    /// Revert the last command. Returns `false` when there is nothing to undo.
    ///
    /// A command that fails to undo is dropped from the history.
    pub fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut command) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.undo(cx) {
            tracing::warn!(command = command.name(), error = %e, "undo failed");
            self.redo.clear();
            return Err(e);
        }
        tracing::debug!(command = command.name(), "undone");
        self.redo.push(command);
        Ok(true)
    }

    /// Re-apply the last undone command. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut command) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.redo(cx) {
            tracing::warn!(command = command.name(), error = %e, "redo failed");
            self.redo.clear();
            return Err(e);
        }
        tracing::debug!(command = command.name(), "redone");
        self.undo.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Name of the command [`undo`](Self::undo) would revert.
    pub fn undo_name(&self) -> Option<&'static str> {
        self.undo.last().map(|c| c.name())
    }

    pub fn redo_name(&self) -> Option<&'static str> {
        self.redo.last().map(|c| c.name())
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
