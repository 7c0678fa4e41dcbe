//! # pmx-edit
//!
//! Document mutation engine for rigged PMX character models.
//!
//! A [`Model`](model::Model) owns ordered sequences of vertices, materials,
//! bones, morphs, labels, rigid bodies, joints and soft bodies. Every object
//! carries a stable id, so edits survive reordering and a serialize-and-reload
//! cycle. Structural edits go through undoable commands that keep
//! cross-references and the per-material vertex-index runs consistent.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math re-exports and name width helpers
//! - [`codec`] - PMX 2.0/2.1 binary reader and writer over a [`Buffer`](codec::Buffer)
//! - [`model`] - Object store, typed ids, ordered arrays and the reference resolver
//! - [`command`] - Undoable create/delete/move/copy commands and the undo stack
//! - [`solver`] - Axis-angle IK solver
//! - [`validator`] - Diagnostics over a whole model
//! - [`physics`] - Simulation engine seam
//! - [`config`] - Persistent settings
//!
//! ## Example
//!
//! ```ignore
//! use pmx_edit::prelude::*;
//!
//! let mut model = Model::open("miku.pmx")?;
//! let mut stack = UndoStack::default();
//! let mut selection = Selection::default();
//! let mut physics = NullPhysicsEngine::new();
//! let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);
//! let delete = DeleteMaterialCommand::from_index(cx.model, 1)?;
//! stack.push(Box::new(delete), &mut cx)?;
//! stack.undo(&mut cx)?;
//! ```

pub mod util;
pub mod codec;
pub mod model;
pub mod command;
pub mod solver;
pub mod validator;
pub mod physics;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};
pub use model::Model;
pub use config::Settings;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::codec::{Buffer, Codec};
    pub use crate::model::*;
    pub use crate::command::*;
    pub use crate::solver::{solve_axis_angle, solve_constraint, AxisAngleOutcome, BoneStates};
    pub use crate::validator::{Diagnostic, Severity, SeverityMask, Validator};
    pub use crate::physics::{NullPhysicsEngine, PhysicsEngine};
    pub use crate::config::Settings;
}
