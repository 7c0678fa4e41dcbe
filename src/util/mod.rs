//! Utility types and functions for model editing.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus solver helpers
//! - Name width helpers used by the validator

mod error;
mod math;
mod text;

pub use error::*;
pub use math::*;
pub use text::*;
