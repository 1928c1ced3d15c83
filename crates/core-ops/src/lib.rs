//! Edit-transformation algebra over document bodies.
//!
//! Actions (`Retain`, `Insert`, `Delete`) walk a body's data stream with a
//! single cursor. The free functions here are the whole engine:
//!
//! * [`apply`] runs a list against a body and returns the new body together
//!   with the list that undoes it;
//! * [`invert`] computes that undo list from the pre-edit body alone;
//! * [`compose`] folds two sequential lists into one.
//!
//! None of them keep state between calls.

pub mod action;
pub mod apply;
pub mod compose;
pub mod error;
pub mod expand;
pub mod format;
pub mod invert;

pub use action::{Action, ActionList, Bias, Delete, Insert, MAIN_SEGMENT, Retain};
pub use apply::{Applied, apply};
pub use compose::{compose, compose_all};
pub use error::{ApplyError, LengthMismatchError, MalformedActionError};
pub use expand::expand_custom_range_deletes;
pub use format::{CoverType, FormatPatch, ParagraphPatch, RunPatch};
pub use invert::invert;
