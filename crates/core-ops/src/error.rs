//! Failure taxonomy of the edit-transformation engine.
//!
//! Neither error is retried: both indicate that whoever built the action
//! list made a mistake (or worked from a stale selection), so the mutation
//! is aborted and nothing reaches the undo stacks.

use core_text::BodyError;
use thiserror::Error;

/// An action whose declared shape disagrees with its payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedActionError {
    #[error("insert declares length {declared} but its body holds {actual} characters")]
    InsertLength { declared: usize, actual: usize },
    #[error("insert body is invalid: {0}")]
    InvalidInsertBody(#[from] BodyError),
    #[error("retain format reaches offset {extent} but the retain covers {len}")]
    FormatOutOfSpan { extent: usize, len: usize },
    #[error("action list mixes segment {expected:?} with {found:?}")]
    MixedSegments { expected: String, found: String },
}

/// The list consumes more of the stream than the body holds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("action list consumes {consumed} characters but the body holds {len}")]
pub struct LengthMismatchError {
    pub consumed: usize,
    pub len: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error(transparent)]
    Malformed(#[from] MalformedActionError),
    #[error(transparent)]
    LengthMismatch(#[from] LengthMismatchError),
    #[error("unit {0:?} is not open")]
    UnknownUnit(String),
    #[error("segment {0:?} does not exist in this unit")]
    UnknownSegment(String),
}
