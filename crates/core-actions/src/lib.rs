//! Command layer: turns user intents into mutations and records them for undo.
//!
//! Entry points:
//! * [`Editor`] owns the state, the IME manager and the registry, and runs
//!   commands by id with JSON params.
//! * [`commands`] holds the pure builders (selection + body -> action list).
//! * [`CommandRegistry`] maps command ids to handlers; custom commands can be
//!   registered next to the built-in ones.

use core_ops::{ApplyError, MalformedActionError};
use thiserror::Error;

pub mod commands;
pub mod dispatcher;
mod editor;
pub mod ime;

pub use commands::{EditPlan, FormatRequest};
pub use dispatcher::{CommandContext, CommandHandler, CommandOutput, CommandRegistry};
pub use editor::Editor;
pub use ime::{ImeCompositionManager, ImeState, SessionEnd};

/// Command and mutation ids.
pub mod ids {
    pub const RICH_TEXT_EDITING: &str = "doc.mutation.rich-text-editing";
    pub const INSERT_TEXT: &str = "doc.command.insert-text";
    pub const DELETE_LEFT: &str = "doc.command.delete-left";
    pub const DELETE_RIGHT: &str = "doc.command.delete-right";
    pub const DELETE_TEXT: &str = "doc.command.delete-text";
    pub const BREAK_LINE: &str = "doc.command.break-line";
    pub const MERGE_TWO_PARAGRAPH: &str = "doc.command.merge-two-paragraph";
    pub const UPDATE_FORMATTING: &str = "doc.command.update-formatting";
    pub const CUT_CONTENT: &str = "doc.command.cut-content";
    pub const PASTE: &str = "doc.command.paste";
    pub const IME_START: &str = "doc.command.ime-start";
    pub const IME_INPUT: &str = "doc.command.ime-input";
    pub const IME_END: &str = "doc.command.ime-end";
    pub const IME_RESET: &str = "doc.command.ime-reset";
    pub const UNDO: &str = "doc.command.undo";
    pub const REDO: &str = "doc.command.redo";
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("command {0:?} is already registered")]
    DuplicateCommand(String),
    #[error("bad params for {id}: {source}")]
    InvalidParams {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{id} requires {field}")]
    MissingParam { id: String, field: &'static str },
    #[error("no unit has focus")]
    NoFocusedUnit,
    #[error("unit {0:?} is not open")]
    UnknownUnit(String),
    #[error("segment {0:?} does not exist in this unit")]
    UnknownSegment(String),
    #[error("no range given and the unit has no selection")]
    NoSelection,
    #[error("range ends at {end} but the body holds {len} characters")]
    RangeOutOfBounds { end: usize, len: usize },
    #[error("no composition is open on unit {0:?}")]
    NotComposing(String),
    #[error(transparent)]
    Malformed(#[from] MalformedActionError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}
