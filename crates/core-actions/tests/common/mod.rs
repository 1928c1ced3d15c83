#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::Editor;
use core_state::{DocumentState, SelectionProvider, TextRange};
use core_text::DocumentBody;
use serde_json::{Value, json};

pub const UNIT: &str = "doc";

/// Editor with one focused unit holding `text`, caret at `caret`.
pub fn editor_with(text: &str, caret: usize) -> Editor {
    editor_with_body(DocumentBody::from_text(text), TextRange::caret(caret))
}

pub fn editor_with_body(body: DocumentBody, selection: TextRange) -> Editor {
    let mut doc = DocumentState::new(UNIT, body);
    doc.selection.replace_text_ranges(vec![selection]);
    let mut editor = Editor::new(100);
    editor.open(doc);
    editor
}

pub fn text(editor: &Editor) -> String {
    editor
        .body(UNIT)
        .map(|b| b.data_stream.clone())
        .unwrap_or_default()
}

pub fn active(editor: &Editor) -> Option<TextRange> {
    editor
        .state()
        .documents
        .get(UNIT)
        .and_then(|d| d.selection.active_range().cloned())
}

pub fn undo_depth(editor: &Editor) -> usize {
    editor.state().history.undo_depth(UNIT)
}

pub fn caret(offset: usize) -> Value {
    json!({ "startOffset": offset, "endOffset": offset, "collapsed": true })
}

pub fn span(start: usize, end: usize) -> Value {
    json!({ "startOffset": start, "endOffset": end, "collapsed": start == end })
}
