mod common;

use std::sync::Arc;

use common::{UNIT, active, caret, editor_with, editor_with_body, span, text, undo_depth};
use core_actions::{CommandOutput, ids};
use core_events::{EditorEvent, layout_channel};
use core_ops::ActionList;
use core_state::{DocumentState, DocumentStore, MutationRecord, TextRange};
use core_text::{CustomRange, CustomRangeType, DocumentBody, TextStyle, token};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

#[test]
fn plain_insert_undo_redo() {
    let mut ed = editor_with("ab\r", 1);
    assert!(ed.execute(ids::INSERT_TEXT, json!({ "text": "X" })));
    assert_eq!(text(&ed), "aXb\r");
    assert_eq!(active(&ed), Some(TextRange::caret(2)));
    assert_eq!(undo_depth(&ed), 1);

    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "ab\r");
    assert_eq!(active(&ed), Some(TextRange::caret(1)));

    assert!(ed.execute(ids::REDO, Value::Null));
    assert_eq!(text(&ed), "aXb\r");
    assert_eq!(active(&ed), Some(TextRange::caret(2)));
}

#[test]
fn backspace_at_paragraph_start_merges_and_undoes() {
    let mut ed = editor_with("ab\rcd\r", 3);
    assert!(ed.execute(ids::DELETE_LEFT, Value::Null));
    assert_eq!(text(&ed), "abcd\r");
    assert_eq!(ed.body(UNIT).map(|b| b.paragraphs.len()), Some(1));
    assert_eq!(active(&ed), Some(TextRange::caret(2)));

    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "ab\rcd\r");
    assert_eq!(ed.body(UNIT).map(|b| b.paragraphs.len()), Some(2));
    assert_eq!(active(&ed), Some(TextRange::caret(3)));
}

#[test]
fn backspace_at_document_start_is_a_no_op() {
    let mut ed = editor_with("ab\r", 0);
    assert_eq!(
        ed.try_execute(ids::DELETE_LEFT, Value::Null).unwrap(),
        CommandOutput::NoOp
    );
    assert_eq!(text(&ed), "ab\r");
    assert_eq!(undo_depth(&ed), 0);
}

#[test]
fn delete_right_and_delete_text_direction() {
    let mut ed = editor_with("abc\r", 1);
    assert!(ed.execute(ids::DELETE_RIGHT, Value::Null));
    assert_eq!(text(&ed), "ac\r");
    assert!(ed.execute(ids::DELETE_TEXT, json!({ "direction": "left" })));
    assert_eq!(text(&ed), "c\r");
    assert!(!ed.execute(ids::DELETE_TEXT, json!({ "direction": "up" })));
}

#[test]
fn ime_session_is_one_undo_step() {
    let mut ed = editor_with("\r", 0);
    assert!(ed.execute(ids::IME_START, Value::Null));
    assert!(ed.execute(ids::IME_INPUT, json!({ "text": "a" })));
    assert!(ed.execute(ids::IME_INPUT, json!({ "text": "ab" })));
    assert_eq!(text(&ed), "ab\r");
    assert_eq!(undo_depth(&ed), 0);
    assert_eq!(ed.ime().buffered(), 2);

    assert!(ed.execute(ids::IME_END, Value::Null));
    assert_eq!(undo_depth(&ed), 1);
    let item = ed.state().history.peek_undo(UNIT).cloned().unwrap();
    assert_eq!(item.redo_mutations[0].actions, ActionList::new().insert_text("ab"));
    assert_eq!(item.undo_mutations[0].actions, ActionList::new().delete(2));

    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "\r");
    assert_eq!(active(&ed), Some(TextRange::caret(0)));
    assert!(ed.execute(ids::REDO, Value::Null));
    assert_eq!(text(&ed), "ab\r");
}

#[test]
fn ime_replaces_selected_text() {
    let body = DocumentBody::from_text("hello\r");
    let mut ed = editor_with_body(body, TextRange::span(1, 4));
    ed.execute(ids::IME_START, Value::Null);
    ed.execute(ids::IME_INPUT, json!({ "text": "i" }));
    ed.execute(ids::IME_END, Value::Null);
    assert_eq!(text(&ed), "hio\r");
    ed.execute(ids::UNDO, Value::Null);
    assert_eq!(text(&ed), "hello\r");
    assert_eq!(active(&ed), Some(TextRange::span(1, 4)));
}

#[test]
fn ime_input_without_session_fails() {
    let mut ed = editor_with("\r", 0);
    assert!(!ed.execute(ids::IME_INPUT, json!({ "text": "a" })));
    assert_eq!(text(&ed), "\r");
}

#[test]
fn ime_reset_takes_back_the_preedit_so_earlier_undo_still_lines_up() {
    let mut ed = editor_with("ab\r", 1);
    assert!(ed.execute(ids::INSERT_TEXT, json!({ "text": "X" })));
    assert!(ed.execute(ids::IME_START, json!({ "range": caret(0) })));
    assert!(ed.execute(ids::IME_INPUT, json!({ "text": "z" })));
    assert!(ed.execute(ids::IME_INPUT, json!({ "text": "zz" })));
    assert_eq!(text(&ed), "zzaXb\r");

    assert_eq!(
        ed.try_execute(ids::IME_RESET, Value::Null).unwrap(),
        CommandOutput::Applied
    );
    assert!(!ed.ime().is_composing());
    assert_eq!(text(&ed), "aXb\r");
    assert_eq!(active(&ed), Some(TextRange::caret(0)));
    assert_eq!(undo_depth(&ed), 1);

    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "ab\r");
    assert_eq!(
        ed.try_execute(ids::IME_RESET, Value::Null).unwrap(),
        CommandOutput::NoOp
    );
}

#[test]
fn starting_a_new_session_reverts_the_open_one() {
    let mut ed = editor_with("ab\r", 2);
    ed.execute(ids::IME_START, Value::Null);
    ed.execute(ids::IME_INPUT, json!({ "text": "q" }));
    assert_eq!(text(&ed), "abq\r");
    assert!(ed.execute(ids::IME_START, json!({ "range": caret(0) })));
    assert_eq!(text(&ed), "ab\r");
    ed.execute(ids::IME_INPUT, json!({ "text": "k" }));
    ed.execute(ids::IME_END, Value::Null);
    assert_eq!(text(&ed), "kab\r");
    assert_eq!(undo_depth(&ed), 1);
    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "ab\r");
}

#[test]
fn cut_many_ranges_then_undo() {
    let mut ed = editor_with("abcdefgh\r", 0);
    let params = json!({ "ranges": [span(5, 8), span(1, 2)] });
    assert!(ed.execute(ids::CUT_CONTENT, params));
    assert_eq!(text(&ed), "acde\r");
    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "abcdefgh\r");
}

#[test]
fn cut_half_a_link_removes_the_whole_link_and_undo_restores_it() {
    let stream = format!("a{}bc{}d\r", token::CUSTOM_RANGE_START, token::CUSTOM_RANGE_END);
    let mut body = DocumentBody::from_text(&stream);
    body.custom_ranges.push(CustomRange {
        start_index: 1,
        end_index: 4,
        range_id: "link".into(),
        range_type: CustomRangeType::Hyperlink,
    });
    let mut ed = editor_with_body(body.clone(), TextRange::span(0, 2));
    assert!(ed.execute(ids::CUT_CONTENT, Value::Null));
    assert_eq!(text(&ed), "d\r");
    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(ed.body(UNIT), Some(&body));
}

#[test]
fn formatting_round_trip() {
    let mut ed = editor_with("abc\r", 0);
    let params = json!({ "ranges": [span(0, 2)], "style": { "bold": true } });
    assert!(ed.execute(ids::UPDATE_FORMATTING, params));
    assert_eq!(
        ed.body(UNIT).and_then(|b| b.style_at(1)).cloned(),
        Some(TextStyle::bold())
    );
    assert_eq!(ed.body(UNIT).and_then(|b| b.style_at(2)), None);
    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(ed.body(UNIT).map(|b| b.text_runs.is_empty()), Some(true));
}

#[test]
fn caret_formatting_styles_the_next_insert() {
    let mut ed = editor_with("ab\r", 2);
    let out = ed
        .try_execute(ids::UPDATE_FORMATTING, json!({ "style": { "italic": true } }))
        .unwrap();
    assert_eq!(out, CommandOutput::NoOp);
    assert_eq!(undo_depth(&ed), 0);
    ed.execute(ids::INSERT_TEXT, json!({ "text": "c" }));
    assert_eq!(
        ed.body(UNIT).and_then(|b| b.style_at(2)).cloned(),
        Some(TextStyle::italic())
    );
}

#[test]
fn break_line_then_merge_back() {
    let mut ed = editor_with("abcd\r", 2);
    assert!(ed.execute(ids::BREAK_LINE, Value::Null));
    assert_eq!(text(&ed), "ab\rcd\r");
    assert_eq!(active(&ed), Some(TextRange::caret(3)));
    assert!(ed.execute(ids::MERGE_TWO_PARAGRAPH, Value::Null));
    assert_eq!(text(&ed), "abcd\r");
    assert_eq!(undo_depth(&ed), 2);
}

#[test]
fn raw_mutation_returns_inverse_and_skips_history() {
    let mut ed = editor_with("ab\r", 0);
    let record = MutationRecord::new(UNIT, ActionList::new().retain(1).insert_text("Z"));
    let out = ed
        .try_execute(ids::RICH_TEXT_EDITING, serde_json::to_value(&record).unwrap())
        .unwrap();
    assert_eq!(text(&ed), "aZb\r");
    assert_eq!(out, CommandOutput::Inverse(ActionList::new().retain(1).delete(1)));
    assert_eq!(undo_depth(&ed), 0);
}

#[test]
fn oversized_mutation_is_rejected_without_change() {
    let mut ed = editor_with("ab\r", 0);
    let record = MutationRecord::new(UNIT, ActionList::new().retain(9).insert_text("Z"));
    assert!(!ed.execute(ids::RICH_TEXT_EDITING, serde_json::to_value(&record).unwrap()));
    assert_eq!(text(&ed), "ab\r");
}

#[test]
fn edits_in_a_segment_leave_the_main_body() {
    let doc = DocumentState::new(UNIT, DocumentBody::from_text("main\r"))
        .with_segment("header", DocumentBody::from_text("top\r"));
    let mut ed = core_actions::Editor::new(10);
    ed.open(doc);
    let range = json!({ "startOffset": 3, "endOffset": 3, "collapsed": true, "segmentId": "header" });
    assert!(ed.execute(ids::INSERT_TEXT, json!({ "text": "!", "range": range })));
    let doc = ed.state().documents.get(UNIT).unwrap();
    assert_eq!(doc.segment_body("header").map(|b| b.data_stream.as_str()), Some("top!\r"));
    assert_eq!(doc.body().data_stream, "main\r");

    assert!(ed.execute(ids::UNDO, Value::Null));
    let doc = ed.state().documents.get(UNIT).unwrap();
    assert_eq!(doc.segment_body("header").map(|b| b.data_stream.as_str()), Some("top\r"));
}

#[test]
fn layout_hears_about_every_commit() {
    let (notifier, mut rx) = layout_channel();
    let mut ed = editor_with("ab\r", 0).with_layout(Arc::new(notifier));
    ed.execute(ids::INSERT_TEXT, json!({ "text": "x", "range": caret(1) }));
    ed.execute(ids::UNDO, Value::Null);
    assert_eq!(
        rx.try_recv().ok(),
        Some(EditorEvent::MutationCommitted {
            unit_id: UNIT.into(),
            segment_id: String::new(),
            command: ids::INSERT_TEXT.into(),
        })
    );
    assert_eq!(
        rx.try_recv().ok(),
        Some(EditorEvent::UndoApplied { unit_id: UNIT.into() })
    );
}

#[test]
fn bad_params_and_unknown_units_fail_cleanly() {
    let mut ed = editor_with("ab\r", 0);
    assert!(!ed.execute(ids::INSERT_TEXT, json!({ "text": 5 })));
    assert!(!ed.execute(ids::INSERT_TEXT, json!({ "text": "x", "unitId": "nope" })));
    assert!(!ed.execute(ids::INSERT_TEXT, json!({})));
    assert_eq!(undo_depth(&ed), 0);
}
