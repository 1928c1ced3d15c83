mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{UNIT, active, editor_with, text, undo_depth};
use core_actions::ids;
use core_events::{EditorEvent, layout_channel, spawn_layout_consumer};
use core_state::TextRange;
use core_text::{DocumentBody, TextStyle};
use pretty_assertions::assert_eq;
use serde_json::Value;

async fn slow_clipboard(body: Option<DocumentBody>) -> Option<DocumentBody> {
    tokio::task::yield_now().await;
    body
}

#[tokio::test]
async fn paste_waits_for_clipboard_then_applies() {
    let mut ed = editor_with("ad\r", 1);
    let clip = DocumentBody::styled("bc", TextStyle::bold());
    assert!(ed.paste_from(slow_clipboard(Some(clip))).await);
    assert_eq!(text(&ed), "abcd\r");
    assert_eq!(active(&ed), Some(TextRange::caret(3)));
    assert_eq!(
        ed.body(UNIT).and_then(|b| b.style_at(1)).cloned(),
        Some(TextStyle::bold())
    );
    assert!(ed.execute(ids::UNDO, Value::Null));
    assert_eq!(text(&ed), "ad\r");
}

#[tokio::test]
async fn empty_clipboard_is_a_no_op() {
    let mut ed = editor_with("ad\r", 1);
    assert!(ed.paste_from(slow_clipboard(None)).await);
    assert_eq!(text(&ed), "ad\r");
    assert_eq!(undo_depth(&ed), 0);
}

#[tokio::test]
async fn layout_consumer_sees_paste() {
    let (notifier, rx) = layout_channel();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let task = spawn_layout_consumer(rx, move |event| {
        if matches!(event, EditorEvent::MutationCommitted { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    {
        let mut ed = editor_with("\r", 0).with_layout(Arc::new(notifier));
        ed.paste_from(slow_clipboard(Some(DocumentBody::from_text("x"))))
            .await;
    }
    let handled = task.await.unwrap();
    assert_eq!(handled, 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
