//! Editor events and the fire-and-forget layout notification path.
//!
//! After a mutation commits, the command layer tells the layout collaborator
//! that a unit's body changed. The engine never waits on layout: the
//! channel notifier uses `try_send` and counts what it had to drop.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// Bounded so a stalled layout consumer cannot grow memory without limit.
// Layout only needs the latest state per unit, so dropping on overflow is safe.
pub const LAYOUT_CHANNEL_CAP: usize = 1024;

pub static LAYOUT_NOTIFICATIONS: AtomicU64 = AtomicU64::new(0);
pub static LAYOUT_DROPPED_FULL: AtomicU64 = AtomicU64::new(0);
pub static LAYOUT_DROPPED_CLOSED: AtomicU64 = AtomicU64::new(0);

/// Something about a document unit's body changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A command's mutation was applied. `segment_id` is empty for the main body.
    MutationCommitted {
        unit_id: String,
        segment_id: String,
        command: String,
    },
    UndoApplied { unit_id: String },
    RedoApplied { unit_id: String },
    /// An IME session closed; `committed` is false when it was reverted.
    CompositionEnded { unit_id: String, committed: bool },
}

impl EditorEvent {
    pub fn unit_id(&self) -> &str {
        match self {
            EditorEvent::MutationCommitted { unit_id, .. }
            | EditorEvent::UndoApplied { unit_id }
            | EditorEvent::RedoApplied { unit_id }
            | EditorEvent::CompositionEnded { unit_id, .. } => unit_id,
        }
    }
}

/// Receiver of "recompute layout" notifications. Implementations must not block.
pub trait LayoutNotifier: Send + Sync {
    fn notify(&self, event: EditorEvent);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLayoutNotifier;

impl LayoutNotifier for NoopLayoutNotifier {
    fn notify(&self, event: EditorEvent) {
        trace!(target: "events.layout", unit = %event.unit_id(), "layout_notify_noop");
    }
}

/// Forwards notifications over a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelLayoutNotifier {
    tx: Sender<EditorEvent>,
}

impl ChannelLayoutNotifier {
    pub fn new(tx: Sender<EditorEvent>) -> Self {
        Self { tx }
    }
}

impl LayoutNotifier for ChannelLayoutNotifier {
    fn notify(&self, event: EditorEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                LAYOUT_NOTIFICATIONS.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(ev)) => {
                LAYOUT_DROPPED_FULL.fetch_add(1, Ordering::Relaxed);
                debug!(target: "events.layout", unit = %ev.unit_id(), "layout_channel_full");
            }
            Err(TrySendError::Closed(ev)) => {
                LAYOUT_DROPPED_CLOSED.fetch_add(1, Ordering::Relaxed);
                trace!(target: "events.layout", unit = %ev.unit_id(), "layout_channel_closed");
            }
        }
    }
}

/// A notifier plus the receiving end for the layout consumer.
pub fn layout_channel() -> (ChannelLayoutNotifier, Receiver<EditorEvent>) {
    let (tx, rx) = mpsc::channel(LAYOUT_CHANNEL_CAP);
    (ChannelLayoutNotifier::new(tx), rx)
}

/// Drain `rx` on a background task until every sender is gone.
/// The task resolves to the number of events handled.
pub fn spawn_layout_consumer<F>(mut rx: Receiver<EditorEvent>, mut handle: F) -> JoinHandle<u64>
where
    F: FnMut(EditorEvent) + Send + 'static,
{
    tokio::spawn(async move {
        let mut handled = 0u64;
        while let Some(event) = rx.recv().await {
            handle(event);
            handled += 1;
        }
        debug!(target: "events.layout", handled, "layout_consumer_stopped");
        handled
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(unit: &str) -> EditorEvent {
        EditorEvent::MutationCommitted {
            unit_id: unit.into(),
            segment_id: String::new(),
            command: "doc.command.insert-text".into(),
        }
    }

    #[tokio::test]
    async fn channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = layout_channel();
        notifier.notify(committed("a"));
        notifier.notify(EditorEvent::UndoApplied { unit_id: "a".into() });
        assert_eq!(rx.recv().await, Some(committed("a")));
        assert_eq!(
            rx.recv().await.map(|e| e.unit_id().to_string()),
            Some("a".to_string())
        );
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let notifier = ChannelLayoutNotifier::new(tx);
        let before = LAYOUT_DROPPED_FULL.load(Ordering::Relaxed);
        notifier.notify(committed("a"));
        notifier.notify(committed("b"));
        assert!(LAYOUT_DROPPED_FULL.load(Ordering::Relaxed) > before);
    }

    #[test]
    fn closed_channel_is_counted() {
        let (notifier, rx) = layout_channel();
        drop(rx);
        let before = LAYOUT_DROPPED_CLOSED.load(Ordering::Relaxed);
        notifier.notify(committed("a"));
        assert!(LAYOUT_DROPPED_CLOSED.load(Ordering::Relaxed) > before);
    }

    #[tokio::test]
    async fn consumer_stops_when_senders_drop() {
        let (notifier, rx) = layout_channel();
        let task = spawn_layout_consumer(rx, |_| {});
        notifier.notify(committed("a"));
        notifier.notify(committed("b"));
        drop(notifier);
        assert_eq!(task.await.unwrap(), 2);
    }
}
