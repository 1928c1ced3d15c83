//! Sequential composition of action lists.

use std::collections::VecDeque;

use tracing::trace;

use crate::action::{Action, ActionList, Delete};
use crate::error::MalformedActionError;

/// Cursor over an action list that hands out prefixes of the front action.
struct Walker {
    queue: VecDeque<Action>,
}

impl Walker {
    fn new(list: &ActionList) -> Self {
        Self {
            queue: list.iter().filter(|a| !a.is_empty()).cloned().collect(),
        }
    }

    fn peek(&self) -> Option<&Action> {
        self.queue.front()
    }

    fn next(&mut self) -> Option<Action> {
        self.queue.pop_front()
    }

    /// Take exactly `n` units off the front action, splitting it if longer.
    fn take(&mut self, n: usize) -> Option<Action> {
        let front = self.queue.pop_front()?;
        if front.len() <= n {
            return Some(front);
        }
        let (head, tail) = front.split_at(n);
        self.queue.push_front(tail);
        Some(head)
    }
}

/// Compose `a` with `b`, where `b` applies to the stream `a` produces.
///
/// Applying the result to a stream equals applying `a` then `b`. Both lists
/// may leave an implicit trailing retain; the result is canonical.
pub fn compose(a: &ActionList, b: &ActionList) -> Result<ActionList, MalformedActionError> {
    let seg_a = a.segment()?;
    let seg_b = b.segment()?;
    if !a.is_empty() && !b.is_empty() && seg_a != seg_b {
        return Err(MalformedActionError::MixedSegments {
            expected: seg_a.to_string(),
            found: seg_b.to_string(),
        });
    }

    let mut left = Walker::new(a);
    let mut right = Walker::new(b);
    let mut out = ActionList::new();
    let mut cancelled = 0usize;

    loop {
        match (left.peek(), right.peek()) {
            (None, None) => break,
            // Deleted by `a`: invisible to `b`.
            (Some(Action::Delete(_)), _) | (Some(_), None) => {
                if let Some(action) = left.next() {
                    out.push(action);
                }
            }
            // Inserted by `b`: consumes nothing from `a`'s output.
            (_, Some(Action::Insert(_))) | (None, Some(_)) => {
                if let Some(action) = right.next() {
                    out.push(action);
                }
            }
            // Inserted by `a`: `b`'s actions over that span edit the inserted
            // content as a whole, so range registrations inside it survive.
            (Some(Action::Insert(_)), Some(_)) => {
                let Some(Action::Insert(inserted)) = left.next() else {
                    break;
                };
                let mut over: Vec<Action> = Vec::new();
                let mut covered = 0usize;
                while covered < inserted.len() {
                    let n = match right.peek() {
                        None => break,
                        Some(Action::Insert(_)) => 0,
                        Some(action) => action.len().min(inserted.len() - covered),
                    };
                    let next = if n == 0 { right.next() } else { right.take(n) };
                    let Some(action) = next else {
                        break;
                    };
                    if let Action::Delete(d) = &action {
                        cancelled += d.len;
                    }
                    covered += n;
                    over.push(action);
                }
                out.push(inserted.edited_by(&over));
            }
            (Some(Action::Retain(x)), Some(Action::Retain(y))) => {
                let n = x.len.min(y.len);
                if let (Some(Action::Retain(r1)), Some(Action::Retain(r2))) =
                    (left.take(n), right.take(n))
                {
                    out.push(r1.then(&r2));
                }
            }
            (Some(Action::Retain(x)), Some(Action::Delete(y))) => {
                let n = x.len.min(y.len);
                let segment_id = x.segment_id.clone();
                left.take(n);
                right.take(n);
                out.push(Delete { len: n, segment_id });
            }
        }
    }

    let out = out.normalized();
    trace!(
        target: "ops.compose",
        left = a.len(),
        right = b.len(),
        result = out.len(),
        cancelled,
        "composed action lists"
    );
    Ok(out)
}

/// Fold a sequence of lists, each applying to the previous one's output.
pub fn compose_all<'a, I>(lists: I) -> Result<ActionList, MalformedActionError>
where
    I: IntoIterator<Item = &'a ActionList>,
{
    lists
        .into_iter()
        .try_fold(ActionList::new(), |acc, next| compose(&acc, next))
}
