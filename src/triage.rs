//! Triage rules for capture items.
//!
//! | From       | Event         | To        | Records                           |
//! |------------|---------------|-----------|-----------------------------------|
//! | unreviewed | promote(task) | promoted  | promoted_to = task, promoted_at   |
//! | unreviewed | promote(note) | promoted  | promoted_to = note, promoted_at   |
//! | unreviewed | discard       | discarded | nothing else                      |
//!
//! Removal (`delete`, `clear_discarded`) is not a transition and lives in the
//! repository. Promoted and discarded are final: nothing moves back to
//! unreviewed or across.

use crate::model::{CaptureItem, CaptureStatus, PromotionTarget};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageEvent {
    Promote(PromotionTarget),
    Discard,
}

impl fmt::Display for TriageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageEvent::Promote(to) => write!(f, "promote({})", to.as_str()),
            TriageEvent::Discard => f.write_str("discard"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriageError {
    #[error("cannot {event} an item that is already {from}")]
    IllegalTransition {
        from: CaptureStatus,
        event: TriageEvent,
    },
}

/// Target state of `event` from `from`, if the table allows it.
pub fn next_status(from: CaptureStatus, event: TriageEvent) -> Option<CaptureStatus> {
    match (from, event) {
        (CaptureStatus::Unreviewed, TriageEvent::Promote(_)) => Some(CaptureStatus::Promoted),
        (CaptureStatus::Unreviewed, TriageEvent::Discard) => Some(CaptureStatus::Discarded),
        _ => None,
    }
}

/// Apply `event` to `item` in place. On error the item is untouched.
pub fn apply(item: &mut CaptureItem, event: TriageEvent, now_ms: i64) -> Result<(), TriageError> {
    let to = next_status(item.status, event).ok_or(TriageError::IllegalTransition {
        from: item.status,
        event,
    })?;
    item.status = to;
    if let TriageEvent::Promote(target) = event {
        item.promoted_to = Some(target);
        item.promoted_at = Some(now_ms);
    }
    Ok(())
}
