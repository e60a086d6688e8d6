//! Persisted form of the capture collection.
//!
//! Written as `{"version":1,"items":[...]}`. A bare JSON array (the older,
//! unversioned layout) is still read. Optional fields missing from old
//! records load as `None`.

use crate::model::{CaptureItem, CaptureStatus};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u64,
    items: &'a [CaptureItem],
}

pub fn encode(items: &[CaptureItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        version: FORMAT_VERSION,
        items,
    })
}

/// Decode whatever is stored. Never fails: unreadable content yields an empty
/// collection and unreadable records are skipped, each with a warning.
pub fn decode(raw: &str) -> Vec<CaptureItem> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(err) => {
            warn!(?err, "stored inbox is not valid JSON; treating as empty");
            return Vec::new();
        }
    };

    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut obj) => {
            let version = obj.get("version").and_then(Value::as_u64);
            match version {
                Some(v) if v <= FORMAT_VERSION => {}
                other => {
                    warn!(
                        ?other,
                        supported = FORMAT_VERSION,
                        "unsupported inbox format version; treating as empty"
                    );
                    return Vec::new();
                }
            }
            match obj.remove("items") {
                Some(Value::Array(records)) => records,
                _ => {
                    warn!("stored inbox has no item list; treating as empty");
                    return Vec::new();
                }
            }
        }
        _ => {
            warn!("stored inbox has an unexpected shape; treating as empty");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<CaptureItem>(record) {
            Ok(item) => normalize(item),
            Err(err) => {
                warn!(?err, idx, "skipping unreadable capture record");
                None
            }
        })
        .collect()
}

/// Only promoted items carry a promotion target and time. Older writers kept
/// them on items discarded after promotion, so they are dropped here. A
/// promoted record without a target cannot be repaired and is skipped.
fn normalize(mut item: CaptureItem) -> Option<CaptureItem> {
    if item.status != CaptureStatus::Promoted {
        item.promoted_to = None;
        item.promoted_at = None;
        return Some(item);
    }
    if item.promoted_to.is_none() {
        warn!(id = %item.id, "skipping promoted capture record without a target");
        return None;
    }
    Some(item)
}
