//! Capture inbox: quick captures, triage and a reactive unreviewed count.
//!
//! - `model`: capture items and their inputs.
//! - `store`: key/value persistence (`KvStore`) with memory and file backends.
//! - `inbox`: `CaptureInbox`, the repository every caller goes through.
//! - `triage`: which status transitions are allowed and what they record.
//! - `notify`: subscriber registry for the unreviewed count.
//! - `decompose`: task breakdown via a generative text service.

pub mod config;
pub mod decompose;
pub mod inbox;
pub mod model;
pub mod notify;
pub mod store;
pub mod triage;

pub use inbox::CaptureInbox;
pub use model::{
    CaptureFilter, CaptureItem, CapturePatch, CaptureSource, CaptureStatus, NewCapture,
    PromotionTarget,
};
pub use notify::Subscription;
