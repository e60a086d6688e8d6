use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest attachment accepted by [`NewCapture::photo`] unless configured otherwise.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 3 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Text,
    Paste,
    Meeting,
    Photo,
    Voice,
}

impl CaptureSource {
    pub const ALL: [CaptureSource; 5] = [
        CaptureSource::Text,
        CaptureSource::Paste,
        CaptureSource::Meeting,
        CaptureSource::Photo,
        CaptureSource::Voice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Text => "text",
            CaptureSource::Paste => "paste",
            CaptureSource::Meeting => "meeting",
            CaptureSource::Photo => "photo",
            CaptureSource::Voice => "voice",
        }
    }

    pub fn parse_source(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|src| src.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Unreviewed,
    Promoted,
    Discarded,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Unreviewed => "unreviewed",
            CaptureStatus::Promoted => "promoted",
            CaptureStatus::Discarded => "discarded",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "unreviewed" => Some(CaptureStatus::Unreviewed),
            "promoted" => Some(CaptureStatus::Promoted),
            "discarded" => Some(CaptureStatus::Discarded),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an item was promoted into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PromotionTarget {
    Task,
    Note,
}

impl PromotionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionTarget::Task => "task",
            PromotionTarget::Note => "note",
        }
    }

    pub fn parse_target(s: &str) -> Option<Self> {
        match s {
            "task" => Some(PromotionTarget::Task),
            "note" => Some(PromotionTarget::Note),
            _ => None,
        }
    }
}

/// One captured fragment, awaiting or done with triage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureItem {
    pub id: String,
    pub source: CaptureSource,
    pub status: CaptureStatus,
    /// Captured text, or a file label when the payload is binary.
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_uri: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_to: Option<PromotionTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Set only on an item handed back from a save that failed to persist.
    #[serde(default, skip_serializing)]
    pub sync_error: Option<String>,
}

impl CaptureItem {
    pub fn is_unreviewed(&self) -> bool {
        self.status == CaptureStatus::Unreviewed
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureInputError {
    #[error("capture text must not be empty")]
    EmptyText,
    #[error("photo captures need an attachment")]
    PhotoNeedsAttachment,
    #[error("attachment is {size} bytes, limit is {limit}")]
    AttachmentTooLarge { size: usize, limit: usize },
}

/// Input for [`crate::inbox::CaptureInbox::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCapture {
    pub source: CaptureSource,
    pub raw: String,
    pub attachment_uri: Option<String>,
}

impl NewCapture {
    /// Unchecked constructor.
    pub fn new(source: CaptureSource, raw: impl Into<String>) -> Self {
        Self {
            source,
            raw: raw.into(),
            attachment_uri: None,
        }
    }

    /// A typed, pasted, meeting or voice capture. The text is trimmed and must
    /// not end up empty.
    pub fn text(source: CaptureSource, raw: &str) -> Result<Self, CaptureInputError> {
        if source == CaptureSource::Photo {
            return Err(CaptureInputError::PhotoNeedsAttachment);
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CaptureInputError::EmptyText);
        }
        Ok(Self::new(source, trimmed))
    }

    /// A photo capture: `label` is usually the file name, `attachment_uri`
    /// references (or inlines) the image.
    pub fn photo(
        label: &str,
        attachment_uri: impl Into<String>,
        max_bytes: usize,
    ) -> Result<Self, CaptureInputError> {
        let attachment_uri = attachment_uri.into();
        if attachment_uri.is_empty() {
            return Err(CaptureInputError::PhotoNeedsAttachment);
        }
        if attachment_uri.len() > max_bytes {
            return Err(CaptureInputError::AttachmentTooLarge {
                size: attachment_uri.len(),
                limit: max_bytes,
            });
        }
        Ok(Self {
            source: CaptureSource::Photo,
            raw: label.trim().to_string(),
            attachment_uri: Some(attachment_uri),
        })
    }
}

/// Shallow patch for [`crate::inbox::CaptureInbox::update`]. Every `Some`
/// field replaces the stored value; status fields only move through triage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturePatch {
    pub raw: Option<String>,
    pub attachment_uri: Option<String>,
    pub transcript: Option<String>,
}

impl CapturePatch {
    pub fn transcript(text: impl Into<String>) -> Self {
        Self {
            transcript: Some(text.into()),
            ..Default::default()
        }
    }

    pub(crate) fn apply_to(self, item: &mut CaptureItem) {
        if let Some(raw) = self.raw {
            item.raw = raw;
        }
        if let Some(uri) = self.attachment_uri {
            item.attachment_uri = Some(uri);
        }
        if let Some(transcript) = self.transcript {
            item.transcript = Some(transcript);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureFilter {
    pub status: Option<CaptureStatus>,
}

impl CaptureFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(status: CaptureStatus) -> Self {
        Self {
            status: Some(status),
        }
    }

    pub fn matches(&self, item: &CaptureItem) -> bool {
        self.status.map_or(true, |s| item.status == s)
    }
}
