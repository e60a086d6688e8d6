//! Break a task description into a handful of subtasks using a generative
//! text service.
//!
//! [`Decomposer::decompose`] never fails: timeouts, empty answers and any
//! other failure become a single human-readable fallback line.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

pub mod gemini;
pub mod model;

pub use gemini::GeminiClient;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

pub const FALLBACK_TIMEOUT: &str = "Request timed out — check your connection and try again";
pub const FALLBACK_UNUSABLE: &str = "Could not decompose — try rephrasing your task";
pub const FALLBACK_FAILURE: &str = "Something went wrong — try again in a moment";

/// A service that answers a prompt with text. `Ok(None)` means it answered
/// with nothing.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>>;
}

#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("response contained no subtasks")]
    Unusable,
    #[error("response was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl DecomposeError {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            DecomposeError::Timeout(_) => FALLBACK_TIMEOUT,
            DecomposeError::Unusable => FALLBACK_UNUSABLE,
            DecomposeError::Malformed(_) | DecomposeError::Service(_) => FALLBACK_FAILURE,
        }
    }
}

pub fn prompt_for(task: &str) -> String {
    format!(
        "Break down the following complex task into 3 to 5 clear, actionable, and small subtasks. Task: \"{task}\""
    )
}

/// Pull `subtasks` out of a `{"subtasks": [...]}` answer. Non-string
/// entries are ignored.
pub fn parse_subtasks(raw: &str) -> Result<Vec<String>, DecomposeError> {
    let value: Value = serde_json::from_str(raw)?;
    let subtasks: Vec<String> = value
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if subtasks.is_empty() {
        return Err(DecomposeError::Unusable);
    }
    Ok(subtasks)
}

#[derive(Debug)]
pub struct Decomposer<G> {
    generator: G,
    timeout: Duration,
}

impl<G: TextGenerator> Decomposer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Subtasks for `task`, or a single fallback line explaining what went wrong.
    pub async fn decompose(&self, task: &str) -> Vec<String> {
        match self.try_decompose(task).await {
            Ok(subtasks) => subtasks,
            Err(err) => {
                match &err {
                    DecomposeError::Timeout(_) => error!(%err, "decomposition timed out"),
                    DecomposeError::Unusable => warn!("decomposition returned nothing usable"),
                    _ => error!(?err, "decomposition failed"),
                }
                vec![err.fallback_message().to_string()]
            }
        }
    }

    pub async fn try_decompose(&self, task: &str) -> Result<Vec<String>, DecomposeError> {
        let prompt = prompt_for(task);
        let answer = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| DecomposeError::Timeout(self.timeout))??;
        match answer {
            Some(raw) if !raw.trim().is_empty() => parse_subtasks(&raw),
            _ => Err(DecomposeError::Unusable),
        }
    }
}
