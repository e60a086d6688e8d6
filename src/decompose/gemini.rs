use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, warn};

use super::model::{GenerateContentRequest, GenerateContentResponse};
use super::TextGenerator;
use crate::config::Config;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/";

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let base_url = Url::parse(GEMINI_API_BASE).context("invalid default Gemini URL")?;
        Self::with_base_url(api_key, model, base_url)
    }

    pub fn with_base_url(api_key: String, model: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("capture-inbox/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.decompose.base_url)
            .with_context(|| format!("invalid decompose.base_url '{}'", cfg.decompose.base_url))?;
        Self::with_base_url(
            cfg.decompose.resolved_api_key(),
            cfg.decompose.model.clone(),
            base_url,
        )
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .context("invalid Gemini base URL")?;
        self.http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&GenerateContentRequest::subtasks(prompt))
            .build()
            .context("failed to build Gemini request")
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("no Gemini API key configured"));
        }
        let request = self.build_request(prompt)?;
        debug!(url = %request.url(), model = %self.model, "gemini request");
        let resp = self
            .http
            .execute(request)
            .await
            .context("Gemini request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %body, "gemini returned an error status");
            return Err(anyhow!("Gemini returned {status}"));
        }
        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .context("failed to decode Gemini response")?;
        Ok(parsed.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn request_targets_model_endpoint_with_key_header() {
        let client = GeminiClient::with_base_url(
            "secret".into(),
            "gemini-2.5-flash".into(),
            Url::parse("http://localhost:9999/").unwrap(),
        )
        .unwrap();
        let req = client.build_request("split this").unwrap();
        assert_eq!(
            req.url().as_str(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(req.headers()["x-goog-api-key"], "secret");

        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        let json: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "split this");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["required"][0], "subtasks");
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"subtasks\":"},{"text":"[\"a\"]}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some(r#"{"subtasks":["a"]}"#));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GeminiClient::new(String::new(), "gemini-2.5-flash".into()).unwrap();
        let err = client.generate("anything").await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
