//! Hosted model client for Scriptum.
//!
//! Implements the core's `SpeechToText` and `TextPolisher` traits against a
//! generate-content style JSON API: audio goes up as an inline base64 part
//! next to a text instruction, polishing as a plain text prompt. One client
//! serves both traits, so a host wires a single `Arc<CloudModel>` into the
//! engine twice.
//!
//! The engine's optional stage timeout bounds individual pipeline stages; the
//! `request_timeout` here is the transport-level backstop on the HTTP call
//! itself.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use scriptum_core::{AudioPayload, Result, ScriptumError, SpeechToText, TextPolisher};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const TRANSCRIBE_INSTRUCTION: &str =
    "Generate a complete, detailed transcript of this audio. \
Return only the spoken words — no commentary, no timestamps.";

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl CloudConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

pub struct CloudModel {
    http: reqwest::Client,
    config: CloudConfig,
}

impl CloudModel {
    pub fn new(config: CloudConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScriptumError::Remote(format!("client build failed: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, parts: Vec<serde_json::Value>) -> Result<String> {
        let payload = json!({ "contents": [{ "parts": parts }] });
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScriptumError::Remote(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ScriptumError::Remote("API key rejected".into()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(ScriptumError::Remote(format!(
                "API error {status}: {preview}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ScriptumError::Remote(format!("unparseable response: {e}")))?;
        let text = body.text();
        debug!(chars = text.len(), "model response received");
        Ok(text)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .map(|p| p.text.as_str())
            .collect()
    }
}

#[async_trait]
impl SpeechToText for CloudModel {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        let parts = vec![
            json!({ "text": TRANSCRIBE_INSTRUCTION }),
            json!({
                "inlineData": {
                    "mimeType": audio.mime_type,
                    "data": audio.data,
                }
            }),
        ];
        self.generate(parts).await
    }
}

#[async_trait]
impl TextPolisher for CloudModel {
    async fn polish(&self, raw: &str, instruction: &str) -> Result<String> {
        let prompt = format!("{instruction}\n\nRaw transcription:\n{raw}");
        self.generate(vec![json!({ "text": prompt })]).await
    }
}
