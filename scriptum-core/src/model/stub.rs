//! `StubModel` — placeholder backend that echoes metadata without a network.
//!
//! Lets a host exercise the full record → note path before wiring a real
//! model client, and keeps engine tests hermetic.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::model::{AudioPayload, SpeechToText, TextPolisher};

/// Echo-style stub implementing both model traits.
#[derive(Debug, Default)]
pub struct StubModel;

impl StubModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechToText for StubModel {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        debug!(mime_type = %audio.mime_type, "StubModel::transcribe");
        Ok(format!(
            "[stub transcript: {} base64 chars of {}]",
            audio.data.len(),
            audio.mime_type
        ))
    }
}

#[async_trait]
impl TextPolisher for StubModel {
    async fn polish(&self, raw: &str, _instruction: &str) -> Result<String> {
        debug!(chars = raw.len(), "StubModel::polish");
        Ok(format!("# Stub Note\n\n{}", raw.trim()))
    }
}
