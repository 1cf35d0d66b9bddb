//! Remote model abstraction.
//!
//! Two traits decouple the pipeline from any specific backend: one turns an
//! encoded audio payload into plain text, the other rewrites raw text into a
//! formatted note. Both are network-bound and fallible; the pipeline treats
//! an empty result as a stage failure, so implementations may return whatever
//! the service produced without filtering.

pub mod stub;

pub use stub::StubModel;

use async_trait::async_trait;

use crate::error::Result;

/// Transport form of one audio object: base64 data plus its container type.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Base64-encoded audio bytes.
    pub data: String,
    /// Container mime type (e.g. `audio/webm`).
    pub mime_type: String,
}

/// Speech-to-text collaborator.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an encoded audio payload to plain text.
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String>;
}

/// Text polishing collaborator.
#[async_trait]
pub trait TextPolisher: Send + Sync {
    /// Rewrite `raw` according to `instruction`, returning markdown-flavored
    /// text.
    async fn polish(&self, raw: &str, instruction: &str) -> Result<String>;
}
