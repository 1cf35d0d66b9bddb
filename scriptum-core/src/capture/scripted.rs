//! `ScriptedInput` — replay backend without a real device.
//!
//! Hands back a fixed chunk sequence on start, so the full capture → pipeline
//! path can be exercised end-to-end in tests and headless hosts. Failure
//! modes (denied permission, refusing processed capture) are opt-in.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::input::{AudioInput, CaptureConstraints, InputError, InputStream};

pub struct ScriptedInput {
    mime_type: String,
    chunks: Vec<Vec<u8>>,
    deny_permission: bool,
    reject_processed: bool,
    /// Constraint sets seen by `start`, in call order.
    pub starts: Vec<CaptureConstraints>,
}

impl ScriptedInput {
    pub fn new(mime_type: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            chunks,
            deny_permission: false,
            reject_processed: false,
            starts: Vec::new(),
        }
    }

    /// Refuse every start with a permission error.
    pub fn denying() -> Self {
        let mut input = Self::new("audio/webm", Vec::new());
        input.deny_permission = true;
        input
    }

    /// Fail any start that asks for processed capture, forcing the session
    /// onto its fallback constraints.
    pub fn rejecting_processed(mut self) -> Self {
        self.reject_processed = true;
        self
    }
}

#[async_trait]
impl AudioInput for ScriptedInput {
    async fn start(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<InputStream, InputError> {
        self.starts.push(constraints.clone());

        if self.deny_permission {
            return Err(InputError::PermissionDenied("input denied by user".into()));
        }
        if self.reject_processed && constraints.echo_cancellation {
            return Err(InputError::DeviceUnavailable(
                "processed capture unsupported".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            // Capacity covers the whole script, so this never blocks.
            let _ = tx.send(chunk.clone()).await;
        }
        debug!(chunks = self.chunks.len(), "scripted input started");

        Ok(InputStream {
            mime_type: self.mime_type.clone(),
            chunks: rx,
        })
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        debug!("scripted input stopped");
        Ok(())
    }
}
