//! One recording's lifecycle.
//!
//! ```text
//! Idle ──start()──► RequestingInput ──► Recording ──stop()──► Finalizing ──► Idle
//!                        │                  │
//!                        └──────────────────┴──► Error
//! ```
//!
//! The session buffers encoded chunks as the input delivers them and
//! concatenates them into one `EncodedAudio` at stop time. Chunks are
//! discarded immediately after finalization or on error; the session never
//! outlives the attempt it was started for.

pub mod input;
pub mod scripted;

pub use input::{AudioInput, CaptureConstraints, InputError, InputStream};
pub use scripted::ScriptedInput;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, ScriptumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    RequestingInput,
    Recording,
    Finalizing,
    Error,
}

/// A finalized recording: concatenated chunks tagged with the negotiated
/// container type.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub duration_seconds: f64,
}

pub struct CaptureSession {
    state: CaptureState,
    started_at: Option<Instant>,
    mime_type: Option<String>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    collector: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            started_at: None,
            mime_type: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            collector: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Elapsed time since capture began. Display feed only — nothing in the
    /// pipeline depends on it.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// Acquire an input stream and begin buffering chunks.
    ///
    /// The primary constraint set is requested first; if the collaborator
    /// refuses, one retry with all processing disabled follows before the
    /// session lands in `Error`.
    pub async fn start(&mut self, input: &mut dyn AudioInput) -> Result<()> {
        if matches!(
            self.state,
            CaptureState::RequestingInput | CaptureState::Recording | CaptureState::Finalizing
        ) {
            return Err(ScriptumError::AlreadyRecording);
        }

        self.state = CaptureState::RequestingInput;
        let stream = match input.start(&CaptureConstraints::primary()).await {
            Ok(stream) => stream,
            Err(primary_err) => {
                warn!(
                    error = %primary_err,
                    "primary capture request failed — retrying with processing disabled"
                );
                match input.start(&CaptureConstraints::fallback()).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        self.state = CaptureState::Error;
                        // Release anything the collaborator partially acquired.
                        let _ = input.stop().await;
                        return Err(classify_input_error(e));
                    }
                }
            }
        };

        info!(mime_type = %stream.mime_type, "capture stream open");
        self.mime_type = Some(stream.mime_type);
        self.chunks.lock().clear();

        let buffer = Arc::clone(&self.chunks);
        let mut rx = stream.chunks;
        self.collector = Some(tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if chunk.is_empty() {
                    continue;
                }
                buffer.lock().push(chunk);
            }
            debug!("chunk collector drained");
        }));

        self.started_at = Some(Instant::now());
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Stop recording and finalize the buffered chunks.
    ///
    /// Returns `Ok(None)` when the session is not recording (stop is
    /// idempotent), and `EmptyCapture` when the input delivered no data.
    pub async fn stop(&mut self, input: &mut dyn AudioInput) -> Result<Option<EncodedAudio>> {
        if self.state != CaptureState::Recording {
            debug!(state = ?self.state, "stop ignored — not recording");
            return Ok(None);
        }

        self.state = CaptureState::Finalizing;
        self.release(input).await;

        let duration_seconds = self
            .started_at
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let mime_type = self
            .mime_type
            .take()
            .unwrap_or_else(|| "application/octet-stream".into());
        let chunks: Vec<Vec<u8>> = std::mem::take(&mut *self.chunks.lock());
        self.state = CaptureState::Idle;

        let total: usize = chunks.iter().map(Vec::len).sum();
        if total == 0 {
            return Err(ScriptumError::EmptyCapture);
        }

        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        info!(
            bytes = bytes.len(),
            mime_type = %mime_type,
            duration_seconds,
            "capture finalized"
        );
        Ok(Some(EncodedAudio {
            bytes,
            mime_type,
            duration_seconds,
        }))
    }

    /// Force-stop, discarding all buffered audio without finalizing.
    pub async fn abort(&mut self, input: &mut dyn AudioInput) {
        if self.state != CaptureState::Recording {
            return;
        }
        info!("recording aborted — buffered audio discarded");
        self.release(input).await;
        self.chunks.lock().clear();
        self.started_at = None;
        self.mime_type = None;
        self.state = CaptureState::Idle;
    }

    async fn release(&mut self, input: &mut dyn AudioInput) {
        if let Err(e) = input.stop().await {
            warn!(error = %e, "input stop reported an error");
        }
        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                warn!(error = %e, "chunk collector panicked");
            }
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_input_error(e: InputError) -> ScriptumError {
    match e {
        InputError::PermissionDenied(msg) => ScriptumError::InputAccessDenied(msg),
        InputError::DeviceUnavailable(msg) => ScriptumError::InputAccessFailed(msg),
    }
}
