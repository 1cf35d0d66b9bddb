//! Transcription/polishing pipeline.
//!
//! ## Stages (per run)
//!
//! ```text
//! 1. Encode audio bytes to base64 (transport-safe form)
//! 2. SpeechToText::transcribe — empty result is a hard stage failure
//! 3. Caller commits the raw transcript into the active note
//! 4. TextPolisher::polish over the single concatenated transcript
//! 5. Title derivation from the polished text
//! 6. Caller commits polished text + title and persists
//! ```
//!
//! Batches transcribe each file sequentially — ordering and incremental
//! status feedback matter more than throughput here — and run exactly one
//! polish pass over the concatenated result. Oversized files are excluded
//! before any network call.
//!
//! Stage failures abort the remainder of the run and leave already-committed
//! fields intact; nothing retries automatically.

pub mod title;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::capture::EncodedAudio;
use crate::config::EngineConfig;
use crate::error::{Result, ScriptumError};
use crate::events::{EngineStatus, StatusEvent};
use crate::model::{AudioPayload, SpeechToText, TextPolisher};

/// One uploaded file feeding the batch path.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Shared counters for observability. Written by the pipeline and the engine,
/// snapshotted on demand.
#[derive(Default)]
pub struct PipelineDiagnostics {
    pub runs_started: AtomicUsize,
    pub runs_committed: AtomicUsize,
    pub runs_discarded_stale: AtomicUsize,
    pub runs_failed: AtomicUsize,
    pub files_excluded: AtomicUsize,
    pub files_failed: AtomicUsize,
}

impl PipelineDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_committed: self.runs_committed.load(Ordering::Relaxed),
            runs_discarded_stale: self.runs_discarded_stale.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            files_excluded: self.files_excluded.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub runs_started: usize,
    pub runs_committed: usize,
    pub runs_discarded_stale: usize,
    pub runs_failed: usize,
    pub files_excluded: usize,
    pub files_failed: usize,
}

pub struct Pipeline {
    stt: Arc<dyn SpeechToText>,
    polisher: Arc<dyn TextPolisher>,
    config: EngineConfig,
    status_tx: broadcast::Sender<StatusEvent>,
    diagnostics: Arc<PipelineDiagnostics>,
}

impl Pipeline {
    pub(crate) fn new(
        stt: Arc<dyn SpeechToText>,
        polisher: Arc<dyn TextPolisher>,
        config: EngineConfig,
        status_tx: broadcast::Sender<StatusEvent>,
        diagnostics: Arc<PipelineDiagnostics>,
    ) -> Self {
        Self {
            stt,
            polisher,
            config,
            status_tx,
            diagnostics,
        }
    }

    /// Transcribe one finalized recording.
    pub async fn transcribe_recording(&self, audio: &EncodedAudio) -> Result<String> {
        self.status(EngineStatus::Transcribing, None);
        let payload = AudioPayload {
            data: BASE64.encode(&audio.bytes),
            mime_type: audio.mime_type.clone(),
        };
        let text = self.call_transcribe(&payload).await?;
        if text.trim().is_empty() {
            return Err(ScriptumError::TranscriptionEmpty);
        }
        debug!(chars = text.len(), "recording transcribed");
        Ok(text)
    }

    /// Transcribe an uploaded batch sequentially, in input order.
    ///
    /// Returns the concatenated transcript: verbatim for a single
    /// contributing file, filename-headed blocks when several contribute.
    pub async fn transcribe_batch(&self, files: &[UploadedFile]) -> Result<String> {
        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            if file.bytes.len() > self.config.max_upload_bytes {
                warn!(
                    name = %file.name,
                    size = file.bytes.len(),
                    max = self.config.max_upload_bytes,
                    "file over size limit — excluded from batch"
                );
                self.diagnostics.files_excluded.fetch_add(1, Ordering::Relaxed);
                self.status(
                    EngineStatus::Transcribing,
                    Some(format!("Skipping {} (too large)", file.name)),
                );
                continue;
            }
            accepted.push(file);
        }

        if accepted.is_empty() {
            return Err(match files.first() {
                Some(file) => ScriptumError::FileTooLarge {
                    name: file.name.clone(),
                    size: file.bytes.len(),
                    max_bytes: self.config.max_upload_bytes,
                },
                None => ScriptumError::NoTranscriptions,
            });
        }

        let total = accepted.len();
        let mut transcripts: Vec<(String, String)> = Vec::with_capacity(total);
        for (index, file) in accepted.into_iter().enumerate() {
            self.status(
                EngineStatus::Transcribing,
                Some(format!(
                    "Transcribing {} ({} of {})",
                    file.name,
                    index + 1,
                    total
                )),
            );
            let payload = AudioPayload {
                data: BASE64.encode(&file.bytes),
                mime_type: file.mime_type.clone(),
            };
            match self.call_transcribe(&payload).await {
                Ok(text) if !text.trim().is_empty() => {
                    transcripts.push((file.name.clone(), text));
                }
                Ok(_) => {
                    warn!(name = %file.name, "transcription returned empty — file contributes nothing");
                    self.diagnostics.files_failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(name = %file.name, error = %e, "transcription failed — file contributes nothing");
                    self.diagnostics.files_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if transcripts.is_empty() {
            return Err(ScriptumError::NoTranscriptions);
        }

        let combined = if transcripts.len() > 1 {
            transcripts
                .iter()
                .map(|(name, text)| format!("--- Transcription for {name} ---\n\n{text}"))
                .collect::<Vec<_>>()
                .join("\n\n")
        } else {
            transcripts.remove(0).1
        };
        Ok(combined)
    }

    /// Polish a raw transcript and derive a title from the result.
    pub async fn polish(&self, raw: &str) -> Result<(String, Option<String>)> {
        self.status(EngineStatus::Polishing, None);
        let polished = self.call_polish(raw).await?;
        if polished.trim().is_empty() {
            return Err(ScriptumError::PolishingEmpty);
        }
        let derived = title::derive_title(
            &polished,
            self.config.title_min_chars,
            self.config.title_max_chars,
        );
        debug!(chars = polished.len(), title = ?derived, "transcript polished");
        Ok((polished, derived))
    }

    pub fn diagnostics(&self) -> &Arc<PipelineDiagnostics> {
        &self.diagnostics
    }

    async fn call_transcribe(&self, payload: &AudioPayload) -> Result<String> {
        with_stage_timeout(
            self.config.stage_timeout,
            "transcription",
            self.stt.transcribe(payload),
        )
        .await
    }

    async fn call_polish(&self, raw: &str) -> Result<String> {
        with_stage_timeout(
            self.config.stage_timeout,
            "polishing",
            self.polisher.polish(raw, &self.config.polish_instruction),
        )
        .await
    }

    fn status(&self, status: EngineStatus, detail: Option<String>) {
        let _ = self.status_tx.send(StatusEvent { status, detail });
    }
}

async fn with_stage_timeout<F>(
    limit: Option<Duration>,
    stage: &'static str,
    fut: F,
) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    match limit {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ScriptumError::StageTimeout { stage }),
        },
    }
}
