//! Engine configuration.

use std::time::Duration;

/// Configuration for `ScriptumEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest uploaded file accepted into a batch, in bytes. Oversized files
    /// are excluded before any network call. Default: 20 MiB (the practical
    /// bound for inline base64 audio on generate-content APIs).
    pub max_upload_bytes: usize,
    /// A fallback title candidate must be strictly longer than this many
    /// characters after markup stripping. Default: 3.
    pub title_min_chars: usize,
    /// Derived titles longer than this are cut and suffixed with an ellipsis.
    /// Default: 60.
    pub title_max_chars: usize,
    /// Optional per-stage bound on the transcribe and polish calls.
    /// `None` leaves the remote calls unbounded. Default: `None`.
    pub stage_timeout: Option<Duration>,
    /// Instruction prompt handed to the polishing collaborator together with
    /// the raw transcript.
    pub polish_instruction: String,
}

const DEFAULT_POLISH_INSTRUCTION: &str = "Rewrite this raw transcription as a clean, well-formatted note. \
Remove filler words, false starts, and repetitions, fix obvious transcription mistakes, \
and structure the content with markdown (headings, lists, paragraphs). \
Begin with a single '#' heading that names the note. \
Preserve the speaker's meaning — do not add information.";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            title_min_chars: 3,
            title_max_chars: 60,
            stage_timeout: None,
            polish_instruction: DEFAULT_POLISH_INSTRUCTION.into(),
        }
    }
}
