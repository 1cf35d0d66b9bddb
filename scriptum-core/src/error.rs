use thiserror::Error;

/// All errors produced by scriptum-core.
#[derive(Debug, Error)]
pub enum ScriptumError {
    #[error("microphone access denied: {0}")]
    InputAccessDenied(String),

    #[error("audio input unavailable: {0}")]
    InputAccessFailed(String),

    #[error("recording captured no audio")]
    EmptyCapture,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("{name} is {size} bytes — over the {max_bytes} byte upload limit")]
    FileTooLarge {
        name: String,
        size: usize,
        max_bytes: usize,
    },

    #[error("transcription returned empty")]
    TranscriptionEmpty,

    #[error("polishing returned empty")]
    PolishingEmpty,

    #[error("no transcriptions generated")]
    NoTranscriptions,

    #[error("{stage} timed out")]
    StageTimeout { stage: &'static str },

    #[error("unknown note: {0}")]
    UnknownNote(String),

    #[error("remote model error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ScriptumError>;
