//! Event types pushed to the presentation surface.
//!
//! The engine owns one broadcast channel per event kind; a host subscribes
//! and renders whatever arrives. Nothing in the core reads these back.

use serde::{Deserialize, Serialize};

use crate::note::Note;

/// Coarse engine state as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Nothing in flight.
    Idle,
    /// Waiting for the capture collaborator to grant an input stream.
    Requesting,
    /// Actively buffering encoded audio.
    Recording,
    /// Remote transcription in progress.
    Transcribing,
    /// Remote polishing in progress.
    Polishing,
    /// Pipeline run committed and persisted.
    Saved,
    /// A stage failed; `detail` carries the user-facing message.
    Error,
}

/// Emitted whenever the engine's processing state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (stage progress, error message).
    pub detail: Option<String>,
}

/// Emitted after every mutation of the persisted collection, carrying the
/// full post-mutation snapshot in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    /// Monotonically increasing revision counter.
    pub revision: u64,
    pub notes: Vec<Note>,
}

/// Emitted whenever the active note changes — a swap to a different note or
/// new content committed into the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveNoteEvent {
    /// Generation tag of the active note at emit time.
    pub generation: u64,
    pub note: Note,
}
