//! # scriptum-core
//!
//! Voice note engine SDK: record or ingest audio, hand it to a remote
//! speech-to-text model, and turn the result into a polished, persisted note.
//!
//! ## Architecture
//!
//! ```text
//! AudioInput ─► CaptureSession ─► Pipeline (base64 → SpeechToText → TextPolisher → title)
//!                                     │
//!                          ScriptumEngine (active note + generation guard)
//!                                     │
//!                        NoteStore ─► StorageBackend slots
//!                                     │
//!                     broadcast events ─► presentation surface
//! ```
//!
//! The engine is headless: capture, the remote model, and rendering are all
//! collaborator traits. Hosts subscribe to the broadcast channels and derive
//! every presentation attribute from the events — never the reverse.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod model;
pub mod note;
pub mod pipeline;
pub mod store;

// Convenience re-exports for downstream crates
pub use capture::{
    AudioInput, CaptureConstraints, CaptureSession, CaptureState, EncodedAudio, InputError,
    InputStream, ScriptedInput,
};
pub use config::EngineConfig;
pub use engine::ScriptumEngine;
pub use error::{Result, ScriptumError};
pub use events::{ActiveNoteEvent, CollectionEvent, EngineStatus, StatusEvent};
pub use export::{ExportArtifact, ExportFormat};
pub use model::{AudioPayload, SpeechToText, StubModel, TextPolisher};
pub use note::Note;
pub use pipeline::{DiagnosticsSnapshot, UploadedFile};
pub use store::slot::{FileBackend, MemoryBackend, StorageBackend};
pub use store::theme::ThemePreference;
pub use store::NoteStore;
