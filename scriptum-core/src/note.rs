//! The persisted note record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used until one is derived from polished content.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// One note as held in memory and serialized into the `notes` storage slot.
///
/// `word_count` and `duration_seconds` are derived metrics: they are
/// recomputed whenever the underlying text or recording changes and are never
/// treated as authoritative when read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub raw_transcription: String,
    pub polished_note: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl Note {
    /// A fresh, empty note with a new identifier and the current timestamp.
    /// Not persisted until it gains content (see `NoteStore::upsert`).
    pub fn new() -> Self {
        Self {
            id: new_id("note"),
            title: DEFAULT_TITLE.into(),
            raw_transcription: String::new(),
            polished_note: String::new(),
            timestamp: Utc::now(),
            word_count: None,
            duration_seconds: None,
        }
    }

    /// Whether this note qualifies for persistence.
    pub fn has_content(&self) -> bool {
        !self.raw_transcription.trim().is_empty() || !self.polished_note.trim().is_empty()
    }

    /// Recompute `word_count` from the current text (raw transcript when
    /// present, polished text otherwise).
    pub fn recompute_word_count(&mut self) {
        let text = if self.raw_transcription.trim().is_empty() {
            &self.polished_note
        } else {
            &self.raw_transcription
        };
        self.word_count = Some(text.split_whitespace().count());
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}
