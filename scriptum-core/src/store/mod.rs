//! Note collection + persistence.
//!
//! `NoteStore` keeps the in-memory collection and the durable `notes` slot
//! identical: every mutating operation flushes before it returns. Load is
//! fail-soft — a missing or undecodable slot is an empty collection, never an
//! error, since the data is locally controlled and availability wins.

pub mod slot;
pub mod theme;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::note::Note;
use slot::StorageBackend;

pub const NOTES_SLOT: &str = "notes";

pub struct NoteStore {
    backend: Arc<dyn StorageBackend>,
    notes: Vec<Note>,
}

impl NoteStore {
    /// Open the store, loading whatever the `notes` slot holds.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        let notes = load_slot(backend.as_ref());
        info!(count = notes.len(), "note store loaded");
        Self { backend, notes }
    }

    /// Collection snapshot in display order (most recently created first;
    /// updates keep their position).
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Insert or replace `note`. Existing notes are replaced in place; new
    /// ones go to the front. Notes without content are skipped entirely so
    /// abandoned sessions never pollute the collection.
    ///
    /// Returns whether the collection changed.
    pub fn upsert(&mut self, note: Note) -> Result<bool> {
        if !note.has_content() {
            debug!(id = %note.id, "upsert skipped — note has no content");
            return Ok(false);
        }
        match self.notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => self.notes.insert(0, note),
        }
        self.flush()?;
        Ok(true)
    }

    /// Remove a note by id. Flushes regardless of whether anything matched.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        let removed = self.notes.len() != before;
        self.flush()?;
        Ok(removed)
    }

    /// Empty the collection. The caller is responsible for having confirmed
    /// this with the user first.
    pub fn clear(&mut self) -> Result<()> {
        self.notes.clear();
        self.flush()
    }

    /// Case-insensitive substring search across title, raw transcription, and
    /// polished text. An empty or whitespace query returns the collection
    /// unfiltered, in its existing order.
    pub fn search(&self, query: &str) -> Vec<Note> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.notes.clone();
        }
        self.notes
            .iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n.raw_transcription.to_lowercase().contains(&needle)
                    || n.polished_note.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string(&self.notes).map_err(anyhow::Error::from)?;
        self.backend.set(NOTES_SLOT, &json)?;
        Ok(())
    }
}

fn load_slot(backend: &dyn StorageBackend) -> Vec<Note> {
    let Some(raw) = backend.get(NOTES_SLOT) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Note>>(&raw) {
        Ok(notes) => notes,
        Err(e) => {
            warn!(error = %e, "notes slot undecodable — treating as empty");
            Vec::new()
        }
    }
}
