//! `ScriptumEngine` — top-level lifecycle controller and session coordinator.
//!
//! ## Lifecycle
//!
//! ```text
//! ScriptumEngine::new()
//!     ├─► start_recording()   → capture session opens the input stream
//!     │       └─► finish_recording() → stop, then transcribe → polish → commit
//!     ├─► ingest_files()      → batch transcribe → polish → commit
//!     └─► new_note()/select_note()/delete_note()/clear_notes()/search()
//! ```
//!
//! The engine owns the single active note and its generation tag. Every
//! pipeline run captures the generation when it starts and re-checks it under
//! the active-note lock before committing; a run that lost the race (the user
//! already moved on) drops its result silently instead of overwriting the new
//! active note. In-flight network calls are never cancelled — the generation
//! check makes their late completions harmless.
//!
//! `ScriptumEngine` is `Send + Sync`; all fields use interior mutability.
//! Wrap it in `Arc` to share between a host's UI tasks and event forwarders.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, info};

use crate::capture::{AudioInput, CaptureSession, EncodedAudio};
use crate::config::EngineConfig;
use crate::error::{Result, ScriptumError};
use crate::events::{ActiveNoteEvent, CollectionEvent, EngineStatus, StatusEvent};
use crate::export::{self, ExportArtifact, ExportFormat};
use crate::model::{SpeechToText, TextPolisher};
use crate::note::Note;
use crate::pipeline::{DiagnosticsSnapshot, Pipeline, PipelineDiagnostics, UploadedFile};
use crate::store::slot::StorageBackend;
use crate::store::theme::{self, ThemePreference};
use crate::store::NoteStore;

/// Broadcast channel capacity per event kind.
const BROADCAST_CAP: usize = 256;

struct Recorder {
    session: CaptureSession,
    input: Box<dyn AudioInput>,
}

pub struct ScriptumEngine {
    backend: Arc<dyn StorageBackend>,
    store: Mutex<NoteStore>,
    active: Mutex<Note>,
    /// Bumped whenever the active note is swapped; pipeline runs compare
    /// against the value they started with.
    generation: AtomicU64,
    recorder: AsyncMutex<Recorder>,
    pipeline: Pipeline,
    status_tx: broadcast::Sender<StatusEvent>,
    collection_tx: broadcast::Sender<CollectionEvent>,
    active_tx: broadcast::Sender<ActiveNoteEvent>,
    revision: AtomicU64,
    diagnostics: Arc<PipelineDiagnostics>,
}

impl ScriptumEngine {
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn StorageBackend>,
        input: Box<dyn AudioInput>,
        stt: Arc<dyn SpeechToText>,
        polisher: Arc<dyn TextPolisher>,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (collection_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (active_tx, _) = broadcast::channel(BROADCAST_CAP);
        let diagnostics = Arc::new(PipelineDiagnostics::default());
        let pipeline = Pipeline::new(
            stt,
            polisher,
            config,
            status_tx.clone(),
            Arc::clone(&diagnostics),
        );
        let store = NoteStore::open(Arc::clone(&backend));
        info!(notes = store.len(), "engine ready");

        Self {
            backend,
            store: Mutex::new(store),
            active: Mutex::new(Note::new()),
            generation: AtomicU64::new(0),
            recorder: AsyncMutex::new(Recorder {
                session: CaptureSession::new(),
                input,
            }),
            pipeline,
            status_tx,
            collection_tx,
            active_tx,
            revision: AtomicU64::new(0),
            diagnostics,
        }
    }

    // ── Notes ────────────────────────────────────────────────────────────

    /// Snapshot of the note currently bound to the editing surface.
    pub fn active_note(&self) -> Note {
        self.active.lock().clone()
    }

    /// Persisted collection snapshot in display order.
    pub fn notes(&self) -> Vec<Note> {
        self.store.lock().notes().to_vec()
    }

    pub fn search(&self, query: &str) -> Vec<Note> {
        self.store.lock().search(query)
    }

    /// Replace the active note with a fresh empty one.
    ///
    /// The only clean way to abandon an in-progress run: an in-flight
    /// recording is force-stopped with its audio discarded, and the
    /// generation bump makes any still-running pipeline drop its result.
    pub async fn new_note(&self) -> Note {
        {
            let mut guard = self.recorder.lock().await;
            let recorder = &mut *guard;
            if recorder.session.is_recording() {
                recorder.session.abort(recorder.input.as_mut()).await;
                self.emit_status(EngineStatus::Idle, Some("Recording discarded".into()));
            }
        }
        let note = Note::new();
        let generation = self.swap_active(note.clone());
        debug!(id = %note.id, generation, "new active note");
        note
    }

    /// Swap the active note to an existing persisted note. No-op when the id
    /// is unknown.
    pub fn select_note(&self, id: &str) -> Option<Note> {
        let found = self.store.lock().get(id).cloned();
        let Some(note) = found else {
            debug!(id, "select ignored — unknown note");
            return None;
        };
        let generation = self.swap_active(note.clone());
        debug!(id = %note.id, generation, "note selected");
        Some(note)
    }

    /// Remove a note from the collection. A deleted active note is replaced
    /// with a fresh empty one.
    pub async fn delete_note(&self, id: &str) -> Result<bool> {
        let (removed, notes) = {
            let mut store = self.store.lock();
            let removed = store.delete(id)?;
            (removed, store.notes().to_vec())
        };
        self.emit_collection(notes);
        let was_active = self.active.lock().id == id;
        if was_active {
            self.new_note().await;
        }
        Ok(removed)
    }

    /// Empty the whole collection. Hosts call this only after their own
    /// confirmation step; the active note is reset alongside.
    pub async fn clear_notes(&self) -> Result<()> {
        {
            let mut store = self.store.lock();
            store.clear()?;
        }
        self.emit_collection(Vec::new());
        self.new_note().await;
        Ok(())
    }

    // ── Recording ────────────────────────────────────────────────────────

    /// Open the capture stream and begin buffering audio.
    pub async fn start_recording(&self) -> Result<()> {
        let mut guard = self.recorder.lock().await;
        let recorder = &mut *guard;
        self.emit_status(EngineStatus::Requesting, None);
        match recorder.session.start(recorder.input.as_mut()).await {
            Ok(()) => {
                self.emit_status(EngineStatus::Recording, None);
                Ok(())
            }
            Err(e) => {
                self.emit_status(EngineStatus::Error, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Whether a capture session is currently buffering audio.
    pub async fn is_recording(&self) -> bool {
        self.recorder.lock().await.session.is_recording()
    }

    /// Elapsed time of the in-flight recording, for live display.
    pub async fn recording_elapsed(&self) -> Option<std::time::Duration> {
        self.recorder.lock().await.session.elapsed()
    }

    /// Stop the in-flight recording and run the full pipeline on its audio.
    /// A stop with nothing recording is a quiet no-op.
    pub async fn finish_recording(&self) -> Result<()> {
        let audio = {
            let mut guard = self.recorder.lock().await;
            let recorder = &mut *guard;
            match recorder.session.stop(recorder.input.as_mut()).await {
                Ok(Some(audio)) => audio,
                Ok(None) => return Ok(()),
                Err(e) => {
                    self.emit_status(EngineStatus::Error, Some(e.to_string()));
                    return Err(e);
                }
            }
        };
        self.run_recording_pipeline(audio).await
    }

    /// Run dropped or picked files through the batch pipeline.
    pub async fn ingest_files(&self, files: Vec<UploadedFile>) -> Result<()> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.diagnostics.runs_started.fetch_add(1, Ordering::Relaxed);
        let outcome: Result<bool> = async {
            let raw = self.pipeline.transcribe_batch(&files).await?;
            if !self.commit_raw(generation, &raw, None)? {
                return Ok(false);
            }
            let (polished, title) = self.pipeline.polish(&raw).await?;
            Ok(self.commit_polished(generation, &polished, title)?)
        }
        .await;
        self.finish_run(outcome)
    }

    async fn run_recording_pipeline(&self, audio: EncodedAudio) -> Result<()> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.diagnostics.runs_started.fetch_add(1, Ordering::Relaxed);
        let duration = audio.duration_seconds;
        let outcome: Result<bool> = async {
            let raw = self.pipeline.transcribe_recording(&audio).await?;
            if !self.commit_raw(generation, &raw, Some(duration))? {
                return Ok(false);
            }
            let (polished, title) = self.pipeline.polish(&raw).await?;
            Ok(self.commit_polished(generation, &polished, title)?)
        }
        .await;
        self.finish_run(outcome)
    }

    fn finish_run(&self, outcome: Result<bool>) -> Result<()> {
        match outcome {
            Ok(true) => {
                self.diagnostics
                    .runs_committed
                    .fetch_add(1, Ordering::Relaxed);
                self.emit_status(EngineStatus::Saved, None);
                Ok(())
            }
            // The active note moved on mid-run; the result was dropped.
            Ok(false) => Ok(()),
            Err(e) => {
                self.diagnostics.runs_failed.fetch_add(1, Ordering::Relaxed);
                self.emit_status(EngineStatus::Error, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Commit the raw transcript into the active note, persist, and notify.
    /// Returns `Ok(false)` when the run is stale.
    fn commit_raw(
        &self,
        generation: u64,
        raw: &str,
        duration_seconds: Option<f64>,
    ) -> Result<bool> {
        let note = {
            let mut active = self.active.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                self.diagnostics
                    .runs_discarded_stale
                    .fetch_add(1, Ordering::Relaxed);
                debug!(generation, "stale transcription result discarded");
                return Ok(false);
            }
            active.raw_transcription = raw.to_string();
            if let Some(duration) = duration_seconds {
                active.duration_seconds = Some(duration);
            }
            active.recompute_word_count();
            active.clone()
        };
        self.emit_active(generation, note.clone());
        self.persist(note)?;
        Ok(true)
    }

    /// Commit polished text and derived title, persist, and notify.
    /// Returns `false` when the run is stale.
    fn commit_polished(
        &self,
        generation: u64,
        polished: &str,
        title: Option<String>,
    ) -> Result<bool> {
        let note = {
            let mut active = self.active.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                self.diagnostics
                    .runs_discarded_stale
                    .fetch_add(1, Ordering::Relaxed);
                debug!(generation, "stale polish result discarded");
                return Ok(false);
            }
            active.polished_note = polished.to_string();
            if let Some(title) = title {
                active.title = title;
            }
            active.recompute_word_count();
            active.clone()
        };
        self.emit_active(generation, note.clone());
        self.persist(note)?;
        Ok(true)
    }

    fn persist(&self, note: Note) -> Result<()> {
        let notes = {
            let mut store = self.store.lock();
            if !store.upsert(note)? {
                return Ok(());
            }
            store.notes().to_vec()
        };
        self.emit_collection(notes);
        Ok(())
    }

    fn swap_active(&self, note: Note) -> u64 {
        let generation = {
            let mut active = self.active.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *active = note.clone();
            generation
        };
        self.emit_active(generation, note);
        generation
    }

    // ── Export / theme ───────────────────────────────────────────────────

    pub fn export_note(&self, id: &str, format: ExportFormat) -> Result<ExportArtifact> {
        let note = self
            .store
            .lock()
            .get(id)
            .cloned()
            .or_else(|| {
                let active = self.active.lock();
                (active.id == id).then(|| active.clone())
            })
            .ok_or_else(|| ScriptumError::UnknownNote(id.to_string()))?;
        export::export_note(&note, format)
    }

    pub fn export_collection(&self, format: ExportFormat) -> Result<ExportArtifact> {
        export::export_collection(&self.notes(), format)
    }

    pub fn theme(&self) -> ThemePreference {
        theme::load_theme(self.backend.as_ref())
    }

    pub fn set_theme(&self, preference: ThemePreference) -> Result<()> {
        theme::save_theme(self.backend.as_ref(), preference)?;
        Ok(())
    }

    // ── Observability ────────────────────────────────────────────────────

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_collection(&self) -> broadcast::Receiver<CollectionEvent> {
        self.collection_tx.subscribe()
    }

    pub fn subscribe_active(&self) -> broadcast::Receiver<ActiveNoteEvent> {
        self.active_tx.subscribe()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    fn emit_status(&self, status: EngineStatus, detail: Option<String>) {
        let _ = self.status_tx.send(StatusEvent { status, detail });
    }

    fn emit_collection(&self, notes: Vec<Note>) {
        let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.collection_tx.send(CollectionEvent { revision, notes });
    }

    fn emit_active(&self, generation: u64, note: Note) {
        let _ = self.active_tx.send(ActiveNoteEvent { generation, note });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::capture::ScriptedInput;
    use crate::model::AudioPayload;
    use crate::store::slot::MemoryBackend;
    use crate::store::NOTES_SLOT;

    /// Model fake with an optional gate: when set, transcribe signals
    /// `entered` and then parks until the test releases `gate`, so races with
    /// `new_note` can be staged deterministically.
    struct GatedModel {
        transcript: String,
        polish_fails: bool,
        gate: Option<(Arc<tokio::sync::Notify>, Arc<tokio::sync::Notify>)>,
        polished: String,
    }

    impl GatedModel {
        fn ok(transcript: &str, polished: &str) -> Self {
            Self {
                transcript: transcript.into(),
                polish_fails: false,
                gate: None,
                polished: polished.into(),
            }
        }

        fn failing_polish(transcript: &str) -> Self {
            Self {
                transcript: transcript.into(),
                polish_fails: true,
                gate: None,
                polished: String::new(),
            }
        }

        fn gated(
            transcript: &str,
            polished: &str,
            entered: Arc<tokio::sync::Notify>,
            gate: Arc<tokio::sync::Notify>,
        ) -> Self {
            Self {
                transcript: transcript.into(),
                polish_fails: false,
                gate: Some((entered, gate)),
                polished: polished.into(),
            }
        }
    }

    #[async_trait]
    impl SpeechToText for GatedModel {
        async fn transcribe(&self, _audio: &AudioPayload) -> Result<String> {
            if let Some((entered, gate)) = &self.gate {
                entered.notify_one();
                gate.notified().await;
            }
            Ok(self.transcript.clone())
        }
    }

    #[async_trait]
    impl TextPolisher for GatedModel {
        async fn polish(&self, _raw: &str, _instruction: &str) -> Result<String> {
            if self.polish_fails {
                return Err(ScriptumError::PolishingEmpty);
            }
            Ok(self.polished.clone())
        }
    }

    fn engine_with(model: GatedModel, backend: Arc<MemoryBackend>) -> Arc<ScriptumEngine> {
        let model = Arc::new(model);
        Arc::new(ScriptumEngine::new(
            EngineConfig::default(),
            backend,
            Box::new(ScriptedInput::new("audio/webm", vec![vec![1, 2, 3]])),
            model.clone(),
            model,
        ))
    }

    fn persisted(backend: &MemoryBackend) -> Vec<Note> {
        backend
            .get(NOTES_SLOT)
            .map(|raw| serde_json::from_str(&raw).expect("notes slot parses"))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn recording_run_commits_transcript_polish_and_title() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(
            GatedModel::ok("raw words here", "# Meeting Recap\n\n- decisions"),
            backend.clone(),
        );

        engine.start_recording().await.expect("start");
        assert!(engine.is_recording().await);
        engine.finish_recording().await.expect("finish");

        let active = engine.active_note();
        assert_eq!(active.raw_transcription, "raw words here");
        assert_eq!(active.polished_note, "# Meeting Recap\n\n- decisions");
        assert_eq!(active.title, "Meeting Recap");
        assert_eq!(active.word_count, Some(3));
        assert!(active.duration_seconds.is_some());

        // Persisted slot and in-memory collection agree.
        assert_eq!(engine.notes(), persisted(&backend));
        assert_eq!(engine.notes()[0].id, active.id);
    }

    #[tokio::test]
    async fn finish_without_recording_is_a_quiet_no_op() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("t", "# T"), backend);

        engine.finish_recording().await.expect("no-op");
        assert!(engine.notes().is_empty());
    }

    #[tokio::test]
    async fn polish_failure_retains_the_committed_raw_transcript() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::failing_polish("partial progress"), backend.clone());

        engine.start_recording().await.expect("start");
        let err = engine.finish_recording().await.expect_err("polish fails");
        assert!(matches!(err, ScriptumError::PolishingEmpty));

        let active = engine.active_note();
        assert_eq!(active.raw_transcription, "partial progress");
        assert!(active.polished_note.is_empty());
        // The partial result was persisted, not rolled back.
        assert_eq!(persisted(&backend)[0].raw_transcription, "partial progress");
    }

    #[tokio::test]
    async fn stale_pipeline_result_is_discarded_after_new_note() {
        let backend = Arc::new(MemoryBackend::new());
        let entered = Arc::new(tokio::sync::Notify::new());
        let gate = Arc::new(tokio::sync::Notify::new());
        let engine = engine_with(
            GatedModel::gated("late words", "# Late", entered.clone(), gate.clone()),
            backend.clone(),
        );

        engine.start_recording().await.expect("start");
        let runner = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.finish_recording().await })
        };
        // Wait until the run is parked inside the transcribe call, then move on.
        entered.notified().await;
        let fresh = engine.new_note().await;
        gate.notify_one();

        runner.await.expect("task").expect("run ends cleanly");

        let active = engine.active_note();
        assert_eq!(active.id, fresh.id);
        assert!(active.raw_transcription.is_empty());
        assert!(engine.notes().is_empty());
        assert!(persisted(&backend).is_empty());
        assert_eq!(engine.diagnostics_snapshot().runs_discarded_stale, 1);
    }

    #[tokio::test]
    async fn new_note_mid_recording_discards_the_audio() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("t", "# T"), backend);

        engine.start_recording().await.expect("start");
        engine.new_note().await;
        assert!(!engine.is_recording().await);

        // The follow-up stop finds nothing to finalize.
        engine.finish_recording().await.expect("no-op");
        assert!(engine.notes().is_empty());
    }

    #[tokio::test]
    async fn deleting_the_active_note_installs_a_fresh_one() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("words", "# Title"), backend.clone());

        engine.start_recording().await.expect("start");
        engine.finish_recording().await.expect("finish");
        let saved = engine.active_note();

        let removed = engine.delete_note(&saved.id).await.expect("delete");
        assert!(removed);

        let active = engine.active_note();
        assert_ne!(active.id, saved.id);
        assert!(!active.has_content());
        assert!(engine.notes().iter().all(|n| n.id != saved.id));
        assert_eq!(engine.notes(), persisted(&backend));
    }

    #[tokio::test]
    async fn select_note_swaps_the_active_reference() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("words", "# Title"), backend);

        engine.start_recording().await.expect("start");
        engine.finish_recording().await.expect("finish");
        let saved = engine.active_note();

        engine.new_note().await;
        assert_ne!(engine.active_note().id, saved.id);

        let selected = engine.select_note(&saved.id).expect("known note");
        assert_eq!(selected.id, saved.id);
        assert_eq!(engine.active_note().id, saved.id);

        assert!(engine.select_note("note-does-not-exist").is_none());
        assert_eq!(engine.active_note().id, saved.id);
    }

    #[tokio::test]
    async fn abandoned_empty_note_is_never_persisted() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("words", "# Title"), backend.clone());

        engine.new_note().await;
        engine.new_note().await;
        assert!(engine.notes().is_empty());
        assert!(persisted(&backend).is_empty());
    }

    #[tokio::test]
    async fn clear_notes_empties_collection_and_resets_active() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("words", "# Title"), backend.clone());

        engine.start_recording().await.expect("start");
        engine.finish_recording().await.expect("finish");
        assert_eq!(engine.notes().len(), 1);

        engine.clear_notes().await.expect("clear");
        assert!(engine.notes().is_empty());
        assert!(persisted(&backend).is_empty());
        assert!(!engine.active_note().has_content());
    }

    #[tokio::test]
    async fn batch_ingest_flows_through_the_same_commit_path() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("<A>", "# Batch Note\n\nbody"), backend);

        let files = vec![
            UploadedFile {
                name: "a.wav".into(),
                mime_type: "audio/wav".into(),
                bytes: vec![1],
            },
            UploadedFile {
                name: "b.wav".into(),
                mime_type: "audio/wav".into(),
                bytes: vec![2],
            },
        ];
        engine.ingest_files(files).await.expect("batch");

        let active = engine.active_note();
        assert_eq!(
            active.raw_transcription,
            "--- Transcription for a.wav ---\n\n<A>\n\n--- Transcription for b.wav ---\n\n<A>"
        );
        assert_eq!(active.title, "Batch Note");
    }

    #[tokio::test]
    async fn theme_preference_round_trips_through_the_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("t", "# T"), backend);

        assert_eq!(engine.theme(), ThemePreference::Dark);
        engine.set_theme(ThemePreference::Light).expect("set light");
        assert_eq!(engine.theme(), ThemePreference::Light);
        engine.set_theme(ThemePreference::Dark).expect("set dark");
        assert_eq!(engine.theme(), ThemePreference::Dark);
    }

    #[tokio::test]
    async fn status_events_trace_the_run() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(GatedModel::ok("words", "# Title"), backend);
        let mut status_rx = engine.subscribe_status();

        engine.start_recording().await.expect("start");
        engine.finish_recording().await.expect("finish");

        let mut seen = Vec::new();
        while let Ok(event) = status_rx.try_recv() {
            seen.push(event.status);
        }
        assert_eq!(
            seen,
            vec![
                EngineStatus::Requesting,
                EngineStatus::Recording,
                EngineStatus::Transcribing,
                EngineStatus::Polishing,
                EngineStatus::Saved,
            ]
        );
    }
}
