//! Export surface.
//!
//! Turns notes into downloadable byte payloads plus suggested filenames. The
//! presentation layer decides how the bytes leave the machine; nothing here
//! touches the filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::note::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Txt,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// A rendered export: suggested filename plus content bytes.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Render one note. `Json` serializes the record verbatim (pretty-printed);
/// the text formats interpolate title, date, polished text, and raw
/// transcription into a fixed template.
pub fn export_note(note: &Note, format: ExportFormat) -> Result<ExportArtifact> {
    let content = match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(note).map_err(anyhow::Error::from)?
        }
        ExportFormat::Markdown => render_markdown(note),
        ExportFormat::Txt => render_txt(note),
    };
    Ok(ExportArtifact {
        filename: filename_for(&note.title, note.timestamp, format),
        bytes: content.into_bytes(),
    })
}

/// Render the whole collection: one JSON array, or the per-note template
/// joined with separators.
pub fn export_collection(notes: &[Note], format: ExportFormat) -> Result<ExportArtifact> {
    let content = match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(notes).map_err(anyhow::Error::from)?
        }
        ExportFormat::Markdown => notes
            .iter()
            .map(render_markdown)
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"),
        ExportFormat::Txt => notes
            .iter()
            .map(render_txt)
            .collect::<Vec<_>>()
            .join("\n\n==========\n\n"),
    };
    Ok(ExportArtifact {
        filename: filename_for("all notes", Utc::now(), format),
        bytes: content.into_bytes(),
    })
}

fn render_markdown(note: &Note) -> String {
    format!(
        "# {}\n\n_{}_\n\n{}\n\n---\n\n## Raw Transcription\n\n{}\n",
        note.title,
        format_date(note.timestamp),
        note.polished_note.trim(),
        note.raw_transcription.trim()
    )
}

fn render_txt(note: &Note) -> String {
    format!(
        "{}\n{}\n\n{}\n\n--- Raw Transcription ---\n\n{}\n",
        note.title,
        format_date(note.timestamp),
        note.polished_note.trim(),
        note.raw_transcription.trim()
    )
}

fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn filename_for(title: &str, timestamp: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "{}-{}.{}",
        sanitize_title(title),
        timestamp.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Lower-case the title and collapse every non-alphanumeric run into a single
/// dash.
fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "note".into()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        let mut note = Note::new();
        note.title = "Weekly Plan: Q3!".into();
        note.raw_transcription = "raw words".into();
        note.polished_note = "# Weekly Plan\n\n- ship it".into();
        note
    }

    #[test]
    fn json_export_round_trips_to_an_equal_note() {
        let note = sample_note();
        let artifact = export_note(&note, ExportFormat::Json).expect("export");
        let parsed: Note =
            serde_json::from_slice(&artifact.bytes).expect("exported JSON parses");
        assert_eq!(parsed, note);
    }

    #[test]
    fn filenames_are_sanitized_and_dated() {
        let note = sample_note();
        let artifact = export_note(&note, ExportFormat::Markdown).expect("export");
        let expected_date = note.timestamp.format("%Y-%m-%d").to_string();
        assert_eq!(
            artifact.filename,
            format!("weekly-plan-q3-{expected_date}.md")
        );
    }

    #[test]
    fn unusable_titles_fall_back_to_a_generic_stem() {
        assert_eq!(sanitize_title("!!!"), "note");
        assert_eq!(sanitize_title(""), "note");
    }

    #[test]
    fn markdown_template_interpolates_all_fields() {
        let note = sample_note();
        let artifact = export_note(&note, ExportFormat::Markdown).expect("export");
        let text = String::from_utf8(artifact.bytes).expect("utf8");
        assert!(text.starts_with("# Weekly Plan: Q3!\n"));
        assert!(text.contains("- ship it"));
        assert!(text.contains("## Raw Transcription"));
        assert!(text.contains("raw words"));
    }

    #[test]
    fn collection_json_export_is_one_array() {
        let notes = vec![sample_note(), sample_note()];
        let artifact = export_collection(&notes, ExportFormat::Json).expect("export");
        let parsed: Vec<Note> =
            serde_json::from_slice(&artifact.bytes).expect("exported JSON parses");
        assert_eq!(parsed, notes);
        assert!(artifact.filename.starts_with("all-notes-"));
        assert!(artifact.filename.ends_with(".json"));
    }

    #[test]
    fn collection_text_export_joins_per_note_templates() {
        let notes = vec![sample_note(), sample_note()];
        let artifact = export_collection(&notes, ExportFormat::Txt).expect("export");
        let text = String::from_utf8(artifact.bytes).expect("utf8");
        assert_eq!(text.matches("--- Raw Transcription ---").count(), 2);
        assert_eq!(text.matches("==========").count(), 1);
    }
}
