//! Theme preference slot.
//!
//! The slot holds the JSON string `"light"`; absence (or anything
//! undecodable) means dark. Setting dark removes the slot so absence stays
//! the single representation.

use serde::{Deserialize, Serialize};

use crate::store::slot::StorageBackend;

pub const THEME_SLOT: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    #[default]
    Dark,
}

pub fn load_theme(backend: &dyn StorageBackend) -> ThemePreference {
    let Some(raw) = backend.get(THEME_SLOT) else {
        return ThemePreference::Dark;
    };
    match serde_json::from_str::<String>(&raw) {
        Ok(value) if value == "light" => ThemePreference::Light,
        _ => ThemePreference::Dark,
    }
}

pub fn save_theme(backend: &dyn StorageBackend, theme: ThemePreference) -> std::io::Result<()> {
    match theme {
        ThemePreference::Light => backend.set(THEME_SLOT, "\"light\""),
        ThemePreference::Dark => backend.remove(THEME_SLOT),
    }
}
