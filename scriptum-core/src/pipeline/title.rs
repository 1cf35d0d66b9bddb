//! Title derivation from polished text.

/// Derive a display title from markdown-flavored polished text.
///
/// The first line that starts with a heading marker wins, marker stripped.
/// Failing that, the first non-empty line with leading markup stripped is
/// used, provided it is longer than `min_chars`; shorter candidates are
/// skipped and the scan continues. Long candidates are cut at `max_chars`
/// with an ellipsis.
pub fn derive_title(polished: &str, min_chars: usize, max_chars: usize) -> Option<String> {
    for line in polished.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix('#') {
            let heading = rest.trim_start_matches('#').trim();
            if !heading.is_empty() {
                return Some(truncate_with_ellipsis(heading, max_chars));
            }
        }
    }

    for line in polished.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let cleaned = trimmed
            .trim_start_matches(|c: char| matches!(c, '#' | '*' | '-' | '+' | '>' | '`' | '_'))
            .trim();
        if cleaned.chars().count() > min_chars {
            return Some(truncate_with_ellipsis(cleaned, max_chars));
        }
    }

    None
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
