// Obsidian naming helpers: file stems, tags and wiki links

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest file stem we produce, in characters
pub const MAX_STEM_CHARS: usize = 100;

// Characters the filesystem or Obsidian's link syntax cannot carry
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|#^\[\]\x00-\x1f]"#).expect("valid filename regex"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static TAG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid separator regex"));
static TAG_INVALID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_/]").expect("valid tag regex"));

/// Turn a note title into a safe file stem (no extension).
///
/// Spaces are kept so the stem reads like the title in Obsidian's file list.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(title, "");
    let collapsed = WHITESPACE_RUN.replace_all(cleaned.trim(), " ");
    let stem: String = collapsed.chars().take(MAX_STEM_CHARS).collect();
    let stem = stem.trim().trim_end_matches('.').trim_end();

    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// Normalise a concept into an Obsidian tag body (without `#`).
///
/// `"Graph Theory"` becomes `graph_theory`. Returns `None` when nothing usable
/// is left.
pub fn format_tag(concept: &str) -> Option<String> {
    let lower = concept.trim().trim_start_matches('#').to_lowercase();
    let joined = TAG_SEPARATORS.replace_all(&lower, "_");
    let tag = TAG_INVALID.replace_all(&joined, "");
    let tag = tag.trim_matches(|c| c == '_' || c == '/');

    // Obsidian rejects purely numeric tags
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit() || c == '_' || c == '/') {
        None
    } else {
        Some(tag.to_string())
    }
}

/// `[[stem]]`
pub fn wiki_link(stem: &str) -> String {
    format!("[[{}]]", stem)
}
