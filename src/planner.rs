// src/planner.rs
//! Destination paths for resolved books: `<root>/<author>/<title>`

use crate::resolver::{MetadataRecord, UNKNOWN_AUTHOR};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-. ()]").unwrap());

/// Title segment used when neither the title nor the folder name survive
pub const UNTITLED: &str = "_untitled_";

/// Sanitize a string for use as a single path segment.
///
/// Keeps word characters, hyphen, period, parentheses and space, then trims
/// leading/trailing dots and spaces so the result is never `.`, `..` or a
/// name Windows would silently rewrite.
pub fn sanitize(s: &str) -> String {
    ILLEGAL
        .replace_all(s, "")
        .trim_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// Explicit output location, or a fixed sibling of the input folder
pub fn output_root(input_folder: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(root) => root.to_path_buf(),
        None => input_folder
            .parent()
            .unwrap_or(input_folder)
            .join(default_name),
    }
}

/// Sanitized author and title segments for a record
pub fn segments(record: &MetadataRecord) -> (String, String) {
    let author = match sanitize(&record.author) {
        a if a.is_empty() => UNKNOWN_AUTHOR.to_string(),
        a => a,
    };

    let title = match sanitize(&record.title) {
        t if !t.is_empty() => t,
        _ => match sanitize(&record.input_folder) {
            f if !f.is_empty() => f,
            _ => UNTITLED.to_string(),
        },
    };

    (author, title)
}

pub fn plan(record: &MetadataRecord, output_root: &Path) -> PathBuf {
    let (author, title) = segments(record);
    output_root.join(author).join(title)
}
