// src/templates.rs
//! Sidecar files written next to an organized book: `metadata.opf` for
//! Audiobookshelf and `info.txt` for players that show a summary.

use crate::resolver::MetadataRecord;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([A-Z]+)__").unwrap());

pub const DEFAULT_OPF_TEMPLATE: &str = include_str!("../templates/metadata.opf");

/// Substitute every `__FIELD__` placeholder with the record's value.
///
/// A single pass over the template, so placeholder-looking text inside a
/// value is left alone. Unknown placeholders stay as written. Values go in
/// verbatim. The unknown-author sentinel and a title that is
/// just the folder name render as empty so the sidecar never repeats a
/// fallback as if it were scraped.
pub fn render_template(template: &str, record: &MetadataRecord) -> String {
    let author = if record.author_is_sentinel() { "" } else { record.author.as_str() };
    let title = if record.title_is_folder_name() { "" } else { record.title.as_str() };

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let value = match &caps[1] {
                "AUTHOR" => author,
                "TITLE" => title,
                "SUMMARY" => record.summary.as_str(),
                "SUBTITLE" => record.subtitle.as_str(),
                "NARRATOR" => record.narrator.as_str(),
                "PUBLISHER" => record.publisher.as_str(),
                "PUBLISHYEAR" => record.publish_year.as_str(),
                "GENRES" => record.genres.as_str(),
                "ISBN" => record.isbn.as_str(),
                "ASIN" => record.asin.as_str(),
                "SERIES" => record.series.as_str(),
                "VOLUMENUMBER" => record.volume_number.as_str(),
                _ => return caps[0].to_string(),
            };
            value.to_string()
        })
        .into_owned()
}

/// Custom template from disk, or the built-in one
pub fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read OPF template {}", path.display())),
        None => Ok(DEFAULT_OPF_TEMPLATE.to_string()),
    }
}

pub fn write_opf(template: &str, record: &MetadataRecord, dir: &Path) -> Result<PathBuf> {
    let path = dir.join("metadata.opf");
    std::fs::write(&path, render_template(template, record))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("📝 Wrote {}", path.display());
    Ok(path)
}

pub fn write_info(record: &MetadataRecord, dir: &Path) -> Result<PathBuf> {
    let path = dir.join("info.txt");
    std::fs::write(&path, &record.summary)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("📝 Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::UNKNOWN_AUTHOR;
    use tempfile::tempdir;

    fn dune() -> MetadataRecord {
        let mut record = MetadataRecord::new("Dune (2007)", "x", None);
        record.author = "Frank Herbert".into();
        record.title = "Dune".into();
        record.narrator = "Scott Brick".into();
        record.series = "Dune".into();
        record.volume_number = "1".into();
        record.summary = "Set on the desert planet Arrakis.".into();
        record
    }

    #[test]
    fn test_placeholders_are_replaced() {
        let out = render_template("__AUTHOR__|__TITLE__|__NARRATOR__|__SERIES__ #__VOLUMENUMBER__", &dune());
        assert_eq!(out, "Frank Herbert|Dune|Scott Brick|Dune #1");
    }

    #[test]
    fn test_placeholder_text_inside_values_is_kept() {
        let mut record = dune();
        record.summary = "Write __SERIES__ and __TITLE__ in the template.".into();

        let out = render_template("__SUMMARY__|__SERIES__|__UNKNOWN__", &record);

        assert_eq!(out, "Write __SERIES__ and __TITLE__ in the template.|Dune|__UNKNOWN__");
    }

    #[test]
    fn test_empty_fields_leave_no_placeholder() {
        let out = render_template(DEFAULT_OPF_TEMPLATE, &dune());
        assert!(!out.contains("__"));
        assert!(out.contains("<dc:publisher></dc:publisher>"));
        assert!(out.contains("<dc:creator opf:role=\"aut\">Frank Herbert</dc:creator>"));
    }

    #[test]
    fn test_fallback_values_render_empty() {
        let mut record = dune();
        record.author = UNKNOWN_AUTHOR.into();
        record.title = record.input_folder.clone();
        assert_eq!(render_template("[__AUTHOR__][__TITLE__]", &record), "[][]");
    }

    #[test]
    fn test_sidecar_files() {
        let tmp = tempdir().unwrap();
        let record = dune();

        let opf = write_opf(DEFAULT_OPF_TEMPLATE, &record, tmp.path()).unwrap();
        let info = write_info(&record, tmp.path()).unwrap();

        assert!(std::fs::read_to_string(opf).unwrap().contains("<dc:title>Dune</dc:title>"));
        assert_eq!(std::fs::read_to_string(info).unwrap(), "Set on the desert planet Arrakis.");
    }

    #[test]
    fn test_missing_custom_template_is_an_error() {
        assert!(load_template(Some(Path::new("/nonexistent/template.opf"))).is_err());
        assert!(load_template(None).unwrap().contains("__TITLE__"));
    }
}
