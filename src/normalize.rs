//! Text normalization utilities for scraped metadata
//!
//! Everything here is a pure string function: whitespace cleanup, numeric
//! sub-extraction (publish year, volume number) and reducing HTML fragments
//! to plain text.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

const BLOCK_TAGS: &[&str] = &["p", "br", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "blockquote"];

/// Collapse runs of whitespace (including newlines) into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Clean a scraped value; `None` when nothing but whitespace is left
pub fn non_empty(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// First run of four digits in a raw date string
///
/// # Examples
/// ```
/// assert_eq!(first_year("2010-06-15"), Some("2010".to_string()));
/// assert_eq!(first_year("First published June 1, 1965"), Some("1965".to_string()));
/// ```
pub fn first_year(raw: &str) -> Option<String> {
    FOUR_DIGITS.find(raw).map(|m| m.as_str().to_string())
}

/// First run of digits, optionally decimal ("1", "2.5")
pub fn first_number(raw: &str) -> Option<String> {
    NUMBER.find(raw).map(|m| m.as_str().to_string())
}

/// First number that follows a literal sequence marker
///
/// # Examples
/// ```
/// assert_eq!(volume_after_marker("Dune Chronicles, Book 3", ", Book "), Some("3".to_string()));
/// assert_eq!(volume_after_marker("The Expanse #5.5", "#"), Some("5.5".to_string()));
/// ```
pub fn volume_after_marker(text: &str, marker: &str) -> Option<String> {
    let pos = text.find(marker)?;
    let rest = text[pos + marker.len()..].trim_start();
    let m = NUMBER.find(rest)?;
    // Digits must follow the marker directly, not somewhere later in the text
    if m.start() != 0 {
        return None;
    }
    Some(m.as_str().to_string())
}

/// Text in front of a sequence marker ("Dune #1" -> "Dune")
pub fn before_marker(text: &str, marker: &str) -> String {
    match text.find(marker) {
        Some(pos) => text[..pos].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Reduce an HTML fragment (publisher summaries) to readable text
pub fn fragment_to_text(fragment: &str) -> String {
    element_text(Html::parse_fragment(fragment).root_element())
}

/// Text of an element and its children; inline tags join without a gap,
/// block tags break words apart
pub fn element_text(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(tag) if BLOCK_TAGS.contains(&tag.name()) => out.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

/// Drop repeated entries while keeping first-seen order
pub fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}
