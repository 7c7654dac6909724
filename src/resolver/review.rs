// src/resolver/review.rs
//! Goodreads book detail page
//!
//! The structured document is the page's JSON-LD `Book` node. When no such
//! node exists every structured strategy misses and the selectors take over.

use super::cascade::{FieldRule, ParsedPage, Strategy};
use super::types::Field;
use crate::normalize::{before_marker, first_year, volume_after_marker};
use log::debug;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

const SERIES_MARKER: &str = "#";

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

pub fn parse(body: &str) -> ParsedPage {
    let doc = Html::parse_document(body);
    let book = book_node(&doc);
    if book.is_none() {
        debug!("No JSON-LD Book node on page, using selectors only");
    }
    ParsedPage::new(book, Some(doc))
}

/// The first JSON-LD object typed as a Book
fn book_node(doc: &Html) -> Option<Value> {
    doc.select(&LD_JSON).find_map(|script| {
        let raw = script.text().collect::<String>();
        let parsed: Value = serde_json::from_str(raw.trim()).ok()?;
        let candidate = match parsed {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        if candidate["@type"].as_str() == Some("Book") {
            Some(candidate)
        } else {
            None
        }
    })
}

pub fn rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(
            Field::Author,
            vec![
                Strategy::structured("ld author[].name", authors),
                Strategy::selector_all(".ContributorLinksList .ContributorLink__name"),
            ],
        ),
        FieldRule::new(
            Field::Title,
            vec![
                Strategy::structured("ld name", name),
                Strategy::selector(r#"h1[data-testid="bookTitle"]"#),
            ],
        ),
        FieldRule::new(
            Field::Summary,
            vec![Strategy::selector(r#"[data-testid="description"] .Formatted"#)],
        ),
        FieldRule::new(
            Field::PublishYear,
            vec![Strategy::selector(r#"[data-testid="publicationInfo"]"#).refine(first_year)],
        ),
        FieldRule::new(
            Field::Genres,
            vec![Strategy::selector_all(".BookPageMetadataSection__genreButton .Button__labelItem")],
        )
        .joined(", "),
        FieldRule::new(Field::Isbn, vec![Strategy::structured("ld isbn", isbn)]),
        FieldRule::new(
            Field::Series,
            vec![Strategy::selector(r#"h3.Text__title3 a[href*="/series/"]"#).refine(series_name)],
        ),
        FieldRule::new(
            Field::VolumeNumber,
            vec![Strategy::selector(r#"h3.Text__title3 a[href*="/series/"]"#).refine(series_volume)],
        ),
    ]
}

/// `author` is either a single Person or a list of them
fn authors(book: &Value) -> Vec<String> {
    match &book["author"] {
        Value::Array(people) => people
            .iter()
            .filter_map(|p| p["name"].as_str().map(str::to_string))
            .collect(),
        Value::Object(_) => book["author"]["name"].as_str().map(str::to_string).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn name(book: &Value) -> Vec<String> {
    book["name"].as_str().map(str::to_string).into_iter().collect()
}

fn isbn(book: &Value) -> Vec<String> {
    match &book["isbn"] {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

// "Dune #1" -> "Dune"
fn series_name(text: &str) -> Option<String> {
    Some(before_marker(text, SERIES_MARKER))
}

// "Dune #1" -> "1"
fn series_volume(text: &str) -> Option<String> {
    volume_after_marker(text, SERIES_MARKER)
}
