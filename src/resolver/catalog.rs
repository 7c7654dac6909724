// src/resolver/catalog.rs
//! Audible catalog product API
//!
//! The live endpoint wraps the product as `{"product": {...}}`; a bare
//! product object is accepted too.

use super::cascade::{FieldRule, ParsedPage, Strategy};
use super::types::Field;
use crate::normalize::{dedupe, first_number, first_year, fragment_to_text};
use log::warn;
use serde_json::Value;

pub fn parse(body: &str) -> ParsedPage {
    let product = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut root)) => match root.remove("product") {
            Some(product @ Value::Object(_)) => Some(product),
            Some(_) | None => Some(Value::Object(root)),
        },
        Ok(_) => {
            warn!("Catalog response is not a JSON object");
            None
        }
        Err(e) => {
            warn!("Catalog response is not JSON: {}", e);
            None
        }
    };

    ParsedPage::new(product, None)
}

pub fn rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(Field::Author, vec![Strategy::structured("authors[].name", authors)]),
        FieldRule::new(Field::Title, vec![Strategy::structured("title", title)]),
        FieldRule::new(Field::Subtitle, vec![Strategy::structured("subtitle", subtitle)]),
        FieldRule::new(
            Field::Summary,
            vec![
                Strategy::structured("publisher_summary", publisher_summary).refine(summary_text),
                Strategy::structured("merchandising_summary", merchandising_summary).refine(summary_text),
            ],
        ),
        FieldRule::new(Field::Narrator, vec![Strategy::structured("narrators[].name", narrators)]),
        FieldRule::new(Field::Publisher, vec![Strategy::structured("publisher_name", publisher)]),
        FieldRule::new(
            Field::PublishYear,
            vec![
                Strategy::structured("release_date", release_date).refine(first_year),
                Strategy::structured("issue_date", issue_date).refine(first_year),
            ],
        ),
        FieldRule::new(Field::Genres, vec![Strategy::structured("category_ladders", genres)]).joined(", "),
        FieldRule::new(Field::Isbn, vec![Strategy::structured("isbn", isbn)]),
        FieldRule::new(Field::Asin, vec![Strategy::structured("asin", asin)]),
        FieldRule::new(Field::Series, vec![Strategy::structured("series[].title", series)]),
        FieldRule::new(
            Field::VolumeNumber,
            vec![Strategy::structured("series[].sequence", sequence).refine(first_number)],
        ),
    ]
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_at(product: &Value, key: &str) -> Vec<String> {
    text(&product[key]).into_iter().collect()
}

fn each_at(product: &Value, key: &str, inner: &str) -> Vec<String> {
    product[key]
        .as_array()
        .map(|items| items.iter().filter_map(|item| text(&item[inner])).collect())
        .unwrap_or_default()
}

fn authors(product: &Value) -> Vec<String> {
    each_at(product, "authors", "name")
}

fn narrators(product: &Value) -> Vec<String> {
    each_at(product, "narrators", "name")
}

fn series(product: &Value) -> Vec<String> {
    each_at(product, "series", "title")
}

fn sequence(product: &Value) -> Vec<String> {
    each_at(product, "series", "sequence")
}

fn title(product: &Value) -> Vec<String> {
    string_at(product, "title")
}

fn subtitle(product: &Value) -> Vec<String> {
    string_at(product, "subtitle")
}

fn publisher(product: &Value) -> Vec<String> {
    string_at(product, "publisher_name")
}

fn publisher_summary(product: &Value) -> Vec<String> {
    string_at(product, "publisher_summary")
}

fn merchandising_summary(product: &Value) -> Vec<String> {
    string_at(product, "merchandising_summary")
}

fn release_date(product: &Value) -> Vec<String> {
    string_at(product, "release_date")
}

fn issue_date(product: &Value) -> Vec<String> {
    string_at(product, "issue_date")
}

fn isbn(product: &Value) -> Vec<String> {
    string_at(product, "isbn")
}

fn asin(product: &Value) -> Vec<String> {
    string_at(product, "asin")
}

/// Category names across every ladder, e.g. "Science Fiction & Fantasy"
fn genres(product: &Value) -> Vec<String> {
    let names = product["category_ladders"]
        .as_array()
        .map(|ladders| {
            ladders
                .iter()
                .flat_map(|ladder| ladder["ladder"].as_array().cloned().unwrap_or_default())
                .filter_map(|rung| text(&rung["name"]))
                .collect()
        })
        .unwrap_or_default();
    dedupe(names)
}

// Summaries arrive as HTML fragments
fn summary_text(raw: &str) -> Option<String> {
    Some(fragment_to_text(raw))
}
