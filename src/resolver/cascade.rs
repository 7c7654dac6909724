// src/resolver/cascade.rs
//! Field extractor cascade
//!
//! Each field owns an ordered list of strategies. Strategies are pure
//! functions of the parsed page: structured-document lookups come first,
//! CSS-selector lookups into the markup tree after. The first strategy that
//! yields a non-empty value wins; a field with no winner gets its fallback.

use super::types::{Fallback, Field, MetadataRecord};
use crate::normalize::{element_text, non_empty};
use log::{debug, info};
use scraper::{Html, Selector};
use serde_json::Value;

/// A response decoded into the two shapes strategies can read
pub struct ParsedPage {
    structured: Option<Value>,
    markup: Option<Html>,
}

impl ParsedPage {
    pub fn new(structured: Option<Value>, markup: Option<Html>) -> Self {
        Self { structured, markup }
    }

    pub fn structured(&self) -> Option<&Value> {
        self.structured.as_ref()
    }

    pub fn markup(&self) -> Option<&Html> {
        self.markup.as_ref()
    }
}

enum Extractor {
    Structured(fn(&Value) -> Vec<String>),
    /// Text of the first matching element
    Selector(&'static str),
    /// Text of every matching element, in document order
    SelectorAll(&'static str),
}

pub struct Strategy {
    pub name: &'static str,
    extractor: Extractor,
    refine: Option<fn(&str) -> Option<String>>,
}

impl Strategy {
    pub fn structured(name: &'static str, lookup: fn(&Value) -> Vec<String>) -> Self {
        Self {
            name,
            extractor: Extractor::Structured(lookup),
            refine: None,
        }
    }

    pub fn selector(css: &'static str) -> Self {
        Self {
            name: css,
            extractor: Extractor::Selector(css),
            refine: None,
        }
    }

    pub fn selector_all(css: &'static str) -> Self {
        Self {
            name: css,
            extractor: Extractor::SelectorAll(css),
            refine: None,
        }
    }

    /// Post-process each raw value; a `None` from `refine` counts as a miss
    pub fn refine(mut self, refine: fn(&str) -> Option<String>) -> Self {
        self.refine = Some(refine);
        self
    }

    /// `None` when the strategy has nothing to say about this page
    pub fn attempt(&self, page: &ParsedPage) -> Option<Vec<String>> {
        let raw = match &self.extractor {
            Extractor::Structured(lookup) => lookup(page.structured()?),
            Extractor::Selector(css) => select_text(page.markup()?, css, false),
            Extractor::SelectorAll(css) => select_text(page.markup()?, css, true),
        };

        let values: Vec<String> = raw
            .iter()
            .filter_map(|value| match self.refine {
                Some(refine) => refine(value).and_then(|v| non_empty(&v)),
                None => non_empty(value),
            })
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

fn select_text(doc: &Html, css: &str, all: bool) -> Vec<String> {
    let selector = match Selector::parse(css) {
        Ok(selector) => selector,
        Err(e) => {
            debug!("Unusable selector '{}': {:?}", css, e);
            return Vec::new();
        }
    };

    let texts = doc.select(&selector).map(element_text);

    if all {
        texts.collect()
    } else {
        texts.take(1).collect()
    }
}

/// Ordered strategies for one field
pub struct FieldRule {
    pub field: Field,
    pub strategies: Vec<Strategy>,
    /// Join every value with this separator instead of keeping the first
    pub join: Option<&'static str>,
}

impl FieldRule {
    pub fn new(field: Field, strategies: Vec<Strategy>) -> Self {
        Self { field, strategies, join: None }
    }

    pub fn joined(mut self, separator: &'static str) -> Self {
        self.join = Some(separator);
        self
    }

    /// First strategy with a value, and what it found
    pub fn resolve(&self, page: &ParsedPage) -> Option<(&'static str, Vec<String>)> {
        first_hit(&self.strategies, |strategy| {
            strategy.attempt(page).map(|values| (strategy.name, values))
        })
    }
}

/// First non-empty result of `attempt` over `items`, in order
pub fn first_hit<'a, S, T>(items: &'a [S], attempt: impl FnMut(&'a S) -> Option<T>) -> Option<T> {
    items.iter().find_map(attempt)
}

/// Run every field through its rule, applying fallbacks on a total miss.
///
/// Fields without a rule for this source go straight to their fallback, so
/// author and title are always populated afterwards.
pub fn apply(rules: &[FieldRule], page: &ParsedPage, record: &mut MetadataRecord) {
    for field in Field::ALL {
        let hit = rules
            .iter()
            .find(|rule| rule.field == field)
            .and_then(|rule| rule.resolve(page).map(|(name, values)| (rule, name, values)));

        match hit {
            Some((rule, strategy, values)) => {
                info!("{} from '{}': {:?}", field.name(), strategy, values);
                let scalar = match rule.join {
                    Some(separator) => values.join(separator),
                    None => values[0].clone(),
                };
                record.set(field, scalar);
                if field.is_multi() {
                    record.set_multi(field, values);
                }
            }
            None => apply_fallback(field, record),
        }
    }
}

fn apply_fallback(field: Field, record: &mut MetadataRecord) {
    match field.fallback() {
        Fallback::Sentinel(sentinel) => {
            record.warn(format!(
                "No {} scraped, placing in {} folder '{}': {}",
                field.name(),
                field.name(),
                sentinel,
                record.input_folder
            ));
            record.set(field, sentinel.to_string());
        }
        Fallback::FolderName => {
            record.warn(format!(
                "No {} scraped, using folder name: {}",
                field.name(),
                record.input_folder
            ));
            let folder = record.input_folder.clone();
            record.set(field, folder);
        }
        Fallback::Empty => {
            info!("No {} scraped, leaving blank ({})", field.name(), record.input_folder);
            record.set(field, String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::first_year;
    use crate::resolver::types::UNKNOWN_AUTHOR;
    use serde_json::json;

    fn title_from_json(v: &Value) -> Vec<String> {
        v["title"].as_str().map(|s| vec![s.to_string()]).unwrap_or_default()
    }

    fn record() -> MetadataRecord {
        MetadataRecord::new("Some Folder", "https://example.invalid", None)
    }

    #[test]
    fn test_structured_strategy_wins_over_selector() {
        let page = ParsedPage::new(
            Some(json!({"title": "From JSON"})),
            Some(Html::parse_document("<h1>From markup</h1>")),
        );
        let rule = FieldRule::new(
            Field::Title,
            vec![Strategy::structured("json title", title_from_json), Strategy::selector("h1")],
        );

        let (name, values) = rule.resolve(&page).unwrap();
        assert_eq!(name, "json title");
        assert_eq!(values, vec!["From JSON".to_string()]);
    }

    #[test]
    fn test_missing_structured_document_falls_through_to_markup() {
        let page = ParsedPage::new(None, Some(Html::parse_document("<h1>  From\n markup </h1>")));
        let rule = FieldRule::new(
            Field::Title,
            vec![Strategy::structured("json title", title_from_json), Strategy::selector("h1")],
        );

        let (name, values) = rule.resolve(&page).unwrap();
        assert_eq!(name, "h1");
        assert_eq!(values, vec!["From markup".to_string()]);
    }

    #[test]
    fn test_blank_and_broken_strategies_are_misses() {
        let page = ParsedPage::new(
            Some(json!({"title": "   "})),
            Some(Html::parse_document("<p>nothing</p>")),
        );
        let rule = FieldRule::new(
            Field::Title,
            vec![
                Strategy::structured("json title", title_from_json),
                Strategy::selector("h1:::not-a-selector"),
                Strategy::selector("h1"),
            ],
        );
        assert!(rule.resolve(&page).is_none());
    }

    #[test]
    fn test_refine_rejects_values_without_a_match() {
        let page = ParsedPage::new(
            None,
            Some(Html::parse_document("<span class='a'>soon</span><span class='b'>June 1965</span>")),
        );
        let rule = FieldRule::new(
            Field::PublishYear,
            vec![
                Strategy::selector("span.a").refine(first_year),
                Strategy::selector("span.b").refine(first_year),
            ],
        );
        assert_eq!(rule.resolve(&page).unwrap().1, vec!["1965".to_string()]);
    }

    #[test]
    fn test_zero_extractable_fields_still_yields_author_and_title() {
        let page = ParsedPage::new(None, None);
        let mut record = record();

        apply(&[], &page, &mut record);

        assert_eq!(record.author, UNKNOWN_AUTHOR);
        assert_eq!(record.title, "Some Folder");
        assert_eq!(record.warnings.len(), 2);
        assert!(record.summary.is_empty() && record.series.is_empty());
    }

    #[test]
    fn test_multi_values_keep_first_as_scalar() {
        let page = ParsedPage::new(
            None,
            Some(Html::parse_document("<a class='n'>Scott Brick</a><a class='n'>Orlagh Cassidy</a>")),
        );
        let rules = vec![FieldRule::new(Field::Narrator, vec![Strategy::selector_all("a.n")])];
        let mut record = record();

        apply(&rules, &page, &mut record);

        assert_eq!(record.narrator, "Scott Brick");
        assert_eq!(record.narrators, vec!["Scott Brick".to_string(), "Orlagh Cassidy".to_string()]);
    }

    #[test]
    fn test_joined_rule_keeps_every_value() {
        let page = ParsedPage::new(
            None,
            Some(Html::parse_document("<b>Fiction</b><b>Classics</b>")),
        );
        let rules = vec![FieldRule::new(Field::Genres, vec![Strategy::selector_all("b")]).joined(", ")];
        let mut record = record();

        apply(&rules, &page, &mut record);

        assert_eq!(record.genres, "Fiction, Classics");
    }

    #[test]
    fn test_first_hit_stops_at_first_value() {
        let mut tried = Vec::new();
        let items = [None, Some(2), Some(3)];
        let hit = first_hit(&items, |item| {
            tried.push(*item);
            *item
        });
        assert_eq!(hit, Some(2));
        assert_eq!(tried.len(), 2);
    }
}
