// src/source.rs
//! Supported metadata sources and the URL shapes that identify them

use crate::error::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CATALOG_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^\s]*audible[^\s]*/pd/[\w-]+Audiobook/(\w{10})").unwrap()
});

static REVIEW_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^\s]*goodreads[^\s]*/book/show/(\d+)").unwrap()
});

static URL_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://([^/?#]+)").unwrap());

/// Queue entries whose URL is `skip` are opted out before anything is fetched
pub fn is_skip(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("skip")
}

/// Which kind of remote document a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Structured JSON product endpoint keyed by a 10-character catalog id
    CatalogApi,
    /// Markup detail page on a community review site
    ReviewPage,
}

impl SourceKind {
    /// Infer the source kind from the URL's domain
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.contains("audible.") {
            Some(SourceKind::CatalogApi)
        } else if lower.contains("goodreads.") {
            Some(SourceKind::ReviewPage)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::CatalogApi => "Audible",
            SourceKind::ReviewPage => "Goodreads",
        }
    }
}

/// A URL that passed validation, trimmed to its canonical prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    pub url: String,
    pub kind: SourceKind,
    /// Catalog id for `CatalogApi`, numeric book id for `ReviewPage`
    pub id: String,
}

impl SourceUrl {
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let raw = raw.trim();
        let kind = SourceKind::from_url(raw).ok_or_else(|| FetchError::InvalidUrl(raw.to_string()))?;
        let pattern = match kind {
            SourceKind::CatalogApi => &*CATALOG_URL,
            SourceKind::ReviewPage => &*REVIEW_URL,
        };

        let caps = pattern
            .captures(raw)
            .ok_or_else(|| FetchError::InvalidUrl(raw.to_string()))?;

        Ok(Self {
            url: caps[0].to_string(),
            kind,
            id: caps[1].to_string(),
        })
    }

    /// Where the metadata is actually requested from.
    ///
    /// Review pages are fetched as-is; catalog URLs are turned into a product
    /// request on the API host of the same marketplace.
    pub fn request_url(&self) -> String {
        match self.kind {
            SourceKind::ReviewPage => self.url.clone(),
            SourceKind::CatalogApi => {
                format!("https://{}/1.0/catalog/products/{}", catalog_api_host(&self.url), self.id)
            }
        }
    }
}

/// `www.audible.co.uk` -> `api.audible.co.uk`
fn catalog_api_host(url: &str) -> String {
    let host = URL_HOST
        .captures(url)
        .map(|c| c[1].to_lowercase())
        .unwrap_or_else(|| "www.audible.com".to_string());

    match host.find("audible.") {
        Some(pos) => format!("api.{}", &host[pos..]),
        None => "api.audible.com".to_string(),
    }
}
