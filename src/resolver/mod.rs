// src/resolver/mod.rs
pub mod cascade;
pub mod catalog;
pub mod review;
pub mod types;

pub use types::*;
use crate::config::Config;
use crate::fetcher::{Fetcher, Transport};
use crate::source::{is_skip, SourceKind, SourceUrl};
use log::{debug, info};
use std::path::Path;

/// Drives one folder+URL pair from `Pending` to a terminal state
pub struct Resolver<T: Transport> {
    fetcher: Fetcher<T>,
    response_groups: String,
}

impl<T: Transport> Resolver<T> {
    pub fn new(fetcher: Fetcher<T>, config: &Config) -> Self {
        Self {
            fetcher,
            response_groups: config.catalog_response_groups.clone(),
        }
    }

    /// Resolve metadata for `folder` from `raw_url`.
    ///
    /// Never errors: network and URL problems end in `Failed`, a `skip` entry
    /// ends in `Skipped`, everything else ends in `Resolved`.
    pub async fn resolve(&self, folder: &Path, raw_url: &str) -> MetadataRecord {
        let folder_name = folder_name(folder);
        let mut record = MetadataRecord::new(folder_name.clone(), raw_url.trim(), SourceKind::from_url(raw_url));

        if is_skip(raw_url) {
            println!("⏭️  Skipping: {}", folder_name);
            record.mark_skipped();
            return record;
        }

        let source = match SourceUrl::parse(raw_url) {
            Ok(source) => source,
            Err(e) => {
                println!("❌ {}, skipping {}", e, folder_name);
                record.mark_failed(e.to_string());
                return record;
            }
        };

        record.state = ResolveState::Fetching;
        println!("🔍 {}: {}", source.kind.label(), source.url);

        let query = match source.kind {
            SourceKind::CatalogApi => vec![("response_groups".to_string(), self.response_groups.clone())],
            SourceKind::ReviewPage => Vec::new(),
        };

        let response = match self.fetcher.fetch(&source.request_url(), &query).await {
            Ok(response) => response,
            Err(e) => {
                println!("❌ Failed to get metadata, skipping {}: {}", folder_name, e);
                record.mark_failed(e.to_string());
                return record;
            }
        };

        record.state = ResolveState::Extracting;
        extract(&source, &response.body, &mut record);
        record.state = ResolveState::Resolved;

        info!("Resolved '{}' from {} -> {} / {}", folder_name, record.source_url(), record.author, record.title);
        record
    }
}

/// Parse the body and run the cascade for the source's field rules
fn extract(source: &SourceUrl, body: &str, record: &mut MetadataRecord) {
    let (page, rules) = match source.kind {
        SourceKind::CatalogApi => (catalog::parse(body), catalog::rules()),
        SourceKind::ReviewPage => (review::parse(body), review::rules()),
    };

    cascade::apply(&rules, &page, record);

    if source.kind == SourceKind::CatalogApi && record.asin.is_empty() {
        debug!("No asin in product, using catalog id {}", source.id);
        record.asin = source.id.clone();
    }
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| folder.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrySettings;
    use crate::error::FetchError;
    use crate::fetcher::tests::ScriptedTransport;
    use crate::fetcher::Response;
    use std::sync::atomic::Ordering;

    const DUNE_URL: &str = "https://www.audible.com/pd/Dune-Audiobook/B002V0QK4C";

    fn resolver(transport: ScriptedTransport) -> Resolver<ScriptedTransport> {
        Resolver::new(Fetcher::new(transport, RetrySettings::default()), &Config::default())
    }

    fn calls(resolver: &Resolver<ScriptedTransport>) -> u32 {
        resolver.fetcher.transport().calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_dune_catalog_scenario() {
        let resolver = resolver(ScriptedTransport::ok(r#"{"title":"Dune","authors":[{"name":"Frank Herbert"}]}"#));

        let record = resolver.resolve(Path::new("/books/Dune"), DUNE_URL).await;

        assert_eq!(record.state, ResolveState::Resolved);
        assert_eq!(record.outcome(), Some(Outcome::Success));
        assert_eq!(record.author, "Frank Herbert");
        assert_eq!(record.title, "Dune");
        assert_eq!(record.asin, "B002V0QK4C");
        assert_eq!(record.source_kind, Some(SourceKind::CatalogApi));
        assert!(!record.skip && !record.failed);
    }

    #[tokio::test]
    async fn test_missing_author_resolves_with_sentinel() {
        let resolver = resolver(ScriptedTransport::ok(r#"{"product": {"title": "Dune"}}"#));

        let record = resolver.resolve(Path::new("/books/Dune"), DUNE_URL).await;

        assert_eq!(record.state, ResolveState::Resolved);
        assert_eq!(record.author, UNKNOWN_AUTHOR);
        assert_eq!(record.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_skip_is_checked_before_fetching() {
        let resolver = resolver(ScriptedTransport::ok("{}"));

        let record = resolver.resolve(Path::new("/books/Dune"), "Skip").await;

        assert_eq!(record.outcome(), Some(Outcome::Skipped));
        assert!(record.skip && !record.failed);
        assert_eq!(calls(&resolver), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_url_fails_without_fetching() {
        let resolver = resolver(ScriptedTransport::ok("{}"));

        let record = resolver.resolve(Path::new("/books/Dune"), "https://example.com/dune").await;

        assert_eq!(record.outcome(), Some(Outcome::Failed));
        assert!(record.failure_reason.unwrap().contains("Unrecognized URL"));
        assert_eq!(calls(&resolver), 0);
    }

    #[tokio::test]
    async fn test_bad_status_fails_without_extracting() {
        let resolver = resolver(ScriptedTransport::new(vec![Ok(Response { status: 404, body: String::new() })]));

        let record = resolver.resolve(Path::new("/books/Dune"), DUNE_URL).await;

        assert_eq!(record.state, ResolveState::Failed);
        assert!(record.skip && record.failed);
        assert_eq!(record.failure_reason.as_deref(), Some("Status code = 404"));
        assert!(record.author.is_empty() && record.title.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_the_folder() {
        let resolver = resolver(ScriptedTransport::new(vec![Err(FetchError::Transient("dns".into()))]));

        let record = resolver.resolve(Path::new("/books/Dune"), DUNE_URL).await;

        assert_eq!(record.outcome(), Some(Outcome::Failed));
        assert!(record.failure_reason.unwrap().contains("5 attempts"));
    }

    #[tokio::test]
    async fn test_review_page_without_marker_uses_selectors() {
        let body = r#"<html><body><h1 data-testid="bookTitle">Dune Messiah</h1></body></html>"#;
        let resolver = resolver(ScriptedTransport::ok(body));

        let record = resolver
            .resolve(Path::new("/books/Messiah"), "https://www.goodreads.com/book/show/44492285-dune-messiah")
            .await;

        assert_eq!(record.state, ResolveState::Resolved);
        assert_eq!(record.title, "Dune Messiah");
        assert_eq!(record.author, UNKNOWN_AUTHOR);
        assert!(record.asin.is_empty());
    }
}
