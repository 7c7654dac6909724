// src/resolver/types.rs
use crate::source::SourceKind;
use serde::Serialize;
use std::path::PathBuf;

/// Author folder used when no author could be scraped
pub const UNKNOWN_AUTHOR: &str = "_unknown_";

/// Where a record is in the resolution pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveState {
    Pending,
    Fetching,
    Extracting,
    Resolved,
    Skipped,
    Failed,
}

/// Run-summary bucket for a finished record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

/// Every field the extractor cascade can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Author,
    Title,
    Subtitle,
    Summary,
    Narrator,
    Publisher,
    PublishYear,
    Genres,
    Isbn,
    Asin,
    Series,
    VolumeNumber,
}

/// What a field falls back to when every strategy misses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Fixed placeholder plus a user warning
    Sentinel(&'static str),
    /// The input folder's own name plus a user warning
    FolderName,
    /// Empty string, logged only
    Empty,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Author,
        Field::Title,
        Field::Subtitle,
        Field::Summary,
        Field::Narrator,
        Field::Publisher,
        Field::PublishYear,
        Field::Genres,
        Field::Isbn,
        Field::Asin,
        Field::Series,
        Field::VolumeNumber,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Author => "author",
            Field::Title => "title",
            Field::Subtitle => "subtitle",
            Field::Summary => "summary",
            Field::Narrator => "narrator",
            Field::Publisher => "publisher",
            Field::PublishYear => "publish year",
            Field::Genres => "genres",
            Field::Isbn => "isbn",
            Field::Asin => "asin",
            Field::Series => "series",
            Field::VolumeNumber => "volume number",
        }
    }

    pub fn fallback(&self) -> Fallback {
        match self {
            Field::Author => Fallback::Sentinel(UNKNOWN_AUTHOR),
            Field::Title => Fallback::FolderName,
            _ => Fallback::Empty,
        }
    }

    /// Fields that keep the full ordered list next to the scalar value
    pub fn is_multi(&self) -> bool {
        matches!(self, Field::Author | Field::Narrator | Field::Series)
    }
}

/// One folder's metadata, from queue entry to final location
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    source_url: String,
    pub source_kind: Option<SourceKind>,
    pub input_folder: String,
    pub state: ResolveState,

    pub author: String,
    pub authors: Vec<String>,
    pub title: String,
    pub subtitle: String,
    pub summary: String,
    pub narrator: String,
    pub narrators: Vec<String>,
    pub publisher: String,
    pub publish_year: String,
    pub genres: String,
    pub isbn: String,
    pub asin: String,
    pub series: String,
    pub series_multi: Vec<String>,
    pub volume_number: String,

    pub skip: bool,
    pub failed: bool,
    pub failure_reason: Option<String>,
    /// Set once the folder has been planned and materialized
    pub final_output: Option<PathBuf>,
    /// User-facing warnings raised while resolving
    pub warnings: Vec<String>,
}

impl MetadataRecord {
    pub fn new(input_folder: impl Into<String>, source_url: impl Into<String>, source_kind: Option<SourceKind>) -> Self {
        Self {
            source_url: source_url.into(),
            source_kind,
            input_folder: input_folder.into(),
            state: ResolveState::Pending,
            author: String::new(),
            authors: Vec::new(),
            title: String::new(),
            subtitle: String::new(),
            summary: String::new(),
            narrator: String::new(),
            narrators: Vec::new(),
            publisher: String::new(),
            publish_year: String::new(),
            genres: String::new(),
            isbn: String::new(),
            asin: String::new(),
            series: String::new(),
            series_multi: Vec::new(),
            volume_number: String::new(),
            skip: false,
            failed: false,
            failure_reason: None,
            final_output: None,
            warnings: Vec::new(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Author => &self.author,
            Field::Title => &self.title,
            Field::Subtitle => &self.subtitle,
            Field::Summary => &self.summary,
            Field::Narrator => &self.narrator,
            Field::Publisher => &self.publisher,
            Field::PublishYear => &self.publish_year,
            Field::Genres => &self.genres,
            Field::Isbn => &self.isbn,
            Field::Asin => &self.asin,
            Field::Series => &self.series,
            Field::VolumeNumber => &self.volume_number,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Author => &mut self.author,
            Field::Title => &mut self.title,
            Field::Subtitle => &mut self.subtitle,
            Field::Summary => &mut self.summary,
            Field::Narrator => &mut self.narrator,
            Field::Publisher => &mut self.publisher,
            Field::PublishYear => &mut self.publish_year,
            Field::Genres => &mut self.genres,
            Field::Isbn => &mut self.isbn,
            Field::Asin => &mut self.asin,
            Field::Series => &mut self.series,
            Field::VolumeNumber => &mut self.volume_number,
        };
        *slot = value;
    }

    /// Companion list for multi-valued fields; ignored for the rest
    pub fn set_multi(&mut self, field: Field, values: Vec<String>) {
        match field {
            Field::Author => self.authors = values,
            Field::Narrator => self.narrators = values,
            Field::Series => self.series_multi = values,
            _ => {}
        }
    }

    pub fn mark_skipped(&mut self) {
        self.skip = true;
        self.state = ResolveState::Skipped;
    }

    /// Terminal error: the folder is also skipped so nothing moves
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.skip = true;
        self.failed = true;
        self.failure_reason = Some(reason.into());
        self.state = ResolveState::Failed;
    }

    pub fn warn(&mut self, message: String) {
        println!("   ⚠️  Warning: {}", message);
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            ResolveState::Resolved => Some(Outcome::Success),
            ResolveState::Skipped => Some(Outcome::Skipped),
            ResolveState::Failed => Some(Outcome::Failed),
            _ => None,
        }
    }

    pub fn author_is_sentinel(&self) -> bool {
        self.author == UNKNOWN_AUTHOR
    }

    pub fn title_is_folder_name(&self) -> bool {
        self.title == self.input_folder
    }
}
