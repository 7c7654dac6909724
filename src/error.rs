// src/error.rs
//! Error types for the organizer pipeline
//!
//! Folder-level errors (`FetchError`, `FilesystemError`) are isolated to the
//! folder being processed. `ValidationError` is raised before any processing
//! starts and aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while retrieving a metadata source
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure that may succeed on retry
    #[error("Request error: {0}")]
    Transient(String),

    /// Transient failures kept happening until the retry budget ran out
    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Any status other than 200 OK; never retried
    #[error("Status code = {0}")]
    BadStatus(u16),

    /// The URL does not match a supported source
    #[error("Unrecognized URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether the fetcher should retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Errors raised while moving, copying or flattening a book folder
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Failed to rename {from} -> {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} -> {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copied to destination but failed to remove source {path}: {source}")]
    RemoveSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to flatten {path}: {source}")]
    Flatten {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pre-flight argument errors; these abort the whole run
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("The output path is not a directory or does not exist: {0}")]
    OutputNotDirectory(PathBuf),

    #[error("The input folder does not exist or is not a directory: {0}")]
    InputNotDirectory(PathBuf),

    #[error("Nothing to process: no folder has a URL queued")]
    EmptyQueue,

    #[error("Invalid queue: {0}")]
    Queue(String),
}
