// src/queue.rs
//! Folder/URL work queue
//!
//! Entries come from a JSON queue file (`[{"folder": .., "url": ..}]`) and
//! from `--pair` arguments. Everything is validated before the first folder
//! is touched.

use crate::error::ValidationError;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub folder: PathBuf,
    pub url: String,
}

impl QueueEntry {
    pub fn new(folder: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            url: url.into(),
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<QueueEntry>, ValidationError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ValidationError::Queue(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents).map_err(|e| ValidationError::Queue(format!("{}: {}", path.display(), e)))
}

/// `--pair FOLDER URL` values, flattened by the argument parser
pub fn from_pairs(values: &[String]) -> Result<Vec<QueueEntry>, ValidationError> {
    if values.len() % 2 != 0 {
        return Err(ValidationError::Queue("--pair takes a folder and a URL".to_string()));
    }
    Ok(values
        .chunks(2)
        .map(|pair| QueueEntry::new(&pair[0], pair[1].trim()))
        .collect())
}

/// Check folders, resolve them to absolute paths and drop duplicates.
///
/// Order is first appearance; a folder listed twice keeps its last URL.
pub fn build(entries: Vec<QueueEntry>) -> Result<Vec<QueueEntry>, ValidationError> {
    let mut queue: IndexMap<PathBuf, String> = IndexMap::new();

    for entry in entries {
        if !entry.folder.is_dir() {
            return Err(ValidationError::InputNotDirectory(entry.folder));
        }
        let folder = entry
            .folder
            .canonicalize()
            .map_err(|_| ValidationError::InputNotDirectory(entry.folder.clone()))?;
        if let Some(previous) = queue.insert(folder.clone(), entry.url) {
            debug!("Replacing queued URL for {}: {}", folder.display(), previous);
        }
    }

    if queue.is_empty() {
        return Err(ValidationError::EmptyQueue);
    }

    Ok(queue
        .into_iter()
        .map(|(folder, url)| QueueEntry { folder, url })
        .collect())
}

pub fn validate_output(path: &Path) -> Result<PathBuf, ValidationError> {
    if !path.is_dir() {
        return Err(ValidationError::OutputNotDirectory(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|_| ValidationError::OutputNotDirectory(path.to_path_buf()))
}
