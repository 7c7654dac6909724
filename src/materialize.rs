// src/materialize.rs
//! Putting a book folder at its planned destination
//!
//! Move is a rename when possible. When the rename fails (different device,
//! locked file) the tree is copied and the source removed only after every
//! file made it across. Copy mode merges into an existing destination.

use crate::error::FilesystemError;
use filetime::FileTime;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions picked up by flatten and the search-term tag scan
pub const AUDIO_EXTENSIONS: &[&str] = &["m4b", "m4a", "mp3", "flac", "ogg", "opus", "aac", "wma"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Copy,
    #[default]
    Move,
}

pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

fn std_rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

pub struct Materializer {
    mode: Mode,
    rename: RenameFn,
}

impl Materializer {
    pub fn new(mode: Mode) -> Self {
        Self { mode, rename: std_rename }
    }

    /// Swap the rename primitive to force the copy fallback
    #[cfg(test)]
    pub(crate) fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    pub fn materialize(&self, source: &Path, dest: &Path) -> Result<(), FilesystemError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| FilesystemError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        if source == dest {
            debug!("Source already at destination: {}", dest.display());
            return Ok(());
        }

        if dest.starts_with(source) {
            return Err(FilesystemError::Copy {
                from: source.to_path_buf(),
                to: dest.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "destination is inside the source folder"),
            });
        }

        match self.mode {
            Mode::Copy => {
                println!("📋 Copying: {} --> {}", source.display(), dest.display());
                copy_tree(source, dest)
            }
            Mode::Move => {
                println!("📦 Moving: {} --> {}", source.display(), dest.display());
                match (self.rename)(source, dest) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        info!("Couldn't move folder directly, performing copy-move ({}): {}", source.display(), e);
                        copy_tree(source, dest)?;
                        fs::remove_dir_all(source).map_err(|e| FilesystemError::RemoveSource {
                            path: source.to_path_buf(),
                            source: e,
                        })
                    }
                }
            }
        }
    }
}

/// Recursive copy that keeps modification times and tolerates existing files
pub fn copy_tree(source: &Path, dest: &Path) -> Result<(), FilesystemError> {
    let copy_err = |from: &Path, to: &Path, e: io::Error| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| copy_err(source, dest, e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| copy_err(entry.path(), dest, io::Error::new(io::ErrorKind::Other, e)))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| FilesystemError::CreateDir {
                path: target.clone(),
                source: e,
            })?;
            continue;
        }

        fs::copy(entry.path(), &target).map_err(|e| copy_err(entry.path(), &target, e))?;
        preserve_mtime(entry.path(), &target).map_err(|e| copy_err(entry.path(), &target, e))?;
    }

    Ok(())
}

/// `fs::copy` carries over permissions, so the copy may already be read-only
fn preserve_mtime(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::metadata(from)?;
    filetime::set_file_mtime(to, FileTime::from_last_modification_time(&metadata))
}

pub(crate) fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Audio files below `dir`, excluding ones already at its root, sorted by path
fn nested_audio_files(dir: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(2) {
        let entry = entry.map_err(|e| FilesystemError::Flatten {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_audio(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// `{index} - {title}{ext}`, index zero-padded to 2 digits, or 3 from 100 files up
fn track_name(index: usize, count: usize, title: &str, original: &Path) -> String {
    let width = if count >= 100 { 3 } else { 2 };
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{:0width$} - {}{}", index, title, ext, width = width)
}

/// Pull every nested audio file up to `dest` with sequential track names.
///
/// Returns how many files were moved; a folder without subfolder audio is
/// left untouched. Subfolders emptied by the move are removed, anything
/// still holding other files stays.
pub fn flatten(dest: &Path, title: &str) -> Result<usize, FilesystemError> {
    let files = nested_audio_files(dest)?;
    if files.is_empty() {
        debug!("Nothing to flatten in {}", dest.display());
        return Ok(0);
    }

    let moves: Vec<(PathBuf, PathBuf)> = files
        .iter()
        .enumerate()
        .map(|(i, file)| (file.clone(), dest.join(track_name(i + 1, files.len(), title, file))))
        .collect();

    if let Some((_, taken)) = moves.iter().find(|(_, target)| target.exists()) {
        return Err(FilesystemError::Flatten {
            path: taken.clone(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "track name already taken"),
        });
    }

    println!("🗂️  Flattening {} audio files into {}", moves.len(), dest.display());

    let mut emptied = BTreeSet::new();
    for (from, to) in &moves {
        debug!("{} -> {}", from.display(), to.display());
        fs::rename(from, to).map_err(|e| FilesystemError::Rename {
            from: from.clone(),
            to: to.clone(),
            source: e,
        })?;
        let mut dir = from.parent();
        while let Some(d) = dir {
            if d == dest || !d.starts_with(dest) {
                break;
            }
            emptied.insert(d.to_path_buf());
            dir = d.parent();
        }
    }

    // Deepest first so parents are empty by the time they are tried
    for dir in emptied.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            debug!("Keeping {}: {}", dir.display(), e);
        }
    }

    Ok(moves.len())
}
