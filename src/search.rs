// src/search.rs
//! Search suggestions for folders that still need a source URL

use crate::config::SearchSite;
use crate::materialize::is_audio;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use log::debug;
use std::path::Path;
use walkdir::WalkDir;

/// "<album> by <artist>" from the first tagged audio file, else the folder name
pub fn search_term(folder: &Path) -> String {
    for entry in WalkDir::new(folder).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !is_audio(entry.path()) {
            continue;
        }

        match album_and_artist(entry.path()) {
            Some((album, artist)) => {
                return format!("{} by {}", album.replace('&', "and"), artist.replace('&', "and"));
            }
            None => debug!("No usable album/artist tags in {}", entry.path().display()),
        }
    }

    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn album_and_artist(path: &Path) -> Option<(String, String)> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag())?;

    let album = tag.album()?.trim().to_string();
    let artist = tag.artist()?.trim().to_string();
    if album.is_empty() || artist.is_empty() {
        return None;
    }
    Some((album, artist))
}

/// Web search restricted to the chosen site
pub fn search_url(site: SearchSite, term: &str) -> String {
    let domain = match site {
        SearchSite::Audible => "audible.com",
        SearchSite::Goodreads => "goodreads.com",
    };
    let query = format!("site:{} {}", domain, term);
    format!("https://duckduckgo.com/?q={}", urlencoding::encode(&query))
}
