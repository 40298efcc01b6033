//! Disk to catalog reconciliation.
//!
//! Every singer folder is scanned (non-recursively) for audio files, and any
//! file whose path is not yet cataloged gets a song row with a title derived
//! from its file name. Files that disappear from disk are never removed from
//! the catalog here.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::AppResult;
use crate::library::singers::Singer;
use crate::library::store::LibraryStore;

/// Supported audio file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "wma", "opus", "aiff", "ape",
];

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    /// Number of songs added to the catalog.
    pub added: usize,
    /// Keys of singers whose folder could not be reconciled.
    pub failed: Vec<String>,
}

/// Check if a file has a supported audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lexically normalize a path so equivalent spellings compare equal.
///
/// The path is made absolute against the working directory, `.` segments are
/// dropped, `..` segments pop their parent and trailing separators vanish.
/// Symlinks are not resolved and the path does not need to exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Turn a file stem such as `yesu_pyar_hai` into `Yesu Pyar Hai`.
pub fn derive_title(stem: &str) -> String {
    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Add every audio file found in the singers' folders that the catalog does
/// not know yet.
///
/// A singer whose folder cannot be created or read, or whose rows cannot be
/// inserted, is logged and reported in [`SyncReport::failed`]; the remaining
/// singers are still reconciled. Running it again without disk changes adds
/// nothing.
pub fn reconcile(store: &LibraryStore, singers: &[Singer]) -> AppResult<SyncReport> {
    let mut existing: HashSet<PathBuf> = store
        .list_file_paths()?
        .iter()
        .map(|p| normalize_path(Path::new(p)))
        .collect();

    let mut report = SyncReport::default();

    for singer in singers {
        match reconcile_singer(store, singer, &mut existing) {
            Ok(added) => report.added += added,
            Err(e) => {
                tracing::warn!(
                    singer = %singer.key,
                    folder = %singer.folder.display(),
                    error = %e,
                    "Skipping singer during sync"
                );
                report.failed.push(singer.key.clone());
            }
        }
    }

    if report.added > 0 {
        tracing::info!(added = report.added, "Synced new songs from disk");
    }

    Ok(report)
}

fn reconcile_singer(
    store: &LibraryStore,
    singer: &Singer,
    existing: &mut HashSet<PathBuf>,
) -> AppResult<usize> {
    fs::create_dir_all(&singer.folder)?;

    let mut files: Vec<PathBuf> = fs::read_dir(&singer.folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_audio_file(path))
        .collect();
    files.sort();

    let mut added = 0;
    for file in files {
        if !existing.insert(normalize_path(&file)) {
            continue;
        }

        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = derive_title(&stem);
        let path = file.to_string_lossy();

        let id = store.add_song(&singer.key, &title, &path)?;
        tracing::debug!(song_id = id, singer = %singer.key, path = %path, "Discovered song");
        added += 1;
    }

    Ok(added)
}
