//! Saving uploaded audio files into a singer's folder.

use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::library::singers::SingerRegistry;
use crate::library::store::LibraryStore;
use crate::library::sync::{is_audio_file, normalize_path};
use crate::models::Song;

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub singer: &'a str,
    pub title: &'a str,
    /// Original file name supplied by the client.
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Validate and sanitize a filename to prevent path traversal attacks.
///
/// Returns an error if the filename contains path traversal sequences.
pub fn sanitize_filename(filename: &str) -> AppResult<&str> {
    if filename.is_empty() {
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!(filename = %filename, "Path traversal attempt blocked");
        return Err(AppError::path_traversal());
    }

    // Windows drive prefixes
    if filename.chars().nth(1) == Some(':') {
        return Err(AppError::path_traversal());
    }

    Ok(filename)
}

/// Store the uploaded bytes in the singer's folder and catalog them.
///
/// Every check runs before anything touches the disk or the catalog. The file
/// is written in place (no temp file); spaces in the name become underscores
/// and a name already on disk or in the catalog gets a timestamp suffix.
pub fn save_upload(
    store: &LibraryStore,
    singers: &dyn SingerRegistry,
    upload: &Upload<'_>,
    max_bytes: usize,
) -> AppResult<Song> {
    if upload.bytes.is_empty() {
        return Err(AppError::Validation(
            "Please choose an audio file to upload".to_string(),
        ));
    }
    if upload.bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "Upload is larger than {} bytes",
            max_bytes
        )));
    }

    let title = upload.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Please enter the song title".to_string()));
    }

    let filename = sanitize_filename(upload.filename.trim())?;
    if !is_audio_file(Path::new(filename)) {
        return Err(AppError::Validation(format!(
            "Unsupported audio file: {}",
            filename
        )));
    }

    let singer = singers.get(upload.singer)?;

    let cataloged: HashSet<PathBuf> = store
        .list_file_paths()?
        .iter()
        .map(|p| normalize_path(Path::new(p)))
        .collect();

    fs::create_dir_all(&singer.folder)?;
    let dest = free_destination(&singer.folder, &filename.replace(' ', "_"), &cataloged);
    fs::write(&dest, upload.bytes)?;

    let file_path = dest.to_string_lossy().into_owned();
    let id = store.add_song(&singer.key, title, &file_path)?;

    tracing::info!(
        song_id = id,
        singer = %singer.key,
        path = %file_path,
        bytes = upload.bytes.len(),
        "Uploaded song"
    );

    Ok(Song {
        id,
        singer: singer.key,
        title: title.to_string(),
        file_path,
    })
}

/// Pick a destination inside `folder` that is neither on disk nor cataloged.
fn free_destination(folder: &Path, safe_name: &str, cataloged: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| p.exists() || cataloged.contains(&normalize_path(p));

    let dest = folder.join(safe_name);
    if !taken(&dest) {
        return dest;
    }

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Utc::now().timestamp();

    let mut candidate = folder.join(format!("{stem}_{stamp}{extension}"));
    let mut attempt = 1;
    while taken(&candidate) {
        candidate = folder.join(format!("{stem}_{stamp}_{attempt}{extension}"));
        attempt += 1;
    }
    candidate
}
