use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::library::{LibraryStore, SharedSingerRegistry};
use crate::session::SessionStore;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<LibraryStore>,
    pub singers: SharedSingerRegistry,
    pub sessions: Arc<SessionStore>,
    pub audio_root: PathBuf,
    /// Only files below this folder are served as singer portraits.
    pub images_root: PathBuf,
    pub max_upload_bytes: usize,
}

/// A cataloged song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    /// Key of the singer the song belongs to.
    pub singer: String,
    pub title: String,
    /// Location of the audio file, as it was cataloged.
    pub file_path: String,
}

/// Outcome of toggling a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteState {
    Added,
    Removed,
}

/// Query parameters for song listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListSongsQuery {
    /// Restrict the listing to one singer key.
    pub singer: Option<String>,
}

/// Song listing with the favorite flag resolved per song.
#[derive(Debug, Serialize)]
pub struct SongEntry {
    #[serde(flatten)]
    pub song: Song,
    pub favorite: bool,
}
