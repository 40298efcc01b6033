//! SQLite-backed catalog of songs and favorites.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::{FavoriteState, Song};

const SONG_COLUMNS: &str = "id, singer, title, file_path";

/// Durable catalog of songs and favorited song ids.
///
/// Every operation is one or two short statements on a shared connection.
/// Writers are assumed to be few and non-concurrent, so no statement runs
/// inside an explicit transaction.
#[derive(Debug)]
pub struct LibraryStore {
    conn: Mutex<Connection>,
}

impl LibraryStore {
    /// Open (or create) the catalog at `path` and make sure both tables exist.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened song catalog");
        Self::with_connection(conn)
    }

    /// Catalog that lives only as long as the process.
    #[cfg(test)]
    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        // Favorites may outlive their song, so the reference is not enforced.
        conn.execute_batch(
            "PRAGMA foreign_keys = OFF;
            CREATE TABLE IF NOT EXISTS songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                singer TEXT NOT NULL,
                title TEXT NOT NULL,
                file_path TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                song_id INTEGER,
                added_at TEXT DEFAULT (datetime('now')),
                FOREIGN KEY(song_id) REFERENCES songs(id)
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a song row and return its id. Path uniqueness is the caller's job.
    pub fn add_song(&self, singer: &str, title: &str, file_path: &str) -> AppResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO songs (singer, title, file_path) VALUES (?1, ?2, ?3)",
            params![singer, title, file_path],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(song_id = id, singer = %singer, title = %title, "Cataloged song");
        Ok(id)
    }

    /// All songs, newest first, optionally restricted to one singer.
    pub fn list_songs(&self, singer: Option<&str>) -> AppResult<Vec<Song>> {
        let conn = self.conn.lock();
        let songs = match singer {
            Some(singer) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SONG_COLUMNS} FROM songs WHERE singer = ?1 ORDER BY id DESC"
                ))?;
                let rows = stmt.query_map([singer], song_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {SONG_COLUMNS} FROM songs ORDER BY id DESC"))?;
                let rows = stmt.query_map([], song_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(songs)
    }

    /// Songs whose id is currently favorited, newest first.
    pub fn list_favorite_songs(&self) -> AppResult<Vec<Song>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SONG_COLUMNS} FROM songs
             WHERE id IN (SELECT song_id FROM favorites)
             ORDER BY id DESC"
        ))?;
        let songs = stmt
            .query_map([], song_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(songs)
    }

    /// Every file path currently in the catalog.
    pub fn list_file_paths(&self) -> AppResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT file_path FROM songs")?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// Point lookup of a single song.
    pub fn get_song(&self, id: i64) -> AppResult<Song> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
            [id],
            song_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::song_not_found(id))
    }

    /// Number of cataloged songs.
    pub fn count_songs(&self) -> AppResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove a song, its favorite rows and, best effort, its audio file.
    ///
    /// The file is only touched once both rows are gone. A file that cannot
    /// be removed is logged and left behind.
    pub fn delete_song(&self, id: i64) -> AppResult<Song> {
        let song = self.get_song(id)?;

        {
            let conn = self.conn.lock();
            conn.execute("DELETE FROM favorites WHERE song_id = ?1", [id])?;
            conn.execute("DELETE FROM songs WHERE id = ?1", [id])?;
        }

        remove_backing_file(&song);

        tracing::info!(song_id = id, title = %song.title, "Deleted song");
        Ok(song)
    }

    /// Flip the favorite marker of a song.
    pub fn toggle_favorite(&self, id: i64) -> AppResult<FavoriteState> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row("SELECT 1 FROM favorites WHERE song_id = ?1", [id], |_| Ok(()))
            .optional()?
            .is_some();

        let state = if exists {
            conn.execute("DELETE FROM favorites WHERE song_id = ?1", [id])?;
            FavoriteState::Removed
        } else {
            conn.execute("INSERT INTO favorites (song_id) VALUES (?1)", [id])?;
            FavoriteState::Added
        };

        tracing::debug!(song_id = id, state = ?state, "Toggled favorite");
        Ok(state)
    }

    /// Ids of all favorited songs.
    pub fn list_favorite_ids(&self) -> AppResult<BTreeSet<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT song_id FROM favorites WHERE song_id IS NOT NULL")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        singer: row.get(1)?,
        title: row.get(2)?,
        file_path: row.get(3)?,
    })
}

fn remove_backing_file(song: &Song) {
    let path = Path::new(&song.file_path);
    if song.file_path.is_empty() || !path.exists() {
        return;
    }

    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(
            song_id = song.id,
            path = %path.display(),
            error = %e,
            "Could not remove audio file, keeping catalog change"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> LibraryStore {
        LibraryStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_add_then_get_returns_same_fields() {
        let store = store();
        let id = store
            .add_song("arif_bhatti", "Yesu Pyar Hai", "audio/arif_bhatti/yesu_pyar_hai.mp3")
            .unwrap();

        let song = store.get_song(id).unwrap();
        assert_eq!(song.id, id);
        assert_eq!(song.singer, "arif_bhatti");
        assert_eq!(song.title, "Yesu Pyar Hai");
        assert_eq!(song.file_path, "audio/arif_bhatti/yesu_pyar_hai.mp3");
    }

    #[test]
    fn test_get_missing_song_is_not_found() {
        let store = store();
        assert!(matches!(store.get_song(42), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_songs_newest_first_and_filtered() {
        let store = store();
        let a = store.add_song("arnest_mall", "One", "a.mp3").unwrap();
        let b = store.add_song("arslan_john", "Two", "b.mp3").unwrap();
        let c = store.add_song("arnest_mall", "Three", "c.mp3").unwrap();

        let all: Vec<i64> = store.list_songs(None).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(all, vec![c, b, a]);

        let arnest: Vec<i64> = store
            .list_songs(Some("arnest_mall"))
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(arnest, vec![c, a]);

        assert!(store.list_songs(Some("nobody")).unwrap().is_empty());
        assert_eq!(store.count_songs().unwrap(), 3);
    }

    #[test]
    fn test_toggle_favorite_twice() {
        let store = store();
        let id = store.add_song("arif_bhatti", "Song", "s.mp3").unwrap();

        assert_eq!(store.toggle_favorite(id).unwrap(), FavoriteState::Added);
        assert!(store.list_favorite_ids().unwrap().contains(&id));
        assert_eq!(store.list_favorite_songs().unwrap().len(), 1);

        assert_eq!(store.toggle_favorite(id).unwrap(), FavoriteState::Removed);
        assert!(store.list_favorite_ids().unwrap().is_empty());
        assert!(store.list_favorite_songs().unwrap().is_empty());
    }

    #[test]
    fn test_delete_song_removes_row_favorite_and_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.mp3");
        fs::write(&file, b"ID3").unwrap();

        let store = store();
        let id = store
            .add_song("arif_bhatti", "Gone", file.to_str().unwrap())
            .unwrap();
        store.toggle_favorite(id).unwrap();

        let deleted = store.delete_song(id).unwrap();
        assert_eq!(deleted.id, id);
        assert!(!file.exists());
        assert!(store.list_songs(None).unwrap().is_empty());
        assert!(!store.list_favorite_ids().unwrap().contains(&id));
        assert!(matches!(store.get_song(id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete_song_without_file_or_favorite() {
        let store = store();
        let id = store
            .add_song("arif_bhatti", "Ghost", "/definitely/not/here.mp3")
            .unwrap();

        store.delete_song(id).unwrap();
        assert!(store.list_songs(None).unwrap().is_empty());
        assert!(store.list_favorite_ids().unwrap().is_empty());
    }

    #[test]
    fn test_delete_song_when_file_cannot_be_removed() {
        let dir = tempdir().unwrap();
        // A directory where a file is expected makes remove_file fail.
        let locked = dir.path().join("locked.mp3");
        fs::create_dir(&locked).unwrap();

        let store = store();
        let id = store
            .add_song("arif_bhatti", "Locked", locked.to_str().unwrap())
            .unwrap();

        store.delete_song(id).unwrap();
        assert!(locked.exists());
        assert!(matches!(store.get_song(id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_toggle_favorite_of_unknown_song() {
        let store = store();

        assert_eq!(store.toggle_favorite(99).unwrap(), FavoriteState::Added);
        assert!(store.list_favorite_ids().unwrap().contains(&99));
        assert!(store.list_favorite_songs().unwrap().is_empty());
        assert_eq!(store.toggle_favorite(99).unwrap(), FavoriteState::Removed);
    }

    #[test]
    fn test_delete_favorited_song_on_disk_database() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("loved.mp3");
        fs::write(&file, b"ID3").unwrap();

        let store = LibraryStore::open(dir.path().join("database.db")).unwrap();
        let keep = store.add_song("arif_bhatti", "Keep", "keep.mp3").unwrap();
        let id = store
            .add_song("arif_bhatti", "Loved", file.to_str().unwrap())
            .unwrap();
        store.toggle_favorite(keep).unwrap();
        store.toggle_favorite(id).unwrap();

        store.delete_song(id).unwrap();
        assert!(!file.exists());
        let ids: Vec<i64> = store.list_songs(None).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![keep]);
        assert_eq!(store.list_favorite_ids().unwrap(), BTreeSet::from([keep]));
    }

    #[test]
    fn test_delete_missing_song_is_not_found() {
        let store = store();
        assert!(matches!(store.delete_song(7), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("database.db");

        let id = {
            let store = LibraryStore::open(&path).unwrap();
            store.add_song("arslan_john", "Rabb Di Rehmat", "r.mp3").unwrap()
        };

        let reopened = LibraryStore::open(&path).unwrap();
        assert_eq!(reopened.get_song(id).unwrap().title, "Rabb Di Rehmat");
        assert_eq!(reopened.list_file_paths().unwrap(), vec!["r.mp3".to_string()]);
    }
}
