//! Page view models.
//!
//! A single function turns a session state into the data one page needs. The
//! page markup and styling live in the client.

use chrono::Utc;
use lofty::file::AudioFile;
use lofty::read_from_path;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::library::{LibraryStore, Singer, SingerRegistry};
use crate::models::{Song, SongEntry};
use crate::session::{Page, SessionState};

/// How many songs the home page lists under "recent uploads".
const RECENT_SONGS: usize = 8;

/// Seconds each verse stays on screen.
const VERSE_PERIOD_SECS: i64 = 30;

const VERSES: &[&str] = &[
    "Psalm 100:1 - Make a joyful noise unto the Lord, all ye lands.",
    "Isaiah 12:5 - Sing unto the Lord; for He hath done excellent things.",
    "Colossians 3:16 - Sing with grace in your hearts to the Lord.",
    "Psalm 95:1 - O come, let us sing unto the Lord!",
    "Ephesians 5:19 - Singing and making melody in your heart to the Lord.",
    "Psalm 33:3 - Sing unto Him a new song; play skilfully with a loud noise.",
    "Psalm 147:7 - Sing unto the Lord with thanksgiving.",
    "1 Chronicles 16:9 - Sing unto Him, sing psalms unto Him.",
    "Psalm 13:6 - I will sing unto the Lord, because He hath dealt bountifully with me.",
    "Psalm 104:33 - I will sing unto the Lord as long as I live.",
];

const SETTINGS_NOTE: &str =
    "Use Upload to add songs and Favorites to manage the songs you like.";

/// Data for the page a session is on.
#[derive(Debug, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageContent {
    Home {
        verse: &'static str,
        singers: Vec<Singer>,
        recent: Vec<SongEntry>,
    },
    Artist {
        singer: Singer,
        songs: Vec<SongEntry>,
    },
    Favorites {
        songs: Vec<SongEntry>,
    },
    Upload {
        singers: Vec<Singer>,
    },
    Settings {
        note: &'static str,
    },
}

/// The song selected for playback, resolved for display.
#[derive(Debug, Serialize)]
pub struct NowPlaying {
    #[serde(flatten)]
    pub song: Song,
    pub singer_name: Option<String>,
    /// Track length read from the file, when it can be parsed.
    pub duration_secs: Option<u32>,
}

/// Verse shown at `unix_secs`.
pub fn verse_at(unix_secs: i64) -> &'static str {
    let index = (unix_secs / VERSE_PERIOD_SECS).rem_euclid(VERSES.len() as i64);
    VERSES[index as usize]
}

/// Attach favorite flags to a list of songs.
pub fn song_entries(songs: Vec<Song>, favorites: &BTreeSet<i64>) -> Vec<SongEntry> {
    songs
        .into_iter()
        .map(|song| SongEntry {
            favorite: favorites.contains(&song.id),
            song,
        })
        .collect()
}

/// Build the content of the session's current page.
///
/// Returns the state the session should continue with: an artist page whose
/// singer is missing or unknown falls back to the home page.
pub fn render(
    store: &LibraryStore,
    singers: &dyn SingerRegistry,
    state: SessionState,
) -> AppResult<(SessionState, PageContent)> {
    let content = match state.page {
        Page::Home => home(store, singers)?,
        Page::Artist => {
            let singer = match &state.selected_singer {
                Some(key) => singers.find(key)?,
                None => None,
            };
            match singer {
                Some(singer) => {
                    let favorites = store.list_favorite_ids()?;
                    let songs = store.list_songs(Some(&singer.key))?;
                    PageContent::Artist {
                        songs: song_entries(songs, &favorites),
                        singer,
                    }
                }
                None => {
                    tracing::debug!(
                        singer = ?state.selected_singer,
                        "Artist page without singer, showing home"
                    );
                    let state = state.navigate(Page::Home, None)?;
                    return Ok((state, home(store, singers)?));
                }
            }
        }
        Page::Favorites => {
            let songs = store.list_favorite_songs()?;
            let favorites: BTreeSet<i64> = songs.iter().map(|s| s.id).collect();
            PageContent::Favorites {
                songs: song_entries(songs, &favorites),
            }
        }
        Page::Upload => PageContent::Upload {
            singers: singers.list()?,
        },
        Page::Settings => PageContent::Settings {
            note: SETTINGS_NOTE,
        },
    };

    Ok((state, content))
}

fn home(store: &LibraryStore, singers: &dyn SingerRegistry) -> AppResult<PageContent> {
    let favorites = store.list_favorite_ids()?;
    let mut recent = store.list_songs(None)?;
    recent.truncate(RECENT_SONGS);

    Ok(PageContent::Home {
        verse: verse_at(Utc::now().timestamp()),
        singers: singers.list()?,
        recent: song_entries(recent, &favorites),
    })
}

/// Resolve the session's playback selection. A selection pointing at a song
/// that no longer exists resolves to nothing.
pub fn now_playing(
    store: &LibraryStore,
    singers: &dyn SingerRegistry,
    state: &SessionState,
) -> AppResult<Option<NowPlaying>> {
    let Some(id) = state.playing_song else {
        return Ok(None);
    };

    let song = match store.get_song(id) {
        Ok(song) => song,
        Err(AppError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    let singer_name = singers.find(&song.singer)?.map(|s| s.name);
    let duration_secs = track_duration(Path::new(&song.file_path));

    Ok(Some(NowPlaying {
        song,
        singer_name,
        duration_secs,
    }))
}

fn track_duration(path: &Path) -> Option<u32> {
    let tagged_file = read_from_path(path).ok()?;
    Some(tagged_file.properties().duration().as_secs() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{JsonSingerRegistry, NewSinger};
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, LibraryStore, JsonSingerRegistry) {
        let dir = tempdir().unwrap();
        let registry =
            JsonSingerRegistry::new(dir.path().join("singers.json"), dir.path().join("audio"))
                .unwrap();
        registry
            .add(NewSinger {
                key: "arnest_mall".to_string(),
                name: "Arnest Mall".to_string(),
                image: None,
                folder: None,
            })
            .unwrap();
        (dir, LibraryStore::open_in_memory().unwrap(), registry)
    }

    #[test]
    fn test_verse_rotation() {
        assert_eq!(verse_at(0), VERSES[0]);
        assert_eq!(verse_at(29), VERSES[0]);
        assert_eq!(verse_at(30), VERSES[1]);
        assert_eq!(verse_at(30 * VERSES.len() as i64), VERSES[0]);
    }

    #[test]
    fn test_home_lists_recent_songs_with_favorites() {
        let (_dir, store, registry) = fixture();
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(
                store
                    .add_song("arnest_mall", &format!("Song {i}"), &format!("{i}.mp3"))
                    .unwrap(),
            );
        }
        store.toggle_favorite(ids[9]).unwrap();

        let (_, content) = render(&store, &registry, SessionState::default()).unwrap();
        match content {
            PageContent::Home { recent, singers, .. } => {
                assert_eq!(recent.len(), RECENT_SONGS);
                assert_eq!(recent[0].song.id, ids[9]);
                assert!(recent[0].favorite);
                assert!(!recent[1].favorite);
                assert_eq!(singers.len(), 1);
            }
            other => panic!("unexpected page: {other:?}"),
        }
    }

    #[test]
    fn test_artist_page_lists_singer_songs() {
        let (_dir, store, registry) = fixture();
        store.add_song("arnest_mall", "Mine", "m.mp3").unwrap();
        store.add_song("someone_else", "Theirs", "t.mp3").unwrap();

        let state = SessionState::default()
            .navigate(Page::Artist, Some("arnest_mall".to_string()))
            .unwrap();
        let (state, content) = render(&store, &registry, state).unwrap();

        assert_eq!(state.page, Page::Artist);
        match content {
            PageContent::Artist { singer, songs } => {
                assert_eq!(singer.name, "Arnest Mall");
                assert_eq!(songs.len(), 1);
                assert_eq!(songs[0].song.title, "Mine");
            }
            other => panic!("unexpected page: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_artist_falls_back_home() {
        let (_dir, store, registry) = fixture();
        let state = SessionState::default()
            .play(3)
            .navigate(Page::Artist, Some("nobody".to_string()))
            .unwrap();

        let (state, content) = render(&store, &registry, state).unwrap();
        assert_eq!(state.page, Page::Home);
        assert_eq!(state.playing_song, Some(3));
        assert!(matches!(content, PageContent::Home { .. }));
    }

    #[test]
    fn test_favorites_page() {
        let (_dir, store, registry) = fixture();
        let liked = store.add_song("arnest_mall", "Liked", "l.mp3").unwrap();
        store.add_song("arnest_mall", "Other", "o.mp3").unwrap();
        store.toggle_favorite(liked).unwrap();

        let state = SessionState::default()
            .navigate(Page::Favorites, None)
            .unwrap();
        let (_, content) = render(&store, &registry, state).unwrap();
        match content {
            PageContent::Favorites { songs } => {
                assert_eq!(songs.len(), 1);
                assert_eq!(songs[0].song.id, liked);
                assert!(songs[0].favorite);
            }
            other => panic!("unexpected page: {other:?}"),
        }
    }

    #[test]
    fn test_now_playing_resolves_and_forgets_deleted_song() {
        let (_dir, store, registry) = fixture();
        let id = store
            .add_song("arnest_mall", "Masih Mera Sahara", "missing.mp3")
            .unwrap();
        let state = SessionState::default().play(id);

        let playing = now_playing(&store, &registry, &state).unwrap().unwrap();
        assert_eq!(playing.song.title, "Masih Mera Sahara");
        assert_eq!(playing.singer_name.as_deref(), Some("Arnest Mall"));
        assert_eq!(playing.duration_secs, None);

        store.delete_song(id).unwrap();
        assert!(now_playing(&store, &registry, &state).unwrap().is_none());
        assert!(now_playing(&store, &registry, &SessionState::default())
            .unwrap()
            .is_none());
    }
}
