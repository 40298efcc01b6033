//! Per-session view state and its transitions.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Page a session is looking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    Artist,
    Favorites,
    Upload,
    Settings,
}

/// Everything the server remembers about one visitor between requests.
///
/// Transitions consume the state and return the next one; nothing else
/// mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub page: Page,
    /// Singer whose songs the artist page shows.
    pub selected_singer: Option<String>,
    /// Song currently selected for playback.
    pub playing_song: Option<i64>,
}

impl SessionState {
    /// Select `song_id` for playback, replacing any previous selection.
    pub fn play(self, song_id: i64) -> Self {
        Self {
            playing_song: Some(song_id),
            ..self
        }
    }

    /// Clear the playback selection.
    pub fn stop(self) -> Self {
        Self {
            playing_song: None,
            ..self
        }
    }

    /// Drop the playback selection if it points at a deleted song.
    pub fn forget_song(self, song_id: i64) -> Self {
        if self.playing_song == Some(song_id) {
            self.stop()
        } else {
            self
        }
    }

    /// Move to another page. The playback selection is left untouched.
    ///
    /// The artist page needs a singer key. Going home forgets the selected
    /// singer; other pages keep it.
    pub fn navigate(self, page: Page, singer: Option<String>) -> AppResult<Self> {
        let selected_singer = match page {
            Page::Artist => Some(singer.ok_or_else(|| {
                AppError::BadRequest("The artist page needs a singer".to_string())
            })?),
            Page::Home => None,
            _ => self.selected_singer,
        };

        Ok(Self {
            page,
            selected_singer,
            playing_song: self.playing_song,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_replaces_selection() {
        let state = SessionState::default().play(3).play(5);
        assert_eq!(state.playing_song, Some(5));
    }

    #[test]
    fn test_forget_song_only_clears_matching_selection() {
        let state = SessionState::default().play(5);
        assert_eq!(state.clone().forget_song(4).playing_song, Some(5));
        assert_eq!(state.forget_song(5).playing_song, None);
    }

    #[test]
    fn test_navigation_keeps_playback() {
        let state = SessionState::default()
            .play(7)
            .navigate(Page::Artist, Some("arif_bhatti".to_string()))
            .unwrap();
        assert_eq!(state.page, Page::Artist);
        assert_eq!(state.selected_singer.as_deref(), Some("arif_bhatti"));
        assert_eq!(state.playing_song, Some(7));

        let state = state.navigate(Page::Favorites, None).unwrap();
        assert_eq!(state.selected_singer.as_deref(), Some("arif_bhatti"));
        assert_eq!(state.playing_song, Some(7));

        let state = state.navigate(Page::Home, None).unwrap();
        assert_eq!(state.selected_singer, None);
        assert_eq!(state.playing_song, Some(7));
    }

    #[test]
    fn test_artist_page_requires_singer() {
        let result = SessionState::default().navigate(Page::Artist, None);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_state_serialization() {
        let state = SessionState::default().play(2);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["page"], "home");
        assert_eq!(json["playing_song"], 2);

        let back: SessionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
