//! Per-visitor session state: current page, selected singer and the song
//! selected for playback.

pub mod extractor;
pub mod state;
pub mod store;

pub use extractor::{SessionId, SESSION_HEADER};
pub use state::{Page, SessionState};
pub use store::SessionStore;
