//! Session and page view endpoints.

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::library::{reconcile, SyncReport};
use crate::models::AppState;
use crate::session::{Page, SessionId, SessionState};
use crate::view::{self, NowPlaying, PageContent};

/// A session and its current state.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub session: SessionState,
}

/// Request body for page navigation.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub page: Page,
    /// Singer key, required for the artist page.
    #[serde(default)]
    pub singer: Option<String>,
}

/// Everything needed to draw one page.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub session_id: Uuid,
    pub session: SessionState,
    pub content: PageContent,
    pub now_playing: Option<NowPlaying>,
    /// Result of the reconciliation run for this page load.
    pub sync: SyncReport,
}

fn session_response(id: Uuid, session: SessionState) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse {
        session_id: id,
        session,
    })
}

/// Current session state.
///
/// GET /api/session
#[get("/api/session")]
pub async fn get_session(session: SessionId, data: web::Data<AppState>) -> HttpResponse {
    session_response(session.0, data.sessions.get(session.0))
}

/// Move to another page.
///
/// POST /api/session/navigate
#[post("/api/session/navigate")]
pub async fn navigate(
    session: SessionId,
    data: web::Data<AppState>,
    body: web::Json<NavigateRequest>,
) -> AppResult<HttpResponse> {
    let NavigateRequest { page, singer } = body.into_inner();
    let state = data
        .sessions
        .try_update(session.0, |s| s.navigate(page, singer))?;
    Ok(session_response(session.0, state))
}

/// Select a song for playback.
///
/// POST /api/session/play/{id}
#[post("/api/session/play/{id}")]
pub async fn play(
    session: SessionId,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let song = data.library.get_song(path.into_inner())?;
    let state = data.sessions.update(session.0, |s| s.play(song.id));

    tracing::debug!(session = %session.0, song_id = song.id, "Selected song for playback");
    Ok(session_response(session.0, state))
}

/// Clear the playback selection.
///
/// POST /api/session/stop
#[post("/api/session/stop")]
pub async fn stop(session: SessionId, data: web::Data<AppState>) -> HttpResponse {
    let state = data.sessions.update(session.0, SessionState::stop);
    session_response(session.0, state)
}

/// Build the current page of the session.
///
/// GET /api/view
///
/// Each call first reconciles the singer folders with the catalog.
#[get("/api/view")]
pub async fn page_view(session: SessionId, data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let singers = data.singers.list()?;
    let sync = reconcile(&data.library, &singers)?;

    let current = data.sessions.get(session.0);
    let (state, content) = view::render(&data.library, data.singers.as_ref(), current)?;
    let state = data.sessions.update(session.0, |_| state);
    let now_playing = view::now_playing(&data.library, data.singers.as_ref(), &state)?;

    Ok(HttpResponse::Ok().json(PageView {
        session_id: session.0,
        session: state,
        content,
        now_playing,
        sync,
    }))
}

/// Configure session routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_session)
        .service(navigate)
        .service(play)
        .service(stop)
        .service(page_view);
}
