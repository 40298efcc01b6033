//! Song catalog endpoints.

use actix_files::NamedFile;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::library::reconcile;
use crate::models::{AppState, ListSongsQuery, Song};
use crate::session::{SessionId, SessionState};
use crate::view::song_entries;

/// Response for a deleted song.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Song,
    pub session_id: Uuid,
    /// Caller's session after the deletion.
    pub session: SessionState,
}

/// List songs, newest first.
///
/// GET /api/songs
///
/// Query parameters:
/// - `singer`: only songs of this singer key
#[get("/api/songs")]
pub async fn list_songs(
    data: web::Data<AppState>,
    query: web::Query<ListSongsQuery>,
) -> AppResult<HttpResponse> {
    let favorites = data.library.list_favorite_ids()?;
    let songs = data.library.list_songs(query.singer.as_deref())?;

    Ok(HttpResponse::Ok().json(song_entries(songs, &favorites)))
}

/// Get one song.
///
/// GET /api/songs/{id}
#[get("/api/songs/{id}")]
pub async fn get_song(data: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let song = data.library.get_song(path.into_inner())?;
    Ok(HttpResponse::Ok().json(song))
}

/// Delete a song and its audio file.
///
/// DELETE /api/songs/{id}
///
/// Any session that had the song selected for playback loses the selection.
#[delete("/api/songs/{id}")]
pub async fn delete_song(
    session: SessionId,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let deleted = data.library.delete_song(id)?;

    let cleared = data.sessions.forget_song(id);
    if cleared > 0 {
        tracing::debug!(song_id = id, sessions = cleared, "Cleared playback selection");
    }

    Ok(HttpResponse::Ok().json(DeleteResponse {
        deleted,
        session_id: session.0,
        session: data.sessions.get(session.0),
    }))
}

/// Stream a song's audio file.
///
/// GET /api/songs/{id}/stream
///
/// Supports range requests for seeking.
#[get("/api/songs/{id}/stream")]
pub async fn stream_song(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let song = data.library.get_song(path.into_inner())?;
    let file_path = Path::new(&song.file_path);

    if !file_path.is_file() {
        tracing::warn!(
            song_id = song.id,
            path = %song.file_path,
            "Cataloged audio file is missing"
        );
        return Err(AppError::NotFound(format!(
            "Audio file missing for song {}",
            song.id
        )));
    }

    let file = NamedFile::open(file_path)?;
    Ok(file.into_response(&req))
}

/// Reconcile the singer folders with the catalog.
///
/// POST /api/sync
#[post("/api/sync")]
pub async fn sync_library(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let singers = data.singers.list()?;
    let report = reconcile(&data.library, &singers)?;
    Ok(HttpResponse::Ok().json(report))
}

/// Configure song routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_songs)
        .service(get_song)
        .service(delete_song)
        .service(stream_song)
        .service(sync_library);
}
