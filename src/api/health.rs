//! Health check endpoints.

use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::models::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Service name.
    pub service: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Service status.
    pub status: &'static str,
    /// Catalog answers queries.
    pub catalog: bool,
    /// Audio root accessible.
    pub audio_root: bool,
    /// Songs in the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<usize>,
    /// Sessions seen since start.
    pub sessions: usize,
}

/// Health check endpoint.
///
/// GET /health
///
/// Returns 200 if the service is running.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
    })
}

/// Readiness check endpoint.
///
/// GET /ready
///
/// Returns 200 when the catalog can be queried and the audio root exists.
#[get("/ready")]
pub async fn ready(data: web::Data<AppState>) -> HttpResponse {
    let songs = match data.library.count_songs() {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog not ready");
            None
        }
    };
    let audio_root_ok = data.audio_root.is_dir();
    let all_ok = songs.is_some() && audio_root_ok;

    let response = ReadyResponse {
        status: if all_ok { "ready" } else { "not_ready" },
        catalog: songs.is_some(),
        audio_root: audio_root_ok,
        songs,
        sessions: data.sessions.len(),
    };

    if all_ok {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Configure health routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
