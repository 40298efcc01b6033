//! Favorite endpoints.

use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;

use crate::error::AppResult;
use crate::models::{AppState, FavoriteState};
use crate::view::song_entries;

/// Response for a favorite toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub song_id: i64,
    pub state: FavoriteState,
}

/// List favorited songs.
///
/// GET /api/favorites
#[get("/api/favorites")]
pub async fn list_favorites(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let songs = data.library.list_favorite_songs()?;
    let favorites = songs.iter().map(|s| s.id).collect();
    Ok(HttpResponse::Ok().json(song_entries(songs, &favorites)))
}

/// Toggle the favorite marker of a song.
///
/// POST /api/favorites/{id}
#[post("/api/favorites/{id}")]
pub async fn toggle_favorite(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let song_id = path.into_inner();
    // Unknown ids are rejected here; the store itself tolerates them.
    data.library.get_song(song_id)?;

    let state = data.library.toggle_favorite(song_id)?;
    tracing::info!(song_id, state = ?state, "Favorite toggled");

    Ok(HttpResponse::Ok().json(ToggleResponse { song_id, state }))
}

/// Configure favorite routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_favorites).service(toggle_favorite);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::app_state;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_toggle_twice() {
        let (_dir, state) = app_state();
        let id = state.library.add_song("arif_bhatti", "Song", "s.mp3").unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let uri = format!("/api/favorites/{id}");
        let first: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::post().uri(&uri).to_request())
                .await;
        assert_eq!(first["state"], "added");

        let listed: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/favorites").to_request(),
        )
        .await;
        assert_eq!(listed[0]["id"], id);

        let second: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::post().uri(&uri).to_request())
                .await;
        assert_eq!(second["state"], "removed");
        assert!(state.library.list_favorite_ids().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_toggle_unknown_song() {
        let (_dir, state) = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/favorites/41").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.library.list_favorite_ids().unwrap().is_empty());
    }
}
