//! Upload endpoint.

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::library::{save_upload, Upload};
use crate::models::AppState;

/// Query parameters describing an upload. The body carries the file bytes.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UploadQuery {
    #[validate(length(min = 1, message = "Please select a singer"))]
    pub singer: String,
    #[validate(length(min = 1, max = 200, message = "Song title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: String,
}

/// Upload an audio file for a singer.
///
/// POST /api/upload?singer=&title=&filename=
///
/// The request body is the raw file content.
#[post("/api/upload")]
pub async fn upload_song(
    data: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let song = save_upload(
        &data.library,
        data.singers.as_ref(),
        &Upload {
            singer: &query.singer,
            title: &query.title,
            filename: &query.filename,
            bytes: &body,
        },
        data.max_upload_bytes,
    )?;

    Ok(HttpResponse::Created().json(song))
}

/// Configure upload routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_song);
}
