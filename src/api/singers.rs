//! Singer endpoints.

use actix_files::NamedFile;
use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::{AppError, AppResult, OptionExt};
use crate::library::sync::normalize_path;
use crate::library::NewSinger;
use crate::models::AppState;

lazy_static::lazy_static! {
    static ref SINGER_KEY_REGEX: regex::Regex = regex::Regex::new(r"^[a-z0-9_]+$").unwrap();
}

/// Portrait formats that may be served.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Request body for registering a singer.
#[derive(Debug, Deserialize, Validate)]
pub struct AddSingerRequest {
    /// Key (2-48 characters, lowercase letters, digits and underscores).
    #[validate(length(min = 2, max = 48, message = "Singer key must be 2-48 characters"))]
    #[validate(regex(
        path = "SINGER_KEY_REGEX",
        message = "Singer key can only contain lowercase letters, numbers, and underscores"
    ))]
    pub key: String,
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Singer name must be 1-100 characters"))]
    pub name: String,
    /// Portrait file, relative to the images folder.
    #[validate(length(min = 1, max = 255, message = "Image name must be 1-255 characters"))]
    #[serde(default)]
    pub image: Option<String>,
}

/// Resolve a portrait against `images_root`.
///
/// Fails with `Validation` unless the result is an image file name that stays
/// below `images_root` after `.`/`..` are folded.
fn resolve_portrait(images_root: &Path, image: &str) -> AppResult<PathBuf> {
    let root = normalize_path(images_root);
    let path = normalize_path(&images_root.join(image));
    if path == root || !path.starts_with(&root) {
        tracing::warn!(image = %image, "Portrait outside the images folder rejected");
        return Err(AppError::Validation(
            "Portrait must be inside the images folder".to_string(),
        ));
    }

    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if !is_image {
        return Err(AppError::Validation(format!("Unsupported portrait: {}", image)));
    }

    Ok(path)
}

/// List singers.
///
/// GET /api/singers
#[get("/api/singers")]
pub async fn list_singers(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.singers.list()?))
}

/// Register a singer and create its audio folder.
///
/// POST /api/singers
#[post("/api/singers")]
pub async fn add_singer(
    data: web::Data<AppState>,
    body: web::Json<AddSingerRequest>,
) -> AppResult<HttpResponse> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let AddSingerRequest { key, name, image } = body.into_inner();
    let image = image
        .map(|image| resolve_portrait(&data.images_root, &image))
        .transpose()?;

    let singer = data.singers.add(NewSinger {
        key,
        name,
        image,
        folder: None,
    })?;

    Ok(HttpResponse::Created().json(singer))
}

/// Get a singer's portrait image.
///
/// GET /api/singers/{key}/image
#[get("/api/singers/{key}/image")]
pub async fn singer_image(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let singer = data.singers.get(&path)?;
    let image = singer
        .image
        .and_then(|p| resolve_portrait(&data.images_root, &p.to_string_lossy()).ok())
        .filter(|p| p.is_file())
        .ok_or_not_found(format!("No portrait for singer {}", singer.key))?;

    let file = NamedFile::open(&image)?;
    let mut response = file.into_response(&req);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=86400"),
    );
    Ok(response)
}

/// Configure singer routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_singers)
        .service(add_singer)
        .service(singer_image);
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::app_state;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_add_and_list_singers() {
        let (dir, state) = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/singers")
                .set_json(serde_json::json!({ "key": "arnest_mall", "name": "Arnest Mall" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(dir.path().join("audio").join("arnest_mall").is_dir());

        let duplicate = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/singers")
                .set_json(serde_json::json!({ "key": "arnest_mall", "name": "Again" }))
                .to_request(),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let invalid = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/singers")
                .set_json(serde_json::json!({ "key": "Bad Key", "name": "Bad" }))
                .to_request(),
        )
        .await;
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let singers: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/singers").to_request(),
        )
        .await;
        assert_eq!(singers.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_singer_image() {
        let (dir, state) = app_state();
        std::fs::write(dir.path().join("images").join("arslan.jpeg"), b"jpeg bytes").unwrap();
        let outside = dir.path().join("private.jpeg");
        std::fs::write(&outside, b"private").unwrap();
        // Stored before portraits were confined to the images folder.
        state
            .singers
            .add(NewSinger {
                key: "old_entry".to_string(),
                name: "Old Entry".to_string(),
                image: Some(outside),
                folder: None,
            })
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let created = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/singers")
                .set_json(serde_json::json!({
                    "key": "arslan_john",
                    "name": "Arslan John",
                    "image": "arslan.jpeg"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let body = test::call_and_read_body(
            &app,
            test::TestRequest::get()
                .uri("/api/singers/arslan_john/image")
                .to_request(),
        )
        .await;
        assert_eq!(&body[..], b"jpeg bytes");

        for uri in ["/api/singers/arif_bhatti/image", "/api/singers/old_entry/image"] {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn test_portrait_outside_images_folder_rejected() {
        let (_dir, state) = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        for image in ["/etc/passwd", "../singers.json", "portrait.txt"] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/singers")
                    .set_json(serde_json::json!({ "key": "evil", "name": "Evil", "image": image }))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let req = test::TestRequest::get().uri("/api/singers/evil/image").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
