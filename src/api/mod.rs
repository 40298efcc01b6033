//! HTTP endpoints.

pub mod favorites;
pub mod health;
pub mod session;
pub mod singers;
pub mod songs;
pub mod upload;

use actix_web::web;

/// Register every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(singers::configure)
        .configure(songs::configure)
        .configure(favorites::configure)
        .configure(upload::configure)
        .configure(session::configure);
}
