//! Session id extractor.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Session id of the caller.
///
/// Requests without the header get a fresh id; clients keep the `session_id`
/// returned in the response and send it back on later requests.
///
/// # Example
/// ```ignore
/// async fn handler(session: SessionId) -> impl Responder {
///     format!("Hello, {}!", session.0)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl FromRequest for SessionId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_session(req))
    }
}

fn extract_session(req: &HttpRequest) -> Result<SessionId, AppError> {
    let Some(header) = req.headers().get(SESSION_HEADER) else {
        return Ok(SessionId(Uuid::new_v4()));
    };

    let value = header
        .to_str()
        .map_err(|_| AppError::BadRequest("Session id must be ASCII".to_string()))?;

    Uuid::parse_str(value.trim())
        .map(SessionId)
        .map_err(|_| AppError::BadRequest(format!("Invalid session id: {}", value)))
}
