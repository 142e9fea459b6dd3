//! Route groups. Each module exposes `routes()` to be merged into the app
//! router.

pub mod arrays;
pub mod catalog;
pub mod tokens;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::media::{negotiate_for, ResultKind};

pub(crate) fn accept(headers: &HeaderMap) -> Option<&str> { headers.get(ACCEPT).and_then(|v| v.to_str().ok()) }

/// Envelope results only come as JSON; anything else is a 406 before any
/// work is done.
pub(crate) fn negotiate_envelope(headers: &HeaderMap) -> AppResult<&'static str> {
    negotiate_for(ResultKind::Envelope, 0, accept(headers))
}

pub(crate) fn envelope_response(media: &'static str, value: &Value) -> AppResult<Response> {
    let body = serde_json::to_vec(value).map_err(|e| AppError::internal(e.to_string()))?;
    Ok(([(CONTENT_TYPE, media)], body).into_response())
}
