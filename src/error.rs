//! Unified application error model and mapping helpers.
//! Every condition raised while resolving entries, addressing blocks, binding
//! search filters or negotiating formats ends up as one `AppError`, which knows
//! its stable code and the HTTP status it maps to at the boundary.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tracing::{debug, error};

/// Which kind of named sub-component a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Variable,
    Coordinate,
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Variable => write!(f, "variable"),
            ComponentKind::Coordinate => write!(f, "coordinate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    #[error("No such entry: /{path}")]
    NotFound { path: String },
    #[error("{message}")]
    WrongType { path: String, message: String },
    #[error("{message}")]
    BadRequest { message: String },
    #[error("Invalid filter[{descriptor}][condition][{field}]: {message}")]
    BadFilterValue { descriptor: String, field: String, message: String },
    #[error("Block index has {got} dimension(s) but the data source has {expected}")]
    BlockDimensionMismatch { expected: usize, got: usize },
    #[error("Block index out of range: {message}")]
    BlockIndexOutOfRange { message: String },
    #[error("Slice out of range: {message}")]
    SliceOutOfRange { message: String },
    #[error("No such {kind} {name}.")]
    UnknownComponent { kind: ComponentKind, name: String },
    #[error("None of the requested media types are supported; supported: {}", .supported.join(", "))]
    UnsupportedMediaTypes { supported: Vec<String> },
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Forbidden { message: String },
    #[error("{message}")]
    Compute { message: String },
    #[error("{message}")]
    Timeout { message: String },
    #[error("{message}")]
    Internal { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "not_found",
            AppError::WrongType { .. } => "wrong_type",
            AppError::BadRequest { .. } => "bad_request",
            AppError::BadFilterValue { .. } => "bad_filter_value",
            AppError::BlockDimensionMismatch { .. } => "block_dimension_mismatch",
            AppError::BlockIndexOutOfRange { .. } => "block_index_out_of_range",
            AppError::SliceOutOfRange { .. } => "slice_out_of_range",
            AppError::UnknownComponent { .. } => "unknown_component",
            AppError::UnsupportedMediaTypes { .. } => "unsupported_media_types",
            AppError::Unauthorized { .. } => "unauthorized",
            AppError::Forbidden { .. } => "forbidden",
            AppError::Compute { .. } => "compute_error",
            AppError::Timeout { .. } => "timeout",
            AppError::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> String { self.to_string() }

    pub fn not_found<S: Into<String>>(path: S) -> Self { AppError::NotFound { path: path.into() } }
    pub fn wrong_type<S: Into<String>>(path: S, msg: S) -> Self { AppError::WrongType { path: path.into(), message: msg.into() } }
    pub fn bad_request<S: Into<String>>(msg: S) -> Self { AppError::BadRequest { message: msg.into() } }
    pub fn block_out_of_range<S: Into<String>>(msg: S) -> Self { AppError::BlockIndexOutOfRange { message: msg.into() } }
    pub fn slice_out_of_range<S: Into<String>>(msg: S) -> Self { AppError::SliceOutOfRange { message: msg.into() } }
    pub fn unknown_component<S: Into<String>>(kind: ComponentKind, name: S) -> Self { AppError::UnknownComponent { kind, name: name.into() } }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { AppError::Unauthorized { message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { message: msg.into() } }

    pub fn bad_filter<D: Into<String>, F: Into<String>, M: Into<String>>(descriptor: D, field: F, msg: M) -> Self {
        AppError::BadFilterValue { descriptor: descriptor.into(), field: field.into(), message: msg.into() }
    }

    pub fn unsupported_media(supported: &[&str]) -> Self {
        AppError::UnsupportedMediaTypes { supported: supported.iter().map(|s| s.to_string()).collect() }
    }

    /// Map to HTTP status code.
    ///
    /// `WrongType` deliberately maps to 404: the path exists, but the route
    /// does not apply to what lives there.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } | AppError::WrongType { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. }
            | AppError::BadFilterValue { .. }
            | AppError::BlockDimensionMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::BlockIndexOutOfRange { .. }
            | AppError::SliceOutOfRange { .. }
            | AppError::UnknownComponent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnsupportedMediaTypes { .. } => StatusCode::NOT_ACCEPTABLE,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Compute { .. } | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}

// Extractor rejections become client errors in the common envelope.
impl From<QueryRejection> for AppError {
    fn from(rej: QueryRejection) -> Self { AppError::bad_request(rej.body_text()) }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self { AppError::bad_request(rej.body_text()) }
}

impl From<PathRejection> for AppError {
    fn from(rej: PathRejection) -> Self { AppError::bad_request(rej.body_text()) }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            error!(code = self.code_str(), "request failed: {}", self);
        } else {
            debug!(code = self.code_str(), "request rejected: {}", self);
        }
        let mut body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        if let AppError::UnsupportedMediaTypes { supported } = &self {
            body["supported"] = serde_json::json!(supported);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
