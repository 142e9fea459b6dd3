//! Extractors whose rejections render through [`AppError`], so a malformed
//! query string, path or body gets the same JSON error document as every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// The query string as a flat list of pairs, in request order.
pub type RawQuery = ApiQuery<Vec<(String, String)>>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Needs {
        #[allow(dead_code)]
        username: String,
    }

    #[tokio::test]
    async fn query_rejection_is_a_bad_request_envelope() {
        let (mut parts, _) = Request::builder().uri("/token?other=1").body(Body::empty()).unwrap().into_parts();
        let err = ApiQuery::<Needs>::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["code"], "bad_request");
        assert!(v["message"].as_str().unwrap().contains("username"));
    }

    #[tokio::test]
    async fn json_rejection_is_a_bad_request() {
        let req = Request::builder()
            .header("content-type", "application/json")
            .body(Body::from("{nope"))
            .unwrap();
        let err = ApiJson::<serde_json::Value>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }
}
