//! Request authentication.
//!
//! Credentials come from `Authorization: Bearer <token>` or, for clients
//! that cannot set headers, an `api_key` query parameter. A presented but
//! unknown credential is always rejected, even when anonymous reads are on.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::AppState;
use crate::error::AppError;
use crate::identity::Principal;

fn credential(parts: &Parts) -> Option<String> {
    if let Some(h) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let h = h.trim();
        if let Some(token) = h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")) {
            return Some(token.trim().to_string());
        }
    }
    let query = parts.uri.query()?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == "api_key").then(|| urlencoding::decode(v).map(|s| s.into_owned()).unwrap_or_else(|_| v.to_string()))
    })
}

fn authenticate(parts: &Parts, state: &AppState, allow_anonymous: bool) -> Result<Principal, AppError> {
    match credential(parts) {
        Some(token) => state.tokens.validate(&token).ok_or_else(|| {
            debug!(target: "auth", "rejected unknown credential");
            AppError::unauthorized("Invalid credentials")
        }),
        None if allow_anonymous => Ok(Principal::anonymous()),
        None => Err(AppError::unauthorized("Not authenticated")),
    }
}

/// Caller of a read route. Anonymous when the server allows it and no
/// credential was presented.
#[derive(Debug, Clone)]
pub struct Reader(pub Principal);

impl FromRequestParts<AppState> for Reader {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, state.config.allow_anonymous_access).map(Reader)
    }
}

/// Caller of a token route; always needs a valid credential.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, false).map(Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut b = Request::builder().uri(uri);
        if let Some(a) = auth {
            b = b.header(AUTHORIZATION, a);
        }
        b.body(()).unwrap().into_parts().0
    }

    #[test]
    fn header_beats_query_and_query_is_decoded() {
        assert_eq!(credential(&parts("/x?api_key=q", Some("Bearer h"))).as_deref(), Some("h"));
        assert_eq!(credential(&parts("/x?block=0&api_key=a%2Db", None)).as_deref(), Some("a-b"));
        assert_eq!(credential(&parts("/x", Some("Basic zzz"))), None);
    }
}
