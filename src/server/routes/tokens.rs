//! Token minting and revocation.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{can_manage_tokens_for, RevokeError};
use crate::server::auth::Authenticated;
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::AppState;

pub fn routes() -> Router<AppState> { Router::new().route("/token", post(create_token).delete(revoke_token)) }

#[derive(Debug, Deserialize)]
pub struct CreateToken {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBody {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String { "bearer".to_string() }

async fn create_token(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiQuery(req): ApiQuery<CreateToken>,
) -> AppResult<Json<TokenBody>> {
    if req.username.is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    if !can_manage_tokens_for(&caller, &req.username) {
        warn!(target: "auth", caller = %caller.user_id, username = %req.username, "token mint refused");
        return Err(AppError::forbidden(format!("{} may not create tokens for {}", caller.user_id, req.username)));
    }
    let access_token = state
        .tokens
        .issue(&req.username)
        .map_err(|e| AppError::internal(format!("token generation failed: {e}")))?;
    info!(target: "auth", caller = %caller.user_id, username = %req.username, "token minted");
    Ok(Json(TokenBody { access_token, token_type: bearer() }))
}

async fn revoke_token(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(body): ApiJson<TokenBody>,
) -> AppResult<Json<Value>> {
    match state.tokens.revoke_authorized(&caller, &body.access_token) {
        Ok(owner) => {
            info!(target: "auth", caller = %caller.user_id, owner = %owner, "token revoked");
            Ok(Json(json!({ "revoked": true, "username": owner })))
        }
        Err(RevokeError::Unknown) => Err(AppError::not_found("token")),
        Err(e @ RevokeError::Forbidden { .. }) => {
            warn!(target: "auth", caller = %caller.user_id, "token revoke refused");
            Err(AppError::forbidden(e.to_string()))
        }
    }
}
