//! Bearer-token authentication and the sign-in endpoints
//!
//! Protected routes run behind [`auth_middleware`], which resolves the token
//! through the session provider and attaches a [`CurrentSession`] to the
//! request for downstream handlers.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::ApiError;
use crate::session::SessionSnapshot;
use crate::workflow::account::{self, SessionToken};
use crate::AppState;

/// Resolved session attached to authenticated requests
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub snapshot: SessionSnapshot,
}

impl CurrentSession {
    pub fn user_id(&self) -> Uuid {
        self.snapshot.identity.user_id
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Authentication middleware
///
/// Returns 401 when the token is missing or does not name a live session.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let snapshot = state.sessions.current(&token).await.ok_or_else(|| {
        debug!("Rejected unknown session token");
        ApiError::Unauthorized("Invalid or expired session".to_string())
    })?;

    request
        .extensions_mut()
        .insert(CurrentSession { token, snapshot });

    Ok(next.run(request).await)
}

/// POST /auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionToken>), ApiError> {
    let Json(credentials) = payload?;
    let session = account::sign_up(&state, &credentials.email, &credentials.password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<SessionToken>, ApiError> {
    let Json(credentials) = payload?;
    let session = account::sign_in(&state, &credentials.email, &credentials.password).await?;
    Ok(Json(session))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SessionToken>, ApiError> {
    let session = account::refresh(&state, &current.token).await?;
    Ok(Json(session))
}

/// POST /auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<StatusCode, ApiError> {
    account::sign_out(&state, &current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
