//! Ballot submission endpoint

use axum::{extract::State, Extension, Json};
use ballot_common::Route;
use serde::Serialize;

use super::{ApiError, CurrentSession};
use crate::workflow;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub redirect: Route,
}

/// POST /api/submit
///
/// On success the session is already ended; the token in the request no
/// longer works.
pub async fn submit(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let redirect = workflow::submit(&state, current.user_id(), &current.token).await?;
    Ok(Json(SubmitResponse { redirect }))
}
