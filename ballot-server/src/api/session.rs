//! Current session endpoint

use axum::{Extension, Json};

use super::CurrentSession;
use crate::session::SessionSnapshot;

/// GET /api/session
///
/// `{identity, profile}`; `profile` is null if it could not be fetched.
pub async fn get_session(Extension(current): Extension<CurrentSession>) -> Json<SessionSnapshot> {
    Json(current.snapshot)
}
