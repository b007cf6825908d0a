//! Sign-up, sign-in, refresh and sign-out
//!
//! Store calls live in `ballot_common::db::identities`; this layer adds the
//! auth event for each change and keeps the session cache consistent for the
//! request that caused it.

use ballot_common::db::identities;
use ballot_common::events::AuthEvent;
use ballot_common::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::AppState;

/// Token handed back after sign-up, sign-in or refresh
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub user_id: Uuid,
}

pub async fn sign_up(state: &AppState, email: &str, password: &str) -> Result<SessionToken> {
    let identity = identities::sign_up(&state.db, email, password).await?;
    let token = identities::create_session(&state.db, identity.user_id).await?;

    info!("New identity {} signed up", identity.user_id);
    announce_sign_in(state, identity.user_id, &token);

    Ok(SessionToken {
        token,
        user_id: identity.user_id,
    })
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<SessionToken> {
    let (identity, token) = identities::sign_in(&state.db, email, password).await?;

    info!("Identity {} signed in", identity.user_id);
    announce_sign_in(state, identity.user_id, &token);

    Ok(SessionToken {
        token,
        user_id: identity.user_id,
    })
}

/// Swap `token` for a new one; the old token stops working immediately
pub async fn refresh(state: &AppState, token: &str) -> Result<SessionToken> {
    let (user_id, new_token) = identities::refresh_session(&state.db, token)
        .await?
        .ok_or_else(|| Error::Unauthorized("Session expired".to_string()))?;

    state.sessions.invalidate(token).await;
    state.events.emit_lossy(AuthEvent::TokenRefreshed {
        user_id,
        old_token: token.to_string(),
        new_token: new_token.clone(),
        timestamp: Utc::now(),
    });

    Ok(SessionToken {
        token: new_token,
        user_id,
    })
}

/// End the session behind `token`
///
/// Signing out an already-ended session is not an error.
pub async fn sign_out(state: &AppState, token: &str) -> Result<()> {
    let ended = identities::end_session(&state.db, token).await?;
    state.sessions.invalidate(token).await;

    if let Some(user_id) = ended {
        info!("Identity {} signed out", user_id);
        state.events.emit_lossy(AuthEvent::SignedOut {
            user_id,
            token: token.to_string(),
            timestamp: Utc::now(),
        });
    }

    Ok(())
}

fn announce_sign_in(state: &AppState, user_id: Uuid, token: &str) {
    state.events.emit_lossy(AuthEvent::SignedIn {
        user_id,
        token: token.to_string(),
        timestamp: Utc::now(),
    });
}
