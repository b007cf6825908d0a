//! One-time ballot submission
//!
//! Sequence: re-read selection and ratings, re-validate, insert one
//! submission row per selected candidate, mark the profile complete, verify
//! the row count, then end the session. The first failing step aborts the
//! rest and nothing is retried.

use ballot_common::db::{profiles, selections, submissions};
use ballot_common::{Route, SubmissionRecord, MAX_SELECTION};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use super::account;
use crate::AppState;

/// Submission failure
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Ballot not ready; `redirect` names the screen that can fix it
    #[error("{message}")]
    Rejected {
        redirect: Route,
        message: &'static str,
    },

    #[error("Ratings already submitted")]
    AlreadySubmitted,

    #[error("Failed to fetch latest ratings: {0}")]
    Fetch(ballot_common::Error),

    #[error("Error submitting ratings: {0}")]
    Insert(ballot_common::Error),

    #[error("Error updating completion status: {0}")]
    Complete(ballot_common::Error),

    #[error("Verification query failed: {0}")]
    VerifyQuery(ballot_common::Error),

    #[error("Verification failed: not all ratings were saved.")]
    Verification { found: usize },

    #[error("Error ending session: {0}")]
    SignOut(ballot_common::Error),
}

/// Submit the ballot for the session behind `token`
///
/// Returns the route the client should show next.
pub async fn submit(state: &AppState, user_id: uuid::Uuid, token: &str) -> Result<Route, SubmitError> {
    let profile = profiles::fetch_profile(&state.db, user_id)
        .await
        .map_err(SubmitError::Fetch)?;
    if profile.is_some_and(|p| p.is_completed) {
        return Err(SubmitError::AlreadySubmitted);
    }

    // 1. Latest persisted state
    let ballot = selections::load_ballot(&state.db, user_id)
        .await
        .map_err(SubmitError::Fetch)?;

    // 2. Re-validate
    let integrity = ballot.integrity();
    if let (Some(redirect), Some(message)) = (integrity.redirect(), integrity.submit_message()) {
        info!("Submission for {} rejected: {:?}", user_id, integrity);
        return Err(SubmitError::Rejected { redirect, message });
    }

    // 3. One record per selected candidate, single batch
    let submitted_at = Utc::now();
    let records: Vec<SubmissionRecord> = ballot
        .selection
        .items()
        .iter()
        .filter_map(|candidate| {
            ballot
                .ratings
                .get(&candidate.id)
                .map(|rating| SubmissionRecord::new(user_id, candidate, rating, submitted_at))
        })
        .collect();

    submissions::insert_submissions(&state.db, &records)
        .await
        .map_err(|e| {
            error!("Error submitting ratings for {}: {}", user_id, e);
            SubmitError::Insert(e)
        })?;

    // 4. Completion flag
    profiles::mark_completed(&state.db, user_id)
        .await
        .map_err(|e| {
            error!("Error updating completion status for {}: {}", user_id, e);
            SubmitError::Complete(e)
        })?;
    // Cached snapshot still says incomplete; drop it even if sign-out fails below
    state.sessions.invalidate(token).await;

    // 5. Verify
    let found = submissions::list_submissions(&state.db, user_id)
        .await
        .map_err(SubmitError::VerifyQuery)?
        .len();
    if found != MAX_SELECTION {
        error!("Expected {} submissions for {}, found {}", MAX_SELECTION, user_id, found);
        return Err(SubmitError::Verification { found });
    }

    // 6. End session
    account::sign_out(state, token)
        .await
        .map_err(SubmitError::SignOut)?;

    info!("Ballot submitted for {}", user_id);
    Ok(Route::ThankYou)
}
