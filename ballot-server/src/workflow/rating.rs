//! Rating review and per-candidate rating edits

use ballot_common::db::selections;
use ballot_common::rating::RatingDraft;
use ballot_common::{Candidate, Error, Integrity, Notice, Rating, Ratings, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

/// State returned when the review screen is opened
#[derive(Debug, Clone, Serialize)]
pub struct RatingReview {
    /// Selected candidates, by city then name
    pub selection: Vec<Candidate>,
    pub ratings: Ratings,
    pub integrity: Integrity,
    pub notice: Option<Notice>,
}

/// Read selection and ratings together and classify them
///
/// A corrupt mapping (unreadable, or more entries than selections allow) is
/// reset in the store before returning.
pub async fn enter_review(db: &SqlitePool, user_id: Uuid) -> Result<RatingReview> {
    let ballot = selections::load_ballot(db, user_id).await?;
    let integrity = ballot.integrity();
    let mut ratings = ballot.ratings;

    if integrity == Integrity::Corrupt {
        match selections::clear_ratings(db, user_id).await {
            Ok(()) => info!("Reset corrupt ratings for {}", user_id),
            Err(e) => error!("Failed to reset corrupt ratings for {}: {}", user_id, e),
        }
        ratings = Ratings::new();
    }

    Ok(RatingReview {
        selection: ballot.selection.sorted_for_display(),
        ratings,
        integrity,
        notice: integrity.entry_notice(),
    })
}

/// Editable copy of a selected candidate's rating, zeros if unrated
pub async fn edit_rating(db: &SqlitePool, user_id: Uuid, candidate_id: &str) -> Result<RatingDraft> {
    let ballot = selections::load_ballot(db, user_id).await?;
    if !ballot.selection.contains(candidate_id) {
        return Err(Error::NotFound(format!("Candidate {} is not selected", candidate_id)));
    }

    Ok(ballot.ratings.draft_for(candidate_id))
}

/// Merge one rating into the stored mapping and overwrite it
///
/// Other entries are carried over unchanged. Candidates outside the stored
/// selection are refused.
pub async fn save_rating(
    db: &SqlitePool,
    user_id: Uuid,
    candidate_id: &str,
    rating: Rating,
) -> Result<Ratings> {
    let ballot = selections::load_ballot(db, user_id).await?;
    if !ballot.selection.contains(candidate_id) {
        return Err(Error::InvalidInput(format!(
            "Candidate {} is not in the selection",
            candidate_id
        )));
    }

    let mut ratings = ballot.ratings;
    let mut draft = ratings.draft_for(candidate_id);
    draft.rating = rating;
    draft.save_into(&mut ratings);

    selections::save_ratings(db, user_id, &ratings).await?;
    Ok(ratings)
}
