//! Rating review and edit endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use ballot_common::rating::RatingDraft;
use ballot_common::{Rating, Ratings};

use super::{ApiError, CurrentSession};
use crate::workflow::{self, RatingReview};
use crate::AppState;

/// GET /api/ratings
///
/// Entry check for the review screen. A `notice` in the response means the
/// client should show its message and navigate to `notice.redirect`.
pub async fn enter_ratings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<RatingReview>, ApiError> {
    let review = workflow::enter_review(&state.db, current.user_id()).await?;
    Ok(Json(review))
}

/// GET /api/ratings/:candidate_id
pub async fn edit_rating(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(candidate_id): Path<String>,
) -> Result<Json<RatingDraft>, ApiError> {
    let draft = workflow::edit_rating(&state.db, current.user_id(), &candidate_id).await?;
    Ok(Json(draft))
}

/// PUT /api/ratings/:candidate_id
///
/// Body `{food, service, ambience}`, each 0 (unset) to 5. Returns the full
/// stored mapping.
pub async fn save_rating(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(candidate_id): Path<String>,
    payload: Result<Json<Rating>, JsonRejection>,
) -> Result<Json<Ratings>, ApiError> {
    let Json(rating) = payload?;
    let ratings =
        workflow::save_rating(&state.db, current.user_id(), &candidate_id, rating).await?;
    Ok(Json(ratings))
}
