//! Per-identity selection set and rating mapping
//!
//! Both live in one `user_selections` row as JSON and are overwritten whole
//! on every save. There is no version check: two sessions for the same
//! identity race and the last write wins.

use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::integrity::{self, Integrity};
use crate::rating::Ratings;
use crate::selection::SelectionSet;
use crate::Result;

/// Selection and ratings as read together in one query
#[derive(Debug, Clone, Default)]
pub struct StoredBallot {
    pub selection: SelectionSet,
    pub ratings: Ratings,
    /// Stored ratings value failed validation and was read as empty
    pub ratings_unreadable: bool,
}

impl StoredBallot {
    pub fn integrity(&self) -> Integrity {
        if self.ratings_unreadable {
            return Integrity::Corrupt;
        }
        integrity::check(&self.selection, &self.ratings)
    }
}

/// Persisted selection, or empty when the identity has none yet
pub async fn load_selection(pool: &SqlitePool, user_id: Uuid) -> Result<SelectionSet> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT selected_restaurants FROM user_selections WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    match value {
        Some(json) => Ok(SelectionSet::from_items(serde_json::from_str(&json)?)),
        None => Ok(SelectionSet::new()),
    }
}

/// Upsert the full selection set
pub async fn save_selection(pool: &SqlitePool, user_id: Uuid, selection: &SelectionSet) -> Result<()> {
    let json = serde_json::to_string(selection)
        .map_err(|e| crate::Error::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO user_selections (user_id, selected_restaurants)
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            selected_restaurants = excluded.selected_restaurants,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id.to_string())
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read selection and ratings in a single query
///
/// An unreadable selection is an error. Unreadable ratings are reported via
/// [`StoredBallot::ratings_unreadable`] so the caller can reset them.
pub async fn load_ballot(pool: &SqlitePool, user_id: Uuid) -> Result<StoredBallot> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT selected_restaurants, restaurant_ratings FROM user_selections WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some((selection_json, ratings_json)) = row else {
        return Ok(StoredBallot::default());
    };

    let selection = SelectionSet::from_items(serde_json::from_str(&selection_json)?);

    let (ratings, ratings_unreadable) = match serde_json::from_str::<Ratings>(&ratings_json) {
        Ok(ratings) => (ratings, false),
        Err(e) => {
            warn!("Unreadable ratings for {}: {}", user_id, e);
            (Ratings::new(), true)
        }
    };

    Ok(StoredBallot {
        selection,
        ratings,
        ratings_unreadable,
    })
}

/// Overwrite the full rating mapping
pub async fn save_ratings(pool: &SqlitePool, user_id: Uuid, ratings: &Ratings) -> Result<()> {
    let json = serde_json::to_string(ratings)
        .map_err(|e| crate::Error::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO user_selections (user_id, restaurant_ratings)
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            restaurant_ratings = excluded.restaurant_ratings,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id.to_string())
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset the rating mapping to empty
pub async fn clear_ratings(pool: &SqlitePool, user_id: Uuid) -> Result<()> {
    save_ratings(pool, user_id, &Ratings::new()).await
}
