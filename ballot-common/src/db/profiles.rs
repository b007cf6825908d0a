//! Profile records

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::model::Profile;
use crate::{Error, Result};

pub async fn fetch_profile(pool: &SqlitePool, uid: Uuid) -> Result<Option<Profile>> {
    let completed: Option<i64> = sqlx::query_scalar("SELECT is_completed FROM profiles WHERE uid = ?")
        .bind(uid.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(completed.map(|flag| Profile {
        uid,
        is_completed: flag != 0,
    }))
}

/// Set the completion flag; errors if the profile does not exist
pub async fn mark_completed(pool: &SqlitePool, uid: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE profiles SET is_completed = 1, updated_at = CURRENT_TIMESTAMP WHERE uid = ?",
    )
    .bind(uid.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Profile {}", uid)));
    }

    Ok(())
}
