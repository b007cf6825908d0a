//! Finalized submission rows (append-only)

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::model::SubmissionRecord;
use crate::{Error, Result};

/// Insert all records in one transaction; either every row lands or none does
pub async fn insert_submissions(pool: &SqlitePool, records: &[SubmissionRecord]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                guid, user_id, restaurant_id, restaurant_name,
                food_rating, service_rating, ambience_rating,
                is_complete, submitted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(record.user_id.to_string())
        .bind(&record.restaurant_id)
        .bind(&record.restaurant_name)
        .bind(record.food_rating as i64)
        .bind(record.service_rating as i64)
        .bind(record.ambience_rating as i64)
        .bind(record.is_complete)
        .bind(record.submitted_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn count_submissions(pool: &SqlitePool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn list_submissions(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<SubmissionRecord>> {
    let rows = sqlx::query_as::<_, (String, String, i64, i64, i64, bool, String)>(
        r#"
        SELECT restaurant_id, restaurant_name, food_rating, service_rating,
               ambience_rating, is_complete, submitted_at
        FROM submissions
        WHERE user_id = ?
        ORDER BY restaurant_name
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(restaurant_id, restaurant_name, food, service, ambience, is_complete, submitted_at)| {
            let submitted_at = DateTime::parse_from_rfc3339(&submitted_at)
                .map_err(|e| Error::Corrupt(format!("Invalid submitted_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(SubmissionRecord {
                user_id,
                restaurant_id,
                restaurant_name,
                food_rating: food as u8,
                service_rating: service as u8,
                ambience_rating: ambience as u8,
                is_complete,
                submitted_at,
            })
        })
        .collect()
}
