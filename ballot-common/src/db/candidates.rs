//! Candidate catalog
//!
//! The catalog is static during voting. It is loaded from a JSON file at
//! startup; jury-only rows are stored but never offered to voters.

use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::model::{Candidate, CatalogEntry};
use crate::{Error, Result};

/// All votable candidates, ordered by city then name
pub async fn load_candidates(pool: &SqlitePool) -> Result<Vec<Candidate>> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT restaurant_id, city_name, restaurant_name
        FROM candidates
        WHERE created_by_jury IS NULL OR created_by_jury = 0
        ORDER BY city_name, restaurant_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, city, name)| Candidate { id, city, name })
        .collect())
}

/// Upsert catalog rows in a single transaction
pub async fn import_catalog(pool: &SqlitePool, entries: &[CatalogEntry]) -> Result<usize> {
    let mut tx = pool.begin().await?;

    for entry in entries {
        if entry.restaurant_id.trim().is_empty() {
            return Err(Error::InvalidInput("Catalog entry with empty restaurant_id".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO candidates (restaurant_id, restaurant_name, city_name, created_by_jury)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(restaurant_id) DO UPDATE SET
                restaurant_name = excluded.restaurant_name,
                city_name = excluded.city_name,
                created_by_jury = excluded.created_by_jury
            "#,
        )
        .bind(&entry.restaurant_id)
        .bind(&entry.restaurant_name)
        .bind(&entry.city_name)
        .bind(entry.created_by_jury)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(entries.len())
}

/// Read a JSON catalog file (`[{restaurant_id, restaurant_name, city_name, created_by_jury?}]`)
pub fn read_catalog_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid catalog file {}: {}", path.display(), e)))?;
    info!("Read {} catalog entries from {}", entries.len(), path.display());
    Ok(entries)
}
