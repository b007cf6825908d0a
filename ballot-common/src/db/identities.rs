//! Identities and their sessions
//!
//! A session is an opaque token row pointing at an identity. Signing out
//! deletes the row; refreshing swaps it for a new token. Rows older than
//! [`SESSION_TTL_HOURS`] no longer resolve and are removed by
//! [`purge_expired_sessions`].

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::parse_guid;
use crate::auth::{generate_token, hash_password, validate_credentials, verify_password};
use crate::model::Identity;
use crate::{Error, Result};

/// Lifetime of a session token, counted from sign-in or last refresh
pub const SESSION_TTL_HOURS: i64 = 24;

/// `datetime('now', ?)` modifier for the oldest still-valid session
fn session_cutoff() -> String {
    format!("-{} hours", SESSION_TTL_HOURS)
}

/// Run a bcrypt operation off the async worker threads
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Password task failed: {}", e)))?
}

/// Register a new identity together with its (incomplete) profile
pub async fn sign_up(pool: &SqlitePool, email: &str, password: &str) -> Result<Identity> {
    let email = validate_credentials(email, password)?;

    let existing: Option<String> = sqlx::query_scalar("SELECT guid FROM identities WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(Error::InvalidInput(format!("Email already registered: {}", email)));
    }

    let user_id = Uuid::new_v4();
    let owned = password.to_string();
    let hash = blocking(move || hash_password(&owned)).await?;

    insert_identity(pool, user_id, &email, &hash).await?;

    debug!("Registered identity {}", user_id);
    Ok(Identity { user_id, email })
}

/// Identity and profile rows in one transaction
///
/// A concurrent sign-up that wins the UNIQUE(email) race surfaces here as the
/// same duplicate-email error the pre-check gives.
async fn insert_identity(pool: &SqlitePool, user_id: Uuid, email: &str, hash: &str) -> Result<()> {
    let duplicate = |e: sqlx::Error| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            Error::InvalidInput(format!("Email already registered: {}", email))
        }
        other => Error::Database(other),
    };

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO identities (guid, email, password_hash) VALUES (?, ?, ?)")
        .bind(user_id.to_string())
        .bind(email)
        .bind(hash)
        .execute(&mut *tx)
        .await
        .map_err(duplicate)?;

    sqlx::query("INSERT INTO profiles (uid, is_completed) VALUES (?, 0)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Check credentials and open a new session
///
/// Returns the identity and the new session token.
pub async fn sign_in(pool: &SqlitePool, email: &str, password: &str) -> Result<(Identity, String)> {
    let email = email.trim().to_lowercase();

    let row = sqlx::query_as::<_, (String, String)>("SELECT guid, password_hash FROM identities WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    let (guid, hash) = row.ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;

    let owned = password.to_string();
    if !blocking(move || verify_password(&owned, &hash)).await? {
        return Err(Error::Unauthorized("Invalid email or password".to_string()));
    }

    let user_id = parse_guid(&guid)?;
    let token = create_session(pool, user_id).await?;

    Ok((Identity { user_id, email }, token))
}

/// Insert a new session row for the identity
pub async fn create_session(pool: &SqlitePool, user_id: Uuid) -> Result<String> {
    let token = generate_token();

    sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?, ?)")
        .bind(&token)
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a live session token to its identity
///
/// Expired tokens resolve to `None` like unknown ones.
pub async fn identity_for_token(pool: &SqlitePool, token: &str) -> Result<Option<Identity>> {
    let row = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT i.guid, i.email
        FROM sessions s
        JOIN identities i ON i.guid = s.user_id
        WHERE s.token = ? AND s.created_at > datetime('now', ?)
        "#,
    )
    .bind(token)
    .bind(session_cutoff())
    .fetch_optional(pool)
    .await?;

    match row {
        Some((guid, email)) => Ok(Some(Identity {
            user_id: parse_guid(&guid)?,
            email,
        })),
        None => Ok(None),
    }
}

/// Replace a session token with a fresh one
///
/// Returns `None` when the old token is unknown or expired.
pub async fn refresh_session(pool: &SqlitePool, token: &str) -> Result<Option<(Uuid, String)>> {
    let mut tx = pool.begin().await?;

    let user: Option<String> =
        sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = ? AND created_at > datetime('now', ?)")
            .bind(token)
            .bind(session_cutoff())
            .fetch_optional(&mut *tx)
            .await?;

    let Some(guid) = user else {
        return Ok(None);
    };

    let new_token = generate_token();

    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?, ?)")
        .bind(&new_token)
        .bind(&guid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some((parse_guid(&guid)?, new_token)))
}

/// Delete a session; returns the owning identity if the token existed
pub async fn end_session(pool: &SqlitePool, token: &str) -> Result<Option<Uuid>> {
    let user: Option<String> = sqlx::query_scalar("DELETE FROM sessions WHERE token = ? RETURNING user_id")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    user.as_deref().map(parse_guid).transpose()
}

/// Delete every expired session row; returns how many went
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE created_at <= datetime('now', ?)")
        .bind(session_cutoff())
        .execute(pool)
        .await?;

    let purged = result.rows_affected();
    if purged > 0 {
        debug!("Purged {} expired sessions", purged);
    }
    Ok(purged)
}
