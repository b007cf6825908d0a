//! Password hashing and session token generation
//!
//! Pure functions only. Storage of credentials and sessions lives in
//! [`crate::db::identities`].

use rand::Rng;

use crate::{Error, Result};

/// Bytes of randomness in a session token (hex-encoded to twice this length)
const TOKEN_BYTES: usize = 32;

/// bcrypt work factor for new password hashes
pub const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

pub const MIN_PASSWORD_LEN: usize = 8;

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Fresh opaque session token
pub fn generate_token() -> String {
    random_hex(TOKEN_BYTES)
}

/// bcrypt hash of a password; salt and cost are embedded in the result
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, PASSWORD_COST)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// A stored value that is not a bcrypt hash is reported as corrupt.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| Error::Corrupt(format!("Stored password hash unreadable: {}", e)))
}

/// Normalize and sanity-check sign-up credentials
pub fn validate_credentials(email: &str, password: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let at = email.find('@');
    let valid_email = matches!(at, Some(i) if i > 0 && i < email.len() - 1);
    if !valid_email {
        return Err(Error::InvalidInput(format!("Invalid email address: {}", email)));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(email)
}
