//! Relational store access
//!
//! Every function takes the pool explicitly and converts rows into the typed
//! records of [`crate::model`]. JSON columns are validated on the way out.

pub mod candidates;
pub mod identities;
pub mod init;
pub mod profiles;
pub mod selections;
pub mod submissions;

pub use init::*;

use uuid::Uuid;

use crate::{Error, Result};

/// Parse a TEXT guid column
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("Invalid guid {}: {}", value, e)))
}
