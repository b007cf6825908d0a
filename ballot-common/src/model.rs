//! Record types shared by the store and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::rating::Rating;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Per-identity metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: Uuid,
    pub is_completed: bool,
}

/// A restaurant eligible for selection and rating
///
/// Serialized as `{id, city, name}`, the same shape stored inside the
/// persisted selection value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub city: String,
    pub name: String,
}

/// Catalog row as supplied by the catalog import file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub city_name: String,
    /// Jury-only entries are hidden from voters; NULL counts as false
    #[serde(default)]
    pub created_by_jury: Option<bool>,
}

impl From<CatalogEntry> for Candidate {
    fn from(entry: CatalogEntry) -> Self {
        Candidate {
            id: entry.restaurant_id,
            city: entry.city_name,
            name: entry.restaurant_name,
        }
    }
}

/// Finalized rating row, written once per (identity, candidate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub user_id: Uuid,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub food_rating: u8,
    pub service_rating: u8,
    pub ambience_rating: u8,
    pub is_complete: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(user_id: Uuid, candidate: &Candidate, rating: &Rating, submitted_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            restaurant_id: candidate.id.clone(),
            restaurant_name: candidate.name.clone(),
            food_rating: rating.food,
            service_rating: rating.service,
            ambience_rating: rating.ambience,
            is_complete: true,
            submitted_at,
        }
    }
}

/// Client navigation targets, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ProcessDescription,
    Selection,
    Rating,
    FinalRatings,
    ThankYou,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::ProcessDescription => "/process-description",
            Route::Selection => "/national-selection",
            Route::Rating => "/rating",
            Route::FinalRatings => "/final-ratings",
            Route::ThankYou => "/thank-you",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl Serialize for Route {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}
