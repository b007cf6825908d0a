//! # Ballot Common Library
//!
//! Shared code for the restaurant ballot service:
//! - Record types (identity, profile, candidate, submission)
//! - Selection set rules and candidate filtering
//! - Rating triples and the selection/rating integrity check
//! - Database schema and queries
//! - Auth event bus
//! - Configuration loading

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod integrity;
pub mod model;
pub mod rating;
pub mod selection;

pub use error::{Error, Result};
pub use integrity::{Integrity, Notice};
pub use model::{Candidate, Identity, Profile, Route, SubmissionRecord};
pub use rating::{Rating, Ratings};
pub use selection::{SelectionSet, MAX_SELECTION};
