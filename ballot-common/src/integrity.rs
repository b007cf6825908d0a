//! Consistency checks between the selection set and the rating mapping
//!
//! Run when the rating screen is entered and again right before submission.
//! Each failed check names the screen that can fix it.

use serde::Serialize;

use crate::model::Route;
use crate::rating::Ratings;
use crate::selection::{SelectionSet, MAX_SELECTION};

pub const NETWORK_ISSUE_MESSAGE: &str =
    "We've detected a network issue and some of your progress may not have been saved.";
pub const SELECTION_INCOMPLETE_MESSAGE: &str =
    "You must select 15 restaurants before submitting.";
pub const RATINGS_INCOMPLETE_MESSAGE: &str =
    "Please rate all restaurants with a score from 1 to 5 before submitting.";

/// Outcome of [`check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrity {
    /// Exactly 15 selections, each with a complete rating
    Ready,
    /// More ratings stored than can ever be valid; a prior write went wrong
    Corrupt,
    SelectionIncomplete,
    RatingsIncomplete,
}

impl Integrity {
    pub fn is_ready(&self) -> bool {
        matches!(self, Integrity::Ready)
    }

    /// Screen that can repair the violated invariant
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Integrity::Ready => None,
            Integrity::SelectionIncomplete => Some(Route::Selection),
            Integrity::Corrupt | Integrity::RatingsIncomplete => Some(Route::Rating),
        }
    }

    /// Message shown before submitting
    pub fn submit_message(&self) -> Option<&'static str> {
        match self {
            Integrity::Ready => None,
            Integrity::SelectionIncomplete => Some(SELECTION_INCOMPLETE_MESSAGE),
            Integrity::Corrupt | Integrity::RatingsIncomplete => Some(RATINGS_INCOMPLETE_MESSAGE),
        }
    }

    /// Blocking notice shown when the review screen is opened
    pub fn entry_notice(&self) -> Option<Notice> {
        self.redirect().map(|redirect| Notice {
            redirect,
            message: NETWORK_ISSUE_MESSAGE.to_string(),
        })
    }
}

/// Redirect plus the message explaining it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub redirect: Route,
    pub message: String,
}

/// Classify the persisted selection/rating pair
pub fn check(selection: &SelectionSet, ratings: &Ratings) -> Integrity {
    if ratings.len() > MAX_SELECTION {
        return Integrity::Corrupt;
    }

    if selection.len() != MAX_SELECTION {
        return Integrity::SelectionIncomplete;
    }

    let all_rated = selection
        .items()
        .iter()
        .all(|c| ratings.get(&c.id).is_some_and(|r| r.is_complete()));

    if ratings.len() != MAX_SELECTION || !all_rated {
        return Integrity::RatingsIncomplete;
    }

    Integrity::Ready
}
