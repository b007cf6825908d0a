//! Per-candidate score triples
//!
//! A score of 0 means "not yet rated"; set scores are 1..=5. Values above 5
//! are rejected at deserialization, so anything read back from storage is
//! already within range.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// Highest star value
pub const MAX_SCORE: u8 = 5;

/// Rating dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Food,
    Service,
    Ambience,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Food, Axis::Service, Axis::Ambience];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Axis::Food => "Food",
            Axis::Service => "Service",
            Axis::Ambience => "Ambience",
        };
        f.write_str(label)
    }
}

/// Progress of a single candidate's rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingState {
    Unrated,
    PartiallyRated,
    FullyRated,
}

/// Food / service / ambience triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRating")]
pub struct Rating {
    pub food: u8,
    pub service: u8,
    pub ambience: u8,
}

#[derive(Deserialize)]
struct RawRating {
    #[serde(default)]
    food: i64,
    #[serde(default)]
    service: i64,
    #[serde(default)]
    ambience: i64,
}

impl TryFrom<RawRating> for Rating {
    type Error = Error;

    fn try_from(raw: RawRating) -> Result<Self> {
        Rating::new(raw.food, raw.service, raw.ambience)
    }
}

fn check_score(axis: Axis, value: i64) -> Result<u8> {
    if (0..=MAX_SCORE as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::InvalidInput(format!(
            "{} score {} out of range 0..={}",
            axis, value, MAX_SCORE
        )))
    }
}

impl Rating {
    /// Validated constructor; each score must be 0 (unset) or 1..=5
    pub fn new(food: i64, service: i64, ambience: i64) -> Result<Self> {
        Ok(Self {
            food: check_score(Axis::Food, food)?,
            service: check_score(Axis::Service, service)?,
            ambience: check_score(Axis::Ambience, ambience)?,
        })
    }

    pub fn get(&self, axis: Axis) -> u8 {
        match axis {
            Axis::Food => self.food,
            Axis::Service => self.service,
            Axis::Ambience => self.ambience,
        }
    }

    fn slot(&mut self, axis: Axis) -> &mut u8 {
        match axis {
            Axis::Food => &mut self.food,
            Axis::Service => &mut self.service,
            Axis::Ambience => &mut self.ambience,
        }
    }

    pub fn state(&self) -> RatingState {
        let set = Axis::ALL.iter().filter(|a| self.get(**a) >= 1).count();
        match set {
            0 => RatingState::Unrated,
            3 => RatingState::FullyRated,
            _ => RatingState::PartiallyRated,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == RatingState::FullyRated
    }
}

/// Candidate id → rating, persisted as one JSON object per identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratings(BTreeMap<String, Rating>);

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, candidate_id: &str) -> Option<&Rating> {
        self.0.get(candidate_id)
    }

    /// Merge one candidate's triple, leaving every other entry untouched
    pub fn set(&mut self, candidate_id: impl Into<String>, rating: Rating) {
        self.0.insert(candidate_id.into(), rating);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rating)> {
        self.0.iter()
    }

    /// Editable copy of the stored triple, or the all-zero default
    pub fn draft_for(&self, candidate_id: &str) -> RatingDraft {
        RatingDraft {
            candidate_id: candidate_id.to_string(),
            rating: self.get(candidate_id).copied().unwrap_or_default(),
        }
    }
}

/// Working copy of one candidate's rating while it is being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingDraft {
    pub candidate_id: String,
    pub rating: Rating,
}

impl RatingDraft {
    /// Apply a star click (1..=5) on one axis
    pub fn set(&mut self, axis: Axis, stars: u8) -> Result<()> {
        if !(1..=MAX_SCORE).contains(&stars) {
            return Err(Error::InvalidInput(format!(
                "{} stars must be between 1 and {}",
                axis, MAX_SCORE
            )));
        }
        *self.rating.slot(axis) = stars;
        Ok(())
    }

    /// Merge the draft into the mapping
    pub fn save_into(self, ratings: &mut Ratings) {
        ratings.set(self.candidate_id, self.rating);
    }
}

/// Star control for one axis; the read-only variant ignores clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarInput {
    pub axis: Axis,
    pub value: u8,
    pub readonly: bool,
}

impl StarInput {
    pub fn editable(axis: Axis, value: u8) -> Self {
        Self { axis, value, readonly: false }
    }

    pub fn readonly(axis: Axis, value: u8) -> Self {
        Self { axis, value, readonly: true }
    }

    /// Returns the new value when the click was accepted
    pub fn click(&mut self, star: u8) -> Option<u8> {
        if self.readonly || !(1..=MAX_SCORE).contains(&star) {
            return None;
        }
        self.value = star;
        Some(star)
    }

    /// Filled flags for stars 1..=5
    pub fn filled(&self) -> [bool; MAX_SCORE as usize] {
        let mut stars = [false; MAX_SCORE as usize];
        for (i, filled) in stars.iter_mut().enumerate() {
            *filled = (i as u8) < self.value;
        }
        stars
    }
}
