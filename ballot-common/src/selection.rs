//! Selection set rules and candidate filtering
//!
//! A voter picks exactly [`MAX_SELECTION`] candidates. The set is capped: once
//! full, toggling an unselected candidate does nothing until one is removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

use crate::model::Candidate;

/// Number of candidates a voter must pick
pub const MAX_SELECTION: usize = 15;

/// City selector value that disables city filtering
pub const ALL_CITIES: &str = "All";

/// Result of [`SelectionSet::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// Candidate appended; `complete` is true when this filled the set
    Added { complete: bool },
    Removed,
    /// Set already full; nothing changed
    AtCapacity,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ToggleOutcome::AtCapacity)
    }
}

/// A voter's chosen candidates, at most [`MAX_SELECTION`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    items: Vec<Candidate>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored items, dropping duplicate ids
    ///
    /// Items beyond the cap are kept so callers can detect and report an
    /// oversized stored set rather than silently truncating it.
    pub fn from_items(items: Vec<Candidate>) -> Self {
        let mut seen = BTreeSet::new();
        let items = items
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[Candidate] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, candidate_id: &str) -> bool {
        self.items.iter().any(|c| c.id == candidate_id)
    }

    /// Exactly [`MAX_SELECTION`] picks; the gate for moving on to rating
    pub fn is_complete(&self) -> bool {
        self.items.len() == MAX_SELECTION
    }

    pub fn remaining(&self) -> usize {
        MAX_SELECTION.saturating_sub(self.items.len())
    }

    /// Remove the candidate if selected, otherwise append it when there is room
    pub fn toggle(&mut self, candidate: &Candidate) -> ToggleOutcome {
        if self.contains(&candidate.id) {
            self.items.retain(|c| c.id != candidate.id);
            return ToggleOutcome::Removed;
        }

        if self.items.len() >= MAX_SELECTION {
            return ToggleOutcome::AtCapacity;
        }

        self.items.push(candidate.clone());
        ToggleOutcome::Added {
            complete: self.is_complete(),
        }
    }

    /// Remove by id; returns whether anything was removed
    pub fn remove(&mut self, candidate_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != candidate_id);
        self.items.len() != before
    }

    /// Copy of the items sorted by city, then name
    pub fn sorted_for_display(&self) -> Vec<Candidate> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.name.cmp(&b.name)));
        items
    }

    pub fn into_items(self) -> Vec<Candidate> {
        self.items
    }
}

/// Lowercase and strip combining diacritical marks (U+0300..U+036F)
pub fn normalize(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Transient search state for the candidate list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateFilter {
    /// Free-text term matched against candidate names
    #[serde(default, alias = "q")]
    pub term: Option<String>,
    /// City name, or [`ALL_CITIES`]; absent means all cities
    #[serde(default)]
    pub city: Option<String>,
}

impl CandidateFilter {
    pub fn new(term: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            city: Some(city.into()),
        }
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        let city_ok = match self.city.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(city) if city == ALL_CITIES => true,
            Some(city) => normalize(&candidate.city) == normalize(city),
        };

        let term_ok = match self.term.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => normalize(&candidate.name).contains(&normalize(term)),
        };

        city_ok && term_ok
    }

    pub fn apply<'a>(&self, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        candidates.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Sorted, de-duplicated city names for the city selector
pub fn cities(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| c.city.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
