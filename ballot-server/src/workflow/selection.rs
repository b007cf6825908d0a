//! Candidate selection
//!
//! Candidates must be loaded before the stored selection is read, so that
//! every stored item can be shown against the current catalog. The
//! `candidates` field doubles as the readiness flag for that ordering.

use ballot_common::db::{candidates, selections};
use ballot_common::selection::{cities, CandidateFilter, ToggleOutcome};
use ballot_common::{Candidate, Error, Result, SelectionSet, MAX_SELECTION};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

pub struct SelectionWorkflow {
    db: SqlitePool,
    user_id: Uuid,
    candidates: Option<Vec<Candidate>>,
    selection: SelectionSet,
}

impl SelectionWorkflow {
    pub fn new(db: SqlitePool, user_id: Uuid) -> Self {
        Self {
            db,
            user_id,
            candidates: None,
            selection: SelectionSet::new(),
        }
    }

    /// Load candidates then the stored selection
    pub async fn open(db: SqlitePool, user_id: Uuid) -> Result<Self> {
        let mut workflow = Self::new(db, user_id);
        workflow.load_candidates().await?;
        workflow.load_selection().await?;
        Ok(workflow)
    }

    /// Fetch the catalog, jury-only entries excluded
    pub async fn load_candidates(&mut self) -> Result<&[Candidate]> {
        let loaded = candidates::load_candidates(&self.db).await?;
        debug!("Loaded {} candidates", loaded.len());
        let loaded = self.candidates.insert(loaded);
        Ok(loaded.as_slice())
    }

    pub fn candidates_loaded(&self) -> bool {
        self.candidates.is_some()
    }

    /// Fetch the stored selection; fails if candidates are not loaded yet
    pub async fn load_selection(&mut self) -> Result<&SelectionSet> {
        if !self.candidates_loaded() {
            return Err(Error::Internal(
                "Selection requested before candidates were loaded".to_string(),
            ));
        }

        self.selection = selections::load_selection(&self.db, self.user_id).await?;
        Ok(&self.selection)
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.candidates.as_deref().unwrap_or(&[])
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn filtered(&self, filter: &CandidateFilter) -> Vec<&Candidate> {
        filter.apply(self.candidates())
    }

    pub fn cities(&self) -> Vec<String> {
        cities(self.candidates())
    }

    /// Proceeding to rating needs exactly [`MAX_SELECTION`] picks
    pub fn can_proceed(&self) -> bool {
        self.selection.len() == MAX_SELECTION
    }

    /// Select or deselect a candidate and persist the change
    ///
    /// A selected candidate can always be deselected, even if it has since
    /// left the catalog. Selecting requires a catalog entry.
    pub async fn toggle(&mut self, candidate_id: &str) -> Result<ToggleOutcome> {
        let candidate = match self.selection.items().iter().find(|c| c.id == candidate_id) {
            Some(selected) => selected.clone(),
            None => self
                .candidates()
                .iter()
                .find(|c| c.id == candidate_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Candidate {}", candidate_id)))?,
        };

        let outcome = self.selection.toggle(&candidate);
        if outcome.changed() {
            self.persist().await?;
        }

        debug!("Toggle {} for {}: {:?}", candidate_id, self.user_id, outcome);
        Ok(outcome)
    }

    /// Remove a candidate and persist; returns whether it was selected
    pub async fn remove(&mut self, candidate_id: &str) -> Result<bool> {
        let removed = self.selection.remove(candidate_id);
        self.persist().await?;
        Ok(removed)
    }

    async fn persist(&self) -> Result<()> {
        selections::save_selection(&self.db, self.user_id, &self.selection).await
    }
}
