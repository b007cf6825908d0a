//! Candidate listing and selection endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use ballot_common::selection::{CandidateFilter, ToggleOutcome};
use ballot_common::{Candidate, MAX_SELECTION};
use serde::{Deserialize, Serialize};

use super::{ApiError, CurrentSession};
use crate::workflow::SelectionWorkflow;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<Candidate>,
    pub cities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: Vec<Candidate>,
    pub count: usize,
    pub max: usize,
    pub can_proceed: bool,
}

impl From<&SelectionWorkflow> for SelectionResponse {
    fn from(workflow: &SelectionWorkflow) -> Self {
        let selection = workflow.selection();
        Self {
            selected: selection.items().to_vec(),
            count: selection.len(),
            max: MAX_SELECTION,
            can_proceed: workflow.can_proceed(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub candidate_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    #[serde(flatten)]
    pub outcome: ToggleOutcome,
    pub selection: SelectionResponse,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
    pub selection: SelectionResponse,
}

/// GET /api/candidates?q=&city=
///
/// `city=All` or no city lists every city. `cities` is always the full list.
pub async fn list_candidates(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    query: Result<Query<CandidateFilter>, QueryRejection>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let Query(filter) = query?;

    let mut workflow = SelectionWorkflow::new(state.db.clone(), current.user_id());
    workflow.load_candidates().await?;

    Ok(Json(CandidatesResponse {
        candidates: workflow.filtered(&filter).into_iter().cloned().collect(),
        cities: workflow.cities(),
    }))
}

/// GET /api/selection
pub async fn get_selection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let workflow = SelectionWorkflow::open(state.db.clone(), current.user_id()).await?;
    Ok(Json(SelectionResponse::from(&workflow)))
}

/// POST /api/selection/toggle
pub async fn toggle_selection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let Json(request) = payload?;

    let mut workflow = SelectionWorkflow::open(state.db.clone(), current.user_id()).await?;
    let outcome = workflow.toggle(&request.candidate_id).await?;

    Ok(Json(ToggleResponse {
        outcome,
        selection: SelectionResponse::from(&workflow),
    }))
}

/// DELETE /api/selection/:candidate_id
pub async fn remove_selection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(candidate_id): Path<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let mut workflow = SelectionWorkflow::open(state.db.clone(), current.user_id()).await?;
    let removed = workflow.remove(&candidate_id).await?;

    Ok(Json(RemoveResponse {
        removed,
        selection: SelectionResponse::from(&workflow),
    }))
}
