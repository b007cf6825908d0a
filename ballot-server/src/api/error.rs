//! Error responses
//!
//! Every failure renders as `{"error": message}`, plus `"redirect"` when a
//! specific screen can fix the problem.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ballot_common::Route;
use serde_json::json;
use tracing::error;

use crate::workflow::SubmitError;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed body, path or query
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    /// Ballot state blocks the request; `redirect` can repair it
    Conflict {
        message: String,
        redirect: Option<Route>,
    },
    Internal(String),
}

impl From<ballot_common::Error> for ApiError {
    fn from(e: ballot_common::Error) -> Self {
        use ballot_common::Error;

        match e {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Rejected { redirect, message } => ApiError::Conflict {
                message: message.to_string(),
                redirect: Some(redirect),
            },
            SubmitError::AlreadySubmitted => ApiError::Conflict {
                message: SubmitError::AlreadySubmitted.to_string(),
                redirect: None,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, redirect) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict { message, redirect } => (StatusCode::CONFLICT, message, redirect),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = match redirect {
            Some(route) => json!({ "error": message, "redirect": route }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
