//! Integration tests for ballot-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - Sign-up / sign-in / refresh / sign-out and bearer authentication
//! - Candidate listing and filtering
//! - Selection cap and persistence
//! - Rating entry checks and saves
//! - Submission finalization

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ballot_common::db::{candidates, init_database, profiles, selections, submissions};
use ballot_common::model::CatalogEntry;
use ballot_common::{Candidate, Rating, Ratings, SubmissionRecord};
use ballot_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

struct TestApp {
    _dir: TempDir,
    app: Router,
    state: AppState,
}

fn entry(id: &str, name: &str, city: &str, jury: Option<bool>) -> CatalogEntry {
    CatalogEntry {
        restaurant_id: id.to_string(),
        restaurant_name: name.to_string(),
        city_name: city.to_string(),
        created_by_jury: jury,
    }
}

/// 18 plain entries across three cities, four named ones, one jury-only
fn catalog() -> Vec<CatalogEntry> {
    let cities = ["Delhi", "Mumbai", "Kolkata"];
    let mut entries: Vec<_> = (0..18)
        .map(|i| entry(&format!("r{i:02}"), &format!("Place {i:02}"), cities[i % 3], None))
        .collect();
    entries.push(entry("spice-1", "Spice Route", "Delhi", Some(false)));
    entries.push(entry("spice-2", "Grand Spice Kitchen", "Mumbai", None));
    entries.push(entry("spice-3", "SPICE Garden", "Goa", None));
    entries.push(entry("cafe-1", "Café Mondegar", "Mumbai", None));
    entries.push(entry("jury-1", "Jury Spice Pick", "Delhi", Some(true)));
    entries
}

/// Test helper: temp database seeded with the catalog
async fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let db = init_database(&dir.path().join("ballot.db"))
        .await
        .expect("Should create database");
    candidates::import_catalog(&db, &catalog())
        .await
        .expect("Should import catalog");

    let state = AppState::new(db);
    TestApp {
        _dir: dir,
        app: build_router(state.clone()),
        state,
    }
}

/// Test helper: build a request with optional bearer token and JSON body
fn test_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response (Null when empty)
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(test_request("GET", uri, Some(token), None)).await
    }

    /// Sign up and return (token, user_id)
    async fn voter(&self, email: &str) -> (String, Uuid) {
        let (status, body) = self
            .send(test_request(
                "POST",
                "/auth/sign-up",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let token = body["token"].as_str().unwrap().to_string();
        let user_id = Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();
        (token, user_id)
    }

    async fn toggle(&self, token: &str, candidate_id: &str) -> Value {
        let (status, body) = self
            .send(test_request(
                "POST",
                "/api/selection/toggle",
                Some(token),
                Some(json!({ "candidate_id": candidate_id })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn rate(&self, token: &str, candidate_id: &str, rating: Value) -> (StatusCode, Value) {
        self.send(test_request(
            "PUT",
            &format!("/api/ratings/{}", candidate_id),
            Some(token),
            Some(rating),
        ))
        .await
    }

    /// Select r00..r(n-1)
    async fn select(&self, token: &str, n: usize) {
        for i in 0..n {
            self.toggle(token, &format!("r{i:02}")).await;
        }
    }

    /// Fully rate r00..r(n-1)
    async fn rate_all(&self, token: &str, n: usize) {
        for i in 0..n {
            let (status, _) = self
                .rate(token, &format!("r{i:02}"), json!({ "food": 5, "service": 4, "ambience": 3 }))
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup_app().await;

    let (status, body) = t.send(test_request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ballot-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let t = setup_app().await;

    let (status, body) = t.send(test_request("GET", "/api/selection", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = t.get("/api/selection", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_returns_identity_and_profile() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("Voter@Example.com").await;

    let (status, body) = t.get("/api/session", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["user_id"], user_id.to_string());
    assert_eq!(body["identity"]["email"], "voter@example.com");
    assert_eq!(body["profile"]["is_completed"], false);
}

#[tokio::test]
async fn test_sign_in_and_bad_credentials() {
    let t = setup_app().await;
    t.voter("a@example.com").await;

    let (status, body) = t
        .send(test_request(
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({ "email": "a@example.com", "password": "password123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = t
        .send(test_request(
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({ "email": "a@example.com", "password": "wrong-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .send(test_request(
            "POST",
            "/auth/sign-up",
            None,
            Some(json!({ "email": "a@example.com", "password": "password123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let t = setup_app().await;

    let (status, body) = t
        .send(test_request("POST", "/auth/sign-in", None, Some(json!({ "email": 3 }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_refresh_rotates_token() {
    let t = setup_app().await;
    let (old_token, user_id) = t.voter("a@example.com").await;

    let (status, body) = t
        .send(test_request("POST", "/auth/refresh", Some(&old_token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.to_string());
    let new_token = body["token"].as_str().unwrap().to_string();
    assert_ne!(new_token, old_token);

    let (status, _) = t.get("/api/session", &old_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = t.get("/api/session", &new_token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    let (status, _) = t
        .send(test_request("POST", "/auth/sign-out", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.get("/api/session", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Candidates and selection
// =============================================================================

#[tokio::test]
async fn test_candidates_exclude_jury_entries() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    let (status, body) = t.get("/api/candidates", &token).await;
    assert_eq!(status, StatusCode::OK);

    let list = body["candidates"].as_array().unwrap();
    assert_eq!(list.len(), 22);
    assert!(list.iter().all(|c| c["id"] != "jury-1"));
    assert_eq!(body["cities"], json!(["Delhi", "Goa", "Kolkata", "Mumbai"]));
}

#[tokio::test]
async fn test_filter_all_cities_by_term() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    let (_, body) = t.get("/api/candidates?q=Spice&city=All", &token).await;
    let mut ids: Vec<_> = body["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["spice-1", "spice-2", "spice-3"]);

    let (_, body) = t.get("/api/candidates?q=spice&city=Mumbai", &token).await;
    assert_eq!(body["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(body["candidates"][0]["id"], "spice-2");
    // City selector list is unaffected by the filter
    assert_eq!(body["cities"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_filter_ignores_diacritics() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    let (_, body) = t.get("/api/candidates?q=cafe", &token).await;
    assert_eq!(body["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(body["candidates"][0]["id"], "cafe-1");
}

#[tokio::test]
async fn test_toggle_twice_restores_selection() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 3).await;

    let (_, before) = t.get("/api/selection", &token).await;

    let body = t.toggle(&token, "spice-1").await;
    assert_eq!(body["outcome"], "added");
    assert_eq!(body["complete"], false);
    let body = t.toggle(&token, "spice-1").await;
    assert_eq!(body["outcome"], "removed");

    let (_, after) = t.get("/api/selection", &token).await;
    assert_eq!(before, after);
    assert_eq!(after["count"], 3);
}

#[tokio::test]
async fn test_selection_capped_at_fifteen() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    t.select(&token, 14).await;
    let body = t.toggle(&token, "r14").await;
    assert_eq!(body["outcome"], "added");
    assert_eq!(body["complete"], true);

    let body = t.toggle(&token, "r15").await;
    assert_eq!(body["outcome"], "at_capacity");
    assert_eq!(body["selection"]["count"], 15);

    let (_, body) = t.get("/api/selection", &token).await;
    assert_eq!(body["count"], 15);
    assert_eq!(body["max"], 15);
    assert_eq!(body["can_proceed"], true);
}

#[tokio::test]
async fn test_remove_selection() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 2).await;

    let (status, body) = t
        .send(test_request("DELETE", "/api/selection/r00", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);
    assert_eq!(body["selection"]["count"], 1);
    assert_eq!(body["selection"]["can_proceed"], false);
}

#[tokio::test]
async fn test_toggle_unknown_candidate_not_found() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;

    let (status, _) = t
        .send(test_request(
            "POST",
            "/api/selection/toggle",
            Some(&token),
            Some(json!({ "candidate_id": "jury-1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Ratings
// =============================================================================

#[tokio::test]
async fn test_rating_entry_with_short_selection_redirects() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 14).await;

    let (status, body) = t.get("/api/ratings", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integrity"], "selection_incomplete");
    assert_eq!(body["notice"]["redirect"], "/national-selection");
}

#[tokio::test]
async fn test_oversized_ratings_cleared_on_entry() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("a@example.com").await;
    t.select(&token, 15).await;

    let mut ratings = Ratings::new();
    for i in 0..16 {
        ratings.set(format!("r{i:02}"), Rating::new(5, 5, 5).unwrap());
    }
    selections::save_ratings(&t.state.db, user_id, &ratings).await.unwrap();

    let (_, body) = t.get("/api/ratings", &token).await;
    assert_eq!(body["integrity"], "corrupt");
    assert_eq!(body["notice"]["redirect"], "/rating");
    assert_eq!(body["ratings"], json!({}));

    let stored = selections::load_ballot(&t.state.db, user_id).await.unwrap();
    assert!(stored.ratings.is_empty());
}

#[tokio::test]
async fn test_rating_entry_sorted_and_ready() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 15).await;
    t.rate_all(&token, 15).await;

    let (_, body) = t.get("/api/ratings", &token).await;
    assert_eq!(body["integrity"], "ready");
    assert!(body["notice"].is_null());

    let cities: Vec<_> = body["selection"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["city"].as_str().unwrap().to_string())
        .collect();
    let mut sorted = cities.clone();
    sorted.sort();
    assert_eq!(cities, sorted);
}

#[tokio::test]
async fn test_save_rating_leaves_others_unchanged() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 3).await;

    t.rate(&token, "r00", json!({ "food": 5, "service": 5, "ambience": 5 })).await;
    let (status, body) = t
        .rate(&token, "r01", json!({ "food": 2, "service": 3, "ambience": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["r00"], json!({ "food": 5, "service": 5, "ambience": 5 }));
    assert_eq!(body["r01"], json!({ "food": 2, "service": 3, "ambience": 1 }));

    let (_, draft) = t.get("/api/ratings/r02", &token).await;
    assert_eq!(draft["rating"], json!({ "food": 0, "service": 0, "ambience": 0 }));
    let (_, draft) = t.get("/api/ratings/r01", &token).await;
    assert_eq!(draft["rating"]["service"], 3);
}

#[tokio::test]
async fn test_invalid_ratings_rejected() {
    let t = setup_app().await;
    let (token, _) = t.voter("a@example.com").await;
    t.select(&token, 1).await;

    let (status, _) = t.rate(&token, "r00", json!({ "food": 6, "service": 1, "ambience": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.rate(&token, "r05", json!({ "food": 1, "service": 1, "ambience": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.get("/api/ratings/r05", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_full_ballot_submission() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("a@example.com").await;
    t.select(&token, 15).await;
    t.rate_all(&token, 15).await;

    let (status, body) = t
        .send(test_request("POST", "/api/submit", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/thank-you");

    assert_eq!(submissions::count_submissions(&t.state.db, user_id).await.unwrap(), 15);
    let profile = profiles::fetch_profile(&t.state.db, user_id).await.unwrap().unwrap();
    assert!(profile.is_completed);

    // Session ended
    let (status, _) = t.get("/api/session", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A second attempt from a fresh session is refused
    let (_, body) = t
        .send(test_request(
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({ "email": "a@example.com", "password": "password123" })),
        ))
        .await;
    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = t
        .send(test_request("POST", "/api/submit", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Ratings already submitted");
    assert_eq!(submissions::count_submissions(&t.state.db, user_id).await.unwrap(), 15);
}

#[tokio::test]
async fn test_submit_with_fourteen_selections_redirects() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("a@example.com").await;
    t.select(&token, 14).await;
    t.rate_all(&token, 14).await;

    let (status, body) = t
        .send(test_request("POST", "/api/submit", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You must select 15 restaurants before submitting.");
    assert_eq!(body["redirect"], "/national-selection");

    assert_eq!(submissions::count_submissions(&t.state.db, user_id).await.unwrap(), 0);
    let (status, _) = t.get("/api/session", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_submit_with_partial_rating_redirects() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("a@example.com").await;
    t.select(&token, 15).await;
    t.rate_all(&token, 14).await;
    t.rate(&token, "r14", json!({ "food": 4, "service": 0, "ambience": 4 })).await;

    let (status, body) = t
        .send(test_request("POST", "/api/submit", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Please rate all restaurants with a score from 1 to 5 before submitting."
    );
    assert_eq!(body["redirect"], "/rating");
    assert_eq!(submissions::count_submissions(&t.state.db, user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_submit_write_failure_is_server_error() {
    let t = setup_app().await;
    let (token, user_id) = t.voter("a@example.com").await;
    t.select(&token, 15).await;
    t.rate_all(&token, 15).await;

    // Stray row for a selected restaurant makes the batch insert fail
    let stray = Candidate {
        id: "r00".to_string(),
        city: "Delhi".to_string(),
        name: "Place 00".to_string(),
    };
    let record = SubmissionRecord::new(user_id, &stray, &Rating::new(1, 1, 1).unwrap(), chrono::Utc::now());
    submissions::insert_submissions(&t.state.db, &[record]).await.unwrap();

    let (status, body) = t
        .send(test_request("POST", "/api/submit", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Error submitting ratings:"));
    assert!(body.get("redirect").is_none());

    let profile = profiles::fetch_profile(&t.state.db, user_id).await.unwrap().unwrap();
    assert!(!profile.is_completed);
    assert_eq!(submissions::count_submissions(&t.state.db, user_id).await.unwrap(), 1);

    // Voter can still fix things and retry
    let (status, body) = t.get("/api/session", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["is_completed"], false);
}
