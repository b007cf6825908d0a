//! ballot-server library
//!
//! HTTP surface for the restaurant ballot: sign-in, candidate selection,
//! rating and the one-time submission.

use std::sync::Arc;

use axum::Router;
use ballot_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod session;
pub mod workflow;

use session::SessionProvider;

/// Auth event channel capacity
pub const EVENT_CAPACITY: usize = 256;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Auth state changes (sign-in, refresh, sign-out)
    pub events: EventBus,
    /// Token to `{identity, profile}` resolver
    pub sessions: Arc<SessionProvider>,
}

impl AppState {
    /// Create state and start the session provider
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(db: SqlitePool) -> Self {
        let events = EventBus::new(EVENT_CAPACITY);
        let sessions = SessionProvider::start(db.clone(), &events);
        Self {
            db,
            events,
            sessions,
        }
    }

    /// Stop background work tied to this state
    pub fn shutdown(&self) {
        self.sessions.shutdown();
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    // Protected routes (bearer token required)
    let protected = Router::new()
        .route("/auth/refresh", post(api::refresh))
        .route("/auth/sign-out", post(api::sign_out))
        .route("/api/session", get(api::get_session))
        .route("/api/candidates", get(api::list_candidates))
        .route("/api/selection", get(api::get_selection))
        .route("/api/selection/toggle", post(api::toggle_selection))
        .route("/api/selection/:candidate_id", delete(api::remove_selection))
        .route("/api/ratings", get(api::enter_ratings))
        .route(
            "/api/ratings/:candidate_id",
            get(api::edit_rating).put(api::save_rating),
        )
        .route("/api/submit", post(api::submit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/auth/sign-up", post(api::sign_up))
        .route("/auth/sign-in", post(api::sign_in))
        .merge(api::health_routes());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
