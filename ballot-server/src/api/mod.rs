//! HTTP API handlers

pub mod auth;
pub mod error;
pub mod health;
pub mod ratings;
pub mod selection;
pub mod session;
pub mod submit;

pub use auth::{auth_middleware, refresh, sign_in, sign_out, sign_up, CurrentSession};
pub use error::ApiError;
pub use health::health_routes;
pub use ratings::{edit_rating, enter_ratings, save_rating};
pub use selection::{get_selection, list_candidates, remove_selection, toggle_selection};
pub use session::get_session;
pub use submit::submit;
