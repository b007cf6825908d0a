//! Ballot workflows
//!
//! Each workflow reads and writes the store directly; handlers in `api`
//! only translate between HTTP and these calls.

pub mod account;
pub mod finalize;
pub mod rating;
pub mod selection;

pub use finalize::{submit, SubmitError};
pub use rating::{edit_rating, enter_review, save_rating, RatingReview};
pub use selection::SelectionWorkflow;
