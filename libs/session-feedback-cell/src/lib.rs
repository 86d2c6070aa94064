//! # Session Feedback Cell
//!
//! Decides what a participant sees once a consultation ends and captures the
//! patient's rating. Patients rate a completed session once; care providers
//! get a plain acknowledgment.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use router::feedback_routes;
pub use services::*;
