//! # Booking Flow Cell
//!
//! Drives one booking attempt per user: pick a category, bind the first
//! online specialist, present pricing, pass the acknowledgment gate and hand
//! the selection to payment. When nobody in the category is online the
//! attempt falls back to scheduling an appointment instead.
//!
//! ```text
//! Idle -> CategorySelected -> SpecialistFound -> PricingPresented
//!                          \-> NoSpecialistAvailable -> (scheduling hand-off)
//! PricingPresented -> PlanAcknowledged -> CheckoutPresented -> (payment)
//! PlanAcknowledged --cancel--> CategorySelected
//! any --close--> Closed (selector rests in Idle)
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use router::booking_routes;
pub use services::*;
