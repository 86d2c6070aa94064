use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    book_appointment_instead, cancel_plan, checkout, close_booking, confirm_plan, get_booking,
    get_pricing_plans, present_pricing, select_category, select_plan,
};
use crate::BookingFlowService;

pub fn booking_routes(service: Arc<BookingFlowService>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(get_booking))
        .route("/plans", get(get_pricing_plans))
        .route("/category", post(select_category))
        .route("/pricing", post(present_pricing))
        .route("/plan", post(select_plan))
        .route("/confirm", post(confirm_plan))
        .route("/cancel", post(cancel_plan))
        .route("/checkout", post(checkout))
        .route("/schedule", post(book_appointment_instead))
        .route("/close", post(close_booking))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}
