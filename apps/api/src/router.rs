use std::sync::Arc;

use axum::{routing::get, Router};

use booking_flow_cell::booking_routes;
use presence_cell::presence_routes;
use session_feedback_cell::feedback_routes;
use shared_config::AppConfig;

use crate::AppServices;

pub fn create_router(config: Arc<AppConfig>, services: &AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Specialist Booking API is running!" }))
        .nest(
            "/presence",
            presence_routes(Arc::clone(&services.presence), Arc::clone(&config)),
        )
        .nest(
            "/booking",
            booking_routes(Arc::clone(&services.booking), Arc::clone(&config)),
        )
        .nest(
            "/sessions",
            feedback_routes(Arc::clone(&services.feedback), config),
        )
}
