use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{get_completion, submit_feedback};
use crate::FeedbackService;

pub fn feedback_routes(service: Arc<FeedbackService>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{session_id}/completion", get(get_completion))
        .route("/{session_id}/feedback", post(submit_feedback))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}
