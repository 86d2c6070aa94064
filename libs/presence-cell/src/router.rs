use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{list_online_specialists, presence_status};
use crate::PresenceFeed;

pub fn presence_routes(feed: Arc<PresenceFeed>, config: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/specialists", get(list_online_specialists))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .route("/status", get(presence_status))
        .merge(protected_routes)
        .with_state(feed)
}
