use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use tracing::debug;

use shared_models::auth::User;

use crate::{
    filter_by_category, OnlineSpecialistsResponse, PresenceFeed, PresenceStatusResponse,
    SpecialistQuery,
};

/// Feed health: status, online count and time of the last update.
pub async fn presence_status(State(feed): State<Arc<PresenceFeed>>) -> Json<PresenceStatusResponse> {
    let state = feed.state();

    Json(PresenceStatusResponse {
        status: state.status,
        online_count: state.snapshot.len(),
        updated_at: state.updated_at,
        subscribers: feed.subscriber_count().await,
        channel: feed.channel_name(),
    })
}

/// Current online specialists, optionally narrowed to one category.
pub async fn list_online_specialists(
    State(feed): State<Arc<PresenceFeed>>,
    Extension(user): Extension<User>,
    Query(query): Query<SpecialistQuery>,
) -> Json<OnlineSpecialistsResponse> {
    let state = feed.state();
    let category = query.category.filter(|c| !c.trim().is_empty());

    let specialists = match &category {
        Some(category) => filter_by_category(state.snapshot.specialists(), category),
        None => state.snapshot.specialists().to_vec(),
    };

    debug!(
        "User {} listed {} online specialists (category: {:?})",
        user.id,
        specialists.len(),
        category
    );

    Json(OnlineSpecialistsResponse {
        status: state.status,
        stale: state.is_stale(),
        category,
        specialists,
    })
}
