use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use uuid::Uuid;

use shared_models::{
    auth::{AuthToken, User},
    error::AppError,
};

use crate::{CompletionResponse, FeedbackReceipt, FeedbackRequest, FeedbackService};

pub async fn get_completion(
    State(service): State<Arc<FeedbackService>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Extension(token): Extension<AuthToken>,
) -> Result<Json<CompletionResponse>, AppError> {
    let response = service
        .completion(session_id, &user, token.as_str())
        .await?;
    Ok(Json(response))
}

pub async fn submit_feedback(
    State(service): State<Arc<FeedbackService>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Extension(token): Extension<AuthToken>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackReceipt>, AppError> {
    let receipt = service
        .submit(session_id, &user, &request, token.as_str())
        .await?;
    Ok(Json(receipt))
}
