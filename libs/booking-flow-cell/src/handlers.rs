use std::sync::Arc;

use axum::{extract::State, response::Json, Extension};
use serde_json::{json, Value};
use tracing::info;

use shared_models::{
    auth::{AuthToken, User},
    error::AppError,
};

use crate::{
    BookingFlowService, BookingView, CheckoutBody, PlanSelectionRequest, PricingPlan,
    PricingView, SelectCategoryRequest,
};

pub async fn get_pricing_plans(State(service): State<Arc<BookingFlowService>>) -> Json<Vec<PricingPlan>> {
    Json(service.catalog().plans().to_vec())
}

pub async fn get_booking(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
) -> Json<BookingView> {
    Json(service.view(&user.id).await)
}

pub async fn select_category(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
    Json(request): Json<SelectCategoryRequest>,
) -> Result<Json<BookingView>, AppError> {
    info!("User {} looking for a {} specialist", user.id, request.category);

    let view = service.select_category(&user.id, &request.category).await?;
    Ok(Json(view))
}

pub async fn present_pricing(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
) -> Result<Json<PricingView>, AppError> {
    Ok(Json(service.present_pricing(&user.id).await?))
}

pub async fn select_plan(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
    Json(request): Json<PlanSelectionRequest>,
) -> Result<Json<Value>, AppError> {
    let gate = service.select_plan(&user.id, &request).await?;

    Ok(Json(json!({
        "state": "plan_acknowledged",
        "acknowledgment": gate,
    })))
}

pub async fn confirm_plan(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let checkout = service.confirm(&user.id).await?;

    Ok(Json(json!({
        "state": "checkout_presented",
        "checkout": checkout,
    })))
}

pub async fn cancel_plan(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(service.cancel(&user.id).await?))
}

/// Starts payment. The payer email defaults to the caller's account email.
pub async fn checkout(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
    Extension(token): Extension<AuthToken>,
    body: Option<Json<CheckoutBody>>,
) -> Result<Json<Value>, AppError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let payer_email = body
        .payer_email
        .or_else(|| user.email.clone())
        .ok_or_else(|| AppError::BadRequest("A payer email is required".to_string()))?;

    let initiation = service
        .checkout(&user.id, &payer_email, token.as_str())
        .await?;

    Ok(Json(json!({
        "success": true,
        "redirect_url": initiation.redirect_url,
        "reference": initiation.reference,
    })))
}

pub async fn book_appointment_instead(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
    Extension(token): Extension<AuthToken>,
) -> Result<Json<Value>, AppError> {
    let handoff = service
        .book_appointment_instead(&user.id, token.as_str())
        .await?;

    Ok(Json(json!({
        "success": true,
        "handoff": handoff,
    })))
}

pub async fn close_booking(
    State(service): State<Arc<BookingFlowService>>,
    Extension(user): Extension<User>,
) -> Json<Value> {
    let transition = service.close(&user.id).await;

    Json(json!({
        "state": "idle",
        "transition": transition,
    }))
}
