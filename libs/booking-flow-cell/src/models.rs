use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use presence_cell::{FeedStatus, OnlineSpecialist};

pub const ACKNOWLEDGMENT_TERMS: &str = "Your paid session time starts when the specialist joins the call. \
Time you do not use before the session ends, including time lost by leaving early or not joining, \
is forfeited and will not be refunded.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    Idle,
    CategorySelected,
    SpecialistFound,
    NoSpecialistAvailable,
    PricingPresented,
    PlanAcknowledged,
    CheckoutPresented,
    Closed,
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Idle => "idle",
            BookingState::CategorySelected => "category_selected",
            BookingState::SpecialistFound => "specialist_found",
            BookingState::NoSpecialistAvailable => "no_specialist_available",
            BookingState::PricingPresented => "pricing_presented",
            BookingState::PlanAcknowledged => "plan_acknowledged",
            BookingState::CheckoutPresented => "checkout_presented",
            BookingState::Closed => "closed",
        }
    }

    /// States in which a plan may be chosen.
    pub fn accepts_plan(&self) -> bool {
        matches!(self, BookingState::SpecialistFound | BookingState::PricingPresented)
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The in-progress choices of one booking attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSelection {
    pub category: String,
    pub specialist: Option<OnlineSpecialist>,
    pub price: Option<f64>,
    pub duration_seconds: Option<u32>,
}

impl BookingSelection {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            specialist: None,
            price: None,
            duration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub title: String,
    pub price_major_units: f64,
    pub duration_seconds: u32,
    pub features: Vec<String>,
    pub is_recommended: bool,
}

/// A plan choice as submitted by a client. Values are untyped until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSelectionRequest {
    #[serde(alias = "price_major_units", alias = "priceMajorUnits")]
    pub price: Value,
    #[serde(alias = "duration_seconds", alias = "durationSeconds")]
    pub duration: Value,
}

impl PlanSelectionRequest {
    pub fn new(price: impl Into<Value>, duration: impl Into<Value>) -> Self {
        Self {
            price: price.into(),
            duration: duration.into(),
        }
    }
}

impl From<&PricingPlan> for PlanSelectionRequest {
    fn from(plan: &PricingPlan) -> Self {
        Self::new(plan.price_major_units, plan.duration_seconds)
    }
}

/// Validated price and duration of a chosen plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanTerms {
    pub price_major_units: f64,
    pub duration_seconds: u32,
}

/// Shown after a plan is chosen; checkout stays locked until it is confirmed.
#[derive(Debug, Clone, Serialize)]
pub struct AcknowledgmentGate {
    pub terms: &'static str,
    pub price_major_units: f64,
    pub duration_seconds: u32,
}

impl AcknowledgmentGate {
    pub fn new(terms: PlanTerms) -> Self {
        Self {
            terms: ACKNOWLEDGMENT_TERMS,
            price_major_units: terms.price_major_units,
            duration_seconds: terms.duration_seconds,
        }
    }
}

/// Everything checkout needs, fixed once the terms are acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub category: String,
    pub specialist: OnlineSpecialist,
    pub price_major_units: f64,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: String,
    pub payer_email: String,
    pub product_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    #[serde(alias = "authorization_url", alias = "authorizationUrl")]
    pub redirect_url: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingRequest {
    pub category: String,
    pub patient_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingHandoff {
    pub category: String,
    pub request_id: Option<String>,
    pub next_step: String,
}

/// A state change that ends or restarts an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: BookingState,
    pub to: BookingState,
}

// ==============================================================================
// HTTP DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectCategoryRequest {
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    pub payer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub state: BookingState,
    pub selection: Option<BookingSelection>,
    pub message: Option<String>,
    pub presence_status: FeedStatus,
    pub presence_stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingView {
    pub state: BookingState,
    pub specialist: OnlineSpecialist,
    pub plans: Vec<PricingPlan>,
}
