use serde_json::Value;
use tracing::debug;

use crate::{BookingFlowError, PlanSelectionRequest, PlanTerms, PricingPlan};

const MAX_SESSION_SECONDS: f64 = 4.0 * 60.0 * 60.0;

/// Ordered, static list of consultation plans.
#[derive(Debug, Clone)]
pub struct PricingCatalog {
    plans: Vec<PricingPlan>,
}

impl PricingCatalog {
    pub fn new(plans: Vec<PricingPlan>) -> Self {
        Self { plans }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            PricingPlan {
                title: "Quick Consult".to_string(),
                price_major_units: 15.0,
                duration_seconds: 900,
                features: vec![
                    "15 minute video call".to_string(),
                    "Chat with the specialist".to_string(),
                ],
                is_recommended: false,
            },
            PricingPlan {
                title: "Standard Consult".to_string(),
                price_major_units: 25.0,
                duration_seconds: 1800,
                features: vec![
                    "30 minute video call".to_string(),
                    "Chat with the specialist".to_string(),
                    "Prescription if needed".to_string(),
                ],
                is_recommended: true,
            },
            PricingPlan {
                title: "Extended Consult".to_string(),
                price_major_units: 40.0,
                duration_seconds: 2700,
                features: vec![
                    "45 minute video call".to_string(),
                    "Chat with the specialist".to_string(),
                    "Prescription if needed".to_string(),
                    "Written consultation summary".to_string(),
                ],
                is_recommended: false,
            },
        ])
    }

    pub fn plans(&self) -> &[PricingPlan] {
        &self.plans
    }

    pub fn recommended(&self) -> Option<&PricingPlan> {
        self.plans.iter().find(|plan| plan.is_recommended)
    }

    /// The catalog plan with exactly these terms, if any.
    pub fn find(&self, terms: &PlanTerms) -> Option<&PricingPlan> {
        self.plans.iter().find(|plan| {
            plan.duration_seconds == terms.duration_seconds
                && (plan.price_major_units - terms.price_major_units).abs() < 0.005
        })
    }
}

impl Default for PricingCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<&PlanSelectionRequest> for PlanTerms {
    type Error = BookingFlowError;

    fn try_from(request: &PlanSelectionRequest) -> Result<Self, Self::Error> {
        let price = numeric(&request.price).ok_or_else(|| {
            BookingFlowError::InvalidPlan(format!("price {} is not a number", request.price))
        })?;
        if !price.is_finite() || price <= 0.0 {
            return Err(BookingFlowError::InvalidPlan(format!(
                "price must be positive, got {}",
                price
            )));
        }

        let duration = numeric(&request.duration).ok_or_else(|| {
            BookingFlowError::InvalidPlan(format!("duration {} is not a number", request.duration))
        })?;
        if duration.fract() != 0.0 || duration <= 0.0 || duration > MAX_SESSION_SECONDS {
            return Err(BookingFlowError::InvalidPlan(format!(
                "duration must be a whole number of seconds between 1 and {}, got {}",
                MAX_SESSION_SECONDS, duration
            )));
        }

        debug!("Plan terms validated: {} for {}s", price, duration);
        Ok(PlanTerms {
            price_major_units: price,
            duration_seconds: duration as u32,
        })
    }
}

/// JSON numbers, or strings holding one, as submitted by form inputs.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
