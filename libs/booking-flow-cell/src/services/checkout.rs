use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, info, instrument};

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::{BookingFlowError, CheckoutRequest, PaymentInitiation, PaymentRequest};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// External payment initiation.
#[async_trait]
pub trait PaymentCollaborator: Send + Sync {
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        auth_token: &str,
    ) -> Result<PaymentInitiation, BookingFlowError>;
}

/// Payment initiation through the backend REST API.
pub struct RestPaymentCollaborator {
    backend: BackendClient,
}

impl RestPaymentCollaborator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }
}

#[async_trait]
impl PaymentCollaborator for RestPaymentCollaborator {
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        auth_token: &str,
    ) -> Result<PaymentInitiation, BookingFlowError> {
        let body = serde_json::to_value(&request)
            .map_err(|e| BookingFlowError::PaymentError(e.to_string()))?;

        self.backend
            .post::<PaymentInitiation>("/payments/initialize", auth_token, body)
            .await
            .map_err(|e| BookingFlowError::PaymentError(e.to_string()))
    }
}

/// Packages an acknowledged selection and hands it to payment.
#[derive(Clone)]
pub struct CheckoutService {
    payments: Arc<dyn PaymentCollaborator>,
    currency: String,
}

impl CheckoutService {
    pub fn new(payments: Arc<dyn PaymentCollaborator>, currency: &str) -> Self {
        Self {
            payments,
            currency: currency.to_string(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn build_payment_request(
        &self,
        checkout: &CheckoutRequest,
        payer_email: &str,
    ) -> Result<PaymentRequest, BookingFlowError> {
        let payer_email = payer_email.trim();
        if !EMAIL_PATTERN.is_match(payer_email) {
            return Err(BookingFlowError::ValidationError(format!(
                "'{}' is not a valid payer email",
                payer_email
            )));
        }

        Ok(PaymentRequest {
            amount: checkout.price_major_units,
            currency: self.currency.clone(),
            payer_email: payer_email.to_string(),
            product_description: describe(checkout),
        })
    }

    #[instrument(skip(self, checkout, auth_token), fields(specialist = %checkout.specialist.id))]
    pub async fn initiate_payment(
        &self,
        checkout: &CheckoutRequest,
        payer_email: &str,
        auth_token: &str,
    ) -> Result<PaymentInitiation, BookingFlowError> {
        let request = self.build_payment_request(checkout, payer_email)?;
        let amount = request.amount;

        match self.payments.initiate_payment(request, auth_token).await {
            Ok(initiation) => {
                info!("Payment of {} {} initiated", amount, self.currency);
                Ok(initiation)
            }
            Err(e) => {
                error!("Payment initiation failed: {}", e);
                Err(e)
            }
        }
    }
}

fn describe(checkout: &CheckoutRequest) -> String {
    format!(
        "{} consultation with {} ({} min)",
        checkout.category,
        checkout.specialist.display_name,
        checkout.duration_seconds / 60
    )
}
