use thiserror::Error;

use shared_models::error::AppError;

use crate::BookingState;

#[derive(Error, Debug)]
pub enum BookingFlowError {
    #[error("Cannot {action} while the booking is {from}")]
    InvalidTransition { from: BookingState, action: &'static str },

    #[error("No specialist is bound to this booking")]
    NoSpecialistBound,

    #[error("The session terms must be acknowledged before checkout")]
    AcknowledgmentRequired,

    #[error("Invalid pricing plan: {0}")]
    InvalidPlan(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No booking in progress")]
    NoActiveAttempt,

    #[error("Payment for this booking is already being initiated")]
    CheckoutInProgress,

    #[error("Payment initiation failed: {0}")]
    PaymentError(String),

    #[error("Appointment scheduling failed: {0}")]
    SchedulingError(String),
}

impl From<BookingFlowError> for AppError {
    fn from(err: BookingFlowError) -> Self {
        match err {
            BookingFlowError::InvalidPlan(_) | BookingFlowError::ValidationError(_) => {
                AppError::ValidationError(err.to_string())
            }
            BookingFlowError::NoActiveAttempt => AppError::NotFound(err.to_string()),
            BookingFlowError::PaymentError(_) | BookingFlowError::SchedulingError(_) => {
                AppError::ExternalService(err.to_string())
            }
            BookingFlowError::InvalidTransition { .. }
            | BookingFlowError::NoSpecialistBound
            | BookingFlowError::CheckoutInProgress
            | BookingFlowError::AcknowledgmentRequired => AppError::Conflict(err.to_string()),
        }
    }
}
