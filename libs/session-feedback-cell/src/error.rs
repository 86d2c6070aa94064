use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("Comment is too long ({0} characters)")]
    CommentTooLong(usize),

    #[error("Feedback for this session was already submitted")]
    AlreadySubmitted,

    #[error("Feedback for this session is being submitted")]
    SubmissionInFlight,

    #[error("Session is {0}, feedback opens once it is completed")]
    SessionNotCompleted(String),

    #[error("Only patients can rate a session")]
    NotPermitted,

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Session backend error: {0}")]
    CollaboratorError(String),
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::InvalidRating(_) | FeedbackError::CommentTooLong(_) => {
                AppError::ValidationError(err.to_string())
            }
            FeedbackError::AlreadySubmitted
            | FeedbackError::SubmissionInFlight
            | FeedbackError::SessionNotCompleted(_) => AppError::Conflict(err.to_string()),
            FeedbackError::NotPermitted => AppError::Forbidden(err.to_string()),
            FeedbackError::SessionNotFound(_) => AppError::NotFound(err.to_string()),
            FeedbackError::CollaboratorError(_) => AppError::ExternalService(err.to_string()),
        }
    }
}
