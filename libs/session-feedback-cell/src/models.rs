use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::UserRole;

use crate::FeedbackError;

pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Lifecycle of a video session as the session backend reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Ready,
    InProgress,
    Completed,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Ready => "ready",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
            SessionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub status: SessionStatus,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub actual_end_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Sessions without a recorded patient accept any patient's rating.
    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.patient_id
            .as_deref()
            .map(|patient| patient == user_id)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub session_id: Uuid,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
}

/// What a participant sees after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum CompletionView {
    InProgress,
    ConsultantAcknowledgment,
    PatientRating { can_retake: bool },
    PatientThanks,
}

impl CompletionView {
    pub fn decide(role: UserRole, status: SessionStatus, feedback_exists: bool) -> Self {
        if !status.is_completed() {
            return CompletionView::InProgress;
        }

        match role {
            UserRole::Patient if feedback_exists => CompletionView::PatientThanks,
            UserRole::Patient => CompletionView::PatientRating { can_retake: true },
            _ => CompletionView::ConsultantAcknowledgment,
        }
    }
}

/// Local rating capture for one session.
///
/// `submitted` flips at most once, and only after the backend accepted the
/// submission. While a submission is in flight the form refuses a second one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackForm {
    rating: Option<u8>,
    comment: String,
    submitted: bool,
    #[serde(skip)]
    in_flight: bool,
}

impl FeedbackForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn set_rating(&mut self, rating: i64) -> Result<(), FeedbackError> {
        self.ensure_open()?;
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::InvalidRating(rating));
        }
        self.rating = Some(rating as u8);
        Ok(())
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<(), FeedbackError> {
        self.ensure_open()?;
        let comment = comment.trim();
        let length = comment.chars().count();
        if length > MAX_COMMENT_LENGTH {
            return Err(FeedbackError::CommentTooLong(length));
        }
        self.comment = comment.to_string();
        Ok(())
    }

    pub fn begin_submit(
        &mut self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<FeedbackSubmission, FeedbackError> {
        self.ensure_open()?;
        let rating = self.rating.ok_or(FeedbackError::InvalidRating(0))?;

        self.in_flight = true;
        Ok(FeedbackSubmission {
            session_id,
            user_id: user_id.to_string(),
            rating,
            comment: self.comment.clone(),
        })
    }

    /// A failed submission reopens the form for a retry.
    pub fn finish_submit(&mut self, accepted: bool) {
        self.in_flight = false;
        if accepted {
            self.submitted = true;
        }
    }

    fn ensure_open(&self) -> Result<(), FeedbackError> {
        if self.submitted {
            return Err(FeedbackError::AlreadySubmitted);
        }
        if self.in_flight {
            return Err(FeedbackError::SubmissionInFlight);
        }
        Ok(())
    }
}

// ==============================================================================
// REQUEST/RESPONSE DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackReceipt {
    pub success: bool,
    pub session_id: Uuid,
    pub navigate_to: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    #[serde(flatten)]
    pub view: CompletionView,
}
