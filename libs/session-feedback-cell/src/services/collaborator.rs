use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::{FeedbackError, FeedbackSubmission, SessionRecord};

/// Session records and feedback persistence owned by the session backend.
#[async_trait]
pub trait SessionCollaborator: Send + Sync {
    async fn fetch_session(
        &self,
        session_id: Uuid,
        auth_token: &str,
    ) -> Result<SessionRecord, FeedbackError>;

    async fn feedback_exists(
        &self,
        session_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<bool, FeedbackError>;

    async fn submit_feedback(
        &self,
        submission: FeedbackSubmission,
        auth_token: &str,
    ) -> Result<(), FeedbackError>;
}

pub struct RestSessionCollaborator {
    backend: BackendClient,
}

impl RestSessionCollaborator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }
}

fn backend_error(e: anyhow::Error) -> FeedbackError {
    FeedbackError::CollaboratorError(e.to_string())
}

#[async_trait]
impl SessionCollaborator for RestSessionCollaborator {
    async fn fetch_session(
        &self,
        session_id: Uuid,
        auth_token: &str,
    ) -> Result<SessionRecord, FeedbackError> {
        let path = format!("/rest/v1/video_sessions?id=eq.{}", session_id);
        let records: Vec<SessionRecord> = self
            .backend
            .get(&path, auth_token)
            .await
            .map_err(backend_error)?;

        records
            .into_iter()
            .next()
            .ok_or(FeedbackError::SessionNotFound(session_id))
    }

    async fn feedback_exists(
        &self,
        session_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<bool, FeedbackError> {
        let path = format!(
            "/rest/v1/session_feedback?session_id=eq.{}&user_id=eq.{}&select=id",
            session_id, user_id
        );
        let rows: Vec<Value> = self
            .backend
            .get(&path, auth_token)
            .await
            .map_err(backend_error)?;

        Ok(!rows.is_empty())
    }

    async fn submit_feedback(
        &self,
        submission: FeedbackSubmission,
        auth_token: &str,
    ) -> Result<(), FeedbackError> {
        let body = json!({
            "session_id": submission.session_id,
            "user_id": submission.user_id,
            "rating": submission.rating,
            "comment": submission.comment,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created: Value = self
            .backend
            .post("/rest/v1/session_feedback", auth_token, body)
            .await
            .map_err(backend_error)?;

        debug!("Feedback stored: {}", created);
        Ok(())
    }
}
