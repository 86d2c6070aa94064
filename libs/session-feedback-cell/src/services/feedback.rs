use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::{User, UserRole};

use crate::services::collaborator::SessionCollaborator;
use crate::{
    CompletionResponse, CompletionView, FeedbackError, FeedbackForm, FeedbackReceipt,
    FeedbackRequest,
};

/// Where a participant goes after the feedback step.
pub fn ended_path(session_id: Uuid) -> String {
    format!("/sessions/{}/ended", session_id)
}

pub struct FeedbackService {
    sessions: Arc<dyn SessionCollaborator>,
    forms: Arc<RwLock<HashMap<Uuid, FeedbackForm>>>,
}

impl FeedbackService {
    pub fn new(sessions: Arc<dyn SessionCollaborator>) -> Self {
        Self {
            sessions,
            forms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn is_submitted(&self, session_id: Uuid) -> bool {
        self.forms
            .read()
            .await
            .get(&session_id)
            .map(FeedbackForm::is_submitted)
            .unwrap_or(false)
    }

    #[instrument(skip(self, user, auth_token), fields(user_id = %user.id))]
    pub async fn completion(
        &self,
        session_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<CompletionResponse, FeedbackError> {
        let record = self.sessions.fetch_session(session_id, auth_token).await?;
        let role = user.role();

        let feedback_exists = if record.status.is_completed() && role == UserRole::Patient {
            self.is_submitted(session_id).await
                || self
                    .sessions
                    .feedback_exists(session_id, &user.id, auth_token)
                    .await?
        } else {
            false
        };

        let view = CompletionView::decide(role, record.status, feedback_exists);
        debug!("Session {} is {}, showing {:?}", session_id, record.status, view);

        Ok(CompletionResponse {
            session_id,
            status: record.status,
            view,
        })
    }

    /// Records the patient's rating for a completed session. The form stays
    /// open for a retry when the backend rejects the submission.
    ///
    /// The backend call runs on its own task so the form is settled even
    /// when the caller goes away mid-request.
    #[instrument(skip(self, user, request, auth_token), fields(user_id = %user.id))]
    pub async fn submit(
        &self,
        session_id: Uuid,
        user: &User,
        request: &FeedbackRequest,
        auth_token: &str,
    ) -> Result<FeedbackReceipt, FeedbackError> {
        if user.role() != UserRole::Patient {
            return Err(FeedbackError::NotPermitted);
        }

        let record = self.sessions.fetch_session(session_id, auth_token).await?;
        if !record.status.is_completed() {
            return Err(FeedbackError::SessionNotCompleted(record.status.to_string()));
        }
        if !record.belongs_to(&user.id) {
            warn!("User {} tried to rate session {} of another patient", user.id, session_id);
            return Err(FeedbackError::NotPermitted);
        }

        let submission = {
            let mut forms = self.forms.write().await;
            let form = forms.entry(session_id).or_default();
            form.set_rating(request.rating)?;
            form.set_comment(&request.comment)?;
            form.begin_submit(session_id, &user.id)?
        };

        let sessions = Arc::clone(&self.sessions);
        let forms = Arc::clone(&self.forms);
        let auth_token = auth_token.to_string();
        let result = tokio::spawn(async move {
            let result = sessions.submit_feedback(submission, &auth_token).await;
            if let Some(form) = forms.write().await.get_mut(&session_id) {
                form.finish_submit(result.is_ok());
            }
            result
        })
        .await
        .map_err(|e| FeedbackError::CollaboratorError(format!("submission task failed: {}", e)))
        .and_then(|result| result);

        match result {
            Ok(()) => {
                info!("Feedback recorded for session {}", session_id);
                Ok(FeedbackReceipt {
                    success: true,
                    session_id,
                    navigate_to: ended_path(session_id),
                })
            }
            Err(e) => {
                error!("Feedback submission for session {} failed: {}", session_id, e);
                Err(e)
            }
        }
    }
}
