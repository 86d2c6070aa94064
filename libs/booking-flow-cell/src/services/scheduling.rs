use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::{BookingFlowError, SchedulingHandoff, SchedulingRequest};

/// Where the client continues after handing a category to scheduling.
pub const SCHEDULING_NEXT_STEP: &str = "/appointments/new";

/// External appointment scheduling, used when no specialist is online.
#[async_trait]
pub trait SchedulingCollaborator: Send + Sync {
    async fn request_appointment(
        &self,
        request: SchedulingRequest,
        auth_token: &str,
    ) -> Result<SchedulingHandoff, BookingFlowError>;
}

pub struct RestSchedulingCollaborator {
    backend: BackendClient,
}

impl RestSchedulingCollaborator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }
}

#[async_trait]
impl SchedulingCollaborator for RestSchedulingCollaborator {
    async fn request_appointment(
        &self,
        request: SchedulingRequest,
        auth_token: &str,
    ) -> Result<SchedulingHandoff, BookingFlowError> {
        let body = json!({
            "category": request.category,
            "patient_id": request.patient_id,
            "status": "pending",
            "requested_at": Utc::now().to_rfc3339(),
        });

        let created: Value = self
            .backend
            .post("/rest/v1/appointment_requests", auth_token, body)
            .await
            .map_err(|e| BookingFlowError::SchedulingError(e.to_string()))?;

        // The backend answers with the created row, either bare or in a list.
        let row = match &created {
            Value::Array(rows) => rows.first(),
            other => Some(other),
        };
        let request_id = row
            .and_then(|row| row.get("id"))
            .and_then(|id| match id {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            });

        debug!("Appointment request created: {:?}", request_id);

        Ok(SchedulingHandoff {
            category: request.category,
            request_id,
            next_step: SCHEDULING_NEXT_STEP.to_string(),
        })
    }
}
