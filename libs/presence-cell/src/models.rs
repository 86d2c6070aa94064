use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::PresenceError;

/// A specialist currently reported online by the presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineSpecialist {
    pub id: String,
    pub category: String,
    pub display_name: String,
    pub profile_image_ref: String,
    pub years_of_experience: Option<u32>,
    pub rating: Option<f32>,
}

impl OnlineSpecialist {
    pub fn new(id: &str, category: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            category: category.to_string(),
            display_name: display_name.to_string(),
            profile_image_ref: String::new(),
            years_of_experience: None,
            rating: None,
        }
    }
}

/// Wire shape of a specialist record. Everything is optional here so that a
/// single malformed record can be dropped without losing the whole update.
#[derive(Debug, Deserialize)]
struct WireSpecialist {
    #[serde(alias = "_id")]
    id: Option<Value>,
    #[serde(alias = "specialty")]
    category: Option<String>,
    #[serde(alias = "displayName", alias = "name")]
    display_name: Option<String>,
    #[serde(alias = "profileImageRef", alias = "image")]
    profile_image_ref: Option<String>,
    #[serde(alias = "yearsOfExperience", alias = "experience")]
    years_of_experience: Option<Value>,
    rating: Option<Value>,
}

impl WireSpecialist {
    fn into_specialist(self) -> Result<OnlineSpecialist, String> {
        let id = match self.id {
            Some(Value::String(id)) => id.trim().to_string(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };
        if id.is_empty() {
            return Err("missing id".to_string());
        }

        let category = self.category.unwrap_or_default().trim().to_string();
        if category.is_empty() {
            return Err(format!("specialist {} has no category", id));
        }

        let years_of_experience = match self.years_of_experience.as_ref().and_then(as_number) {
            Some(years) if years >= 0.0 => Some(years as u32),
            Some(years) => {
                warn!("Discarding negative experience {} for specialist {}", years, id);
                None
            }
            None => None,
        };

        let rating = match self.rating.as_ref().and_then(as_number) {
            Some(rating) if (0.0..=5.0).contains(&rating) => Some(rating as f32),
            Some(rating) => {
                warn!("Discarding out-of-range rating {} for specialist {}", rating, id);
                None
            }
            None => None,
        };

        Ok(OnlineSpecialist {
            display_name: self.display_name.unwrap_or_else(|| id.clone()),
            id,
            category,
            profile_image_ref: self.profile_image_ref.unwrap_or_default(),
            years_of_experience,
            rating,
        })
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The full online set from the most recent update, in feed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresenceSnapshot {
    specialists: Vec<OnlineSpecialist>,
}

impl PresenceSnapshot {
    pub fn new(specialists: Vec<OnlineSpecialist>) -> Self {
        Self { specialists }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a channel payload. The payload must be a JSON array; records
    /// that fail validation are dropped individually.
    pub fn decode(payload: &str) -> Result<Self, PresenceError> {
        let value: Value = serde_json::from_str(payload)?;
        let records = match value {
            Value::Array(records) => records,
            other => {
                return Err(PresenceError::InvalidPayload(format!(
                    "expected an array of specialists, got {}",
                    type_name(&other)
                )))
            }
        };

        let mut specialists = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<WireSpecialist>(record) {
                Ok(wire) => match wire.into_specialist() {
                    Ok(specialist) => specialists.push(specialist),
                    Err(reason) => warn!("Dropping specialist record: {}", reason),
                },
                Err(e) => warn!("Dropping undecodable specialist record: {}", e),
            }
        }

        Ok(Self { specialists })
    }

    pub fn encode(&self) -> Result<String, PresenceError> {
        Ok(serde_json::to_string(&self.specialists)?)
    }

    pub fn specialists(&self) -> &[OnlineSpecialist] {
        &self.specialists
    }

    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    /// Channel opened, no update received yet.
    Connecting,
    Live,
    /// The transport dropped; the snapshot is stale.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct PresenceState {
    pub snapshot: Arc<PresenceSnapshot>,
    pub status: FeedStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PresenceState {
    pub fn is_stale(&self) -> bool {
        self.status == FeedStatus::Disconnected
    }
}

impl Default for PresenceState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(PresenceSnapshot::empty()),
            status: FeedStatus::Connecting,
            updated_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PresenceStatusResponse {
    pub status: FeedStatus,
    pub online_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
    pub subscribers: usize,
    pub channel: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SpecialistQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OnlineSpecialistsResponse {
    pub status: FeedStatus,
    pub stale: bool,
    pub category: Option<String>,
    pub specialists: Vec<OnlineSpecialist>,
}
