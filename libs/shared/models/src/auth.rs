use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: u64,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Who is looking at a booking or session view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Specialist,
    Consultant,
    Doctor,
    Admin,
}

impl UserRole {
    /// Unknown or missing roles fall back to `Patient`, the least privileged view.
    pub fn parse(role: Option<&str>) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("specialist") => UserRole::Specialist,
            Some("consultant") => UserRole::Consultant,
            Some("doctor") => UserRole::Doctor,
            Some("admin") => UserRole::Admin,
            _ => UserRole::Patient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::parse(self.role.as_deref())
    }
}

/// Raw bearer token of the authenticated request, forwarded to the backend.
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
