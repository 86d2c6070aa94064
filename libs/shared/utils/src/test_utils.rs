use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub backend_url: String,
    pub backend_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            backend_url: "http://localhost:54321".to_string(),
            backend_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_backend(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_url: self.backend_url.clone(),
            backend_anon_key: self.backend_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn specialist(email: &str) -> Self {
        Self::new(email, "specialist")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));
        Self::sign(user, secret, now.timestamp(), exp.timestamp())
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        let issued = Utc::now() - Duration::hours(3);
        let expired = Utc::now() - Duration::hours(2);
        Self::sign(user, secret, issued.timestamp(), expired.timestamp())
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    fn sign(user: &TestUser, secret: &str, iat: i64, exp: i64) -> String {
        let claims = JwtClaims {
            sub: user.id.clone(),
            exp: exp as u64,
            email: Some(user.email.clone()),
            role: Some(user.role.clone()),
            user_metadata: None,
            aud: Some("authenticated".to_string()),
            iat: Some(iat as u64),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("test token should encode")
    }
}
