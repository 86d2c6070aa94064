use std::env;
use tracing::warn;

pub const DEFAULT_PRESENCE_REQUEST_CHANNEL: &str = "presence:snapshot-request";
pub const DEFAULT_PRESENCE_UPDATE_CHANNEL: &str = "presence:updated";
pub const DEFAULT_PAYMENT_CURRENCY: &str = "USD";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    pub presence_request_channel: String,
    pub presence_update_channel: String,
    pub payment_currency: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_URL not set, using empty value");
                    String::new()
                }),
            backend_anon_key: env::var("BACKEND_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_ANON_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            presence_request_channel: env::var("PRESENCE_REQUEST_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_PRESENCE_REQUEST_CHANNEL.to_string()),
            presence_update_channel: env::var("PRESENCE_UPDATE_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_PRESENCE_UPDATE_CHANNEL.to_string()),
            payment_currency: env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_PAYMENT_CURRENCY.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|port| match port.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT is not a valid port number: {}, using default", port);
                        None
                    }
                })
                .unwrap_or(DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_presence_configured() {
            warn!("REDIS_URL not set, presence feed will use the in-process channel");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty()
            && !self.backend_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_presence_configured(&self) -> bool {
        self.redis_url.is_some()
            && !self.presence_request_channel.is_empty()
            && !self.presence_update_channel.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            backend_anon_key: String::new(),
            jwt_secret: String::new(),
            redis_url: None,
            presence_request_channel: DEFAULT_PRESENCE_REQUEST_CHANNEL.to_string(),
            presence_update_channel: DEFAULT_PRESENCE_UPDATE_CHANNEL.to_string(),
            payment_currency: DEFAULT_PAYMENT_CURRENCY.to_string(),
            port: DEFAULT_PORT,
        }
    }
}
