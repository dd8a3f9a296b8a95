//! HTTP API configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Shortest accepted session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Main API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// Request limits
    pub limits: LimitsConfig,
}

impl ApiConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.is_empty() {
            return Err(ConfigError::MissingSecret("session secret"));
        }
        if self.session.secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "session secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Invalid("session ttl cannot be 0".into()));
        }
        if self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Invalid(
                "wildcard origin cannot be used with credentialed CORS".into(),
            ));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_upload_bytes cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 4000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4000,
        }
    }
}

/// CORS configuration. The frontend sends the session cookie, so
/// credentials are allowed and origins must be listed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Max age for preflight cache, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            max_age: 86400,
        }
    }
}

/// Session cookie configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC key signing the cookie
    pub secret: String,
    /// Session lifetime in seconds (default: 7 days)
    pub ttl_secs: u64,
    /// Add the `Secure` attribute (HTTPS deployments)
    pub cookie_secure: bool,
    /// Redis URL; sessions stay in memory when unset
    pub redis_url: Option<String>,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 7 * 24 * 3600,
            cookie_secure: false,
            redis_url: None,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("cookie_secure", &self.cookie_secure)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .finish()
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max body size for multipart uploads in bytes (default: 50MB)
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A required secret is empty
    #[error("missing {0}")]
    MissingSecret(&'static str),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
