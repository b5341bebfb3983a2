use chrono::Duration;

use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret shared by all server instances.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in days.
    pub refresh_token_ttl_days: i64,
    /// Salt context separating action tokens from auth tokens.
    pub action_token_salt: String,
    /// Maximum accepted age of verification / reset links, in seconds.
    pub action_token_max_age_secs: i64,
    /// Connection URL of the Redis instance backing the jti blocklist.
    pub redis_url: String,
    /// Lifetime of blocklist entries; must cover the access token lifetime.
    pub blocklist_ttl_secs: u64,
    /// Base URL used when building links embedded in outbound emails.
    pub public_base_url: String,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("BOOKSHELF_JWT_SECRET")
            .map_err(|_| AuthError::Config("BOOKSHELF_JWT_SECRET is required".into()))?;
        let access_token_ttl_secs = std::env::var("BOOKSHELF_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);
        let refresh_token_ttl_days = std::env::var("BOOKSHELF_REFRESH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(2);
        let action_token_salt = std::env::var("BOOKSHELF_ACTION_TOKEN_SALT")
            .unwrap_or_else(|_| "email-actions".into());
        let action_token_max_age_secs = std::env::var("BOOKSHELF_ACTION_TOKEN_MAX_AGE_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24 * 60 * 60);
        let redis_url = std::env::var("BOOKSHELF_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let blocklist_ttl_secs = std::env::var("BOOKSHELF_BLOCKLIST_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);
        let public_base_url = std::env::var("BOOKSHELF_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into());

        let config = Self {
            jwt_secret,
            access_token_ttl_secs,
            refresh_token_ttl_days,
            action_token_salt,
            action_token_max_age_secs,
            redis_url,
            blocklist_ttl_secs,
            public_base_url,
        };

        // A blocklist entry evicted before the token it shadows expires would
        // let a logged-out token back in.
        if (config.blocklist_ttl_secs as i64) < config.access_token_ttl_secs {
            return Err(AuthError::Config(
                "BOOKSHELF_BLOCKLIST_TTL_SECS must be >= BOOKSHELF_ACCESS_TOKEN_TTL_SECS".into(),
            ));
        }

        Ok(config)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn action_token_max_age(&self) -> Duration {
        Duration::seconds(self.action_token_max_age_secs)
    }
}
