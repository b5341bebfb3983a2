//! Authentication subsystem: configuration, token codecs, the Redis jti
//! blocklist, credential handling, Rocket request guards and the session
//! route handlers.

use std::sync::Arc;

pub mod action_tokens;
pub mod blocklist;
pub mod config;
pub mod error;
pub mod guards;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod tokens;
pub mod users;

pub use action_tokens::ActionTokenCodec;
pub use blocklist::TokenBlocklist;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{ADMIN_ROLES, AccessToken, CurrentUser, MEMBER_ROLES, RefreshToken};
pub use passwords::PasswordService;
pub use tokens::{TokenKind, TokenService, UserClaims};

/// Auth dependencies injected at process start and shared by all request
/// handlers. Everything here is either immutable or externally synchronized
/// (the blocklist lives in Redis).
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub passwords: Arc<PasswordService>,
    pub tokens: Arc<TokenService>,
    pub action_tokens: Arc<ActionTokenCodec>,
    pub blocklist: TokenBlocklist,
}

impl AuthState {
    /// Build all auth services and open the blocklist connection.
    pub async fn initialize(config: AuthConfig) -> AuthResult<Self> {
        let blocklist =
            TokenBlocklist::connect(&config.redis_url, config.blocklist_ttl_secs).await?;
        let tokens = TokenService::from_config(&config);
        let action_tokens = ActionTokenCodec::new(&config.jwt_secret, &config.action_token_salt);

        Ok(Self {
            config,
            passwords: Arc::new(PasswordService::new()),
            tokens: Arc::new(tokens),
            action_tokens: Arc::new(action_tokens),
            blocklist,
        })
    }
}
