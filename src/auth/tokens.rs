use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthResult};

/// Discriminator between the two kinds of session tokens. The expected kind
/// is passed to the verifier as a plain value; there is no type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// User data embedded inside a session token. Refresh tokens carry no role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub email: String,
    pub user_uid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Full claim set of a signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: UserClaims,
    pub exp: i64,
    /// Unique token identifier, used as the revocation key.
    pub jti: String,
    pub refresh: bool,
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        if self.refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        }
    }
}

/// Signs and verifies self-contained session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            default_ttl: config.access_token_ttl(),
        }
    }

    /// Mint a signed token carrying `user`, a fresh jti and an absolute
    /// expiry of now plus `ttl` (the configured access TTL when `None`).
    pub fn issue(
        &self,
        user: UserClaims,
        ttl: Option<Duration>,
        kind: TokenKind,
    ) -> AuthResult<String> {
        let expires_at = Utc::now() + ttl.unwrap_or(self.default_ttl);
        let claims = TokenClaims {
            user,
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            refresh: matches!(kind, TokenKind::Refresh),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify signature, algorithm and expiry. Every failure mode collapses
    /// to `None`; the cause is logged here and never surfaced to callers.
    pub fn decode(&self, token: &str) -> Option<TokenClaims> {
        match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                match err.kind() {
                    ErrorKind::ExpiredSignature => {
                        log::warn!("session token has expired");
                    }
                    ErrorKind::InvalidToken
                    | ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_) => {
                        log::warn!("session token is invalid or malformed: {}", err);
                    }
                    _ => {
                        log::error!("unexpected token verification error: {}", err);
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-signing-secret".into(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_days: 2,
            action_token_salt: "email-actions".into(),
            action_token_max_age_secs: 86400,
            redis_url: "redis://127.0.0.1:6379".into(),
            blocklist_ttl_secs: 3600,
            public_base_url: "http://localhost:8000".into(),
        }
    }

    fn sample_user() -> UserClaims {
        UserClaims {
            email: "reader@example.com".into(),
            user_uid: Uuid::new_v4(),
            role: Some("user".into()),
        }
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let service = TokenService::from_config(&test_config());
        let user = sample_user();

        let token = service
            .issue(user.clone(), None, TokenKind::Access)
            .expect("issue token");
        let claims = service.decode(&token).expect("decode token");

        assert!(!claims.refresh);
        assert_eq!(claims.kind(), TokenKind::Access);
        assert_eq!(claims.user.email, user.email);
        assert_eq!(claims.user.user_uid, user.user_uid);
        assert_eq!(claims.user.role.as_deref(), Some("user"));
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn refresh_tokens_carry_the_refresh_flag() {
        let service = TokenService::from_config(&test_config());

        let token = service
            .issue(sample_user(), Some(Duration::days(2)), TokenKind::Refresh)
            .expect("issue token");
        let claims = service.decode(&token).expect("decode token");

        assert!(claims.refresh);
        assert_eq!(claims.kind(), TokenKind::Refresh);
    }

    #[test]
    fn every_token_gets_a_unique_jti() {
        let service = TokenService::from_config(&test_config());

        let first = service
            .issue(sample_user(), None, TokenKind::Access)
            .expect("issue token");
        let second = service
            .issue(sample_user(), None, TokenKind::Access)
            .expect("issue token");

        let first = service.decode(&first).expect("decode token");
        let second = service.decode(&second).expect("decode token");
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn expired_tokens_decode_to_none() {
        let service = TokenService::from_config(&test_config());

        // Past the 30s validation leeway.
        let token = service
            .issue(sample_user(), Some(Duration::seconds(-120)), TokenKind::Access)
            .expect("issue token");

        assert!(service.decode(&token).is_none());
    }

    #[test]
    fn tampered_tokens_decode_to_none() {
        let service = TokenService::from_config(&test_config());

        let token = service
            .issue(sample_user(), None, TokenKind::Access)
            .expect("issue token");
        let mut tampered = token.clone();
        tampered.pop();

        assert!(service.decode(&tampered).is_none());
        assert!(service.decode("not-a-token").is_none());
    }
}
