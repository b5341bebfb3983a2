use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::auth::AuthResult;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by an action token (email verification, password reset).
///
/// `issued_at` is embedded by the serializer; [`ActionTokenCodec::decode`]
/// enforces a maximum age against it, since the signature itself never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClaims {
    pub email: String,
    pub issued_at: i64,
}

/// Signs and verifies action tokens for out-of-band flows.
///
/// The salt is mixed into every MAC so that action tokens and session
/// tokens are not interchangeable even if the same secret were reused.
pub struct ActionTokenCodec {
    key: Vec<u8>,
    salt: Vec<u8>,
}

impl ActionTokenCodec {
    pub fn new(secret: &str, salt: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            salt: salt.as_bytes().to_vec(),
        }
    }

    /// Wrap `email` and the current timestamp into a signed opaque string.
    pub fn encode(&self, email: &str) -> AuthResult<String> {
        self.encode_at(email, Utc::now().timestamp())
    }

    fn encode_at(&self, email: &str, issued_at: i64) -> AuthResult<String> {
        let claims = ActionClaims {
            email: email.to_string(),
            issued_at,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify the signature and parse the claims, rejecting tokens older
    /// than `max_age`. Every failure collapses to `None` and is logged.
    pub fn decode(&self, token: &str, max_age: Duration) -> Option<ActionClaims> {
        let Some((payload, signature)) = token.split_once('.') else {
            log::warn!("action token is missing its signature");
            return None;
        };

        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            log::warn!("action token signature is not valid base64");
            return None;
        };

        if !self.verify(payload.as_bytes(), &signature) {
            log::warn!("action token signature mismatch");
            return None;
        }

        let Ok(raw) = URL_SAFE_NO_PAD.decode(payload) else {
            log::warn!("action token payload is not valid base64");
            return None;
        };

        let claims: ActionClaims = match serde_json::from_slice(&raw) {
            Ok(claims) => claims,
            Err(err) => {
                log::warn!("action token payload is malformed: {}", err);
                return None;
            }
        };

        let age = Utc::now().timestamp() - claims.issued_at;
        if age > max_age.num_seconds() {
            log::warn!("action token is too old ({age}s)");
            return None;
        }

        Some(claims)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(payload);
        // verify_slice is constant time.
        mac.verify_slice(signature).is_ok()
    }

    fn mac(&self) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(&self.salt);
        mac
    }
}
