use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Error taxonomy for the authentication and authorization subsystem.
///
/// Decode failures and revoked tokens deliberately collapse into
/// [`AuthError::InvalidToken`] so callers cannot distinguish the two; the
/// cause is logged where it happens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("invalid token")]
    InvalidToken,
    #[error("access token required")]
    AccessTokenRequired,
    #[error("refresh token required")]
    RefreshTokenRequired,
    #[error("insufficient permission")]
    InsufficientPermission,
    #[error("account not verified")]
    AccountNotVerified,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("invalid or expired action token")]
    InvalidActionToken,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("blocklist error: {0}")]
    Redis(String),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::AuthenticationRequired
            | AuthError::InvalidToken
            | AuthError::AccessTokenRequired
            | AuthError::RefreshTokenRequired => Status::Unauthorized,
            AuthError::InsufficientPermission | AuthError::AccountNotVerified => Status::Forbidden,
            AuthError::UserAlreadyExists => Status::Conflict,
            AuthError::UserNotFound => Status::NotFound,
            AuthError::InvalidCredentials
            | AuthError::PasswordMismatch
            | AuthError::InvalidActionToken => Status::BadRequest,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Redis(_)
            | AuthError::Jwt(_)
            | AuthError::Serialization(_)
            | AuthError::PasswordHash(_) => Status::InternalServerError,
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            log::error!("auth request failed: {}", self);
        } else {
            log::debug!("auth request rejected: {}", self);
        }

        let body = serde_json::json!({
            "status": status.code,
            "message": self.to_string(),
        })
        .to_string();

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl OpenApiResponderInner for AuthError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}
