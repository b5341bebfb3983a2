//! Request guards implementing the bearer-token verifier and the
//! role-based authorization gate.
//!
//! Verification walks EXTRACT -> DECODE -> REVOCATION_CHECK -> KIND_CHECK
//! with a failure exit at every stage. A single verifier takes the expected
//! token kind as a value; the guard types are thin wrappers around it.

use rocket::Request;
use rocket::State;
use rocket::request::{FromRequest, Outcome};
use rocket_db_pools::sqlx::PgPool;
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::tokens::{TokenClaims, TokenKind};
use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState, users};
use crate::models::User;

/// Role sets attached to endpoints. Membership is configuration, not a
/// type hierarchy.
pub const MEMBER_ROLES: &[Role] = &[Role::User, Role::Admin];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Verified claims of an access-kind bearer token.
#[derive(Debug, OpenApiFromRequest)]
pub struct AccessToken(pub TokenClaims);

/// Verified claims of a refresh-kind bearer token.
#[derive(Debug, OpenApiFromRequest)]
pub struct RefreshToken(pub TokenClaims);

/// Principal resolved from a verified access token.
#[derive(Debug, OpenApiFromRequest)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Authorization gate: the account must be verified and its role a
    /// member of the endpoint's allowed set.
    pub fn authorize(&self, allowed: &[Role]) -> AuthResult<()> {
        if !self.0.is_verified {
            return Err(AuthError::AccountNotVerified);
        }
        if allowed.contains(&Role::from_db_value(&self.0.role)) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermission)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessToken {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match verify_bearer(request, TokenKind::Access).await {
            Ok(claims) => Outcome::Success(AccessToken(claims)),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RefreshToken {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match verify_bearer(request, TokenKind::Refresh).await {
            Ok(claims) => Outcome::Success(RefreshToken(claims)),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_user(request).await {
            Ok(user) => Outcome::Success(CurrentUser(user)),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Shared verifier: extract the bearer credential, decode it, reject
/// revoked identifiers and check the kind discriminator.
async fn verify_bearer(request: &Request<'_>, expected: TokenKind) -> AuthResult<TokenClaims> {
    let token = bearer_token(request)?;

    let state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from managed state".into()))?;

    // Decode failure and revocation collapse into the same error on purpose:
    // the caller learns nothing about why the token was rejected.
    let claims = state.tokens.decode(token).ok_or(AuthError::InvalidToken)?;

    if state.blocklist.is_revoked(&claims.jti).await? {
        return Err(AuthError::InvalidToken);
    }

    match (claims.kind(), expected) {
        (TokenKind::Refresh, TokenKind::Access) => Err(AuthError::AccessTokenRequired),
        (TokenKind::Access, TokenKind::Refresh) => Err(AuthError::RefreshTokenRequired),
        _ => Ok(claims),
    }
}

async fn resolve_user(request: &Request<'_>) -> AuthResult<User> {
    let claims = verify_bearer(request, TokenKind::Access).await?;

    let pool = request
        .guard::<&State<PgPool>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("database pool missing from managed state".into()))?;

    users::get_user_by_email(pool.inner(), &claims.user.email)
        .await?
        .ok_or(AuthError::UserNotFound)
}

fn bearer_token<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::AuthenticationRequired)?;

    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::AuthenticationRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_user(role: &str, verified: bool) -> CurrentUser {
        CurrentUser(User {
            uid: Uuid::new_v4(),
            username: "reader".into(),
            email: "reader@example.com".into(),
            firstname: "Rea".into(),
            lastname: "Der".into(),
            role: role.into(),
            is_verified: verified,
            password_hash: "hash".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn unverified_accounts_are_rejected_first() {
        let user = sample_user("admin", false);
        assert!(matches!(
            user.authorize(ADMIN_ROLES),
            Err(AuthError::AccountNotVerified)
        ));
    }

    #[test]
    fn role_must_be_in_the_allowed_set() {
        let user = sample_user("user", true);
        assert!(user.authorize(MEMBER_ROLES).is_ok());
        assert!(matches!(
            user.authorize(ADMIN_ROLES),
            Err(AuthError::InsufficientPermission)
        ));

        let admin = sample_user("admin", true);
        assert!(admin.authorize(ADMIN_ROLES).is_ok());
        assert!(admin.authorize(MEMBER_ROLES).is_ok());
    }

    #[test]
    fn unknown_roles_fall_back_to_user() {
        let user = sample_user("superuser", true);
        assert!(user.authorize(MEMBER_ROLES).is_ok());
        assert!(user.authorize(ADMIN_ROLES).is_err());
    }
}
