//! Session endpoints: thin orchestration over the token codecs, the
//! blocklist, credential handling and principal persistence.

use chrono::Utc;
use rocket::State;
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_db_pools::sqlx::PgPool;
use rocket_okapi::openapi;

use crate::auth::guards::{AccessToken, CurrentUser, MEMBER_ROLES, RefreshToken};
use crate::auth::responses::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, PasswordResetConfirm,
    PasswordResetRequest, RefreshResponse, SignupRequest, SignupResponse, UserProfileResponse,
    UserResponse, UserSummary,
};
use crate::auth::tokens::{TokenKind, UserClaims};
use crate::auth::{AuthError, AuthState, users};
use crate::mailer::Mailer;

/// Create a new, unverified account and queue a verification email.
#[openapi(tag = "Auth")]
#[post("/auth/signup", data = "<payload>")]
pub async fn signup(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    mailer: &State<Mailer>,
    payload: Json<SignupRequest>,
) -> Result<Json<SignupResponse>, AuthError> {
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    if users::email_exists(pool, &email).await? {
        return Err(AuthError::UserAlreadyExists);
    }

    let password_hash = state.passwords.hash_password(password)?;
    let user = users::create_user(pool, &payload, &email, &password_hash).await?;

    let token = state.action_tokens.encode(&email)?;
    let link = format!(
        "{}/api/v1/auth/verify/{token}",
        state.config.public_base_url
    );
    let html = format!(
        "<h1>Verify your email</h1>\
         <p>Please click this <a href=\"{link}\">link</a> to verify your email.</p>"
    );
    mailer.dispatch(vec![email], "Verify your email", html);

    Ok(Json(SignupResponse {
        message: "Account created; check your email to verify your account".into(),
        user: UserResponse::from(user),
    }))
}

/// Mark the account named by a valid action token as verified.
#[openapi(tag = "Auth")]
#[get("/auth/verify/<token>")]
pub async fn verify_account(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    token: &str,
) -> Result<Json<MessageResponse>, AuthError> {
    let claims = state
        .action_tokens
        .decode(token, state.config.action_token_max_age())
        .ok_or(AuthError::InvalidActionToken)?;

    let user = users::get_user_by_email(pool, &claims.email)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    users::mark_verified(pool, user.uid).await?;

    Ok(Json(MessageResponse::new("Account verified successfully")))
}

/// Issue an access/refresh token pair. Unknown email and wrong password
/// produce the same error.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    payload: Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let email = payload.email.trim().to_lowercase();

    let user = users::get_user_by_email(pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let verified = state
        .passwords
        .verify_password(payload.password.trim(), &user.password_hash)?;
    if !verified {
        return Err(AuthError::InvalidCredentials);
    }

    let access_token = state.tokens.issue(
        UserClaims {
            email: user.email.clone(),
            user_uid: user.uid,
            role: Some(user.role.clone()),
        },
        None,
        TokenKind::Access,
    )?;

    // Refresh tokens carry no role; it is re-read at refresh time.
    let refresh_token = state.tokens.issue(
        UserClaims {
            email: user.email.clone(),
            user_uid: user.uid,
            role: None,
        },
        Some(state.config.refresh_token_ttl()),
        TokenKind::Refresh,
    )?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        access_token,
        refresh_token,
        user: UserSummary {
            email: user.email,
            uid: user.uid,
        },
    }))
}

/// Mint a new access token from a still-valid refresh token's embedded
/// user claims.
#[openapi(tag = "Auth")]
#[get("/auth/refresh_token")]
pub async fn refresh_token(
    state: &State<AuthState>,
    token: RefreshToken,
) -> Result<Json<RefreshResponse>, AuthError> {
    let claims = token.0;
    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::InvalidToken);
    }

    let access_token = state
        .tokens
        .issue(claims.user, None, TokenKind::Access)?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Revoke the presented access token's jti.
#[openapi(tag = "Auth")]
#[get("/auth/logout")]
pub async fn logout(
    state: &State<AuthState>,
    token: AccessToken,
) -> Result<Json<MessageResponse>, AuthError> {
    state.blocklist.revoke(&token.0.jti).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Current principal with owned books and reviews.
#[openapi(tag = "Auth")]
#[get("/auth/me")]
pub async fn me(
    pool: &State<PgPool>,
    user: CurrentUser,
) -> Result<Json<UserProfileResponse>, AuthError> {
    user.authorize(MEMBER_ROLES)?;

    let profile = users::load_profile(pool, user.0).await?;
    Ok(Json(profile))
}

/// Queue a welcome email to a list of addresses.
#[openapi(tag = "Auth")]
#[post("/auth/send_mail", data = "<payload>")]
pub async fn send_mail(
    mailer: &State<Mailer>,
    payload: Json<EmailRequest>,
) -> Json<MessageResponse> {
    mailer.dispatch(
        payload.addresses.clone(),
        "Welcome to Bookshelf",
        "<h1>Welcome to Bookshelf</h1>".into(),
    );

    Json(MessageResponse::new("Email queued"))
}

/// Send a password-reset link. Always answers 200 so the endpoint is not
/// an account-existence oracle.
#[openapi(tag = "Auth")]
#[post("/auth/password-reset-request", data = "<payload>")]
pub async fn password_reset_request(
    state: &State<AuthState>,
    mailer: &State<Mailer>,
    payload: Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let email = payload.email.trim().to_lowercase();

    let token = state.action_tokens.encode(&email)?;
    let link = format!(
        "{}/api/v1/auth/password-reset-confirm/{token}",
        state.config.public_base_url
    );
    let html = format!(
        "<h1>Reset your password</h1>\
         <p>Please click this <a href=\"{link}\">link</a> to reset your password.</p>"
    );
    mailer.dispatch(vec![email], "Reset your password", html);

    Ok(Json(MessageResponse::new(
        "Check your email for instructions to reset your password",
    )))
}

/// Replace the password for the account named by a valid action token.
/// The two submitted passwords must match before anything is persisted.
#[openapi(tag = "Auth")]
#[post("/auth/password-reset-confirm/<token>", data = "<payload>")]
pub async fn password_reset_confirm(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    token: &str,
    payload: Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, AuthError> {
    if payload.new_password != payload.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }

    let claims = state
        .action_tokens
        .decode(token, state.config.action_token_max_age())
        .ok_or(AuthError::InvalidActionToken)?;

    let user = users::get_user_by_email(pool, &claims.email)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let password_hash = state.passwords.hash_password(payload.new_password.trim())?;
    users::update_password(pool, user.uid, &password_hash).await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
