//! Principal persistence helpers shared by guards and session routes.

use rocket_db_pools::sqlx::{self, PgPool};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::auth::responses::{SignupRequest, UserProfileResponse, UserResponse};
use crate::models::{Book, Review, User};

const USER_COLUMNS: &str = "uid, username, email, firstname, lastname, role, is_verified, \
                            password_hash, created_at, updated_at";

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> AuthResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn email_exists(pool: &PgPool, email: &str) -> AuthResult<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
            .bind(email)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a new, unverified principal with the default role.
pub async fn create_user(
    pool: &PgPool,
    signup: &SignupRequest,
    email: &str,
    password_hash: &str,
) -> AuthResult<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, firstname, lastname, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
    ))
    .bind(signup.username.trim())
    .bind(email)
    .bind(signup.firstname.trim())
    .bind(signup.lastname.trim())
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn mark_verified(pool: &PgPool, user_uid: Uuid) -> AuthResult<()> {
    sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = now() WHERE uid = $1")
        .bind(user_uid)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_password(pool: &PgPool, user_uid: Uuid, password_hash: &str) -> AuthResult<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE uid = $1")
        .bind(user_uid)
        .bind(password_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// Assemble the nested profile representation: the principal plus the books
/// and reviews it owns.
pub async fn load_profile(pool: &PgPool, user: User) -> AuthResult<UserProfileResponse> {
    let books = sqlx::query_as::<_, Book>(
        "SELECT uid, title, author, publisher, published_date, page_count, language, user_uid, \
                created_at, updated_at \
         FROM books WHERE user_uid = $1 ORDER BY created_at DESC",
    )
    .bind(user.uid)
    .fetch_all(pool)
    .await?;

    let reviews = sqlx::query_as::<_, Review>(
        "SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at \
         FROM reviews WHERE user_uid = $1 ORDER BY created_at DESC",
    )
    .bind(user.uid)
    .fetch_all(pool)
    .await?;

    Ok(UserProfileResponse {
        user: UserResponse::from(user),
        books,
        reviews,
    })
}
