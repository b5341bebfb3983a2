use rocket::serde::json::Json;
use rocket::{delete, get, post};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::guards::{CurrentUser, MEMBER_ROLES};
use crate::auth::responses::MessageResponse;
use crate::db::BookshelfDb;
use crate::error::ApiError;
use crate::models::{ApiResponse, Review};

const REVIEW_COLUMNS: &str = "uid, rating, review_text, user_uid, book_uid, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReviewCreate {
    /// Star rating between 1 and 5.
    pub rating: i32,
    pub review_text: String,
}

/// List every review, newest first.
#[openapi(tag = "Reviews")]
#[get("/reviews")]
pub async fn list_reviews(
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let reviews: Vec<Review> = sqlx::query_as(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC"
    ))
    .fetch_all(&mut **db)
    .await?;

    Ok(Json(ApiResponse::new(reviews)))
}

/// Fetch one review.
#[openapi(tag = "Reviews")]
#[get("/reviews/<review_uid>")]
pub async fn get_review(
    review_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Review>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let review: Review = sqlx::query_as(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE uid = $1"
    ))
    .bind(review_uid)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Review '{review_uid}' not found")))?;

    Ok(Json(review))
}

/// Attach a review by the current user to a book.
#[openapi(tag = "Reviews")]
#[post("/books/<book_uid>/reviews", data = "<payload>")]
pub async fn add_review_to_book(
    book_uid: Uuid,
    payload: Json<ReviewCreate>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Review>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }

    let book_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE uid = $1)")
            .bind(book_uid)
            .fetch_one(&mut **db)
            .await?;
    if !book_exists {
        return Err(ApiError::NotFound(format!("Book '{book_uid}' not found")));
    }

    let review: Review = sqlx::query_as(&format!(
        "INSERT INTO reviews (rating, review_text, user_uid, book_uid) \
         VALUES ($1, $2, $3, $4) RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(payload.rating)
    .bind(&payload.review_text)
    .bind(user.0.uid)
    .bind(book_uid)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(review))
}

/// Delete a review. Only its author may remove it.
#[openapi(tag = "Reviews")]
#[delete("/reviews/<review_uid>")]
pub async fn delete_review(
    review_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let review: Review = sqlx::query_as(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE uid = $1"
    ))
    .bind(review_uid)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Review '{review_uid}' not found")))?;

    if review.user_uid != Some(user.0.uid) {
        return Err(ApiError::Auth(AuthError::InsufficientPermission));
    }

    sqlx::query("DELETE FROM reviews WHERE uid = $1")
        .bind(review_uid)
        .execute(&mut **db)
        .await?;

    Ok(Json(MessageResponse::new("Successfully deleted review")))
}
