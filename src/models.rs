use chrono::{DateTime, NaiveDate, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping list and detail payloads.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ===== Principals =====

/// Principal row. Never serialized directly; see
/// [`crate::auth::responses::UserResponse`] for the outward shape.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    pub is_verified: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ===== Books =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Book {
    pub uid: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
    pub user_uid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book together with its tags and reviews (nested representation).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub tags: Vec<Tag>,
    pub reviews: Vec<Review>,
}

// ===== Tags =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Tag {
    pub uid: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ===== Reviews =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Review {
    pub uid: Uuid,
    pub rating: i32,
    pub review_text: String,
    pub user_uid: Option<Uuid>,
    pub book_uid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
