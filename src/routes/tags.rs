use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::sqlx::Acquire;
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::guards::{ADMIN_ROLES, CurrentUser, MEMBER_ROLES};
use crate::auth::responses::MessageResponse;
use crate::db::BookshelfDb;
use crate::error::ApiError;
use crate::models::{ApiResponse, Book, Tag};

const TAG_COLUMNS: &str = "uid, name, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TagCreate {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TagList {
    pub tags: Vec<TagCreate>,
}

/// List every tag alphabetically.
#[openapi(tag = "Tags")]
#[get("/tags")]
pub async fn list_tags(
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Tag>>>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let tags: Vec<Tag> =
        sqlx::query_as(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"))
            .fetch_all(&mut **db)
            .await?;

    Ok(Json(ApiResponse::new(tags)))
}

/// Create a new tag. Names are unique.
#[openapi(tag = "Tags")]
#[post("/tags", data = "<payload>")]
pub async fn create_tag(
    payload: Json<TagCreate>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Tag>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tags WHERE name = $1)")
        .bind(&payload.name)
        .fetch_one(&mut **db)
        .await?;
    if exists {
        return Err(ApiError::Conflict(format!(
            "Tag '{}' already exists",
            payload.name
        )));
    }

    let tag: Tag = sqlx::query_as(&format!(
        "INSERT INTO tags (name) VALUES ($1) RETURNING {TAG_COLUMNS}"
    ))
    .bind(&payload.name)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(tag))
}

/// Attach a list of tags to a book, creating tags that do not exist yet.
#[openapi(tag = "Tags")]
#[post("/books/<book_uid>/tags", data = "<payload>")]
pub async fn add_tags_to_book(
    book_uid: Uuid,
    payload: Json<TagList>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Book>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let book: Book = sqlx::query_as(
        "SELECT uid, title, author, publisher, published_date, page_count, language, \
         user_uid, created_at, updated_at FROM books WHERE uid = $1",
    )
    .bind(book_uid)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Book '{book_uid}' not found")))?;

    // All tags attach or none do.
    let mut tx = (&mut **db).begin().await?;

    for item in &payload.tags {
        let tag: Tag = sqlx::query_as(&format!(
            "INSERT INTO tags (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(&item.name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_tags (book_uid, tag_uid) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(book_uid)
        .bind(tag.uid)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(book))
}

/// Rename a tag. The change is visible on every tagged book, so this is
/// restricted to administrators like deletion.
#[openapi(tag = "Tags")]
#[put("/tags/<tag_uid>", data = "<payload>")]
pub async fn update_tag(
    tag_uid: Uuid,
    payload: Json<TagCreate>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Tag>, ApiError> {
    user.authorize(ADMIN_ROLES)?;

    let tag: Tag = sqlx::query_as(&format!(
        "UPDATE tags SET name = $2 WHERE uid = $1 RETURNING {TAG_COLUMNS}"
    ))
    .bind(tag_uid)
    .bind(&payload.name)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Tag '{tag_uid}' not found")))?;

    Ok(Json(tag))
}

/// Delete a tag everywhere. Restricted to administrators.
#[openapi(tag = "Tags")]
#[delete("/tags/<tag_uid>")]
pub async fn delete_tag(
    tag_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    user.authorize(ADMIN_ROLES)?;

    let result = sqlx::query("DELETE FROM tags WHERE uid = $1")
        .bind(tag_uid)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Tag '{tag_uid}' not found")));
    }

    Ok(Json(MessageResponse::new("Successfully deleted tag")))
}
