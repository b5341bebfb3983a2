use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::guards::{CurrentUser, MEMBER_ROLES};
use crate::db::BookshelfDb;
use crate::error::ApiError;
use crate::models::{ApiResponse, Book, BookDetail, Review, Tag};

const BOOK_COLUMNS: &str = "uid, title, author, publisher, published_date, page_count, language, \
                            user_uid, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookCreate {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
}

/// List every book, newest first.
#[openapi(tag = "Books")]
#[get("/books")]
pub async fn list_books(
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Book>>>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let books: Vec<Book> = sqlx::query_as(&format!(
        "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC"
    ))
    .fetch_all(&mut **db)
    .await?;

    Ok(Json(ApiResponse::new(books)))
}

/// List the books submitted by one user.
#[openapi(tag = "Books")]
#[get("/books/user/<user_uid>")]
pub async fn list_user_books(
    user_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Book>>>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let books: Vec<Book> = sqlx::query_as(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE user_uid = $1 ORDER BY created_at DESC"
    ))
    .bind(user_uid)
    .fetch_all(&mut **db)
    .await?;

    Ok(Json(ApiResponse::new(books)))
}

/// Create a book owned by the current user.
#[openapi(tag = "Books")]
#[post("/books", data = "<payload>")]
pub async fn create_book(
    payload: Json<BookCreate>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Book>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let book: Book = sqlx::query_as(&format!(
        "INSERT INTO books (title, author, publisher, published_date, page_count, language, user_uid) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOK_COLUMNS}"
    ))
    .bind(&payload.title)
    .bind(&payload.author)
    .bind(&payload.publisher)
    .bind(payload.published_date)
    .bind(payload.page_count)
    .bind(&payload.language)
    .bind(user.0.uid)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(book))
}

/// Fetch one book together with its tags and reviews.
#[openapi(tag = "Books")]
#[get("/books/<book_uid>")]
pub async fn get_book(
    book_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<BookDetail>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let book: Book = sqlx::query_as(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE uid = $1"
    ))
    .bind(book_uid)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Book '{book_uid}' not found")))?;

    let tags: Vec<Tag> = sqlx::query_as(
        "SELECT t.uid, t.name, t.created_at FROM tags t \
         JOIN book_tags bt ON bt.tag_uid = t.uid \
         WHERE bt.book_uid = $1 ORDER BY t.name",
    )
    .bind(book_uid)
    .fetch_all(&mut **db)
    .await?;

    let reviews: Vec<Review> = sqlx::query_as(
        "SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at \
         FROM reviews WHERE book_uid = $1 ORDER BY created_at DESC",
    )
    .bind(book_uid)
    .fetch_all(&mut **db)
    .await?;

    Ok(Json(BookDetail {
        book,
        tags,
        reviews,
    }))
}

/// Update any subset of a book's fields.
#[openapi(tag = "Books")]
#[patch("/books/<book_uid>", data = "<payload>")]
pub async fn update_book(
    book_uid: Uuid,
    payload: Json<BookUpdate>,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<Book>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let book: Book = sqlx::query_as(&format!(
        "UPDATE books SET \
             title = COALESCE($2, title), \
             author = COALESCE($3, author), \
             publisher = COALESCE($4, publisher), \
             published_date = COALESCE($5, published_date), \
             page_count = COALESCE($6, page_count), \
             language = COALESCE($7, language), \
             updated_at = now() \
         WHERE uid = $1 RETURNING {BOOK_COLUMNS}"
    ))
    .bind(book_uid)
    .bind(&payload.title)
    .bind(&payload.author)
    .bind(&payload.publisher)
    .bind(payload.published_date)
    .bind(payload.page_count)
    .bind(&payload.language)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Book '{book_uid}' not found")))?;

    Ok(Json(book))
}

/// Delete a book.
#[openapi(tag = "Books")]
#[delete("/books/<book_uid>")]
pub async fn delete_book(
    book_uid: Uuid,
    mut db: Connection<BookshelfDb>,
    user: CurrentUser,
) -> Result<Json<crate::auth::responses::MessageResponse>, ApiError> {
    user.authorize(MEMBER_ROLES)?;

    let result = sqlx::query("DELETE FROM books WHERE uid = $1")
        .bind(book_uid)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Book '{book_uid}' not found")));
    }

    Ok(Json(crate::auth::responses::MessageResponse::new(
        "Successfully deleted book",
    )))
}
