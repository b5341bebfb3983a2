//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (books, tags,
//! reviews, health) and exposes typed Rocket handlers annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically. Session endpoints live in [`crate::auth::routes`].

pub mod books;
pub mod health;
pub mod reviews;
pub mod tags;
