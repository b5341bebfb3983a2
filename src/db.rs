use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("bookshelf_db")]
pub struct BookshelfDb(sqlx::PgPool);
