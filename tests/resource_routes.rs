use bookshelf_api::auth::{AuthConfig, AuthState, routes as auth_routes};
use bookshelf_api::mailer::Mailer;
use bookshelf_api::routes::{books, reviews, tags};
use bookshelf_api::test_support::{TestDatabase, TestInfraError, TestRedis, TestRocketBuilder};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::{Value, json};
use uuid::Uuid;

fn test_config(redis_url: &str) -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".into(),
        access_token_ttl_secs: 3600,
        refresh_token_ttl_days: 2,
        action_token_salt: "email-actions".into(),
        action_token_max_age_secs: 86400,
        redis_url: redis_url.into(),
        blocklist_ttl_secs: 3600,
        public_base_url: "http://localhost:8000".into(),
    }
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

/// Sign up, verify and log in one account, returning its access token.
async fn onboard(client: &Client, state: &AuthState, email: &str, username: &str) -> String {
    let response = client
        .post("/api/v1/auth/signup")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "reading-list",
            "firstname": "Test",
            "lastname": "Reader",
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let token = state
        .action_tokens
        .encode(email)
        .expect("action token encodes");
    let response = client
        .get(format!("/api/v1/auth/verify/{token}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .post("/api/v1/auth/login")
        .json(&json!({"email": email, "password": "reading-list"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    body["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

#[tokio::test]
async fn resource_routes_enforce_ownership_and_roles() {
    let test_db = match TestDatabase::new().await {
        Ok(db) => db,
        Err(TestInfraError::Container(err)) => {
            eprintln!("skipping resource routes test: container runtime unavailable: {err}");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };
    let test_redis = match TestRedis::new().await {
        Ok(redis) => redis,
        Err(TestInfraError::Container(err)) => {
            eprintln!("skipping resource routes test: container runtime unavailable: {err}");
            return;
        }
        Err(err) => panic!("failed to provision test redis: {err:?}"),
    };

    let state = AuthState::initialize(test_config(test_redis.url()))
        .await
        .expect("auth state initializes");

    let client = TestRocketBuilder::new()
        .attach_db(test_db.url())
        .mount_api_routes(routes![
            auth_routes::signup,
            auth_routes::verify_account,
            auth_routes::login,
            books::create_book,
            books::get_book,
            tags::list_tags,
            tags::create_tag,
            tags::add_tags_to_book,
            tags::update_tag,
            tags::delete_tag,
            reviews::add_review_to_book,
            reviews::delete_review,
        ])
        .manage_pg_pool(test_db.pool_clone())
        .manage_auth_state(state.clone())
        .manage_mailer(Mailer::disabled())
        .async_client()
        .await;

    let author_token = onboard(&client, &state, "author@example.com", "author").await;
    let member_token = onboard(&client, &state, "member@example.com", "member").await;

    // Author submits a book.
    let response = client
        .post("/api/v1/books")
        .header(bearer(&author_token))
        .json(&json!({
            "title": "The Once and Future King",
            "author": "T. H. White",
            "publisher": "Collins",
            "published_date": "1958-05-01",
            "page_count": 639,
            "language": "en",
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    let book_uid = body["uid"].as_str().expect("book uid").to_string();

    // Out-of-range ratings and unknown books are rejected.
    let response = client
        .post(format!("/api/v1/books/{book_uid}/reviews"))
        .header(bearer(&author_token))
        .json(&json!({"rating": 6, "review_text": "too enthusiastic"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post(format!("/api/v1/books/{}/reviews", Uuid::new_v4()))
        .header(bearer(&author_token))
        .json(&json!({"rating": 4, "review_text": "ghost book"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .post(format!("/api/v1/books/{book_uid}/reviews"))
        .header(bearer(&author_token))
        .json(&json!({"rating": 5, "review_text": "a classic"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    let review_uid = body["uid"].as_str().expect("review uid").to_string();

    // Only the review's author may delete it.
    let response = client
        .delete(format!("/api/v1/reviews/{review_uid}"))
        .header(bearer(&member_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .delete(format!("/api/v1/reviews/{review_uid}"))
        .header(bearer(&author_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    // Tag names are unique.
    let response = client
        .post("/api/v1/tags")
        .header(bearer(&member_token))
        .json(&json!({"name": "fantasy"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    let tag_uid = body["uid"].as_str().expect("tag uid").to_string();

    let response = client
        .post("/api/v1/tags")
        .header(bearer(&member_token))
        .json(&json!({"name": "fantasy"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    // A failing attach leaves nothing behind.
    let response = client
        .post(format!("/api/v1/books/{book_uid}/tags"))
        .header(bearer(&member_token))
        .json(&json!({"tags": [{"name": "epic"}, {"name": "x".repeat(100)}]}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);

    let response = client
        .get(format!("/api/v1/books/{book_uid}"))
        .header(bearer(&member_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(body["tags"], json!([]));

    let response = client
        .post(format!("/api/v1/books/{book_uid}/tags"))
        .header(bearer(&member_token))
        .json(&json!({"tags": [{"name": "fantasy"}, {"name": "classic"}]}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/v1/books/{book_uid}"))
        .header(bearer(&member_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(body["tags"].as_array().map(Vec::len), Some(2));

    // Renaming and deleting tags is for administrators only.
    let response = client
        .put(format!("/api/v1/tags/{tag_uid}"))
        .header(bearer(&member_token))
        .json(&json!({"name": "high-fantasy"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .delete(format!("/api/v1/tags/{tag_uid}"))
        .header(bearer(&member_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Promote the member; the role is re-read from the database per request.
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = $1")
        .bind("member@example.com")
        .execute(test_db.pool())
        .await
        .expect("promotion succeeds");

    let response = client
        .put(format!("/api/v1/tags/{tag_uid}"))
        .header(bearer(&member_token))
        .json(&json!({"name": "high-fantasy"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(body["name"], "high-fantasy");

    let response = client
        .delete(format!("/api/v1/tags/{tag_uid}"))
        .header(bearer(&member_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    test_db.close().await.expect("failed to drop test database");
}
