//! API integration tests
//!
//! The router tests run the full stack against the in-memory store. The
//! `#[ignore]`d tests at the bottom talk to a live server.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use librarium_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

fn test_app() -> Router {
    let config = AppConfig::default();
    let services = Services::new(
        Repository::in_memory(),
        config.auth.clone(),
        Arc::new(mockable::DefaultClock),
    );

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a reader and return (token, user id)
async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn add_book(app: &Router, token: &str, title: &str, author: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/books/add",
        Some(token),
        Some(json!({ "title": title, "author": author, "genre": "Fiction", "year": 1969 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add book failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_answers() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn borrow_conflict_return_and_reborrow() {
    let app = test_app();
    let (alice, alice_id) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_id) = register(&app, "Bob", "bob@example.com").await;
    let book = add_book(&app, &alice, "The Left Hand of Darkness", "Ursula K. Le Guin").await;

    let (status, body) = send(&app, Method::POST, &format!("/books/borrow/{}", book), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], alice_id.as_str());
    assert_eq!(body["book_id"], book.as_str());

    let (status, body) = send(&app, Method::POST, &format!("/books/borrow/{}", book), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyBorrowed");

    let (status, body) = send(&app, Method::POST, &format!("/books/return/{}", book), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], alice_id.as_str());

    let (status, body) = send(&app, Method::POST, &format!("/books/borrow/{}", book), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], bob_id.as_str());
}

#[tokio::test]
async fn returning_a_book_held_by_someone_else_is_not_found() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;
    let (bob, _) = register(&app, "Bob", "bob@example.com").await;
    let book = add_book(&app, &alice, "Dune", "Frank Herbert").await;

    let (status, _) = send(&app, Method::POST, &format!("/books/borrow/{}", book), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, &format!("/books/return/{}", book), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBorrow");

    // Bob still has it
    let (_, borrowed) = send(&app, Method::GET, "/books/borrowed", None, None).await;
    assert_eq!(borrowed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn borrowing_an_unknown_book_is_not_found() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;

    let uri = format!("/books/borrow/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBook");
}

#[tokio::test]
async fn malformed_book_id_is_a_field_error() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(&app, Method::POST, "/books/borrow/not-a-uuid", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["id"][0], "Invalid book ID format");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = test_app();
    let uri = format!("/books/borrow/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided, access denied");

    let (status, _) = send(&app, Method::POST, &uri, Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_a_deleted_user_is_forbidden() {
    let app = test_app();
    let (alice, alice_id) = register(&app, "Alice", "alice@example.com").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{}", alice_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/users/profile", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn borrowed_list_projects_users_without_credentials() {
    let app = test_app();
    let (alice, alice_id) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_id) = register(&app, "Bob", "bob@example.com").await;
    let first = add_book(&app, &alice, "Solaris", "Stanislaw Lem").await;
    let second = add_book(&app, &alice, "Hyperion", "Dan Simmons").await;

    send(&app, Method::POST, &format!("/books/borrow/{}", first), Some(&alice), None).await;
    send(&app, Method::POST, &format!("/books/borrow/{}", second), Some(&bob), None).await;

    let (status, body) = send(&app, Method::GET, "/books/borrowed", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        let user = row["user"].as_object().unwrap();
        assert!(!user.contains_key("password"));
        let expected = if row["book_id"] == first.as_str() {
            (alice_id.as_str(), "Solaris")
        } else {
            (bob_id.as_str(), "Hyperion")
        };
        assert_eq!(row["user_id"], expected.0);
        assert_eq!(user["id"], expected.0);
        assert_eq!(row["book"]["title"], expected.1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_through_the_router_have_one_winner() {
    let app = test_app();
    let (owner, _) = register(&app, "Owner", "owner@example.com").await;
    let book = add_book(&app, &owner, "Foundation", "Isaac Asimov").await;

    let mut tokens = Vec::new();
    for i in 0..4 {
        let (token, _) = register(&app, "Reader", &format!("reader{}@example.com", i)).await;
        tokens.push(token);
    }

    let handles: Vec<_> = tokens
        .into_iter()
        .map(|token| {
            let app = app.clone();
            let uri = format!("/books/borrow/{}", book);
            tokio::spawn(async move { send(&app, Method::POST, &uri, Some(&token), None).await.0 })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 3);
}

#[tokio::test]
async fn registration_and_login_failures() {
    let app = test_app();
    register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": "Other", "email": "alice@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": "Short", "email": "short@example.com", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["password"][0], "Password must be at least 6 characters");

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn users_can_only_modify_their_own_account() {
    let app = test_app();
    let (alice, alice_id) = register(&app, "Alice", "alice@example.com").await;
    let (_, bob_id) = register(&app, "Bob", "bob@example.com").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/users/{}", bob_id),
        Some(&alice),
        Some(json!({ "name": "Mallory" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/users/{}", alice_id),
        Some(&alice),
        Some(json!({ "name": "Alice Liddell" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice Liddell");

    let (status, body) = send(&app, Method::GET, &format!("/users/{}", alice_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice Liddell");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn borrowed_books_cannot_be_deleted() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;
    let book = add_book(&app, &alice, "Kindred", "Octavia E. Butler").await;
    send(&app, Method::POST, &format!("/books/borrow/{}", book), Some(&alice), None).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{}", book), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, Method::POST, &format!("/books/return/{}", book), Some(&alice), None).await;
    let (status, body) = send(&app, Method::DELETE, &format!("/books/{}", book), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");

    let (status, _) = send(&app, Method::GET, &format!("/books/{}", book), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_filters_books() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;
    add_book(&app, &alice, "The Dispossessed", "Ursula K. Le Guin").await;
    add_book(&app, &alice, "Neuromancer", "William Gibson").await;

    let (status, body) = send(&app, Method::GET, "/books/search?author=le%20guin", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "The Dispossessed");

    let (status, _) = send(&app, Method::GET, "/books/search?year=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn books_from_the_future_are_rejected() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/books/add",
        Some(&alice),
        Some(json!({ "title": "Tomorrow", "author": "Nobody", "genre": "Fiction", "year": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["year"][0], "Year cannot be in the future");
}

#[tokio::test]
async fn book_writes_require_a_token() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;
    let book = add_book(&app, &alice, "Ubik", "Philip K. Dick").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/books/add",
        None,
        Some(json!({ "title": "Valis", "author": "Philip K. Dick", "genre": "Fiction", "year": 1981 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/books/{}", book),
        None,
        Some(json!({ "title": "Ubik!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{}", book), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/books/{}", book),
        Some(&alice),
        Some(json!({ "title": "Ubik (revised)" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Ubik (revised)");
}

#[tokio::test]
async fn missing_or_mistyped_fields_are_field_errors() {
    let app = test_app();
    let (alice, _) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/books/add",
        Some(&alice),
        Some(json!({ "title": "T", "author": "A", "genre": "G" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["fields"]["year"][0], "This field is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/books/add",
        Some(&alice),
        Some(json!({ "title": "T", "author": "A", "genre": "G", "year": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["year"][0].as_str().unwrap().starts_with("Invalid value"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": "NoEmail", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"][0], "This field is required");
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let app = test_app();
    let (alice, alice_id) = register(&app, "Alice", "alice@example.com").await;

    for scheme in ["bearer", "BEARER"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/users/profile")
            .header(header::AUTHORIZATION, format!("{} {}", scheme, alice))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["id"], alice_id.as_str());
    }
}

// Live server tests. Run with: cargo test -- --ignored

const BASE_URL: &str = "http://localhost:3000";

#[tokio::test]
#[ignore]
async fn live_health_check() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn live_borrow_requires_token() {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/books/borrow/{}", BASE_URL, uuid::Uuid::new_v4()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn live_borrowed_list_is_an_array() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/books/borrowed", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}
