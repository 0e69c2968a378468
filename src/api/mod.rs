//! API handlers for Librarium REST endpoints

pub mod auth;
pub mod books;
pub mod borrows;
pub mod health;
pub mod openapi;
pub mod users;

use std::time::Duration;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AuthFailure},
    models::user::UserSummary,
    AppState,
};

/// Extractor for the authenticated principal behind a bearer token
pub struct AuthenticatedUser(pub UserSummary);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthenticated(AuthFailure::MissingToken))?;

        // The scheme name is case-insensitive
        let token = auth_header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .ok_or(AppError::Unauthenticated(AuthFailure::InvalidToken))?;

        if token.is_empty() {
            return Err(AppError::Unauthenticated(AuthFailure::MissingToken));
        }

        let principal = state.services.auth.authenticate(token).await?;
        Ok(AuthenticatedUser(principal))
    }
}

/// JSON body extractor that runs `validator` rules before the handler sees it
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(err) => {
                    let detail = err.body_text();
                    match data_error_field(&detail) {
                        Some((field, message)) => AppError::invalid_field(&field, &message),
                        None => AppError::BadRequest(detail),
                    }
                }
                other => AppError::BadRequest(other.body_text()),
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Pull the offending field out of a JSON data error.
///
/// Missing fields come as ``missing field `name` ``; type errors are
/// prefixed with the field path, e.g. `year: invalid type: ...`.
fn data_error_field(detail: &str) -> Option<(String, String)> {
    let detail = detail
        .split_once("target type: ")
        .map_or(detail, |(_, rest)| rest);

    if let Some((_, rest)) = detail.split_once("missing field `") {
        let field = rest.split('`').next().filter(|f| !f.is_empty())?;
        return Some((field.to_string(), "This field is required".to_string()));
    }

    let (path, reason) = detail.split_once(": ")?;
    let field = path.split(['.', '[']).next().unwrap_or(path);
    let is_field_name = !field.is_empty()
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_field_name {
        return None;
    }

    let reason = reason.split(" at line ").next().unwrap_or(reason);
    Some((field.to_string(), format!("Invalid value: {}", reason)))
}

/// Plain message response
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Parse a path identifier, reporting a field error on the `id` field
pub(crate) fn parse_id(raw: &str, message: &str) -> Result<Uuid, AppError> {
    raw.parse().map_err(|_| AppError::invalid_field("id", message))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Users and authentication
        .route("/users", get(users::list_users))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/profile", get(auth::profile))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Books (catalog)
        .route("/books/add", post(books::add_book))
        .route("/books/search", get(books::search_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrows
        .route("/books/borrowed", get(borrows::list_borrowed))
        .route("/books/borrow/:id", post(borrows::borrow_book))
        .route("/books/return/:id", post(borrows::return_book))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
