//! Registration, login and profile endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{LoginUser, RegisterUser, UserSummary},
    AppState,
};

use super::{AuthenticatedUser, ValidatedJson};

/// Token issued on registration or login
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    /// JWT bearer token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserSummary,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (token, user) = state.services.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created".to_string(),
            token,
            token_type: "Bearer".to_string(),
            expires_in: state.services.auth.token_ttl_secs(),
            user: user.into(),
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "auth",
    request_body = LoginUser,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginUser>,
) -> AppResult<Json<AuthResponse>> {
    let (token, user) = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.services.auth.token_ttl_secs(),
        user: user.into(),
    }))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The user's profile", body = UserSummary),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "User no longer exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn profile(AuthenticatedUser(principal): AuthenticatedUser) -> Json<UserSummary> {
    Json(principal)
}
