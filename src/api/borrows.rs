//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrow::{Borrow, BorrowDetails},
    AppState,
};

use super::{books::INVALID_BOOK_ID, parse_id, AuthenticatedUser};

/// Borrow a book for the authenticated user
#[utoipa::path(
    post,
    path = "/books/borrow/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 201, description = "Book borrowed", body = Borrow),
        (status = 400, description = "Malformed book ID", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "User no longer exists", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is already borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    let book_id = parse_id(&id, INVALID_BOOK_ID)?;
    let borrow = state.services.borrows.borrow(principal.id, book_id).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Return a book borrowed by the authenticated user
#[utoipa::path(
    post,
    path = "/books/return/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 200, description = "Book returned", body = Borrow),
        (status = 400, description = "Malformed book ID", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "No such borrow for this user", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Borrow>> {
    let book_id = parse_id(&id, INVALID_BOOK_ID)?;
    let borrow = state.services.borrows.return_book(principal.id, book_id).await?;
    Ok(Json(borrow))
}

/// List every book currently out
#[utoipa::path(
    get,
    path = "/books/borrowed",
    tag = "borrows",
    responses(
        (status = 200, description = "Active borrows", body = Vec<BorrowDetails>)
    )
)]
pub async fn list_borrowed(State(state): State<AppState>) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrowed = state.services.borrows.list_active().await?;
    Ok(Json(borrowed))
}
