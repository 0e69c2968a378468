//! Borrow model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{book::Book, user::UserSummary};

/// Active borrow. Its existence is what marks a book as checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
}

/// Active borrow joined with its book and borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowDetails {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub book: Book,
    pub user: UserSummary,
}

impl BorrowDetails {
    pub fn new(borrow: Borrow, book: Book, user: UserSummary) -> Self {
        Self {
            user_id: borrow.user_id,
            book_id: borrow.book_id,
            borrowed_at: borrow.borrowed_at,
            book,
            user,
        }
    }
}
