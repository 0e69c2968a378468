//! Borrow ledger: the borrow/return lifecycle
//!
//! A book is out exactly while a borrow row exists for it. The ledger never
//! caches; each call reads the stores afresh and leaves the final
//! "is the book free" decision to the store's atomic insert.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Entity},
    models::borrow::{Borrow, BorrowDetails},
    repository::{BookStore, BorrowStore, Repository, UserStore},
};

use super::SharedClock;

#[derive(Clone)]
pub struct BorrowLedger {
    users: Arc<dyn UserStore>,
    books: Arc<dyn BookStore>,
    borrows: Arc<dyn BorrowStore>,
    clock: SharedClock,
}

impl BorrowLedger {
    pub fn new(repository: &Repository, clock: SharedClock) -> Self {
        Self {
            users: repository.users.clone(),
            books: repository.books.clone(),
            borrows: repository.borrows.clone(),
            clock,
        }
    }

    /// Lend a book to a user.
    ///
    /// Fails with `NotFound(User)`, `NotFound(Book)` or
    /// `Conflict(AlreadyBorrowed)`. Conflicts are never retried.
    pub async fn borrow(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Borrow> {
        if self.users.get(user_id).await?.is_none() {
            return Err(AppError::NotFound(Entity::User));
        }
        if self.books.get(book_id).await?.is_none() {
            return Err(AppError::NotFound(Entity::Book));
        }

        let borrow = Borrow {
            user_id,
            book_id,
            borrowed_at: self.clock.utc(),
        };

        match self.borrows.insert(&borrow).await {
            Ok(created) => {
                tracing::info!(%user_id, %book_id, "Book borrowed");
                Ok(created)
            }
            Err(AppError::Conflict(kind)) => {
                tracing::warn!(%user_id, %book_id, "Borrow rejected: {}", kind);
                Err(AppError::Conflict(kind))
            }
            Err(e) => Err(e),
        }
    }

    /// Take back a book lent to exactly this user.
    ///
    /// Returning a book held by someone else is `NotFound(Borrow)`, not a
    /// permission error.
    pub async fn return_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Borrow> {
        let borrow = self
            .borrows
            .delete(user_id, book_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Borrow))?;

        tracing::info!(%user_id, %book_id, "Book returned");
        Ok(borrow)
    }

    /// Every active borrow with its book and borrower
    pub async fn list_active(&self) -> AppResult<Vec<BorrowDetails>> {
        self.borrows.list_active().await
    }
}
