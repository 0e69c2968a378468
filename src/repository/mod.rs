//! Repository layer: entity store contracts and their implementations
//!
//! Services only see the [`UserStore`], [`BookStore`] and [`BorrowStore`]
//! traits. Every operation is atomic on its own; the borrow insert is a
//! conditional write that the store itself guards, so two servers sharing
//! one database cannot both lend the same book.

pub mod books;
pub mod borrows;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        borrow::{Borrow, BorrowDetails},
        user::{NewUser, User, UserChanges, UserSummary},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn list(&self) -> AppResult<Vec<UserSummary>>;

    /// Fails with `Conflict(EmailTaken)` when the email is already registered
    async fn create(&self, user: &NewUser) -> AppResult<User>;

    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User>;

    /// Fails with `Conflict(UserHasBorrows)` while the user holds books
    async fn delete(&self, id: Uuid) -> AppResult<User>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book>;

    /// Fails with `Conflict(BookBorrowed)` while the book is out
    async fn delete(&self, id: Uuid) -> AppResult<Book>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowStore: Send + Sync {
    /// Insert a borrow in one atomic step.
    ///
    /// Fails with `Conflict(AlreadyBorrowed)` if any borrow exists for the
    /// book, and with `NotFound(User)` / `NotFound(Book)` if either side
    /// disappeared before the write.
    async fn insert(&self, borrow: &Borrow) -> AppResult<Borrow>;

    /// Delete the borrow keyed by exactly `(user_id, book_id)`
    async fn delete(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Option<Borrow>>;

    /// All active borrows, read in one snapshot
    async fn list_active(&self) -> AppResult<Vec<BorrowDetails>>;
}

/// Entity stores handed to the services
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UserStore>,
    pub books: Arc<dyn BookStore>,
    pub borrows: Arc<dyn BorrowStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            borrows: Arc::new(borrows::BorrowsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            pool: None,
            users: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            borrows: Arc::new(store),
        }
    }

    /// Assemble a repository from arbitrary store implementations
    pub fn from_stores(
        users: Arc<dyn UserStore>,
        books: Arc<dyn BookStore>,
        borrows: Arc<dyn BorrowStore>,
    ) -> Self {
        Self {
            pool: None,
            users,
            books,
            borrows,
        }
    }

    /// Check that the backing database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Translate a constraint violation into a domain error.
///
/// `map` receives the violated constraint name; anything it does not
/// recognise stays a database error.
pub(crate) fn map_constraint_violation(
    err: sqlx::Error,
    map: impl Fn(&str) -> Option<AppError>,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = db_err.constraint().and_then(&map) {
            return mapped;
        }
    }
    AppError::Database(err)
}
