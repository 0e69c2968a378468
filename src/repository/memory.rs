//! In-memory entity store
//!
//! Used by tests and by the `memory` storage backend. All three store
//! traits share one lock, so the borrow check-and-insert happens under a
//! single write guard, just as the database does it in one statement.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        borrow::{Borrow, BorrowDetails},
        user::{NewUser, User, UserChanges, UserSummary},
    },
};

use super::{BookStore, BorrowStore, UserStore};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    books: HashMap<Uuid, Book>,
    /// Keyed by book id: at most one borrow per book
    borrows: HashMap<Uuid, Borrow>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> AppResult<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut users: Vec<UserSummary> = state.users.values().map(UserSummary::from).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }

        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(AppError::Conflict(ConflictKind::EmailTaken));
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or(AppError::NotFound(Entity::User))?;
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password = hash.clone();
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<User> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Err(AppError::NotFound(Entity::User));
        }
        if state.borrows.values().any(|b| b.user_id == id) {
            return Err(AppError::Conflict(ConflictKind::UserHasBorrows));
        }
        state
            .users
            .remove(&id)
            .ok_or(AppError::NotFound(Entity::User))
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            published_year: book.year,
        };
        self.state
            .write()
            .await
            .books
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or(AppError::NotFound(Entity::Book))?;
        if let Some(title) = &changes.title {
            book.title = title.clone();
        }
        if let Some(author) = &changes.author {
            book.author = author.clone();
        }
        if let Some(genre) = &changes.genre {
            book.genre = genre.clone();
        }
        if let Some(year) = changes.year {
            book.published_year = year;
        }
        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<Book> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(Entity::Book));
        }
        if state.borrows.contains_key(&id) {
            return Err(AppError::Conflict(ConflictKind::BookBorrowed));
        }
        state
            .books
            .remove(&id)
            .ok_or(AppError::NotFound(Entity::Book))
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn insert(&self, borrow: &Borrow) -> AppResult<Borrow> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&borrow.user_id) {
            return Err(AppError::NotFound(Entity::User));
        }
        if !state.books.contains_key(&borrow.book_id) {
            return Err(AppError::NotFound(Entity::Book));
        }
        if state.borrows.contains_key(&borrow.book_id) {
            return Err(AppError::Conflict(ConflictKind::AlreadyBorrowed));
        }
        state.borrows.insert(borrow.book_id, borrow.clone());
        Ok(borrow.clone())
    }

    async fn delete(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Option<Borrow>> {
        let mut state = self.state.write().await;
        let held_by_user = state
            .borrows
            .get(&book_id)
            .is_some_and(|b| b.user_id == user_id);
        if !held_by_user {
            return Ok(None);
        }
        Ok(state.borrows.remove(&book_id))
    }

    async fn list_active(&self) -> AppResult<Vec<BorrowDetails>> {
        let state = self.state.read().await;
        let mut details = state
            .borrows
            .values()
            .map(|borrow| -> AppResult<BorrowDetails> {
                let book = state.books.get(&borrow.book_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("borrow references missing book {}", borrow.book_id))
                })?;
                let user = state.users.get(&borrow.user_id).map(UserSummary::from).ok_or_else(|| {
                    AppError::Internal(format!("borrow references missing user {}", borrow.user_id))
                })?;
                Ok(BorrowDetails::new(borrow.clone(), book, user))
            })
            .collect::<AppResult<Vec<_>>>()?;
        details.sort_by(|a, b| {
            a.borrowed_at
                .cmp(&b.borrowed_at)
                .then(a.book_id.cmp(&b.book_id))
        });
        Ok(details)
    }
}
