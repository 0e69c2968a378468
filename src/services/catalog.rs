//! Catalog service: books

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Entity},
    models::book::{ensure_not_future, Book, BookQuery, CreateBook, UpdateBook},
    repository::BookStore,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }

    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        ensure_not_future(book.year)?;
        let book = self.books.create(&book).await?;
        tracing::info!(book_id = %book.id, "Book added");
        Ok(book)
    }

    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.books.search(query).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.books
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Book))
    }

    pub async fn update(&self, id: Uuid, changes: UpdateBook) -> AppResult<Book> {
        if let Some(year) = changes.year {
            ensure_not_future(year)?;
        }
        self.books.update(id, &changes).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<Book> {
        let book = self.books.delete(id).await?;
        tracing::info!(book_id = %id, "Book deleted");
        Ok(book)
    }
}
