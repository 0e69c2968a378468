//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

use super::{map_constraint_violation, BookStore};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, published_year FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genre, published_year
            FROM books
            WHERE ($1::TEXT IS NULL OR title ILIKE $1 ESCAPE '\')
              AND ($2::TEXT IS NULL OR author ILIKE $2 ESCAPE '\')
              AND ($3::TEXT IS NULL OR genre ILIKE $3 ESCAPE '\')
              AND ($4::INTEGER IS NULL OR published_year = $4)
            ORDER BY title, id
            "#,
        )
        .bind(query.title.as_deref().map(like_pattern))
        .bind(query.author.as_deref().map(like_pattern))
        .bind(query.genre.as_deref().map(like_pattern))
        .bind(query.year)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, genre, published_year)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, author, genre, published_year
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                genre = COALESCE($4, genre),
                published_year = COALESCE($5, published_year)
            WHERE id = $1
            RETURNING id, title, author, genre, published_year
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.genre)
        .bind(changes.year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound(Entity::Book))
    }

    async fn delete(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "DELETE FROM books WHERE id = $1 RETURNING id, title, author, genre, published_year",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            map_constraint_violation(err, |constraint| {
                (constraint == "borrows_book_id_fkey")
                    .then_some(AppError::Conflict(ConflictKind::BookBorrowed))
            })
        })?
        .ok_or(AppError::NotFound(Entity::Book))
    }
}
