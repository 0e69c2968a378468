//! Borrows repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::{
        book::Book,
        borrow::{Borrow, BorrowDetails},
        user::UserSummary,
    },
};

use super::{map_constraint_violation, BorrowStore};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowStore for BorrowsRepository {
    async fn insert(&self, borrow: &Borrow) -> AppResult<Borrow> {
        // Single statement: the unique constraint on book_id decides the
        // race, the foreign keys catch a user or book deleted meanwhile.
        sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (user_id, book_id, borrowed_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, book_id, borrowed_at
            "#,
        )
        .bind(borrow.user_id)
        .bind(borrow.book_id)
        .bind(borrow.borrowed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            map_constraint_violation(err, |constraint| match constraint {
                "borrows_book_id_key" | "borrows_pkey" => {
                    Some(AppError::Conflict(ConflictKind::AlreadyBorrowed))
                }
                "borrows_user_id_fkey" => Some(AppError::NotFound(Entity::User)),
                "borrows_book_id_fkey" => Some(AppError::NotFound(Entity::Book)),
                _ => None,
            })
        })
    }

    async fn delete(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Option<Borrow>> {
        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            DELETE FROM borrows
            WHERE user_id = $1 AND book_id = $2
            RETURNING user_id, book_id, borrowed_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(borrow)
    }

    async fn list_active(&self) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT br.user_id, br.book_id, br.borrowed_at,
                   b.title, b.author, b.genre, b.published_year,
                   u.name AS user_name, u.email AS user_email
            FROM borrows br
            JOIN books b ON b.id = br.book_id
            JOIN users u ON u.id = br.user_id
            ORDER BY br.borrowed_at, br.book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let details = rows
            .into_iter()
            .map(|row| {
                let user_id: Uuid = row.get("user_id");
                let book_id: Uuid = row.get("book_id");
                let borrowed_at: DateTime<Utc> = row.get("borrowed_at");

                BorrowDetails {
                    user_id,
                    book_id,
                    borrowed_at,
                    book: Book {
                        id: book_id,
                        title: row.get("title"),
                        author: row.get("author"),
                        genre: row.get("genre"),
                        published_year: row.get("published_year"),
                    },
                    user: UserSummary {
                        id: user_id,
                        name: row.get("user_name"),
                        email: row.get("user_email"),
                    },
                }
            })
            .collect();

        Ok(details)
    }
}
