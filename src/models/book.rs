//! Book model and related types

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record. One record is one lendable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
}

/// Add book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Genre is required"))]
    pub genre: String,
    /// Publication year
    #[serde(alias = "published_year")]
    #[validate(range(min = 1000, message = "Year must be a valid number"))]
    pub year: i32,
}

/// Partial book update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "Genre cannot be empty"))]
    pub genre: Option<String>,
    #[serde(alias = "published_year")]
    #[validate(range(min = 1000, message = "Year must be a valid number"))]
    pub year: Option<i32>,
}

/// Book search filters. Text filters match case-insensitive substrings,
/// `year` matches exactly.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        }

        contains(&book.title, &self.title)
            && contains(&book.author, &self.author)
            && contains(&book.genre, &self.genre)
            && self.year.map(|y| book.published_year == y).unwrap_or(true)
    }
}

/// Reject publication years after the current one
pub fn ensure_not_future(year: i32) -> AppResult<()> {
    if year > Utc::now().year() {
        return Err(AppError::invalid_field("year", "Year cannot be in the future"));
    }
    Ok(())
}
