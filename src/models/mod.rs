//! Data models for Librarium

pub mod book;
pub mod borrow;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery};
pub use borrow::{Borrow, BorrowDetails};
pub use user::{User, UserSummary};
