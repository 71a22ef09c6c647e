//! Storage Layer
//!
//! In-memory data access for exams, attempts and the evidence index.

mod models;
mod repository;

pub use models::{AttemptRecord, ExamRecord, Question};
pub use repository::Repository;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Conflict: {0}")]
    Conflict(String),
}
