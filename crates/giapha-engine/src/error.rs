//! Error types for giapha-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GiaphaError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Family tree not found: {0}")]
    TreeNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),
}

pub type Result<T> = std::result::Result<T, GiaphaError>;
