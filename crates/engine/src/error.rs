//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Unauthorized`] thrown when the caller is unknown or does not own the
//!   resource it is touching.
//! - [`KeyNotFound`] thrown when an account, transaction, budget or user is
//!   not found.
//! - [`InvalidArgument`] thrown for malformed input (non-positive amount,
//!   unknown kind, empty category).
//! - [`InvalidState`] thrown when stored data cannot be evaluated (zero budget
//!   ceiling, ambiguous budgets).
//! - [`Conflict`] thrown when a transaction changed under a concurrent writer.
//! - [`Transport`] thrown when a notification could not be delivered.
//!
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidArgument`]: EngineError::InvalidArgument
//!  [`InvalidState`]: EngineError::InvalidState
//!  [`Conflict`]: EngineError::Conflict
//!  [`Transport`]: EngineError::Transport
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Notification failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Transport(a), Self::Transport(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
