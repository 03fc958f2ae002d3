//! Signup and signin failures.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    /// A signup field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Signup with an email that already has an account.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Signin with an email that has no account.
    #[error("user not found")]
    UserNotFound,

    /// Signin with the wrong password.
    #[error("incorrect password")]
    InvalidCredentials,

    #[error("password hashing failed")]
    PasswordHash,

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
