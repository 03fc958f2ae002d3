//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body has the shape `{"success": false, "status": <code>, "message": "<text>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart or favorite operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No usable credentials on the request.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credentials were presented but rejected.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        let internal = || (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned());
        let bad_request = |msg: String| (StatusCode::BAD_REQUEST, msg);
        let not_found = |msg: &str| (StatusCode::NOT_FOUND, msg.to_owned());

        match self {
            Self::Database(_) | Self::Internal(_) => internal(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => bad_request("Invalid email address".to_owned()),
                AuthError::MissingField(_) | AuthError::WeakPassword(_) => {
                    bad_request(err.to_string())
                }
                AuthError::UserAlreadyExists => {
                    (StatusCode::CONFLICT, "Email is already in use".to_owned())
                }
                AuthError::UserNotFound => not_found("User not found"),
                AuthError::InvalidCredentials => {
                    (StatusCode::FORBIDDEN, "Incorrect password".to_owned())
                }
                AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    internal()
                }
            },
            Self::Cart(err) => match err {
                CartServiceError::UserNotFound => not_found("User not found"),
                CartServiceError::ProductNotFound(_) => not_found("Product not found"),
                CartServiceError::ProductNotInCart(_) => {
                    not_found("Product not found in the user's cart")
                }
                CartServiceError::InvalidQuantity(_) | CartServiceError::QuantityOverflow(_) => {
                    bad_request(err.to_string())
                }
                CartServiceError::Repository(_) => internal(),
            },
            Self::Order(err) => match err {
                OrderError::UserNotFound => not_found("User not found"),
                OrderError::IncompleteAddress(_)
                | OrderError::EmptyCart
                | OrderError::StaleProduct(_)
                | OrderError::TotalOverflow
                | OrderError::InvalidIdempotencyKey => bad_request(err.to_string()),
                OrderError::Repository(_) => internal(),
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidIdentifier(_) => bad_request("Invalid Product ID".to_owned()),
                CatalogError::ProductNotFound => not_found("Product not found"),
                CatalogError::InvalidProduct { .. } | CatalogError::InvalidFilter(_) => {
                    bad_request(err.to_string())
                }
                CatalogError::Repository(_) => internal(),
            },
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::InvalidToken(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => bad_request(msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_owned(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "status": status.as_u16(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
