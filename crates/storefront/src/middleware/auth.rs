//! Authentication extractor.
//!
//! Resolves the `Authorization: Bearer <token>` header to a user id.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use shopfront_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Message for a request with no usable credentials.
pub const UNAUTHENTICATED_MESSAGE: &str = "You are not authenticated!";
/// Message for a token that failed verification.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token!";

/// Extractor that requires a valid identity token.
///
/// A missing or non-bearer `Authorization` header is rejected with 401. A
/// bearer token that fails verification is rejected with 403.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {user}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub UserId);

/// The token part of a bearer `Authorization` header value.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_owned()))?;

        let user = state.tokens().verify(token).map_err(|e| {
            if e.is_rejection() {
                tracing::debug!(error = %e, "token rejected");
                AppError::InvalidToken(INVALID_TOKEN_MESSAGE.to_owned())
            } else {
                AppError::Internal(e.to_string())
            }
        })?;

        Span::current().record("user_id", tracing::field::display(user));
        set_sentry_user(&user);

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/user/cart");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
