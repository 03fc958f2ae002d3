//! Integration test harness for the storefront.
//!
//! Builds the full router (middleware included) over a [`MemoryStore`] and
//! drives it in-process with `tower::ServiceExt::oneshot`, so no server,
//! port or database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::db::MemoryStore;
use shopfront_storefront::state::AppState;

/// Signing key used by every test app.
const TOKEN_KEY: &str = "k9$Qz!2LmT#8vR@pW4&nY7^bC1*eX5uJ";

/// A response decoded for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// An in-process storefront over a fresh memory store.
#[derive(Clone)]
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StorefrontConfig::in_memory(SecretString::from(TOKEN_KEY)))
    }

    /// An app with signup/signin rate limiting switched on.
    #[must_use]
    pub fn rate_limited() -> Self {
        let mut config = StorefrontConfig::in_memory(SecretString::from(TOKEN_KEY));
        config.auth_rate_limit = true;
        Self::with_config(config)
    }

    fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = shopfront_storefront::app(AppState::new(config, store.clone()));
        Self { store, router }
    }

    /// Send a request and decode the body as JSON (or a JSON string for
    /// plain-text bodies).
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Register a user and return its token.
    pub async fn signup(&self, email: &str) -> String {
        let response = self
            .call(
                Method::POST,
                "/user/signup",
                None,
                Some(json!({
                    "name": "Test Shopper",
                    "email": email,
                    "password": "correct horse battery",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["token"].as_str().unwrap().to_owned()
    }

    /// Create one product through the API and return its id.
    pub async fn add_product(&self, title: &str, org: &str, category: &[&str]) -> String {
        let response = self
            .call(
                Method::POST,
                "/products",
                None,
                Some(json!([{
                    "title": title,
                    "name": "Acme",
                    "desc": format!("{title} description"),
                    "price": {"org": org, "mrp": org, "off": "0"},
                    "sizes": ["M"],
                    "category": category,
                }])),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["createdProducts"][0]["id"]
            .as_str()
            .unwrap()
            .to_owned()
    }
}
