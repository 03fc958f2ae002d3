//! Signup and signin handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::models::user::UserView;
use crate::services::auth::{AuthService, AuthSession, Registration};
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub img: Option<String>,
}

/// Signin request body.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Token plus user view, returned by signup and signin.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.user.into(),
        }
    }
}

/// POST /user/signup
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<Json<AuthResponse>> {
    let auth = AuthService::new(state.store(), state.tokens());
    let session = auth
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            img: body.img,
        })
        .await?;
    Ok(Json(session.into()))
}

/// POST /user/signin
#[instrument(skip_all)]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SigninRequest>,
) -> Result<Json<AuthResponse>> {
    let auth = AuthService::new(state.store(), state.tokens());
    let session = auth.login(&body.email, &body.password).await?;
    tracing::info!(user_id = %session.user.user.id, "user signed in");
    Ok(Json(session.into()))
}
