//! Auth endpoints: signin, signup, reset-password.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::SecretString;
use serde::Deserialize;

use crate::api::ApiState;
use crate::error::AuthError;
use crate::identity::Identity;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

fn user_response(user: Identity) -> Response {
    Json(serde_json::json!({ "user": user })).into_response()
}

/// Status-code mapping the original server uses: auth failures are 401,
/// the signup conflict is 400, transport problems are 500.
fn error_response(e: AuthError) -> Response {
    let status = match e {
        AuthError::NotFound | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyExists => StatusCode::BAD_REQUEST,
        AuthError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &e {
        AuthError::Transport(detail) => {
            tracing::error!("Auth transport error: {detail}");
            "Internal server error".to_string()
        }
        domain => domain.to_string(),
    };
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

/// POST /api/auth/signin
pub async fn signin(State(state): State<ApiState>, Json(req): Json<SignInRequest>) -> Response {
    let password = SecretString::from(req.password);
    match state.auth.sign_in(&req.email, &password).await {
        Ok(user) => user_response(user),
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/signup
pub async fn signup(State(state): State<ApiState>, Json(req): Json<SignUpRequest>) -> Response {
    let password = SecretString::from(req.password);
    match state
        .auth
        .sign_up(&req.email, &password, &req.full_name)
        .await
    {
        Ok(user) => user_response(user),
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<ApiState>,
    Json(req): Json<ResetRequest>,
) -> Response {
    match state.auth.reset_password(&req.email).await {
        Ok(()) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(AuthError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "User not found"})),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
