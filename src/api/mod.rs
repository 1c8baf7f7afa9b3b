//! REST surface: thin handlers over the document store.
//!
//! Each endpoint maps 1:1 to a collection operation; the interesting
//! application logic lives in the core, not here. Status codes and error
//! bodies are part of the contract the HTTP collaborators parse.

pub mod auth;
pub mod company;
pub mod submissions;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::auth::AuthService;
use crate::store::Database;
use crate::store::model::Stats;

/// Shared state for the REST handlers.
#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<dyn Database>,
    pub auth: Arc<dyn AuthService>,
}

/// 500 with the generic body the original server sends.
pub(crate) fn internal_error<E: std::fmt::Display>(context: &str, e: E) -> Response {
    tracing::error!("{context}: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
        .into_response()
}

/// GET /api/stats
async fn get_stats(State(state): State<ApiState>) -> Response {
    let total_users = match state
        .db
        .count_users_with_role(crate::identity::Role::User)
        .await
    {
        Ok(n) => n,
        Err(e) => return internal_error("Get stats error", e),
    };
    let total_companies = match state.db.count_companies().await {
        Ok(n) => n,
        Err(e) => return internal_error("Get stats error", e),
    };
    let total_submissions = match state.db.count_submissions().await {
        Ok(n) => n,
        Err(e) => return internal_error("Get stats error", e),
    };

    Json(Stats {
        total_users,
        total_companies,
        total_submissions,
    })
    .into_response()
}

/// Build the full REST router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route(
            "/api/company/{user_id}",
            get(company::by_user),
        )
        .route("/api/company", post(company::create))
        .route(
            "/api/submissions",
            get(submissions::list_all).post(submissions::create),
        )
        .route(
            "/api/submissions/{id}",
            get(submissions::list_by_user).delete(submissions::remove),
        )
        .route("/api/submissions/{id}/status", put(submissions::update_status))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
