//! Company endpoints: existence lookup and creation.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::{ApiState, internal_error};
use crate::store::model::{CompanyProfile, NewCompany};

/// GET /api/company/{user_id}
///
/// Serves the company or a JSON `null`; absence is not an error status.
pub async fn by_user(State(state): State<ApiState>, Path(user_id): Path<Uuid>) -> Response {
    match state.db.company_by_user_id(user_id).await {
        Ok(company) => Json(company).into_response(),
        Err(e) => internal_error("Get company error", e),
    }
}

/// POST /api/company
pub async fn create(State(state): State<ApiState>, Json(req): Json<NewCompany>) -> Response {
    let company = CompanyProfile::create(req);
    match state.db.insert_company(&company).await {
        Ok(()) => Json(company).into_response(),
        Err(e) => internal_error("Create company error", e),
    }
}
