//! Submission endpoints: filing, listings, review workflow.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiState, internal_error};
use crate::store::model::{
    NewSubmission, Submission, SubmissionDetails, SubmissionFilters, SubmissionStatus,
};

/// GET /api/submissions
///
/// Admin review listing: every submission with its user and company
/// embedded. A missing user or company leaves the field null rather
/// than failing the whole listing.
pub async fn list_all(State(state): State<ApiState>) -> Response {
    let submissions = match state.db.all_submissions().await {
        Ok(submissions) => submissions,
        Err(e) => return internal_error("Get all submissions error", e),
    };

    let mut details = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let user = match state.db.user_by_id(submission.user_id).await {
            Ok(user) => user.map(|u| u.identity()),
            Err(e) => {
                tracing::warn!(submission_id = %submission.id, "Error fetching user details: {e}");
                None
            }
        };
        let company = match state.db.company_by_id(submission.company_id).await {
            Ok(company) => company,
            Err(e) => {
                tracing::warn!(submission_id = %submission.id, "Error fetching company details: {e}");
                None
            }
        };
        details.push(SubmissionDetails {
            submission,
            user,
            company,
        });
    }

    Json(details).into_response()
}

/// GET /api/submissions/{user_id}
///
/// One user's submissions, newest first, with optional query filters.
pub async fn list_by_user(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Query(filters): Query<SubmissionFilters>,
) -> Response {
    let submissions = match state.db.submissions_by_user(user_id).await {
        Ok(submissions) => submissions,
        Err(e) => return internal_error("Get submissions error", e),
    };

    let filtered: Vec<Submission> = if filters.is_empty() {
        submissions
    } else {
        submissions
            .into_iter()
            .filter(|s| filters.matches(s))
            .collect()
    };

    Json(filtered).into_response()
}

/// POST /api/submissions
pub async fn create(State(state): State<ApiState>, Json(req): Json<NewSubmission>) -> Response {
    let submission = Submission::create(req);
    match state.db.insert_submission(&submission).await {
        Ok(()) => Json(submission).into_response(),
        Err(e) => internal_error("Create submission error", e),
    }
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: SubmissionStatus,
}

/// PUT /api/submissions/{id}/status
///
/// Review workflow: the requested transition must be valid from the
/// submission's current status.
pub async fn update_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Response {
    let current = match state.db.submission_by_id(id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => return Json(serde_json::json!({"success": false})).into_response(),
        Err(e) => return internal_error("Update submission status error", e),
    };

    if !current.status.can_transition_to(req.status) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Cannot change status from {} to {}", current.status, req.status)
            })),
        )
            .into_response();
    }

    match state.db.update_submission_status(id, req.status).await {
        Ok(success) => Json(serde_json::json!({"success": success})).into_response(),
        Err(e) => internal_error("Update submission status error", e),
    }
}

/// DELETE /api/submissions/{id}
pub async fn remove(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.db.delete_submission(id).await {
        Ok(success) => Json(serde_json::json!({"success": success})).into_response(),
        Err(e) => internal_error("Delete submission error", e),
    }
}
