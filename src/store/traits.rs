//! Backend-agnostic `Database` trait: one async interface for all
//! persistence used by the REST layer and the local collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::identity::{Identity, Role};
use crate::store::model::{CompanyProfile, Submission, SubmissionStatus};

/// A stored user account: the identity fields plus the password hash,
/// which never crosses the API boundary.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The password-less view served over the wire.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Backend-agnostic database trait covering users, companies, and
/// submissions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert a new user account.
    async fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError>;

    /// Look up a user by email.
    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// Look up a user by id.
    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError>;

    /// Count users with the given role.
    async fn count_users_with_role(&self, role: Role) -> Result<u64, DatabaseError>;

    // ── Companies ───────────────────────────────────────────────────

    /// Insert a new company profile.
    async fn insert_company(&self, company: &CompanyProfile) -> Result<(), DatabaseError>;

    /// The company registered by the given user, if any.
    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, DatabaseError>;

    /// Look up a company by id.
    async fn company_by_id(&self, id: Uuid) -> Result<Option<CompanyProfile>, DatabaseError>;

    /// Count all companies.
    async fn count_companies(&self) -> Result<u64, DatabaseError>;

    // ── Submissions ─────────────────────────────────────────────────

    /// Insert a new submission.
    async fn insert_submission(&self, submission: &Submission) -> Result<(), DatabaseError>;

    /// Look up a submission by id.
    async fn submission_by_id(&self, id: Uuid) -> Result<Option<Submission>, DatabaseError>;

    /// A user's submissions, newest first.
    async fn submissions_by_user(&self, user_id: Uuid) -> Result<Vec<Submission>, DatabaseError>;

    /// All submissions, newest first.
    async fn all_submissions(&self) -> Result<Vec<Submission>, DatabaseError>;

    /// Update a submission's status. Returns false if no row matched.
    async fn update_submission_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool, DatabaseError>;

    /// Delete a submission. Returns false if no row matched.
    async fn delete_submission(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Count all submissions.
    async fn count_submissions(&self) -> Result<u64, DatabaseError>;
}
