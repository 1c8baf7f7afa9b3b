//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases; the latter is what the
//! tests run against.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::identity::Role;
use crate::store::migrations;
use crate::store::model::{CompanyProfile, Submission, SubmissionStatus};
use crate::store::traits::{Database, UserRecord};

/// libSQL database backend.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async
/// use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string (our canonical write format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("Bad id {s:?}: {e}")))
}

/// Convert `Option<&str>` to a libsql Value (NULL when absent).
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<f64>` to a libsql Value.
fn opt_real(v: Option<f64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Real(v),
        None => libsql::Value::Null,
    }
}

fn role_to_str(role: &Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Admin => "admin",
    }
}

fn str_to_role(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        _ => Role::User,
    }
}

fn status_to_str(status: &SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Submitted => "submitted",
        SubmissionStatus::Reviewed => "reviewed",
        SubmissionStatus::Approved => "approved",
        SubmissionStatus::Rejected => "rejected",
    }
}

fn str_to_status(s: &str) -> SubmissionStatus {
    match s {
        "reviewed" => SubmissionStatus::Reviewed,
        "approved" => SubmissionStatus::Approved,
        "rejected" => SubmissionStatus::Rejected,
        _ => SubmissionStatus::Submitted,
    }
}

const USER_COLUMNS: &str = "id, email, name, role, password_hash, created_at, updated_at";

fn row_to_user(row: &libsql::Row) -> Result<UserRecord, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?;
    let role_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?;
    let created_str: String = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?;
    let updated_str: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?;

    Ok(UserRecord {
        id: parse_uuid(&id_str)?,
        email: row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?,
        name: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?,
        role: str_to_role(&role_str),
        password_hash: row
            .get(4)
            .map_err(|e| DatabaseError::Query(format!("user row: {e}")))?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const COMPANY_COLUMNS: &str = "id, user_id, company_name, registration_number, address, \
     contact_person, contact_phone, official_email, industry_type, gst_pan, \
     created_at, updated_at";

fn row_to_company(row: &libsql::Row) -> Result<CompanyProfile, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("company row: {e}")))?;
    let user_id_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("company row: {e}")))?;
    let created_str: String = row
        .get(10)
        .map_err(|e| DatabaseError::Query(format!("company row: {e}")))?;
    let updated_str: String = row
        .get(11)
        .map_err(|e| DatabaseError::Query(format!("company row: {e}")))?;

    Ok(CompanyProfile {
        id: parse_uuid(&id_str)?,
        user_id: parse_uuid(&user_id_str)?,
        company_name: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("company row: {e}")))?,
        registration_number: row.get(3).ok(),
        address: row.get(4).ok(),
        contact_person: row.get(5).ok(),
        contact_phone: row.get(6).ok(),
        official_email: row.get(7).ok(),
        industry_type: row.get(8).ok(),
        gst_pan: row.get(9).ok(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const SUBMISSION_COLUMNS: &str = "id, user_id, company_id, chemical_name, cas_number, quantity, \
     unit, purity, hazard_class, use_purpose, storage_conditions, \
     inventory_date, status, created_at, updated_at";

fn row_to_submission(row: &libsql::Row) -> Result<Submission, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;
    let user_id_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;
    let company_id_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;
    let inventory_str: Option<String> = row.get(11).ok();
    let status_str: String = row
        .get(12)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;
    let created_str: String = row
        .get(13)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;
    let updated_str: String = row
        .get(14)
        .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?;

    Ok(Submission {
        id: parse_uuid(&id_str)?,
        user_id: parse_uuid(&user_id_str)?,
        company_id: parse_uuid(&company_id_str)?,
        chemical_name: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("submission row: {e}")))?,
        cas_number: row.get(4).ok(),
        quantity: row.get::<f64>(5).ok(),
        unit: row.get(6).ok(),
        purity: row.get(7).ok(),
        hazard_class: row.get(8).ok(),
        use_purpose: row.get(9).ok(),
        storage_conditions: row.get(10).ok(),
        inventory_date: parse_optional_datetime(&inventory_str),
        status: str_to_status(&status_str),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, name, role, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.email.clone(),
                    user.name.clone(),
                    role_to_str(&user.role),
                    user.password_hash.clone(),
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_user: {e}")))?;
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("user_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("user_by_email: {e}"))),
        }
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("user_by_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("user_by_id: {e}"))),
        }
    }

    async fn count_users_with_role(&self, role: Role) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM users WHERE role = ?1",
                params![role_to_str(&role)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("count_users_with_role: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) as u64),
            _ => Ok(0),
        }
    }

    // ── Companies ───────────────────────────────────────────────────

    async fn insert_company(&self, company: &CompanyProfile) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO companies (id, user_id, company_name, registration_number, address,
                     contact_person, contact_phone, official_email, industry_type, gst_pan,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    company.id.to_string(),
                    company.user_id.to_string(),
                    company.company_name.clone(),
                    opt_text(company.registration_number.as_deref()),
                    opt_text(company.address.as_deref()),
                    opt_text(company.contact_person.as_deref()),
                    opt_text(company.contact_phone.as_deref()),
                    opt_text(company.official_email.as_deref()),
                    opt_text(company.industry_type.as_deref()),
                    opt_text(company.gst_pan.as_deref()),
                    company.created_at.to_rfc3339(),
                    company.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_company: {e}")))?;
        Ok(())
    }

    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE user_id = ?1"),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("company_by_user_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_company(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("company_by_user_id: {e}"))),
        }
    }

    async fn company_by_id(&self, id: Uuid) -> Result<Option<CompanyProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("company_by_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_company(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("company_by_id: {e}"))),
        }
    }

    async fn count_companies(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM companies", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_companies: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) as u64),
            _ => Ok(0),
        }
    }

    // ── Submissions ─────────────────────────────────────────────────

    async fn insert_submission(&self, submission: &Submission) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO submissions (id, user_id, company_id, chemical_name, cas_number,
                     quantity, unit, purity, hazard_class, use_purpose, storage_conditions,
                     inventory_date, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    submission.id.to_string(),
                    submission.user_id.to_string(),
                    submission.company_id.to_string(),
                    submission.chemical_name.clone(),
                    opt_text(submission.cas_number.as_deref()),
                    opt_real(submission.quantity),
                    opt_text(submission.unit.as_deref()),
                    opt_text(submission.purity.as_deref()),
                    opt_text(submission.hazard_class.as_deref()),
                    opt_text(submission.use_purpose.as_deref()),
                    opt_text(submission.storage_conditions.as_deref()),
                    opt_text(submission.inventory_date.map(|d| d.to_rfc3339()).as_deref()),
                    status_to_str(&submission.status),
                    submission.created_at.to_rfc3339(),
                    submission.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_submission: {e}")))?;
        Ok(())
    }

    async fn submission_by_id(&self, id: Uuid) -> Result<Option<Submission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("submission_by_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_submission(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("submission_by_id: {e}"))),
        }
    }

    async fn submissions_by_user(&self, user_id: Uuid) -> Result<Vec<Submission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE user_id = ?1
                     ORDER BY created_at DESC"
                ),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("submissions_by_user: {e}")))?;

        let mut submissions = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_submission(&row) {
                Ok(submission) => submissions.push(submission),
                Err(e) => tracing::warn!("Skipping submission row: {e}"),
            }
        }
        Ok(submissions)
    }

    async fn all_submissions(&self) -> Result<Vec<Submission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY created_at DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("all_submissions: {e}")))?;

        let mut submissions = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_submission(&row) {
                Ok(submission) => submissions.push(submission),
                Err(e) => tracing::warn!("Skipping submission row: {e}"),
            }
        }
        Ok(submissions)
    }

    async fn update_submission_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn()
            .execute(
                "UPDATE submissions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status_to_str(&status), now, id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_submission_status: {e}")))?;
        Ok(changed == 1)
    }

    async fn delete_submission(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM submissions WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_submission: {e}")))?;
        Ok(deleted == 1)
    }

    async fn count_submissions(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM submissions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_submissions: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) as u64),
            _ => Ok(0),
        }
    }
}
