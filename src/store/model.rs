//! Domain records: company profiles and chemical submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;

/// A company profile registered by a user during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub official_email: Option<String>,
    pub industry_type: Option<String>,
    pub gst_pan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the company form (id and timestamps are assigned
/// at creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub user_id: Uuid,
    pub company_name: String,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub official_email: Option<String>,
    #[serde(default)]
    pub industry_type: Option<String>,
    #[serde(default)]
    pub gst_pan: Option<String>,
}

impl CompanyProfile {
    /// Create a profile from form input.
    pub fn create(new: NewCompany) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            company_name: new.company_name,
            registration_number: new.registration_number,
            address: new.address,
            contact_person: new.contact_person,
            contact_phone: new.contact_phone,
            official_email: new.official_email,
            industry_type: new.industry_type,
            gst_pan: new.gst_pan,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Review state of a chemical submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Filed by the company, awaiting review.
    Submitted,
    /// An administrator has looked at it.
    Reviewed,
    /// Accepted.
    Approved,
    /// Returned to the company.
    Rejected,
}

impl SubmissionStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, target),
            (Submitted, Reviewed)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Reviewed, Approved)
                | (Reviewed, Rejected)
        )
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A chemical-handling record filed by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub chemical_name: String,
    pub cas_number: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub purity: Option<String>,
    pub hazard_class: Option<String>,
    pub use_purpose: Option<String>,
    pub storage_conditions: Option<String>,
    pub inventory_date: Option<DateTime<Utc>>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the data-entry form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub chemical_name: String,
    #[serde(default)]
    pub cas_number: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub purity: Option<String>,
    #[serde(default)]
    pub hazard_class: Option<String>,
    #[serde(default)]
    pub use_purpose: Option<String>,
    #[serde(default)]
    pub storage_conditions: Option<String>,
    #[serde(default)]
    pub inventory_date: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a submission from form input; it starts as `Submitted`.
    pub fn create(new: NewSubmission) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            company_id: new.company_id,
            chemical_name: new.chemical_name,
            cas_number: new.cas_number,
            quantity: new.quantity,
            unit: new.unit,
            purity: new.purity,
            hazard_class: new.hazard_class,
            use_purpose: new.use_purpose,
            storage_conditions: new.storage_conditions,
            inventory_date: new.inventory_date,
            status: SubmissionStatus::Submitted,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A submission with its owning user and company embedded, as served to
/// the admin review listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionDetails {
    #[serde(flatten)]
    pub submission: Submission,
    pub user: Option<Identity>,
    pub company: Option<CompanyProfile>,
}

/// Optional filters on a user's submission listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFilters {
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub chemical_name: Option<String>,
    #[serde(default)]
    pub status: Option<SubmissionStatus>,
}

impl SubmissionFilters {
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none()
            && self.date_to.is_none()
            && self.chemical_name.is_none()
            && self.status.is_none()
    }

    /// Whether a submission passes every set filter. The chemical-name
    /// filter is a case-insensitive substring match.
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(from) = self.date_from {
            if submission.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if submission.created_at > to {
                return false;
            }
        }
        if let Some(name) = &self.chemical_name {
            if !submission
                .chemical_name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if submission.status != status {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: u64,
    pub total_companies: u64,
    pub total_submissions: u64,
}
