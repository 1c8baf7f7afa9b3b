//! Collaborator traits: authentication and company-existence lookup.
//!
//! The core is written against these seams only. Failures come back as
//! tagged values, never as panics: domain errors (`NotFound`,
//! `InvalidCredentials`, `AlreadyExists`) are distinguished from
//! transport failures so the UI can choose between a form-level message
//! and a generic retry.

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::error::{AuthError, LookupError};
use crate::identity::Identity;
use crate::store::model::CompanyProfile;

/// Authentication service.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials and return the signed-in identity.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError>;

    /// Create an account and return it as an already-authenticated
    /// identity (no separate verification step is modeled).
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError>;

    /// Request a password reset for the given address.
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
}

/// Company-existence lookup.
#[async_trait]
pub trait CompanyLookup: Send + Sync {
    /// The company profile registered by the given user, if any.
    /// Absence is `Ok(None)`; only transport failures are errors.
    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, LookupError>;
}
