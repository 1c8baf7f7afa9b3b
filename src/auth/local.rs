//! Database-backed collaborator implementations.
//!
//! These sit behind the REST handlers: credential checks against the
//! `users` table with argon2 hashes, and the company-existence lookup
//! against the `companies` table.

use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::service::{AuthService, CompanyLookup};
use crate::error::{AuthError, LookupError};
use crate::identity::{Identity, Role};
use crate::store::model::CompanyProfile;
use crate::store::{Database, UserRecord};

/// Authentication against the local user table.
pub struct LocalAuthService {
    db: Arc<dyn Database>,
}

impl LocalAuthService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn hash_password(password: &SecretString) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Transport(format!("password hashing failed: {e}")))
    }

    fn verify_password(password: &SecretString, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            warn!("Stored password hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let user = self
            .db
            .user_by_email(email)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?
            .ok_or(AuthError::NotFound)?;

        if !Self::verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user.identity())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        let existing = self
            .db
            .user_by_email(email)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role: Role::User,
            password_hash: Self::hash_password(password)?,
            created_at: now,
            updated_at: now,
        };

        self.db
            .insert_user(&user)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        info!(user_id = %user.id, "User account created");
        Ok(user.identity())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .db
            .user_by_email(email)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?
            .ok_or(AuthError::NotFound)?;

        // Reset delivery (mail) is outside this system; the request is
        // acknowledged once the account is confirmed to exist.
        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }
}

impl LocalAuthService {
    /// Create the admin account if it doesn't exist yet. Used at startup
    /// when admin credentials are configured; a no-op otherwise.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        if let Some(existing) = self
            .db
            .user_by_email(email)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?
        {
            return Ok(existing.identity());
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role: Role::Admin,
            password_hash: Self::hash_password(password)?,
            created_at: now,
            updated_at: now,
        };
        self.db
            .insert_user(&user)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        info!(user_id = %user.id, "Admin account created");
        Ok(user.identity())
    }
}

/// Company-existence lookup against the local company table.
pub struct LocalCompanyLookup {
    db: Arc<dyn Database>,
}

impl LocalCompanyLookup {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CompanyLookup for LocalCompanyLookup {
    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, LookupError> {
        self.db
            .company_by_user_id(user_id)
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))
    }
}
