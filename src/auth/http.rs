//! REST-backed collaborator implementations.
//!
//! This is the path the real frontend takes: the core talks to the API
//! over HTTP, and every network-level failure maps to
//! `AuthError::Transport` while the backend's error bodies map back to
//! the domain variants.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::service::{AuthService, CompanyLookup};
use crate::error::{AuthError, LookupError};
use crate::identity::Identity;
use crate::store::model::CompanyProfile;

#[derive(Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
}

#[derive(Serialize)]
struct ResetBody<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: Identity,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Map an API error body back onto the domain taxonomy. Unrecognized
/// bodies (including 500s) are transport errors: the form can't do
/// anything smarter than retry.
fn map_auth_error(status: StatusCode, message: &str) -> AuthError {
    match message {
        "User not found" => AuthError::NotFound,
        "Invalid credentials" => AuthError::InvalidCredentials,
        "User already exists" => AuthError::AlreadyExists,
        _ => AuthError::Transport(format!("{status}: {message}")),
    }
}

/// Authentication over the REST API.
pub struct HttpAuthService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post_for_user<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let envelope: UserEnvelope = response
                .json()
                .await
                .map_err(|e| AuthError::Transport(format!("bad response body: {e}")))?;
            Ok(envelope.user)
        } else {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            Err(map_auth_error(status, &body.error))
        }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        self.post_for_user(
            "/api/auth/signin",
            &SignInBody {
                email,
                password: password.expose_secret(),
            },
        )
        .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        self.post_for_user(
            "/api/auth/signup",
            &SignUpBody {
                email,
                password: password.expose_secret(),
                full_name: name,
            },
        )
        .await
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(format!("{}/api/auth/reset-password", self.base_url))
            .json(&ResetBody { email })
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            Err(map_auth_error(status, &body.error))
        }
    }
}

/// Company-existence lookup over the REST API.
pub struct HttpCompanyLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCompanyLookup {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CompanyLookup for HttpCompanyLookup {
    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, LookupError> {
        let response = self
            .client
            .get(format!("{}/api/company/{user_id}", self.base_url))
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Transport(format!(
                "company lookup returned {status}"
            )));
        }

        // The endpoint serves the company or a JSON null.
        response
            .json::<Option<CompanyProfile>>()
            .await
            .map_err(|e| LookupError::Transport(format!("bad response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_map_to_domain_variants() {
        assert_eq!(
            map_auth_error(StatusCode::UNAUTHORIZED, "User not found"),
            AuthError::NotFound
        );
        assert_eq!(
            map_auth_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            map_auth_error(StatusCode::BAD_REQUEST, "User already exists"),
            AuthError::AlreadyExists
        );
    }

    #[test]
    fn unknown_bodies_map_to_transport() {
        let err = map_auth_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        assert!(matches!(err, AuthError::Transport(_)));
        let err = map_auth_error(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(err, AuthError::Transport(_)));
    }
}
