//! Error types for ChemFlow.
//!
//! Errors are split along the taxonomy the UI depends on: domain errors
//! (wrong password, duplicate account) are recoverable by retrying the
//! form, transport errors (network, timeout) get a generic retry message,
//! and corrupt local state is repaired silently and never surfaces.

/// Top-level error type for the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Errors returned by the authentication collaborator.
///
/// `NotFound`, `InvalidCredentials` and `AlreadyExists` are domain errors;
/// `Transport` covers network failures and bounded-wait timeouts. The
/// resolver returns these as values, it never panics across its boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("User not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    AlreadyExists,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl AuthError {
    /// Whether this is a domain error (user-facing, retry the form) as
    /// opposed to a transport failure.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

/// Errors from the persisted session record.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the company-existence lookup collaborator.
///
/// "No company" is not an error; the lookup returns `Ok(None)` for that.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_vs_transport() {
        assert!(AuthError::NotFound.is_domain());
        assert!(AuthError::InvalidCredentials.is_domain());
        assert!(AuthError::AlreadyExists.is_domain());
        assert!(!AuthError::Transport("connection refused".into()).is_domain());
    }

    #[test]
    fn messages_match_wire_strings() {
        // The REST layer serializes these into {"error": "..."} bodies, so
        // the Display strings are part of the API contract.
        assert_eq!(AuthError::NotFound.to_string(), "User not found");
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
        assert_eq!(AuthError::AlreadyExists.to_string(), "User already exists");
    }
}
