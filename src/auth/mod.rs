//! Collaborator interfaces consumed by the application core, and their
//! local (database-backed) and HTTP (REST-backed) implementations.

pub mod http;
pub mod local;
pub mod service;

pub use http::{HttpAuthService, HttpCompanyLookup};
pub use local::{LocalAuthService, LocalCompanyLookup};
pub use service::{AuthService, CompanyLookup};
