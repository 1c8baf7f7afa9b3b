//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Port the REST API listens on.
    pub api_port: u16,
    /// Path of the persisted session record.
    pub session_path: PathBuf,
    /// Bounded wait for sign-in/sign-up before resolving to a transport
    /// error (keeps `settled()` from sticking false on a dead network).
    pub auth_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/chemflow.db"),
            api_port: 3001,
            session_path: PathBuf::from("./data/session.json"),
            auth_timeout: Duration::from_secs(10),
        }
    }
}
