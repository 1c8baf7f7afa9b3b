//! Identity resolver: session restore, sign-in/out, and change events.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{RwLock, broadcast};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::auth::AuthService;
use crate::error::AuthError;
use crate::identity::model::Identity;
use crate::identity::session::SessionStore;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Point-in-time view of the resolver's state.
///
/// `settled` is false only during initial restoration or while a
/// sign-in/sign-up is in flight; the router renders `Loading` until it
/// is true, so observers never act on a transient "logged out" state.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySnapshot {
    pub identity: Option<Identity>,
    pub settled: bool,
}

/// Event broadcast to subscribers on every state change.
#[derive(Debug, Clone)]
pub enum IdentityEvent {
    Changed(IdentitySnapshot),
}

/// Single source of truth for "who is the current user".
///
/// Owns the session store (single writer) and the authentication
/// collaborator. Every mutation publishes exactly one snapshot event.
pub struct IdentityResolver {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn SessionStore>,
    state: RwLock<IdentitySnapshot>,
    tx: broadcast::Sender<IdentityEvent>,
    auth_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn SessionStore>,
        auth_timeout: Duration,
    ) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            auth,
            store,
            state: RwLock::new(IdentitySnapshot {
                identity: None,
                settled: false,
            }),
            tx,
            auth_timeout,
        })
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> IdentitySnapshot {
        self.state.read().await.clone()
    }

    /// Current identity, if signed in.
    pub async fn current(&self) -> Option<Identity> {
        self.state.read().await.identity.clone()
    }

    /// Whether restoration and any in-flight auth operation have finished.
    pub async fn settled(&self) -> bool {
        self.state.read().await.settled
    }

    /// Whether the current identity is an admin.
    pub async fn is_admin(&self) -> bool {
        self.state
            .read()
            .await
            .identity
            .as_ref()
            .is_some_and(Identity::is_admin)
    }

    /// Restore the persisted session, once, at startup.
    ///
    /// A corrupt record is discarded and cleared without surfacing an
    /// error. The resolver reports itself settled only after this
    /// completes, success or failure.
    pub async fn restore(&self) {
        let identity = match self.store.load().await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Identity>(&bytes) {
                Ok(identity) => {
                    info!(user_id = %identity.id, "Session restored");
                    Some(identity)
                }
                Err(e) => {
                    warn!("Discarding corrupt session record: {e}");
                    if let Err(e) = self.store.clear().await {
                        warn!("Failed to clear corrupt session record: {e}");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read session store, starting signed out: {e}");
                None
            }
        };

        self.publish(identity, true).await;
    }

    /// Sign in with email and password.
    ///
    /// The wait is bounded: past `auth_timeout` the attempt resolves to
    /// `AuthError::Transport` rather than leaving `settled()` stuck
    /// false. On failure the current identity is left unchanged.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        self.mark_unsettled().await;
        debug!(email, "Sign-in attempt");

        let outcome = match timeout(self.auth_timeout, self.auth.sign_in(email, password)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Transport("sign-in timed out".into())),
        };

        self.adopt_outcome(outcome, "Sign-in").await
    }

    /// Create an account; the new identity is adopted as already
    /// authenticated. `AlreadyExists` leaves state unchanged.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        self.mark_unsettled().await;
        debug!(email, "Sign-up attempt");

        let outcome =
            match timeout(self.auth_timeout, self.auth.sign_up(email, password, name)).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Transport("sign-up timed out".into())),
            };

        self.adopt_outcome(outcome, "Sign-up").await
    }

    /// Clear the in-memory identity and the persisted session together.
    ///
    /// The in-memory identity is always cleared before this returns, so
    /// no queued operation can observe a stale identity. The store clear
    /// is retried once; a second failure is logged (the record will be
    /// overwritten by the next sign-in).
    pub async fn sign_out(&self) {
        self.publish(None, true).await;

        if let Err(first) = self.store.clear().await {
            warn!("Session clear failed, retrying: {first}");
            if let Err(second) = self.store.clear().await {
                warn!("Session clear failed twice, giving up: {second}");
                return;
            }
        }
        info!("Signed out");
    }

    /// Request a password reset for the given address.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.auth.reset_password(email).await
    }

    /// Re-broadcast the current snapshot so subscribers re-evaluate.
    pub async fn refresh(&self) {
        let snapshot = self.state.read().await.clone();
        let _ = self.tx.send(IdentityEvent::Changed(snapshot));
    }

    async fn adopt_outcome(
        &self,
        outcome: Result<Identity, AuthError>,
        op: &str,
    ) -> Result<Identity, AuthError> {
        match outcome {
            Ok(identity) => {
                self.persist(&identity).await;
                info!(user_id = %identity.id, role = %identity.role, "{op} succeeded");
                self.publish(Some(identity.clone()), true).await;
                Ok(identity)
            }
            Err(e) => {
                debug!("{op} failed: {e}");
                self.resettle().await;
                Err(e)
            }
        }
    }

    async fn persist(&self, identity: &Identity) {
        match serde_json::to_vec(identity) {
            Ok(bytes) => {
                // A save failure only costs session persistence across
                // restarts; the sign-in itself still succeeds.
                if let Err(e) = self.store.save(&bytes).await {
                    warn!("Failed to persist session record: {e}");
                }
            }
            Err(e) => warn!("Failed to serialize session record: {e}"),
        }
    }

    async fn mark_unsettled(&self) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.settled = false;
            state.clone()
        };
        let _ = self.tx.send(IdentityEvent::Changed(snapshot));
    }

    async fn resettle(&self) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.settled = true;
            state.clone()
        };
        let _ = self.tx.send(IdentityEvent::Changed(snapshot));
    }

    async fn publish(&self, identity: Option<Identity>, settled: bool) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.identity = identity;
            state.settled = settled;
            state.clone()
        };
        let _ = self.tx.send(IdentityEvent::Changed(snapshot));
    }
}
