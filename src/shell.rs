//! Application shell: owns the core components and their wiring.
//!
//! Startup order matters here: subscriptions are taken before `restore()`
//! runs, so the router and the gate driver observe the restoration event
//! itself and can never act on a pre-restore snapshot.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{AuthService, CompanyLookup};
use crate::error::AuthError;
use crate::identity::{Identity, IdentityEvent, IdentityResolver, SessionStore};
use crate::onboarding::{OnboardingGate, OnboardingStatus};
use crate::routing::{ActiveView, ViewRouter};

/// Composition root for the application core.
///
/// Wires the identity resolver, onboarding gate, and view router
/// together: identity changes invalidate the gate and trigger a fresh
/// company check, and the router recomputes on every event from either.
pub struct AppShell {
    resolver: Arc<IdentityResolver>,
    gate: Arc<OnboardingGate>,
    router: Arc<ViewRouter>,
}

impl AppShell {
    /// Build the core, start its background wiring, and run session
    /// restoration to completion. When this returns, the resolver is
    /// settled and the router reflects the restored state.
    pub async fn start(
        auth: Arc<dyn AuthService>,
        lookup: Arc<dyn CompanyLookup>,
        session: Arc<dyn SessionStore>,
        auth_timeout: Duration,
    ) -> Arc<Self> {
        let resolver = IdentityResolver::new(auth, session, auth_timeout);
        let gate = OnboardingGate::new(lookup);
        let router = ViewRouter::new(Arc::clone(&resolver), Arc::clone(&gate));

        // Subscribe before restore so no event is missed.
        let driver_rx = resolver.subscribe();
        let router_identity_rx = resolver.subscribe();
        let router_onboarding_rx = gate.subscribe();

        tokio::spawn(drive_gate(
            Arc::clone(&gate),
            driver_rx,
        ));
        tokio::spawn(Arc::clone(&router).run(router_identity_rx, router_onboarding_rx));

        resolver.restore().await;
        router.recompute().await;

        Arc::new(Self {
            resolver,
            gate,
            router,
        })
    }

    // ── Resolver surface ────────────────────────────────────────────

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        self.resolver.sign_in(email, password).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        self.resolver.sign_up(email, password, name).await
    }

    /// Sign out. The gate is superseded before the identity is cleared,
    /// so a company check still in flight for the old identity can never
    /// apply after this returns.
    pub async fn sign_out(&self) {
        self.gate.invalidate().await;
        self.resolver.sign_out().await;
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.resolver.reset_password(email).await
    }

    pub async fn current(&self) -> Option<Identity> {
        self.resolver.current().await
    }

    pub async fn is_admin(&self) -> bool {
        self.resolver.is_admin().await
    }

    pub async fn settled(&self) -> bool {
        self.resolver.settled().await
    }

    // ── Gate and router surface ─────────────────────────────────────

    pub async fn onboarding_status(&self) -> OnboardingStatus {
        self.gate.status().await
    }

    /// Force a fresh company check for the current identity. Called
    /// after company creation so a cached `Absent` is not trusted.
    pub async fn refresh_company_status(&self) {
        self.gate.invalidate().await;
        if let Some(identity) = self.resolver.current().await {
            self.gate.check(&identity).await;
        }
        self.resolver.refresh().await;
    }

    pub async fn navigate(&self, path: &str) -> ActiveView {
        self.router.navigate(path).await
    }

    pub async fn active_view(&self) -> ActiveView {
        self.router.active().await
    }

    pub fn subscribe_views(&self) -> broadcast::Receiver<ActiveView> {
        self.router.subscribe()
    }

    pub fn resolver(&self) -> &Arc<IdentityResolver> {
        &self.resolver
    }

    pub fn gate(&self) -> &Arc<OnboardingGate> {
        &self.gate
    }

    pub fn router(&self) -> &Arc<ViewRouter> {
        &self.router
    }
}

/// Gate driver: on every identity change, invalidate the gate, then
/// kick off a check for the new identity (if any).
///
/// Events are handled strictly in order and `spawn_check` issues its
/// bookkeeping before returning, so a check is always issued against
/// the invalidation state that preceded it; only the network wait runs
/// in the background, where the gate's epoch makes a superseded result
/// inert.
async fn drive_gate(
    gate: Arc<OnboardingGate>,
    mut rx: broadcast::Receiver<IdentityEvent>,
) {
    let mut last_seen: Option<Uuid> = None;
    loop {
        let snapshot = match rx.recv().await {
            Ok(IdentityEvent::Changed(snapshot)) => snapshot,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let current_id = snapshot.identity.as_ref().map(|i| i.id);
        if current_id == last_seen {
            continue;
        }
        last_seen = current_id;

        gate.invalidate().await;
        if let Some(identity) = &snapshot.identity {
            Arc::clone(&gate).spawn_check(identity).await;
        }
    }
}
