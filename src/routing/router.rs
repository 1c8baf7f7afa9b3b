//! The region decision table and the router that re-evaluates it.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::identity::{IdentityEvent, IdentityResolver, Role};
use crate::onboarding::{OnboardingEvent, OnboardingGate, OnboardingStatus};
use crate::routing::region::ViewRegion;
use crate::routing::routes::{self, RouteOutcome};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// The facts the decision table reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFacts {
    /// Identity resolver has finished restore and any in-flight auth.
    pub settled: bool,
    /// Role of the signed-in identity, `None` when signed out.
    pub role: Option<Role>,
    /// Company-profile existence, as far as it is known.
    pub onboarding: OnboardingStatus,
    /// Current navigation path.
    pub path: String,
}

/// Select the active region. Pure; evaluated top to bottom, first match
/// wins. `Unknown` onboarding renders `Loading`, never a guessed area:
/// a wrong-then-corrected region is exactly the defect class this table
/// exists to rule out.
pub fn decide(facts: &RouteFacts) -> ViewRegion {
    if !facts.settled {
        return ViewRegion::Loading;
    }
    let Some(role) = facts.role else {
        return ViewRegion::LoginArea;
    };
    if role.is_admin() {
        return ViewRegion::AdminArea;
    }
    match facts.onboarding {
        OnboardingStatus::Unknown => ViewRegion::Loading,
        OnboardingStatus::Absent if facts.path != routes::COMPANY_FORM_PATH => {
            ViewRegion::OnboardingArea
        }
        _ => match routes::resolve_user(&facts.path) {
            RouteOutcome::NotFound => ViewRegion::NotFound,
            _ => ViewRegion::UserArea,
        },
    }
}

/// The currently active view: region plus the (possibly redirected) path.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveView {
    pub region: ViewRegion,
    pub path: String,
}

/// Recomputes the active view whenever identity, onboarding status, or
/// the navigation path changes, and broadcasts the result.
pub struct ViewRouter {
    resolver: Arc<IdentityResolver>,
    gate: Arc<OnboardingGate>,
    path: RwLock<String>,
    current: RwLock<ActiveView>,
    tx: broadcast::Sender<ActiveView>,
}

impl ViewRouter {
    pub fn new(resolver: Arc<IdentityResolver>, gate: Arc<OnboardingGate>) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            resolver,
            gate,
            path: RwLock::new(routes::USER_DEFAULT_PATH.to_string()),
            current: RwLock::new(ActiveView {
                region: ViewRegion::Loading,
                path: routes::USER_DEFAULT_PATH.to_string(),
            }),
            tx,
        })
    }

    /// Subscribe to active-view changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ActiveView> {
        self.tx.subscribe()
    }

    /// The currently active view.
    pub async fn active(&self) -> ActiveView {
        self.current.read().await.clone()
    }

    /// Change the navigation path and re-evaluate.
    pub async fn navigate(&self, path: &str) -> ActiveView {
        *self.path.write().await = path.to_string();
        self.recompute().await
    }

    /// Gather current facts from the resolver and gate.
    async fn facts(&self) -> RouteFacts {
        let snapshot = self.resolver.snapshot().await;
        RouteFacts {
            settled: snapshot.settled,
            role: snapshot.identity.map(|i| i.role),
            onboarding: self.gate.status().await,
            path: self.path.read().await.clone(),
        }
    }

    /// Re-evaluate the decision table against fresh facts.
    ///
    /// An unmatched path inside an area is redirected to that area's
    /// default before the result is published, so subscribers only ever
    /// see a view the area can actually render.
    pub async fn recompute(&self) -> ActiveView {
        let mut facts = self.facts().await;
        let mut region = decide(&facts);

        let redirect = match region {
            ViewRegion::UserArea => match routes::resolve_user(&facts.path) {
                RouteOutcome::Redirect(target) => Some(target),
                _ => None,
            },
            ViewRegion::AdminArea => match routes::resolve_admin(&facts.path) {
                RouteOutcome::Redirect(target) => Some(target),
                _ => None,
            },
            _ => None,
        };
        if let Some(target) = redirect {
            debug!(from = %facts.path, to = %target, "Redirecting unmatched path");
            *self.path.write().await = target.to_string();
            facts.path = target.to_string();
            region = decide(&facts);
        }

        let view = ActiveView {
            region,
            path: facts.path,
        };
        let changed = {
            let mut current = self.current.write().await;
            let changed = *current != view;
            *current = view.clone();
            changed
        };
        if changed {
            debug!(region = %view.region, path = %view.path, "Active view changed");
            let _ = self.tx.send(view.clone());
        }
        view
    }

    /// Event loop: re-evaluate on every resolver or gate event.
    ///
    /// Events are only triggers; the facts are read back from their
    /// owners on each pass, so a lagged receiver merely coalesces
    /// recomputations instead of losing state.
    pub async fn run(
        self: Arc<Self>,
        mut identity_rx: broadcast::Receiver<IdentityEvent>,
        mut onboarding_rx: broadcast::Receiver<OnboardingEvent>,
    ) {
        loop {
            tokio::select! {
                ev = identity_rx.recv() => match ev {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                ev = onboarding_rx.recv() => match ev {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
            self.recompute().await;
        }
    }
}
