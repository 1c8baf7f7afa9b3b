//! Cached, race-safe company-profile existence checks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::CompanyLookup;
use crate::identity::Identity;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Whether a company profile exists for the current identity.
///
/// `Unknown` means "not yet checked, or the identity changed since the
/// last check"; the router renders it as loading, never as a guess.
/// Once resolved, the status never returns to `Unknown` except through
/// `invalidate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Unknown,
    Present,
    Absent,
}

impl OnboardingStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Present => "present",
            Self::Absent => "absent",
        };
        write!(f, "{s}")
    }
}

/// Event broadcast to subscribers when the status changes.
#[derive(Debug, Clone)]
pub enum OnboardingEvent {
    Changed(OnboardingStatus),
}

/// Tag carried by an in-flight lookup: which identity it was issued
/// for, and the epoch at issue time. A result only applies if the epoch
/// still matches at resolution.
#[derive(Debug, Clone, Copy)]
struct CheckTicket {
    user_id: Uuid,
    epoch: u64,
}

struct GateState {
    status: OnboardingStatus,
    /// Identity the current status belongs to.
    target: Option<Uuid>,
    /// Identity with a lookup currently in flight, if any.
    in_flight: Option<Uuid>,
    /// Bumped by `invalidate()`; stale tickets fail the comparison.
    epoch: u64,
}

/// Answers "does this identity have a company profile?" with caching and
/// logical cancellation of superseded checks.
pub struct OnboardingGate {
    lookup: Arc<dyn CompanyLookup>,
    state: RwLock<GateState>,
    tx: broadcast::Sender<OnboardingEvent>,
}

impl OnboardingGate {
    pub fn new(lookup: Arc<dyn CompanyLookup>) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            lookup,
            state: RwLock::new(GateState {
                status: OnboardingStatus::Unknown,
                target: None,
                in_flight: None,
                epoch: 0,
            }),
            tx,
        })
    }

    /// Subscribe to status-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<OnboardingEvent> {
        self.tx.subscribe()
    }

    /// Current status.
    pub async fn status(&self) -> OnboardingStatus {
        self.state.read().await.status
    }

    /// Reset to `Unknown` and supersede any in-flight check.
    ///
    /// Called on every identity change (including sign-out) and after a
    /// company profile is created, forcing a re-check instead of trusting
    /// a cached `Absent`.
    pub async fn invalidate(&self) {
        let changed = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.target = None;
            state.in_flight = None;
            let changed = state.status != OnboardingStatus::Unknown;
            state.status = OnboardingStatus::Unknown;
            changed
        };
        if changed {
            let _ = self
                .tx
                .send(OnboardingEvent::Changed(OnboardingStatus::Unknown));
        }
    }

    /// Resolve the status for the given identity, waiting for the lookup.
    ///
    /// Admins never need a company profile, so the gate resolves to
    /// `Present` without touching the lookup collaborator. For everyone
    /// else the lookup runs at most once per identity at a time: a cached
    /// result is kept, a concurrent call for the same identity does not
    /// issue a second lookup, and a result arriving after `invalidate()`
    /// is discarded.
    pub async fn check(&self, identity: &Identity) {
        if let Some(ticket) = self.begin(identity).await {
            self.finish(ticket).await;
        }
    }

    /// Like `check`, but only the bookkeeping happens before this
    /// returns; the lookup itself runs on a spawned task. This keeps a
    /// caller that is processing an event stream responsive while still
    /// ordering the issue of the check against prior invalidations.
    pub async fn spawn_check(self: Arc<Self>, identity: &Identity) {
        if let Some(ticket) = self.begin(identity).await {
            tokio::spawn(async move {
                self.finish(ticket).await;
            });
        }
    }

    /// Issue-time bookkeeping. Returns `None` when no lookup is needed:
    /// the identity is an admin (resolved immediately), the result is
    /// already cached, or a check for the same identity is in flight.
    async fn begin(&self, identity: &Identity) -> Option<CheckTicket> {
        if identity.is_admin() {
            let changed = {
                let mut state = self.state.write().await;
                state.target = Some(identity.id);
                state.in_flight = None;
                let changed = state.status != OnboardingStatus::Present;
                state.status = OnboardingStatus::Present;
                changed
            };
            if changed {
                debug!(user_id = %identity.id, "Admin identity, company check skipped");
                let _ = self
                    .tx
                    .send(OnboardingEvent::Changed(OnboardingStatus::Present));
            }
            return None;
        }

        let mut state = self.state.write().await;
        if state.target == Some(identity.id) && state.status.is_resolved() {
            return None;
        }
        if state.in_flight == Some(identity.id) {
            return None;
        }
        state.in_flight = Some(identity.id);
        Some(CheckTicket {
            user_id: identity.id,
            epoch: state.epoch,
        })
    }

    /// Run the lookup for an issued ticket and apply the result, unless
    /// the gate was invalidated in the meantime.
    async fn finish(&self, ticket: CheckTicket) {
        debug!(user_id = %ticket.user_id, "Checking company profile");
        let status = match self.lookup.company_by_user_id(ticket.user_id).await {
            Ok(Some(company)) => {
                debug!(user_id = %ticket.user_id, company_id = %company.id, "Company profile found");
                OnboardingStatus::Present
            }
            Ok(None) => OnboardingStatus::Absent,
            Err(e) => {
                // Fail closed: onboarding is the safe destination, and an
                // indefinite Unknown would render as an infinite spinner.
                warn!(user_id = %ticket.user_id, "Company lookup failed, treating as absent: {e}");
                OnboardingStatus::Absent
            }
        };

        let changed = {
            let mut state = self.state.write().await;
            if state.epoch != ticket.epoch {
                debug!(user_id = %ticket.user_id, "Discarding stale company check result");
                return;
            }
            state.in_flight = None;
            state.target = Some(ticket.user_id);
            let changed = state.status != status;
            state.status = status;
            changed
        };
        if changed {
            info!(user_id = %ticket.user_id, status = %status, "Onboarding status resolved");
            let _ = self.tx.send(OnboardingEvent::Changed(status));
        }
    }
}
