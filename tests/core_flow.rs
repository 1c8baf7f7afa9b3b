//! Integration tests for the application core: session restore, the
//! onboarding gate, and view routing, wired together by the shell over
//! stub collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::time::timeout;
use uuid::Uuid;

use chemflow::auth::{AuthService, CompanyLookup};
use chemflow::error::{AuthError, LookupError};
use chemflow::identity::{Identity, MemorySessionStore, Role, SessionStore};
use chemflow::onboarding::OnboardingStatus;
use chemflow::routing::{ActiveView, ViewRegion};
use chemflow::shell::AppShell;
use chemflow::store::model::{CompanyProfile, NewCompany};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const AUTH_TIMEOUT: Duration = Duration::from_millis(500);

fn identity(email: &str, role: Role) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: email.into(),
        name: email.split('@').next().unwrap_or(email).into(),
        role,
        created_at: Utc::now(),
    }
}

/// In-memory auth service stub with registered accounts.
struct TestAuth {
    accounts: Mutex<HashMap<String, (String, Identity)>>,
}

impl TestAuth {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
        })
    }

    async fn register(&self, email: &str, password: &str, role: Role) -> Identity {
        let who = identity(email, role);
        self.accounts
            .lock()
            .await
            .insert(email.to_string(), (password.to_string(), who.clone()));
        who
    }
}

#[async_trait]
impl AuthService for TestAuth {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock().await;
        let (expected, who) = accounts.get(email).ok_or(AuthError::NotFound)?;
        if expected != password.expose_secret() {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(who.clone())
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &SecretString,
        name: &str,
    ) -> Result<Identity, AuthError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(AuthError::AlreadyExists);
        }
        let mut who = identity(email, Role::User);
        who.name = name.to_string();
        accounts.insert(email.to_string(), ("".into(), who.clone()));
        Ok(who)
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }
}

/// Company lookup stub: a set of user ids that have companies, a call
/// counter, and an optional hold point to control when results land.
struct TestLookup {
    companies: Mutex<HashSet<Uuid>>,
    calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl TestLookup {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            companies: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            hold: None,
        })
    }

    fn held(hold: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            companies: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            hold: Some(hold),
        })
    }

    async fn add_company(&self, user_id: Uuid) {
        self.companies.lock().await.insert(user_id);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompanyLookup for TestLookup {
    async fn company_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CompanyProfile>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if self.companies.lock().await.contains(&user_id) {
            Ok(Some(CompanyProfile::create(NewCompany {
                user_id,
                company_name: "Acme Chemicals".into(),
                registration_number: None,
                address: None,
                contact_person: None,
                contact_phone: None,
                official_email: None,
                industry_type: None,
                gst_pan: None,
            })))
        } else {
            Ok(None)
        }
    }
}

/// Wait until the router publishes the expected region.
async fn wait_for_region(
    rx: &mut broadcast::Receiver<ActiveView>,
    expected: ViewRegion,
) -> ActiveView {
    loop {
        let view = timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for view change")
            .expect("view channel closed");
        if view.region == expected {
            return view;
        }
    }
}

async fn start_shell(
    auth: Arc<TestAuth>,
    lookup: Arc<TestLookup>,
    session: Arc<dyn SessionStore>,
) -> Arc<AppShell> {
    AppShell::start(auth, lookup, session, AUTH_TIMEOUT).await
}

fn password(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

#[tokio::test]
async fn fresh_start_lands_on_login() {
    timeout(TEST_TIMEOUT, async {
        let shell = start_shell(
            TestAuth::new(),
            TestLookup::new(),
            Arc::new(MemorySessionStore::new()),
        )
        .await;

        assert!(shell.settled().await);
        assert_eq!(shell.active_view().await.region, ViewRegion::LoginArea);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn corrupt_session_starts_logged_out_and_repairs() {
    timeout(TEST_TIMEOUT, async {
        let session = Arc::new(MemorySessionStore::with_record(b"}}garbage{{".to_vec()));
        let shell = start_shell(
            TestAuth::new(),
            TestLookup::new(),
            Arc::clone(&session) as Arc<dyn SessionStore>,
        )
        .await;

        assert_eq!(shell.active_view().await.region, ViewRegion::LoginArea);
        assert!(session.load().await.unwrap().is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn restored_session_with_company_reaches_user_area() {
    timeout(TEST_TIMEOUT, async {
        let who = identity("ops@acme.example", Role::User);
        let lookup = TestLookup::new();
        lookup.add_company(who.id).await;
        let session = Arc::new(MemorySessionStore::with_record(
            serde_json::to_vec(&who).unwrap(),
        ));

        let shell = start_shell(TestAuth::new(), lookup, session).await;
        let mut views = shell.subscribe_views();

        // The gate check is still in flight right after startup; the
        // router must show Loading (never a guessed area) until the
        // status resolves.
        let view = shell.active_view().await;
        assert!(
            view.region == ViewRegion::Loading || view.region == ViewRegion::UserArea,
            "unexpected region {:?}",
            view.region
        );

        if view.region != ViewRegion::UserArea {
            wait_for_region(&mut views, ViewRegion::UserArea).await;
        }
        assert_eq!(shell.onboarding_status().await, OnboardingStatus::Present);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sign_in_without_company_reaches_onboarding() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        auth.register("ops@acme.example", "hunter2", Role::User).await;

        let shell = start_shell(
            Arc::clone(&auth),
            TestLookup::new(),
            Arc::new(MemorySessionStore::new()),
        )
        .await;
        let mut views = shell.subscribe_views();

        shell
            .sign_in("ops@acme.example", &password("hunter2"))
            .await
            .unwrap();

        let view = wait_for_region(&mut views, ViewRegion::OnboardingArea).await;
        assert_eq!(view.region, ViewRegion::OnboardingArea);
        assert_eq!(shell.onboarding_status().await, OnboardingStatus::Absent);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn company_creation_then_refresh_unlocks_user_area() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        let who = auth.register("ops@acme.example", "hunter2", Role::User).await;
        let lookup = TestLookup::new();

        let shell = start_shell(
            Arc::clone(&auth),
            Arc::clone(&lookup),
            Arc::new(MemorySessionStore::new()),
        )
        .await;
        let mut views = shell.subscribe_views();

        shell
            .sign_in("ops@acme.example", &password("hunter2"))
            .await
            .unwrap();
        wait_for_region(&mut views, ViewRegion::OnboardingArea).await;

        // The company form was submitted; the gate must re-check instead
        // of trusting its cached Absent.
        lookup.add_company(who.id).await;
        shell.refresh_company_status().await;

        wait_for_region(&mut views, ViewRegion::UserArea).await;
        assert_eq!(shell.onboarding_status().await, OnboardingStatus::Present);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn admin_reaches_admin_area_without_a_lookup_call() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        auth.register("root@chemflow.example", "hunter2", Role::Admin)
            .await;
        let lookup = TestLookup::new();

        let shell = start_shell(
            Arc::clone(&auth),
            Arc::clone(&lookup),
            Arc::new(MemorySessionStore::new()),
        )
        .await;
        let mut views = shell.subscribe_views();

        shell
            .sign_in("root@chemflow.example", &password("hunter2"))
            .await
            .unwrap();

        let view = wait_for_region(&mut views, ViewRegion::AdminArea).await;
        assert_eq!(view.path, "/admin");
        assert_eq!(shell.onboarding_status().await, OnboardingStatus::Present);
        assert_eq!(lookup.calls(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sign_out_discards_the_in_flight_company_check() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        let who = auth.register("ops@acme.example", "hunter2", Role::User).await;
        let hold = Arc::new(Notify::new());
        let lookup = TestLookup::held(Arc::clone(&hold));
        lookup.add_company(who.id).await;

        let shell = start_shell(
            Arc::clone(&auth),
            Arc::clone(&lookup),
            Arc::new(MemorySessionStore::new()),
        )
        .await;
        let mut views = shell.subscribe_views();

        shell
            .sign_in("ops@acme.example", &password("hunter2"))
            .await
            .unwrap();
        wait_for_region(&mut views, ViewRegion::Loading).await;
        // Make sure the company check is actually in flight.
        while lookup.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Sign out while the company check is still in flight, then let
        // the stale Present land. It must not be applied.
        shell.sign_out().await;
        wait_for_region(&mut views, ViewRegion::LoginArea).await;
        hold.notify_one();

        // Give the stale result a chance to (incorrectly) apply.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(shell.onboarding_status().await, OnboardingStatus::Unknown);
        assert_eq!(shell.active_view().await.region, ViewRegion::LoginArea);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_sign_in_stays_on_login() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        auth.register("ops@acme.example", "hunter2", Role::User).await;

        let shell = start_shell(
            Arc::clone(&auth),
            TestLookup::new(),
            Arc::new(MemorySessionStore::new()),
        )
        .await;

        let err = shell
            .sign_in("ops@acme.example", &password("wrong"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(shell.settled().await);
        assert_eq!(shell.active_view().await.region, ViewRegion::LoginArea);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_paths_redirect_to_area_default() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        let who = auth.register("ops@acme.example", "hunter2", Role::User).await;
        let lookup = TestLookup::new();
        lookup.add_company(who.id).await;

        let shell = start_shell(
            Arc::clone(&auth),
            lookup,
            Arc::new(MemorySessionStore::new()),
        )
        .await;
        let mut views = shell.subscribe_views();

        shell
            .sign_in("ops@acme.example", &password("hunter2"))
            .await
            .unwrap();
        wait_for_region(&mut views, ViewRegion::UserArea).await;

        let view = shell.navigate("/definitely-not-a-page").await;
        assert_eq!(view.region, ViewRegion::UserArea);
        assert_eq!(view.path, "/");

        let view = shell.navigate("/404").await;
        assert_eq!(view.region, ViewRegion::NotFound);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn session_survives_restart() {
    timeout(TEST_TIMEOUT, async {
        let auth = TestAuth::new();
        let who = auth.register("ops@acme.example", "hunter2", Role::User).await;
        let lookup = TestLookup::new();
        lookup.add_company(who.id).await;
        let session = Arc::new(MemorySessionStore::new());

        // First run: sign in, which persists the session.
        let shell = start_shell(
            Arc::clone(&auth),
            Arc::clone(&lookup),
            Arc::clone(&session) as Arc<dyn SessionStore>,
        )
        .await;
        shell
            .sign_in("ops@acme.example", &password("hunter2"))
            .await
            .unwrap();

        // Second run over the same store: the identity comes back
        // without a sign-in.
        let restarted = start_shell(auth, lookup, session).await;
        assert_eq!(restarted.current().await, Some(who));
    })
    .await
    .expect("test timed out");
}
