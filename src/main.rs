use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

use chemflow::api::{ApiState, api_routes};
use chemflow::auth::{HttpAuthService, HttpCompanyLookup, LocalAuthService};
use chemflow::config::AppConfig;
use chemflow::identity::FileSessionStore;
use chemflow::shell::AppShell;
use chemflow::store::model::NewCompany;
use chemflow::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = config_from_env();

    eprintln!("⚗️  ChemFlow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://127.0.0.1:{}/api", config.api_port);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Session: {}", config.session_path.display());
    eprintln!("   Type `help` for commands. `quit` to exit.\n");

    // ── Database + REST API ─────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );

    let local_auth = Arc::new(LocalAuthService::new(Arc::clone(&db)));

    // Optional admin seed from the environment.
    if let (Ok(email), Ok(password)) = (
        std::env::var("CHEMFLOW_ADMIN_EMAIL"),
        std::env::var("CHEMFLOW_ADMIN_PASSWORD"),
    ) {
        let password = SecretString::from(password);
        if let Err(e) = local_auth.ensure_admin(&email, &password, "Administrator").await {
            tracing::warn!("Failed to seed admin account: {e}");
        }
    }

    let api_state = ApiState {
        db: Arc::clone(&db),
        auth: local_auth,
    };
    let listener = TcpListener::bind(("127.0.0.1", config.api_port)).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api_routes(api_state)).await {
            tracing::error!("API server exited: {e}");
        }
    });

    // ── Application core over the REST API ──────────────────────────
    // Same path the SPA takes: the core only ever talks to the backend
    // through the HTTP collaborators.
    let base_url = format!("http://127.0.0.1:{}", config.api_port);
    let shell = AppShell::start(
        Arc::new(HttpAuthService::new(base_url.clone())),
        Arc::new(HttpCompanyLookup::new(base_url.clone())),
        Arc::new(FileSessionStore::new(config.session_path.clone())),
        config.auth_timeout,
    )
    .await;

    // Print view changes as they happen.
    let mut views = shell.subscribe_views();
    tokio::spawn(async move {
        while let Ok(view) = views.recv().await {
            eprintln!("  [view] {} @ {}", view.region, view.path);
            eprint!("> ");
        }
    });

    let view = shell.active_view().await;
    eprintln!("  [view] {} @ {}", view.region, view.path);

    run_repl(shell, &base_url).await;
    Ok(())
}

/// Read configuration from CHEMFLOW_* environment variables.
fn config_from_env() -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        db_path: std::env::var("CHEMFLOW_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path),
        api_port: std::env::var("CHEMFLOW_API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.api_port),
        session_path: std::env::var("CHEMFLOW_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_path),
        auth_timeout: std::env::var("CHEMFLOW_AUTH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.auth_timeout),
    }
}

/// Interactive shell driving the application core from stdin.
async fn run_repl(shell: Arc<AppShell>, base_url: &str) {
    let http = reqwest::Client::new();
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprint!("> ");
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {e}");
                break;
            }
        };
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        match command {
            "login" => {
                let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
                    eprintln!("usage: login <email> <password>");
                    eprint!("> ");
                    continue;
                };
                let password = SecretString::from(password.to_string());
                match shell.sign_in(email, &password).await {
                    Ok(identity) => eprintln!("signed in as {} ({})", identity.name, identity.role),
                    Err(e) => eprintln!("sign-in failed: {e}"),
                }
            }
            "signup" => {
                let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
                    eprintln!("usage: signup <email> <password> <name>");
                    eprint!("> ");
                    continue;
                };
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = if name.is_empty() { email } else { name.as_str() };
                let password = SecretString::from(password.to_string());
                match shell.sign_up(email, &password, name).await {
                    Ok(identity) => eprintln!("account created for {}", identity.email),
                    Err(e) => eprintln!("sign-up failed: {e}"),
                }
            }
            "logout" => {
                shell.sign_out().await;
                eprintln!("signed out");
            }
            "reset" => {
                let Some(email) = parts.next() else {
                    eprintln!("usage: reset <email>");
                    eprint!("> ");
                    continue;
                };
                match shell.reset_password(email).await {
                    Ok(()) => eprintln!("password reset requested"),
                    Err(e) => eprintln!("reset failed: {e}"),
                }
            }
            "company" => {
                let Some(identity) = shell.current().await else {
                    eprintln!("sign in first");
                    eprint!("> ");
                    continue;
                };
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    eprintln!("usage: company <name>");
                    eprint!("> ");
                    continue;
                }
                let body = NewCompany {
                    user_id: identity.id,
                    company_name: name,
                    registration_number: None,
                    address: None,
                    contact_person: None,
                    contact_phone: None,
                    official_email: None,
                    industry_type: None,
                    gst_pan: None,
                };
                let created = http
                    .post(format!("{base_url}/api/company"))
                    .json(&body)
                    .send()
                    .await;
                match created {
                    Ok(response) if response.status().is_success() => {
                        eprintln!("company registered");
                        // Don't trust the cached Absent: re-check now.
                        shell.refresh_company_status().await;
                    }
                    Ok(response) => eprintln!("company creation failed: {}", response.status()),
                    Err(e) => eprintln!("company creation failed: {e}"),
                }
            }
            "go" => {
                let Some(path) = parts.next() else {
                    eprintln!("usage: go <path>");
                    eprint!("> ");
                    continue;
                };
                shell.navigate(path).await;
            }
            "whoami" => match shell.current().await {
                Some(identity) => {
                    eprintln!("{} <{}> role={}", identity.name, identity.email, identity.role)
                }
                None => eprintln!("signed out"),
            },
            "view" => {
                let view = shell.active_view().await;
                eprintln!("{} @ {}", view.region, view.path);
            }
            "help" => {
                eprintln!("commands:");
                eprintln!("  login <email> <password>   sign in");
                eprintln!("  signup <email> <password> <name>");
                eprintln!("  logout                     sign out");
                eprintln!("  reset <email>              request a password reset");
                eprintln!("  company <name>             register a company profile");
                eprintln!("  go <path>                  navigate (/, /submit, /profile, /admin)");
                eprintln!("  whoami / view              show identity / active view");
                eprintln!("  quit");
            }
            "quit" | "exit" => break,
            other => eprintln!("unknown command: {other} (try `help`)"),
        }
        eprint!("> ");
    }
}
