use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use licensegate::config::{Config, LicenseClass};
use licensegate::db::{AppState, create_pool, init_audit_db, init_db, queries};
use licensegate::error::AppError;
use licensegate::handlers;
use licensegate::jwt::{MIN_SECRET_LEN, PrincipalVerifier};
use licensegate::licensing;
use licensegate::models::{ActorType, AuditAction, Principal};

/// Signing secret used in dev mode when AUTH_JWT_SECRET is not set.
const DEV_JWT_SECRET: &str = "licensegate-dev-secret";

#[derive(Parser, Debug)]
#[command(name = "licensegate")]
#[command(about = "License activation and single-use redirect gateway")]
struct Cli {
    /// Seed the database with sample license keys (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete databases on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    /// Create license keys of the given class, print them, and exit
    #[arg(long, value_name = "CLASS")]
    create_license: Option<String>,

    /// Number of keys to create with --create-license
    #[arg(long, default_value_t = 1, requires = "create_license")]
    count: u32,

    /// Print an identity token for the given principal and exit (dev mode only)
    #[arg(long, num_args = 2, value_names = ["ID", "EMAIL"])]
    mint_dev_token: Option<Vec<String>>,
}

fn audit_system(state: &AppState, action: AuditAction, resource_type: &str, resource_id: &str) {
    let Some(audit) = state.audit_conn() else {
        return;
    };
    if let Err(e) = queries::create_audit_log(
        &audit,
        state.audit_log_enabled,
        ActorType::System,
        Some("cli"),
        None,
        action.as_ref(),
        resource_type,
        resource_id,
        None,
        None,
        None,
    ) {
        tracing::warn!("Failed to write audit log: {}", e);
    }
}

/// Mint `count` new keys under `class_name` and print them one per line.
fn create_licenses(state: &AppState, class_name: &str, count: u32) -> anyhow::Result<()> {
    let class = state.license_class(class_name).with_context(|| {
        let known: Vec<&str> = state.license_classes.iter().map(|c| c.name.as_str()).collect();
        format!(
            "Unknown license class '{}' (configured: {})",
            class_name,
            known.join(", ")
        )
    })?;

    let conn = state.db.get()?;
    for _ in 0..count {
        let license = licensing::create_license(&conn, class, None, &state.license_key_prefix)?;
        audit_system(state, AuditAction::CreateLicense, "license", &license.key);
        println!("{}", license.key);
    }
    Ok(())
}

/// Seeds fixed sample keys for local testing: one for each of the 7 and 30
/// day terms, if a class with that term is configured.
fn seed_dev_data(state: &AppState) -> anyhow::Result<()> {
    let conn = state.db.get()?;

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    for (key, days) in [("TEST-7DAYS-001", 7), ("TEST-30DAYS-001", 30)] {
        let Some(class) = state.license_classes.iter().find(|c| c.term_days == days) else {
            tracing::warn!("No {}-day license class configured, skipping {}", days, key);
            continue;
        };
        match licensing::create_license(&conn, class, Some(key), &state.license_key_prefix) {
            Ok(license) => {
                audit_system(state, AuditAction::CreateLicense, "license", &license.key);
                tracing::info!("License: {} ({}, {} days)", license.key, class.name, days);
            }
            Err(AppError::Conflict(_)) => {
                tracing::info!("License {} already exists, skipping", key);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("============================================");
    Ok(())
}

fn build_state(config: &Config, verifier: PrincipalVerifier) -> anyhow::Result<AppState> {
    let db_pool = create_pool(&config.database_path).context("Failed to create database pool")?;
    let audit_pool = create_pool(&config.audit_database_path)
        .context("Failed to create audit database pool")?;

    {
        let conn = db_pool.get()?;
        init_db(&conn).context("Failed to initialize database")?;
    }
    {
        let conn = audit_pool.get()?;
        init_audit_db(&conn).context("Failed to initialize audit database")?;
    }

    Ok(AppState {
        db: db_pool,
        audit: audit_pool,
        base_url: config.base_url.clone(),
        audit_log_enabled: config.audit_log_enabled,
        auth: Arc::new(verifier),
        redirect_token_ttl_secs: config.redirect_token_ttl_secs,
        allowed_redirect_hosts: Arc::new(config.allowed_redirect_hosts.clone()),
        license_classes: Arc::new(config.license_classes.clone()),
        license_key_prefix: config.license_key_prefix.clone(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "licensegate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let secret = match (&config.auth_jwt_secret, config.dev_mode) {
        (Some(secret), _) => secret.clone(),
        (None, true) => {
            tracing::warn!("AUTH_JWT_SECRET not set, using the built-in dev secret");
            DEV_JWT_SECRET.to_string()
        }
        (None, false) => bail!("AUTH_JWT_SECRET must be set outside dev mode"),
    };
    if secret.len() < MIN_SECRET_LEN {
        bail!(
            "AUTH_JWT_SECRET is {} bytes, identity tokens need at least {}",
            secret.len(),
            MIN_SECRET_LEN
        );
    }
    let verifier = PrincipalVerifier::new(
        secret.as_bytes(),
        config.auth_jwt_issuer.clone(),
        config.auth_jwt_audience.clone(),
    )?;

    if let Some(args) = &cli.mint_dev_token {
        if !config.dev_mode {
            bail!("--mint-dev-token is only available in dev mode (set LICENSEGATE_ENV=dev)");
        }
        let principal = Principal::new(args[0].as_str(), args[1].as_str());
        println!("{}", verifier.sign(&principal, 24 * 3600)?);
        return Ok(());
    }

    let state = build_state(&config, verifier)?;

    if let Some(class) = &cli.create_license {
        return create_licenses(&state, class, cli.count);
    }

    // Purge old audit logs on startup (0 = never purge)
    if config.audit_log_retention_days > 0 {
        if let Some(conn) = state.audit_conn() {
            match queries::purge_old_audit_logs(&conn, config.audit_log_retention_days) {
                Ok(count) if count > 0 => {
                    tracing::info!(
                        "Purged {} audit log entries older than {} days",
                        count,
                        config.audit_log_retention_days
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to purge old audit logs: {}", e),
            }
        }
    }

    if cli.seed {
        if config.dev_mode {
            seed_dev_data(&state)?;
        } else {
            tracing::warn!("--seed flag ignored: not in dev mode (set LICENSEGATE_ENV=dev)");
        }
    }

    let classes: Vec<String> = state
        .license_classes
        .iter()
        .map(|LicenseClass { name, term_days }| format!("{}={}d", name, term_days))
        .collect();
    tracing::info!("License classes: {}", classes.join(", "));

    let mut app = handlers::router(state.clone(), config.dev_mode)
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if let Some(cors) = handlers::cors_layer(&config.cors_allowed_origins) {
        app = app.layer(cors);
    }

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: databases will be deleted on exit");
    }

    tracing::info!("licensegate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral databases...");
        for path in [&config.database_path, &config.audit_database_path] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::info!("Removed {}", path),
                Err(e) => tracing::warn!("Failed to remove {}: {}", path, e),
            }
            let _ = std::fs::remove_file(format!("{}-wal", path));
            let _ = std::fs::remove_file(format!("{}-shm", path));
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
