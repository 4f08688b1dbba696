//! Warden Core - pluggable authentication for HTTP APIs.
//!
//! Every request passes an access gate; unless its path is excluded, the
//! configured strategy (basic credentials or session cookies, optionally
//! expiring and persisted) must resolve it to a user.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePool;
use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod logging;
mod storage;

use crate::api::build_router;
use crate::auth::{
    AccountService, AuthStrategy, BasicAuth, Clock, GateState, SessionAuth, SessionDbAuth,
    SessionExpAuth, SessionExpiry, SessionStore, SystemClock,
};
use crate::config::{AuthConfig, AuthType, Config, SessionStoreKind};
use crate::error::WardenResult;
use crate::storage::{FileSessionStore, SessionPersistence, UserStore, WardenRepository};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The configured authentication strategy.
    pub strategy: Arc<dyn AuthStrategy>,
    /// Registration, login checks and password resets.
    pub accounts: AccountService,
    /// Cookie name and lifetime for login responses.
    pub auth_config: Arc<AuthConfig>,
}

/// Assemble the strategy named by `auth.auth_type`.
async fn build_strategy(
    auth: &AuthConfig,
    repository: &WardenRepository,
) -> WardenResult<Arc<dyn AuthStrategy>> {
    let users: Arc<dyn UserStore> = Arc::new(repository.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let base = || {
        SessionAuth::new(
            SessionStore::new(),
            auth.session_name.clone(),
            users.clone(),
            clock.clone(),
        )
    };
    let expiry = SessionExpiry::new(auth.session_duration, clock.clone());

    let strategy: Arc<dyn AuthStrategy> = match auth.auth_type {
        AuthType::BasicAuth => Arc::new(BasicAuth::new(users.clone())),
        AuthType::SessionAuth => Arc::new(base()),
        AuthType::SessionExpAuth => Arc::new(SessionExpAuth::new(base(), expiry)),
        AuthType::SessionDbAuth => {
            let persistence: Arc<dyn SessionPersistence> = match auth.session_store {
                SessionStoreKind::Sqlite => Arc::new(repository.clone()),
                SessionStoreKind::File => Arc::new(FileSessionStore::new(&auth.session_file)),
            };
            let strategy = SessionDbAuth::new(base(), persistence, expiry);
            strategy.reload().await?;
            Arc::new(strategy)
        }
    };

    Ok(strategy)
}

/// Periodically drop expired sessions.
fn spawn_session_sweeper(strategy: Arc<dyn AuthStrategy>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(sessions) = strategy.as_session() else {
                return;
            };
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Expired sessions swept"),
                Err(e) => tracing::error!(error = %e, "Session sweep failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    // This is optional and won't fail if .env doesn't exist
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init()?;

    tracing::info!("Starting Warden Core v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url,
        auth_type = ?config.auth.auth_type,
        session_duration = config.auth.session_duration,
        excluded_paths = config.auth.excluded_paths.len(),
        "Configuration loaded"
    );

    // Connect to database
    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    // Initialize repository and schema
    let repository = WardenRepository::new(pool);
    repository.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!("Database connected and schema initialized");

    // Build authentication components
    let strategy = build_strategy(&config.auth, &repository)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build authentication strategy");
            anyhow::anyhow!("Authentication setup error: {}", e)
        })?;

    tracing::info!(strategy = strategy.name(), "Authentication strategy ready");

    if config.auth.auth_type.uses_sessions()
        && config.auth.auth_type != AuthType::SessionAuth
        && config.auth.session_duration > 0
    {
        spawn_session_sweeper(strategy.clone(), config.auth.sweep_interval_secs);
    }

    let gate = GateState {
        strategy: strategy.clone(),
        exclusions: Arc::new(config.auth.excluded_paths.clone()),
        session_name: config.auth.session_name.clone(),
    };

    // Build application state
    let state = AppState {
        strategy,
        accounts: AccountService::new(repository),
        auth_config: Arc::new(config.auth.clone()),
    };

    // Build router
    let app = build_router(state, gate);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
