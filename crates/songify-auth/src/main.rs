//! Songify Auth Service
//!
//! Issues signed access tokens and enforces the access policy.

use songify_auth::clock::SystemClock;
use songify_auth::config::Config;
use songify_auth::crypto::BcryptPasswordVerifier;
use songify_auth::observability::metrics::init_metrics_recorder;
use songify_auth::policy::AccessPolicy;
use songify_auth::repositories::{InMemoryPrincipalStore, PrincipalStore};
use songify_auth::routes::{self, AppState};
use songify_auth::services::key_management_service;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songify_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Songify Auth");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        issuer = %config.issuer,
        algorithm = %config.signing_algorithm,
        token_expiration_minutes = config.token_expiration_minutes,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Key material is required before anything can be served
    info!("Initializing signing keys...");
    let key_material = key_management_service::initialize_key_material(&config).map_err(|e| {
        error!("Failed to initialize signing keys: {}", e);
        e
    })?;

    let store: Arc<dyn PrincipalStore> = match &config.principals_file {
        Some(path) => {
            let store = InMemoryPrincipalStore::from_file(path).map_err(|e| {
                error!("Failed to load principals: {}", e);
                e
            })?;
            info!(principals = store.len(), "Principal store loaded");
            Arc::new(store)
        }
        None => {
            warn!("PRINCIPALS_FILE not set, every login will be rejected");
            Arc::new(InMemoryPrincipalStore::default())
        }
    };

    let policy = match &config.access_policy_file {
        Some(path) => AccessPolicy::from_file(path).map_err(|e| {
            error!("Failed to load access policy: {}", e);
            e
        })?,
        None => AccessPolicy::catalog_default(),
    };
    info!(rules = policy.len(), fallback = %policy.fallback(), "Access policy loaded");

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    let state = AppState::new(
        config,
        store,
        Arc::new(BcryptPasswordVerifier::new()),
        key_material,
        policy,
        Arc::new(SystemClock),
    )
    .map_err(|e| {
        error!("Failed to build application state: {}", e);
        e
    })?;

    let app = routes::build_routes(Arc::new(state), metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Songify Auth listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Songify Auth shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
