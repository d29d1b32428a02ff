//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real auth server instances in tests.

use crate::clock::ManualClock;
use crate::crypto_fixtures::{test_key_material, test_password_hash};
use crate::test_ids::*;
use axum::{
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::{json, Value};
use songify_auth::config::Config;
use songify_auth::crypto::BcryptPasswordVerifier;
use songify_auth::models::{AuthenticatedContext, LoginResponse, Principal};
use songify_auth::observability::metrics::init_metrics_recorder;
use songify_auth::policy::{AccessPolicy, CATALOG_RESOURCES};
use songify_auth::repositories::InMemoryPrincipalStore;
use songify_auth::routes::{self, AppState};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the auth server in E2E tests
///
/// The server is seeded with `alice/pw1/[ADMIN]`, `bob/pw2/[USER]` and a
/// disabled `carol/pw3/[USER]`, signs with the fixture key pair, and mounts
/// stub catalog endpoints behind the access policy.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> Result<()> {
///     let server = TestAuthServer::spawn().await?;
///     let response = reqwest::Client::new()
///         .post(format!("{}/token", server.url()))
///         .json(&json!({"username": "alice", "password": "pw1"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    clock: Arc<ManualClock>,
    handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn with default configuration and a clock starting at wall time.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(Arc::new(ManualClock::starting_now()), HashMap::new()).await
    }

    /// Spawn with default configuration and the given clock.
    pub async fn spawn_with_clock(clock: Arc<ManualClock>) -> Result<Self, anyhow::Error> {
        Self::spawn_with(clock, HashMap::new()).await
    }

    /// Spawn with configuration overrides, as environment variable pairs.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Sign with the fixture key pair for the configured algorithm
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        clock: Arc<ManualClock>,
        vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Invalid test configuration: {}", e))?;
        config.bind_address = "127.0.0.1:0".to_string();

        let store = InMemoryPrincipalStore::new(seeded_principals())
            .map_err(|e| anyhow::anyhow!("Failed to seed principals: {}", e))?;
        let verifier = BcryptPasswordVerifier::with_dummy_hash(test_password_hash("dummy"));

        let state = AppState::new(
            config.clone(),
            Arc::new(store),
            Arc::new(verifier),
            test_key_material(config.signing_algorithm),
            AccessPolicy::catalog_default(),
            clock.clone(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to build application state: {}", e))?;
        let state = Arc::new(state);

        // Build routes using the service's real route builder
        let app = routes::build_routes_with(state.clone(), test_metrics_handle(), catalog_routes());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind(config.bind_address.as_str())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            clock,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// The clock the server reads; advance it to age tokens.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// POST /token and return the raw response.
    pub async fn login_response(
        &self,
        username: &str,
        password: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = reqwest::Client::new()
            .post(format!("{}/token", self.url()))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        Ok(response)
    }

    /// Log in and return the token, failing on any non-200 response.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, anyhow::Error> {
        let response = self.login_response(username, password).await?;
        if response.status() != reqwest::StatusCode::OK {
            anyhow::bail!("Login for {} failed with {}", username, response.status());
        }
        let body: LoginResponse = response.json().await?;
        Ok(body.token)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn principal(id: Uuid, username: &str, password: &str, role: &str, enabled: bool) -> Principal {
    Principal {
        id,
        username: username.to_string(),
        password_hash: test_password_hash(password),
        enabled,
        authorities: BTreeSet::from([role.parse().expect("fixture role is valid")]),
    }
}

/// alice (ADMIN), bob (USER) and disabled carol (USER).
pub fn seeded_principals() -> Vec<Principal> {
    vec![
        principal(TEST_USER_ALICE, ALICE_USERNAME, ALICE_PASSWORD, ROLE_ADMIN, true),
        principal(TEST_USER_BOB, BOB_USERNAME, BOB_PASSWORD, ROLE_USER, true),
        principal(TEST_USER_CAROL, CAROL_USERNAME, CAROL_PASSWORD, ROLE_USER, false),
    ]
}

/// Stub catalog endpoints. They do no work of their own; they exist so tests
/// can observe the policy decisions in front of them.
pub fn catalog_routes() -> Router {
    CATALOG_RESOURCES
        .iter()
        .fold(Router::new(), |router, resource| {
            router
                .route(&format!("/{resource}"), get(list_items).post(create_item))
                .route(
                    &format!("/{resource}/:id"),
                    get(get_item).put(update_item).patch(update_item).delete(delete_item),
                )
        })
}

async fn list_items() -> Json<Value> {
    Json(json!([]))
}

async fn get_item() -> Json<Value> {
    Json(json!({}))
}

async fn create_item(Extension(ctx): Extension<AuthenticatedContext>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "created_by": ctx.subject })))
}

async fn update_item(Extension(ctx): Extension<AuthenticatedContext>) -> Json<Value> {
    Json(json!({ "updated_by": ctx.subject }))
}

async fn delete_item() -> StatusCode {
    StatusCode::NO_CONTENT
}
