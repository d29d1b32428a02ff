//! HTTP routes for the auth service.
//!
//! Defines the Axum router and application state.

use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::{KeyMaterial, PasswordVerifier};
use crate::errors::AuthError;
use crate::handlers;
use crate::middleware::enforce_access_policy;
use crate::policy::{AccessPolicy, AccessPolicyEnforcer};
use crate::repositories::PrincipalStore;
use crate::services::{ClaimsAuthorizationConverter, CredentialAuthenticator, TokenIssuer};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Login credential checks.
    pub authenticator: CredentialAuthenticator,

    /// Sole holder of the signing key.
    pub issuer: Arc<TokenIssuer>,

    /// Per-request policy decisions. Holds only the verifying key.
    pub enforcer: Arc<AccessPolicyEnforcer>,

    /// Time source for issuance and verification.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the auth components together.
    ///
    /// The key pair is split here: the signing half goes to the
    /// [`TokenIssuer`], the verifying half to the converter behind the
    /// enforcer.
    pub fn new(
        config: Config,
        store: Arc<dyn PrincipalStore>,
        verifier: Arc<dyn PasswordVerifier>,
        key_material: KeyMaterial,
        policy: AccessPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let (signing_key, verifying_key) = key_material.into_parts();

        let issuer = TokenIssuer::new(
            signing_key,
            config.issuer.clone(),
            config.token_expiration(),
        )?;

        let clock_skew = u64::try_from(config.jwt_clock_skew_seconds).map_err(|_| {
            tracing::error!(target: "songify_auth.routes", "Clock skew must not be negative");
            AuthError::Internal
        })?;
        let converter = ClaimsAuthorizationConverter::new(
            verifying_key,
            config.issuer.clone(),
            Duration::from_secs(clock_skew),
            clock.clone(),
        );

        Ok(Self {
            authenticator: CredentialAuthenticator::new(store, verifier),
            issuer: Arc::new(issuer),
            enforcer: Arc::new(AccessPolicyEnforcer::new(converter, Arc::new(policy))),
            clock,
            config,
        })
    }
}

/// Put `router` behind the access policy middleware.
///
/// Used for `/me` and for any resource routes mounted next to this service.
pub fn protect<S>(router: Router<S>, state: &AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        state.enforcer.clone(),
        enforce_access_policy,
    ))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/token` - Login, public
/// - `/health` - Liveness probe (simple "OK"), public
/// - `/metrics` - Prometheus metrics endpoint, public
/// - `/me` - Current token holder, behind the access policy
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    build_routes_with(state, metrics_handle, Router::new())
}

/// [`build_routes`] plus `resources`, mounted behind the access policy.
pub fn build_routes_with(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    resources: Router,
) -> Router {
    // Public routes (no token needed)
    let public_routes = Router::new()
        .route("/token", post(handlers::handle_login))
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Policy-enforced routes
    let protected_routes = protect(
        Router::new().route("/me", get(handlers::get_me)).merge(resources),
        &state,
    );

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
