//! Access policy middleware.
//!
//! Finds the request's token, runs it through the [`AccessPolicyEnforcer`]
//! and stores the outcome in request extensions for handlers.

use crate::errors::AuthError;
use crate::models::AuthenticatedContext;
use crate::policy::{AccessPolicyEnforcer, AccessState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Name of the cookie set by the login endpoint.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Enforce the access policy on every request passing through.
///
/// # Token sources
///
/// 1. `Authorization: Bearer <token>`
/// 2. the `accessToken` cookie
///
/// An `Authorization` header with any other scheme is an invalid token; it
/// does not fall through to the cookie.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` if a token is required but missing, or is invalid
/// - 403 if the token lacks the required authority
/// - otherwise the inner handler runs with [`AccessState`] (and, when
///   authenticated, [`AuthenticatedContext`]) in extensions
#[instrument(skip_all, name = "songify_auth.middleware.access")]
pub async fn enforce_access_policy(
    State(enforcer): State<Arc<AccessPolicyEnforcer>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(req.headers())?;

    let state = enforcer.enforce(token.as_deref(), req.method(), req.uri().path())?;

    if let AccessState::Authenticated(ctx) = &state {
        req.extensions_mut().insert(ctx.clone());
    }
    req.extensions_mut().insert(state);

    Ok(next.run(req).await)
}

/// Pull the raw token from the headers, Bearer header first.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| {
            tracing::debug!(target: "songify_auth.middleware", "Authorization header is not valid ASCII");
            AuthError::InvalidToken("Invalid Authorization header encoding".to_string())
        })?;

        let token = value.strip_prefix("Bearer ").ok_or_else(|| {
            tracing::debug!(target: "songify_auth.middleware", "Invalid Authorization header format");
            AuthError::InvalidToken("Invalid Authorization header format".to_string())
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken("Empty bearer token".to_string()));
        }
        return Ok(Some(token.to_string()));
    }

    Ok(cookie_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Extension trait for reading the access outcome from a request.
pub trait ContextExt {
    /// `None` if the middleware did not run or the caller is unauthenticated.
    fn auth_context(&self) -> Option<&AuthenticatedContext>;
}

impl<B> ContextExt for axum::http::Request<B> {
    fn auth_context(&self) -> Option<&AuthenticatedContext> {
        self.extensions().get::<AuthenticatedContext>()
    }
}
