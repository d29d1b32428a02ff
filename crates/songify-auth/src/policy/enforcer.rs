//! Per-request access decisions.
//!
//! A request moves through `Unauthenticated -> Authenticated -> {Authorized, Denied}`.
//! No token leaves it `Unauthenticated`, which only passes `public`
//! requirements. A token that fails verification is rejected outright, even
//! where no token would have been needed.

use super::{resource_for_path, AccessPolicy, Action, Requirement};
use crate::errors::AuthError;
use crate::models::AuthenticatedContext;
use crate::observability::metrics::record_access_decision;
use crate::services::ClaimsAuthorizationConverter;
use axum::http::Method;
use std::sync::Arc;
use tracing::instrument;

/// Authentication outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Unauthenticated,
    Authenticated(AuthenticatedContext),
}

impl AccessState {
    pub fn context(&self) -> Option<&AuthenticatedContext> {
        match self {
            AccessState::Unauthenticated => None,
            AccessState::Authenticated(ctx) => Some(ctx),
        }
    }
}

#[derive(Clone)]
pub struct AccessPolicyEnforcer {
    converter: ClaimsAuthorizationConverter,
    policy: Arc<AccessPolicy>,
}

impl AccessPolicyEnforcer {
    pub fn new(converter: ClaimsAuthorizationConverter, policy: Arc<AccessPolicy>) -> Self {
        Self { converter, policy }
    }

    /// Resolve the request's token, if any.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AccessState, AuthError> {
        match token {
            None => Ok(AccessState::Unauthenticated),
            Some(raw) => self.converter.convert(raw).map(AccessState::Authenticated),
        }
    }

    /// Check `state` against the requirement for (resource, action).
    ///
    /// Unauthenticated callers that fall short get `MissingToken` (401);
    /// authenticated ones get `InsufficientAuthority` (403).
    pub fn authorize(
        &self,
        resource: Option<&str>,
        action: Option<Action>,
        state: &AccessState,
    ) -> Result<(), AuthError> {
        let requirement = self.policy.requirement_for(resource, action);

        if requirement.is_satisfied_by(state.context()) {
            let outcome = if *requirement == Requirement::Public {
                "public"
            } else {
                "authorized"
            };
            record_access_decision(outcome);
            return Ok(());
        }

        match state {
            AccessState::Unauthenticated => {
                record_access_decision("unauthenticated");
                Err(AuthError::MissingToken)
            }
            AccessState::Authenticated(ctx) => {
                record_access_decision("denied");
                tracing::info!(
                    target: "songify_auth.policy",
                    resource = resource.unwrap_or("-"),
                    action = action.map(|a| a.as_str()).unwrap_or("-"),
                    required = %requirement,
                    "Access denied"
                );
                Err(AuthError::InsufficientAuthority {
                    required: requirement.to_string(),
                    provided: ctx.authority_names(),
                })
            }
        }
    }

    /// Authenticate then authorize a request.
    #[instrument(skip_all, fields(method = %method, resource))]
    pub fn enforce(
        &self,
        token: Option<&str>,
        method: &Method,
        path: &str,
    ) -> Result<AccessState, AuthError> {
        let resource = resource_for_path(path);
        tracing::Span::current().record("resource", resource.unwrap_or("-"));

        let state = self.authenticate(token).map_err(|e| {
            record_access_decision("unauthenticated");
            e
        })?;

        self.authorize(resource, Action::from_method(method), &state)?;

        Ok(state)
    }
}
