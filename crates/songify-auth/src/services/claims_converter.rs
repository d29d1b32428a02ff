//! Inbound token verification.
//!
//! Turns a raw bearer token into an [`AuthenticatedContext`]. Checks run in a
//! fixed order and the first failure wins:
//!
//! 1. size limit and three-segment structure
//! 2. header `alg` equals the verifying key's algorithm
//! 3. signature
//! 4. claim shape (`sub`, `iat`, `exp`, `roles`)
//! 5. `iat` not further in the future than the configured skew
//! 6. issuer
//! 7. expiry (`now >= exp`)
//!
//! Anything unexpected in the payload is a failure. There is no path on which
//! a malformed claim turns into an empty authority set.

use crate::clock::Clock;
use crate::crypto::{self, VerifyingKey};
use crate::errors::AuthError;
use crate::models::{Authority, AuthenticatedContext};
use crate::observability::metrics::record_token_validation;
use crate::observability::{hash_for_correlation, ErrorCategory};
use chrono::{DateTime, Utc};
use common::jwt::{extract_alg, validate_iat_at};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Verifies tokens with the public key only.
#[derive(Clone)]
pub struct ClaimsAuthorizationConverter {
    verifying_key: VerifyingKey,
    issuer: String,
    clock_skew: Duration,
    clock: Arc<dyn Clock>,
}

impl ClaimsAuthorizationConverter {
    pub fn new(
        verifying_key: VerifyingKey,
        issuer: impl Into<String>,
        clock_skew: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifying_key,
            issuer: issuer.into(),
            clock_skew,
            clock,
        }
    }

    /// Verify `raw` against the injected clock's current time.
    pub fn convert(&self, raw: &str) -> Result<AuthenticatedContext, AuthError> {
        self.convert_at(raw, self.clock.now())
    }

    /// Verify `raw` as of `now`.
    #[instrument(skip_all)]
    pub fn convert_at(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedContext, AuthError> {
        let result = self.verify(raw, now.timestamp());

        match &result {
            Ok(ctx) => {
                record_token_validation("success", None);
                tracing::debug!(
                    target: "songify_auth.converter",
                    subject = %hash_for_correlation(&ctx.subject),
                    "Token accepted"
                );
            }
            Err(e) => {
                record_token_validation("error", Some(ErrorCategory::from(e).as_str()));
                tracing::debug!(target: "songify_auth.converter", error = %e, "Token rejected");
            }
        }

        result
    }

    fn verify(&self, raw: &str, now: i64) -> Result<AuthenticatedContext, AuthError> {
        let alg = extract_alg(raw)?;
        let expected = self.verifying_key.algorithm().as_str();
        if alg != expected {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm '{}', expected '{}'",
                alg, expected
            )));
        }

        let payload = crypto::verify_signature(raw, &self.verifying_key)?;
        let payload = payload
            .as_object()
            .ok_or_else(|| AuthError::InvalidToken("payload is not an object".to_string()))?;

        let subject = required_string(payload, "sub")?;
        let iat = required_integer(payload, "iat")?;
        let exp = required_integer(payload, "exp")?;
        if exp <= iat {
            return Err(AuthError::InvalidToken("exp must be after iat".to_string()));
        }
        let authorities = roles_claim(payload)?;

        validate_iat_at(iat, self.clock_skew, now)?;

        match payload.get("iss") {
            Some(Value::String(iss)) if *iss == self.issuer => {}
            _ => return Err(AuthError::TokenIssuerMismatch),
        }

        if now >= exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(AuthenticatedContext {
            subject,
            authorities,
            issued_at: iat,
            expires_at: exp,
        })
    }
}

fn required_string(payload: &Map<String, Value>, name: &str) -> Result<String, AuthError> {
    match payload.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(AuthError::InvalidToken(format!(
            "claim '{}' must be a non-empty string",
            name
        ))),
    }
}

fn required_integer(payload: &Map<String, Value>, name: &str) -> Result<i64, AuthError> {
    payload
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| AuthError::InvalidToken(format!("claim '{}' must be an integer", name)))
}

/// Absent roles mean no authorities. Present roles must be an array of valid
/// authority strings; `null` or any other shape is rejected.
fn roles_claim(payload: &Map<String, Value>) -> Result<BTreeSet<Authority>, AuthError> {
    let Some(roles) = payload.get("roles") else {
        return Ok(BTreeSet::new());
    };

    let roles = roles
        .as_array()
        .ok_or_else(|| AuthError::InvalidToken("claim 'roles' must be an array".to_string()))?;

    roles
        .iter()
        .map(|role| {
            role.as_str()
                .ok_or_else(|| AuthError::InvalidToken("role must be a string".to_string()))
                .and_then(|name| {
                    Authority::new(name).map_err(|e| AuthError::InvalidToken(format!("role: {}", e)))
                })
        })
        .collect()
}
