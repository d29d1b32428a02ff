//! Token issuance.

use crate::crypto::{self, Claims, SigningKey};
use crate::errors::AuthError;
use crate::models::Principal;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_token_issuance;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::time::Instant;
use tracing::instrument;

/// A freshly signed token and its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl IssuedToken {
    /// Remaining lifetime in whole seconds, as used for the cookie `Max-Age`.
    pub fn lifetime_seconds(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Builds and signs bearer tokens. Holds the only reference to the private key.
#[derive(Debug)]
pub struct TokenIssuer {
    signing_key: SigningKey,
    issuer: String,
    expiration: Duration,
}

impl TokenIssuer {
    /// # Errors
    ///
    /// `Internal` if the expiration window is not strictly positive or the
    /// issuer is empty.
    pub fn new(
        signing_key: SigningKey,
        issuer: impl Into<String>,
        expiration: Duration,
    ) -> Result<Self, AuthError> {
        let issuer = issuer.into();
        if expiration <= Duration::zero() {
            tracing::error!(target: "songify_auth.token", "Token expiration window must be positive");
            return Err(AuthError::Internal);
        }
        if issuer.is_empty() {
            tracing::error!(target: "songify_auth.token", "Token issuer must not be empty");
            return Err(AuthError::Internal);
        }

        Ok(Self {
            signing_key,
            issuer,
            expiration,
        })
    }

    /// Issue a token for `principal` whose window starts at `now`.
    ///
    /// `now` is truncated to whole seconds so `iat`/`exp` match the returned
    /// timestamps exactly.
    #[instrument(skip_all, fields(subject = %hash_for_correlation(&principal.username)))]
    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let start = Instant::now();

        let result = self.sign(principal, now);

        let status = if result.is_ok() { "success" } else { "error" };
        record_token_issuance(status, start.elapsed());

        result
    }

    fn sign(&self, principal: &Principal, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.expiration.num_seconds())
            .ok_or(AuthError::Internal)?;

        let issued_at = DateTime::from_timestamp(iat, 0).ok_or(AuthError::Internal)?;
        let expires_at = DateTime::from_timestamp(exp, 0).ok_or(AuthError::Internal)?;

        let claims = Claims {
            sub: principal.username.clone(),
            iat,
            exp,
            iss: Some(self.issuer.clone()),
            roles: principal.authority_names(),
        };

        let token = crypto::sign_token(&claims, &self.signing_key)?;

        tracing::debug!(
            target: "songify_auth.token",
            algorithm = %self.signing_key.algorithm(),
            roles = ?claims.roles,
            exp = exp,
            "Issued token"
        );

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }
}
