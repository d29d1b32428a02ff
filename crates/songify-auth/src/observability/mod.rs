//! Observability for the auth service.
//!
//! # Privacy by Default
//!
//! Instrumented functions use `#[instrument(skip_all)]` and add fields
//! explicitly. Fields fall into three groups:
//! - **SAFE**: logged as-is (algorithms, outcomes, resource names)
//! - **HASHED**: SHA-256 prefix only (usernames, token subjects)
//! - **NEVER**: passwords, password hashes, tokens, key material

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Lets log lines about the same username be grouped without writing the
/// username itself. Not a secret-protection mechanism.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad credentials, missing token
    Authentication,
    /// Insufficient authority
    Authorization,
    /// Invalid, expired or foreign tokens; signing failures
    Cryptographic,
    /// Store and system failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&crate::errors::AuthError> for ErrorCategory {
    fn from(err: &crate::errors::AuthError) -> Self {
        use crate::errors::AuthError;
        match err {
            AuthError::InvalidCredentials | AuthError::MissingToken => ErrorCategory::Authentication,
            AuthError::InsufficientAuthority { .. } => ErrorCategory::Authorization,
            AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::TokenIssuerMismatch
            | AuthError::Crypto(_)
            | AuthError::KeyMaterialUnavailable(_) => ErrorCategory::Cryptographic,
            AuthError::PrincipalStore(_) | AuthError::Internal => ErrorCategory::Internal,
        }
    }
}
