//! Structural JWT checks shared by the issuing and verifying sides.
//!
//! Nothing in this module verifies a signature. It only answers questions
//! that must be settled before any cryptography runs:
//!
//! - is the token small enough to parse at all
//! - does it have the `header.payload.signature` shape
//! - which algorithm does its header claim
//! - is its `iat` plausibly not from the future
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Every error renders the same generic message so callers cannot
//!   distinguish failure reasons from the outside
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_alg, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! let alg = extract_alg(token)?;
//! if alg != "RS256" {
//!     return Err(...);
//! }
//!
//! // After signature verification
//! validate_iat_at(claims.iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical Songify tokens are 500-700 bytes with an RS256 signature and a
/// handful of roles. Anything past 8KB is rejected before base64 decoding or
/// signature verification so oversized input costs almost nothing.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens whose `iat` lies more than this far in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from structural JWT checks.
///
/// Display output is deliberately identical for every variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not three base64url segments with a JSON header.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Header has no string `alg` field.
    #[error("The access token is invalid or expired")]
    MissingAlgorithm,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a token into its three segments after the size check.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - token does not have exactly three non-empty segments
pub fn split_segments(token: &str) -> Result<(&str, &str, &str), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => {
            tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Extract the `alg` value from a JWT header without verifying the signature.
///
/// Used to reject tokens that claim an algorithm other than the one the
/// verifying key is bound to, before any signature work happens. The returned
/// value must never be used to *choose* a verification algorithm.
///
/// # Errors
///
/// - `TokenTooLarge` / `MalformedToken` - see [`split_segments`]
/// - `MissingAlgorithm` - header lacks a non-empty string `alg`
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    let (header_part, _, _) = split_segments(token)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlgorithm)
}

/// Validate the `iat` (issued-at) claim against an explicit `now`.
///
/// Callers pass the time from their injected clock so that expiry and skew
/// behave identically under test and in production.
///
/// # Errors
///
/// Returns `IatTooFarInFuture` if `iat` is more than `clock_skew` after `now`.
pub fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds)
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
