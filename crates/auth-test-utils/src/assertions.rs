//! Custom test assertions for expressive tests
//!
//! Decodes tokens without verifying them; signature checks belong to the
//! service under test.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {}", index));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT segment {} JSON: {}", index, e))
}

fn claims(token: &str) -> JwtClaims {
    decode_part(token, 1)
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject("alice")
///     .assert_roles(&["ADMIN"])
///     .assert_lifetime(3600);
/// ```
pub trait TokenAssertions {
    /// Assert the token is a three-segment RS256 JWT with the expected claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the header names `alg`
    fn assert_algorithm(&self, alg: &str) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that the token carries the role
    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert the exact `roles` claim, order included
    fn assert_roles(&self, roles: &[&str]) -> &Self;

    fn assert_issuer(&self, issuer: &str) -> &Self;

    /// Assert `exp - iat`
    fn assert_lifetime(&self, seconds: i64) -> &Self;

    fn assert_issued_at(&self, timestamp: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let segments = self.split('.').count();
        assert_eq!(
            segments, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            segments
        );

        let header: JwtHeader = decode_part(self, 0);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        let claims = claims(self);
        assert!(!claims.sub.is_empty(), "Token subject is empty");
        assert!(
            claims.exp > claims.iat,
            "exp ({}) must be after iat ({})",
            claims.exp,
            claims.iat
        );

        self
    }

    fn assert_algorithm(&self, alg: &str) -> &Self {
        let header: JwtHeader = decode_part(self, 0);
        assert_eq!(header.alg, alg, "Unexpected token algorithm");
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(claims.sub, subject, "Unexpected token subject");
        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims = claims(self);
        assert!(
            claims.roles.iter().any(|r| r == role),
            "Token does not contain role '{}'. Available roles: {:?}",
            role,
            claims.roles
        );
        self
    }

    fn assert_roles(&self, roles: &[&str]) -> &Self {
        let claims = claims(self);
        assert_eq!(claims.roles, roles, "Unexpected roles claim");
        self
    }

    fn assert_issuer(&self, issuer: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(claims.iss.as_deref(), Some(issuer), "Unexpected issuer");
        self
    }

    fn assert_lifetime(&self, seconds: i64) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Expected a {}s validity window",
            seconds
        );
        self
    }

    fn assert_issued_at(&self, timestamp: i64) -> &Self {
        let claims = claims(self);
        assert_eq!(claims.iat, timestamp, "Unexpected iat");
        self
    }
}
