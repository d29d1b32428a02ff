//! Builder patterns for test token construction
//!
//! Produces tokens the server never issued: expired, foreign-issuer,
//! malformed claims and so on.

use crate::test_ids::TEST_ISSUER;
use chrono::Utc;
use serde_json::{json, Map, Value};
use songify_auth::crypto::{sign_token, SigningKey};

/// Builder for hand-made JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::at(now)
///     .for_user("bob")
///     .with_roles(&["USER"])
///     .expires_in(60)
///     .sign(&test_signing_key(SigningAlgorithm::Rs256));
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    iat: i64,
}

impl TestTokenBuilder {
    /// Defaults relative to the wall clock.
    pub fn new() -> Self {
        Self::at(Utc::now().timestamp())
    }

    /// Defaults: subject `test-subject`, no roles, test issuer, one hour
    /// window starting at `iat`.
    pub fn at(iat: i64) -> Self {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iat".to_string(), json!(iat));
        claims.insert("exp".to_string(), json!(iat + 3600));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("roles".to_string(), json!([]));
        Self { claims, iat }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    pub fn with_roles(self, roles: &[&str]) -> Self {
        self.with_claim("roles", json!(roles))
    }

    /// Drop the `roles` claim entirely.
    pub fn without_roles(self) -> Self {
        self.without_claim("roles")
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    pub fn without_issuer(self) -> Self {
        self.without_claim("iss")
    }

    /// Set expiration in seconds after `iat`
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = self.iat + seconds;
        self.with_claim("exp", json!(exp))
    }

    /// Set issued-at, keeping the current `exp`.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self.with_claim("iat", json!(timestamp))
    }

    /// Set or overwrite any claim, including with a wrongly typed value.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with `key`.
    pub fn sign(self, key: &SigningKey) -> String {
        sign_token(&self.build(), key).expect("test token signing should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
