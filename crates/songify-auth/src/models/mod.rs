use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A named permission grant, e.g. `ADMIN` or `USER`.
///
/// Non-empty, with no whitespace or control characters. Compared and ordered
/// as the plain string so authority sets serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Authority(String);

impl Authority {
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.is_empty() {
            return Err("authority must not be empty".to_string());
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(format!("invalid authority: {:?}", name));
        }
        Ok(Self(name))
    }

    /// For names fixed in the source. Must satisfy the same rules as [`Authority::new`].
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok(), "invalid static authority {name:?}");
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Authority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Authority> for String {
    fn from(authority: Authority) -> Self {
        authority.0
    }
}

impl FromStr for Authority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity record owned by the principal store. Read-only here.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    /// Verifiable credential form (bcrypt hash).
    pub password_hash: SecretString,
    pub enabled: bool,
    pub authorities: BTreeSet<Authority>,
}

impl Principal {
    /// Authority names in their stable (sorted) order.
    pub fn authority_names(&self) -> Vec<String> {
        self.authorities.iter().map(ToString::to_string).collect()
    }
}

/// Request-scoped result of verifying a token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedContext {
    pub subject: String,
    pub authorities: BTreeSet<Authority>,
    /// Issued-at, Unix seconds.
    pub issued_at: i64,
    /// Expires-at, Unix seconds.
    pub expires_at: i64,
}

impl AuthenticatedContext {
    pub fn has_authority(&self, authority: &Authority) -> bool {
        self.authorities.contains(authority)
    }

    pub fn authority_names(&self) -> Vec<String> {
        self.authorities.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Debug for AuthenticatedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedContext")
            .field("subject", &"[REDACTED]")
            .field("authorities", &self.authorities)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
}

/// Login response body
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// `GET /me` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub subject: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl From<&AuthenticatedContext> for MeResponse {
    fn from(ctx: &AuthenticatedContext) -> Self {
        Self {
            subject: ctx.subject.clone(),
            roles: ctx.authority_names(),
            iat: ctx.issued_at,
            exp: ctx.expires_at,
        }
    }
}
