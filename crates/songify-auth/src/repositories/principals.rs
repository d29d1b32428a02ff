//! Principal lookup.
//!
//! The service only ever reads principals. [`PrincipalStore`] is the seam the
//! hosting application plugs its own user storage into; the bundled
//! [`InMemoryPrincipalStore`] serves tests and small deployments seeded from a
//! JSON file.

use crate::errors::AuthError;
use crate::models::{Authority, Principal};
use common::secret::SecretString;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use uuid::Uuid;

/// Read-only principal lookup (enables plugging in external storage).
#[async_trait::async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, AuthError>;
}

/// One entry of a principal seed file.
#[derive(Debug, Deserialize)]
struct PrincipalRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    username: String,
    password_hash: SecretString,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    roles: Vec<Authority>,
}

fn default_enabled() -> bool {
    true
}

impl From<PrincipalRecord> for Principal {
    fn from(record: PrincipalRecord) -> Self {
        Principal {
            id: record.id,
            username: record.username,
            password_hash: record.password_hash,
            enabled: record.enabled,
            authorities: record.roles.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

/// Immutable in-memory store keyed by username.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    principals: HashMap<String, Principal>,
}

impl InMemoryPrincipalStore {
    /// Build a store, rejecting empty or duplicate usernames.
    pub fn new(principals: Vec<Principal>) -> Result<Self, AuthError> {
        let mut by_username = HashMap::with_capacity(principals.len());

        for principal in principals {
            if principal.username.is_empty() {
                return Err(AuthError::PrincipalStore(
                    "Principal username must not be empty".to_string(),
                ));
            }
            if by_username.contains_key(&principal.username) {
                return Err(AuthError::PrincipalStore(format!(
                    "Duplicate principal username: {}",
                    principal.username
                )));
            }
            by_username.insert(principal.username.clone(), principal);
        }

        Ok(Self {
            principals: by_username,
        })
    }

    /// Parse a JSON seed: `[{"id", "username", "password_hash", "enabled", "roles"}]`.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let records: Vec<PrincipalRecord> = serde_json::from_str(json)
            .map_err(|e| AuthError::PrincipalStore(format!("Invalid principal seed: {}", e)))?;

        Self::new(records.into_iter().map(Principal::from).collect())
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::PrincipalStore(format!(
                "Failed to read principal seed {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait::async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self.principals.get(username).cloned())
    }
}
