//! Access policy: which authority each (resource, action) pair requires.
//!
//! The policy is an explicit table built once at startup and never mutated.
//! Lookups are pure. Anything the table does not name falls to the fallback
//! requirement, which defaults to `authenticated`.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "fallback": "authenticated",
//!   "resources": {
//!     "songs": { "read": "public", "create": { "role": "ADMIN" } },
//!     "me":    { "read": "authenticated" },
//!     "charts": { "update": { "any_role": ["ADMIN", "EDITOR"] } }
//!   }
//! }
//! ```

pub mod enforcer;

pub use enforcer::{AccessPolicyEnforcer, AccessState};

use crate::errors::AuthError;
use crate::models::{Authority, AuthenticatedContext};
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// Resources served by the catalog.
pub const CATALOG_RESOURCES: [&str; 4] = ["songs", "albums", "artists", "genres"];

/// Authority required for catalog writes.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Operation kind, derived from the HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const WRITES: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    /// Methods without an action (OPTIONS, TRACE, ...) return `None` and are
    /// governed by the fallback requirement.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Action::Read),
            Method::POST => Some(Action::Create),
            Method::PUT | Method::PATCH => Some(Action::Update),
            Method::DELETE => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// What a request must present to pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// No token needed.
    Public,
    /// Any verified token.
    Authenticated,
    /// A verified token holding this authority.
    Role(Authority),
    /// A verified token holding at least one of these authorities.
    AnyRole(BTreeSet<Authority>),
}

impl Requirement {
    pub fn role(name: &str) -> Result<Self, String> {
        Authority::new(name).map(Requirement::Role)
    }

    /// Whether `ctx` (None when unauthenticated) satisfies this requirement.
    pub fn is_satisfied_by(&self, ctx: Option<&AuthenticatedContext>) -> bool {
        match (self, ctx) {
            (Requirement::Public, _) => true,
            (_, None) => false,
            (Requirement::Authenticated, Some(_)) => true,
            (Requirement::Role(role), Some(ctx)) => ctx.has_authority(role),
            (Requirement::AnyRole(roles), Some(ctx)) => {
                roles.iter().any(|role| ctx.has_authority(role))
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => f.write_str("public"),
            Requirement::Authenticated => f.write_str("authenticated"),
            Requirement::Role(role) => write!(f, "{}", role),
            Requirement::AnyRole(roles) => {
                let names: Vec<&str> = roles.iter().map(Authority::as_str).collect();
                write!(f, "any of [{}]", names.join(", "))
            }
        }
    }
}

/// First non-empty path segment, e.g. `/songs/42` -> `songs`.
pub fn resource_for_path(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}

/// Immutable (resource, action) -> requirement table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: HashMap<(String, Action), Requirement>,
    fallback: Requirement,
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(default = "default_fallback")]
    fallback: Requirement,
    #[serde(default)]
    resources: HashMap<String, HashMap<String, Requirement>>,
}

fn default_fallback() -> Requirement {
    Requirement::Authenticated
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    /// Catalog policy: reads are public, writes need `ADMIN`, `/me` needs any
    /// verified token.
    pub fn catalog_default() -> Self {
        let admin = Requirement::Role(Authority::from_static(ADMIN_ROLE));

        let mut builder = AccessPolicy::builder();
        for resource in CATALOG_RESOURCES {
            builder = builder
                .reads(resource, Requirement::Public)
                .writes(resource, admin.clone());
        }
        builder
            .rule("me", Action::Read, Requirement::Authenticated)
            .build()
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let document: PolicyDocument = serde_json::from_str(json).map_err(|e| {
            tracing::error!(target: "songify_auth.policy", error = %e, "Invalid access policy document");
            AuthError::Internal
        })?;

        let mut builder = AccessPolicy::builder().fallback(document.fallback);
        for (resource, actions) in document.resources {
            for (action, requirement) in actions {
                let action = action.parse::<Action>().map_err(|e| {
                    tracing::error!(target: "songify_auth.policy", resource = %resource, error = %e, "Invalid access policy document");
                    AuthError::Internal
                })?;
                builder = builder.rule(&resource, action, requirement);
            }
        }
        Ok(builder.build())
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(
                target: "songify_auth.policy",
                path = %path.display(),
                error = %e,
                "Failed to read access policy"
            );
            AuthError::Internal
        })?;
        Self::from_json(&json)
    }

    /// Requirement for a request. Pure; depends only on the table.
    pub fn requirement_for(&self, resource: Option<&str>, action: Option<Action>) -> &Requirement {
        match (resource, action) {
            (Some(resource), Some(action)) => self
                .rules
                .get(&(resource.to_string(), action))
                .unwrap_or(&self.fallback),
            _ => &self.fallback,
        }
    }

    pub fn fallback(&self) -> &Requirement {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Builder for [`AccessPolicy`]. Later rules for the same pair replace earlier ones.
#[derive(Debug, Clone)]
pub struct AccessPolicyBuilder {
    rules: HashMap<(String, Action), Requirement>,
    fallback: Requirement,
}

impl Default for AccessPolicyBuilder {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: Requirement::Authenticated,
        }
    }
}

impl AccessPolicyBuilder {
    pub fn rule(mut self, resource: &str, action: Action, requirement: Requirement) -> Self {
        self.rules.insert((resource.to_string(), action), requirement);
        self
    }

    pub fn reads(self, resource: &str, requirement: Requirement) -> Self {
        self.rule(resource, Action::Read, requirement)
    }

    /// Same requirement for create, update and delete.
    pub fn writes(mut self, resource: &str, requirement: Requirement) -> Self {
        for action in Action::WRITES {
            self = self.rule(resource, action, requirement.clone());
        }
        self
    }

    pub fn fallback(mut self, requirement: Requirement) -> Self {
        self.fallback = requirement;
        self
    }

    pub fn build(self) -> AccessPolicy {
        AccessPolicy {
            rules: self.rules,
            fallback: self.fallback,
        }
    }
}
