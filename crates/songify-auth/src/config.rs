//! Service configuration.
//!
//! Loaded from environment variables once at startup. Any invalid value is a
//! `ConfigError` and the binary refuses to start.

use crate::crypto::SigningAlgorithm;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default issuer written into every token.
pub const DEFAULT_ISSUER: &str = "songify";

/// Default token lifetime (1 hour).
pub const DEFAULT_TOKEN_EXPIRATION_MINUTES: i64 = 60;

/// Upper bound on token lifetime (7 days).
pub const MAX_TOKEN_EXPIRATION_MINUTES: i64 = 7 * 24 * 60;

/// Default JWT clock skew tolerance in seconds.
#[allow(clippy::cast_possible_wrap)]
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: i64 = DEFAULT_CLOCK_SKEW.as_secs() as i64;

/// Where the signing key pair comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Generate a fresh pair at startup. Tokens do not survive a restart.
    Generate,

    /// Load a PEM pair from disk.
    Files {
        private_key_path: PathBuf,
        public_key_path: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Issuer string (`iss`) written into and required from tokens.
    pub issuer: String,

    /// Token lifetime in minutes. Always in `1..=MAX_TOKEN_EXPIRATION_MINUTES`.
    pub token_expiration_minutes: i64,

    /// Asymmetric algorithm used for signing and verification.
    pub signing_algorithm: SigningAlgorithm,

    pub key_source: KeySource,

    /// Clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Whether the login cookie carries the `Secure` attribute.
    pub cookie_secure: bool,

    /// Optional JSON seed for the in-memory principal store.
    pub principals_file: Option<PathBuf>,

    /// Optional JSON access policy. The built-in catalog policy is used otherwise.
    pub access_policy_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Invalid token expiration configuration: {0}")]
    InvalidExpiration(String),

    #[error("Invalid signing algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid key source: {0}")]
    InvalidKeySource(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid boolean for {name}: '{value}'")]
    InvalidBool { name: String, value: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let issuer = vars
            .get("JWT_ISSUER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        if issuer.trim().is_empty() {
            return Err(ConfigError::InvalidIssuer(
                "JWT_ISSUER must not be empty".to_string(),
            ));
        }

        let token_expiration_minutes =
            if let Some(value_str) = vars.get("JWT_EXPIRATION_MINUTES") {
                let value: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidExpiration(format!(
                        "JWT_EXPIRATION_MINUTES must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value <= 0 {
                    return Err(ConfigError::InvalidExpiration(format!(
                        "JWT_EXPIRATION_MINUTES must be positive, got {}",
                        value
                    )));
                }

                if value > MAX_TOKEN_EXPIRATION_MINUTES {
                    return Err(ConfigError::InvalidExpiration(format!(
                        "JWT_EXPIRATION_MINUTES must not exceed {}, got {}",
                        MAX_TOKEN_EXPIRATION_MINUTES, value
                    )));
                }

                value
            } else {
                DEFAULT_TOKEN_EXPIRATION_MINUTES
            };

        let signing_algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => value
                .parse::<SigningAlgorithm>()
                .map_err(ConfigError::InvalidAlgorithm)?,
            None => SigningAlgorithm::Rs256,
        };

        let key_source = match vars.get("JWT_KEY_SOURCE").map(String::as_str) {
            None | Some("generate") => KeySource::Generate,
            Some("file") => {
                let private_key_path = vars
                    .get("JWT_PRIVATE_KEY_PATH")
                    .ok_or_else(|| ConfigError::MissingEnvVar("JWT_PRIVATE_KEY_PATH".to_string()))?;
                let public_key_path = vars
                    .get("JWT_PUBLIC_KEY_PATH")
                    .ok_or_else(|| ConfigError::MissingEnvVar("JWT_PUBLIC_KEY_PATH".to_string()))?;
                KeySource::Files {
                    private_key_path: PathBuf::from(private_key_path),
                    public_key_path: PathBuf::from(public_key_path),
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidKeySource(format!(
                    "JWT_KEY_SOURCE must be 'generate' or 'file', got '{}'",
                    other
                )));
            }
        };

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            #[allow(clippy::cast_possible_wrap)]
            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_JWT_CLOCK_SKEW_SECONDS
        };

        let cookie_secure = parse_bool(vars, "AUTH_COOKIE_SECURE", false)?;

        let principals_file = vars.get("PRINCIPALS_FILE").map(PathBuf::from);
        let access_policy_file = vars.get("ACCESS_POLICY_FILE").map(PathBuf::from);

        Ok(Config {
            bind_address,
            issuer,
            token_expiration_minutes,
            signing_algorithm,
            key_source,
            jwt_clock_skew_seconds,
            cookie_secure,
            principals_file,
            access_policy_file,
        })
    }

    /// Token lifetime as a duration.
    pub fn token_expiration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_expiration_minutes)
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: v,
        }),
    }
}
