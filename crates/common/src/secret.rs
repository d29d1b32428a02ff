//! Secret types for keeping passwords, tokens and key material out of logs.
//!
//! Re-exports the [`secrecy`] wrappers. Anything holding a credential should
//! store it as [`SecretString`], so that a derived `Debug`
//! on the surrounding struct prints `[REDACTED]` instead of the value.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Login {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let login = Login {
//!     username: "alice".to_string(),
//!     password: SecretString::from("pw1"),
//! };
//!
//! assert!(!format!("{login:?}").contains("pw1"));
//! assert_eq!(login.password.expose_secret(), "pw1");
//! ```
//!
//! `SecretString` covers passwords, bcrypt hashes and the PEM text of the
//! private signing key as read from disk.
//!
//! With the `serde` feature of `secrecy` enabled, it deserializes from JSON,
//! which is how login bodies and principal seed files are read.

pub use secrecy::{ExposeSecret, SecretString};
