//! Common utilities and types shared across Songify auth components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT structural checks (size limit, header inspection, iat skew)
pub mod jwt;
