//! Songify Auth Service Library
//!
//! Login, token issuance and per-request access control for the Songify
//! catalog API.
//!
//! # Modules
//!
//! - `clock` - Injectable time source
//! - `config` - Service configuration
//! - `crypto` - Key material, JWT signing and password verification
//! - `errors` - Error types and their HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Access policy middleware
//! - `models` - Domain data models
//! - `policy` - Access policy table and enforcer
//! - `repositories` - Principal store
//! - `routes` - Router and application state
//! - `services` - Credential, token and claims services

pub mod clock;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod services;
