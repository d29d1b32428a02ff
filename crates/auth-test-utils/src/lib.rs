//! # Auth Test Utilities
//!
//! Shared test utilities for the Songify auth service.
//!
//! This crate provides:
//! - Fixed key fixtures (PEM pairs checked into `testdata/keys`)
//! - A manually advanced clock for expiry tests
//! - Test data builders (TestTokenBuilder)
//! - Server test harness (TestAuthServer for E2E tests)
//! - Fixed test IDs and seeded credentials
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestAuthServer::spawn().await?;
//!     let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;
//!
//!     token
//!         .assert_valid_jwt()
//!         .assert_for_subject(ALICE_USERNAME)
//!         .assert_has_role("ADMIN");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod clock;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use clock::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
