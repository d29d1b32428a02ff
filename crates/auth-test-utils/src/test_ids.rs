//! Fixed test IDs and credentials for deterministic tests

use uuid::Uuid;

// Principal IDs (100-199)
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);
pub const TEST_USER_CAROL: Uuid = Uuid::from_u128(102);

// Seeded credentials
pub const ALICE_USERNAME: &str = "alice";
pub const ALICE_PASSWORD: &str = "pw1";
pub const BOB_USERNAME: &str = "bob";
pub const BOB_PASSWORD: &str = "pw2";
/// Carol exists with a valid password but is disabled.
pub const CAROL_USERNAME: &str = "carol";
pub const CAROL_PASSWORD: &str = "pw3";

// Roles
pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";

/// Issuer the test server is configured with.
pub const TEST_ISSUER: &str = "songify";
