//! Fixed key fixtures for testing
//!
//! The PEM pairs live in `testdata/keys` so every test run signs with the
//! same keys. None of them may be used outside tests.

use common::secret::SecretString;
use songify_auth::crypto::{KeyMaterial, SigningAlgorithm, SigningKey};

/// RSA pair the test server signs with.
pub const RSA_PRIVATE_PEM: &str = include_str!("../../../testdata/keys/rsa_private.pem");
pub const RSA_PUBLIC_PEM: &str = include_str!("../../../testdata/keys/rsa_public.pem");

/// A second, unrelated RSA pair for wrong-key tests.
pub const RSA_OTHER_PRIVATE_PEM: &str = include_str!("../../../testdata/keys/rsa_other_private.pem");
pub const RSA_OTHER_PUBLIC_PEM: &str = include_str!("../../../testdata/keys/rsa_other_public.pem");

/// Ed25519 pair for `JWT_ALGORITHM=EdDSA` tests.
pub const ED25519_PRIVATE_PEM: &str = include_str!("../../../testdata/keys/ed25519_private.pem");
pub const ED25519_PUBLIC_PEM: &str = include_str!("../../../testdata/keys/ed25519_public.pem");

/// bcrypt cost for seeded test principals. Far below production cost so
/// login tests stay fast.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Load the fixture pair for `algorithm`.
///
/// # Panics
///
/// Panics if the checked-in fixture fails to load.
pub fn test_key_material(algorithm: SigningAlgorithm) -> KeyMaterial {
    let (private_pem, public_pem) = match algorithm {
        SigningAlgorithm::Rs256 => (RSA_PRIVATE_PEM, RSA_PUBLIC_PEM),
        SigningAlgorithm::EdDsa => (ED25519_PRIVATE_PEM, ED25519_PUBLIC_PEM),
    };
    KeyMaterial::from_pem(algorithm, &SecretString::from(private_pem), public_pem)
        .expect("fixture key pair should load")
}

/// Signing half of the fixture pair the test server trusts.
pub fn test_signing_key(algorithm: SigningAlgorithm) -> SigningKey {
    test_key_material(algorithm).into_parts().0
}

/// Signing half of a valid RSA pair the test server does NOT trust.
pub fn untrusted_signing_key() -> SigningKey {
    KeyMaterial::from_pem(
        SigningAlgorithm::Rs256,
        &SecretString::from(RSA_OTHER_PRIVATE_PEM),
        RSA_OTHER_PUBLIC_PEM,
    )
    .expect("fixture key pair should load")
    .into_parts()
    .0
}

/// bcrypt hash of `password` at [`TEST_BCRYPT_COST`].
pub fn test_password_hash(password: &str) -> SecretString {
    SecretString::from(bcrypt::hash(password, TEST_BCRYPT_COST).expect("bcrypt hash should succeed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_pairs_load() {
        assert_eq!(
            test_key_material(SigningAlgorithm::Rs256).algorithm(),
            SigningAlgorithm::Rs256
        );
        assert_eq!(
            test_key_material(SigningAlgorithm::EdDsa).algorithm(),
            SigningAlgorithm::EdDsa
        );
    }

    #[test]
    fn test_password_hash_verifies() {
        use common::secret::ExposeSecret;

        let hash = test_password_hash("pw1");
        assert!(bcrypt::verify("pw1", hash.expose_secret()).unwrap());
        assert!(!bcrypt::verify("pw2", hash.expose_secret()).unwrap());
    }
}
