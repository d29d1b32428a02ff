//! Signing keys, token signing/verification and password verification.
//!
//! The key pair is produced once by [`KeyMaterial`] and immediately split into
//! a [`SigningKey`] and a [`VerifyingKey`]. The signing half goes to the token
//! issuer, the verifying half to the claims converter.

use crate::errors::AuthError;
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// RSA modulus size for generated keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Well-formed bcrypt hash used when the principal does not exist, so the
/// unknown-user path does the same work as the wrong-password path.
const DUMMY_BCRYPT_HASH: &str = "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

// ============================================================================
// Algorithms
// ============================================================================

/// Asymmetric algorithms the service can sign with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// Ed25519.
    EdDsa,
}

impl SigningAlgorithm {
    /// Value of the JWT `alg` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::Rs256 => "RS256",
            SigningAlgorithm::EdDsa => "EdDSA",
        }
    }

    fn jwt_algorithm(self) -> Algorithm {
        match self {
            SigningAlgorithm::Rs256 => Algorithm::RS256,
            SigningAlgorithm::EdDsa => Algorithm::EdDSA,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RS256" => Ok(SigningAlgorithm::Rs256),
            "EDDSA" => Ok(SigningAlgorithm::EdDsa),
            _ => Err(format!("expected 'RS256' or 'EdDSA', got '{}'", s)),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Claims
// ============================================================================

/// JWT payload written by the issuer.
///
/// `sub` is the username, so the custom Debug implementation redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .field("roles", &self.roles)
            .finish()
    }
}

// ============================================================================
// Key material
// ============================================================================

/// Private half of the key pair. Only the token issuer holds one.
pub struct SigningKey {
    algorithm: SigningAlgorithm,
    key: EncodingKey,
}

impl SigningKey {
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Public half of the key pair. Only the claims converter holds one.
#[derive(Clone)]
pub struct VerifyingKey {
    algorithm: SigningAlgorithm,
    key: DecodingKey,
}

impl VerifyingKey {
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A validated signing key pair.
///
/// Both constructors sign and verify a probe token before returning, so a
/// mismatched or unusable pair never reaches the request path.
pub struct KeyMaterial {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.signing.algorithm)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Generate a fresh key pair using the OS CSPRNG.
    #[instrument(skip_all, fields(algorithm = %algorithm))]
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, AuthError> {
        let (encoding, decoding) = match algorithm {
            SigningAlgorithm::Rs256 => {
                let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_BITS)
                    .map_err(|e| {
                        AuthError::KeyMaterialUnavailable(format!("RSA key generation failed: {}", e))
                    })?;
                let private_der = private_key.to_pkcs1_der().map_err(|e| {
                    AuthError::KeyMaterialUnavailable(format!("RSA key encoding failed: {}", e))
                })?;
                let public_der = private_key.to_public_key().to_pkcs1_der().map_err(|e| {
                    AuthError::KeyMaterialUnavailable(format!("RSA key encoding failed: {}", e))
                })?;
                (
                    EncodingKey::from_rsa_der(private_der.as_bytes()),
                    DecodingKey::from_rsa_der(public_der.as_bytes()),
                )
            }
            SigningAlgorithm::EdDsa => {
                let rng = SystemRandom::new();
                let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|e| {
                    AuthError::KeyMaterialUnavailable(format!("Keypair generation failed: {}", e))
                })?;
                let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|e| {
                    AuthError::KeyMaterialUnavailable(format!("Keypair parsing failed: {}", e))
                })?;
                (
                    EncodingKey::from_ed_der(pkcs8.as_ref()),
                    DecodingKey::from_ed_der(key_pair.public_key().as_ref()),
                )
            }
        };

        Self::checked(algorithm, encoding, decoding)
    }

    /// Load a PEM-encoded pair.
    ///
    /// RSA keys may be PKCS#1 or PKCS#8 / SPKI. Ed25519 keys must be PKCS#8 / SPKI.
    #[instrument(skip_all, fields(algorithm = %algorithm))]
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &SecretString,
        public_pem: &str,
    ) -> Result<Self, AuthError> {
        let private_bytes = private_pem.expose_secret().as_bytes();
        let public_bytes = public_pem.as_bytes();

        let (encoding, decoding) = match algorithm {
            SigningAlgorithm::Rs256 => (
                EncodingKey::from_rsa_pem(private_bytes),
                DecodingKey::from_rsa_pem(public_bytes),
            ),
            SigningAlgorithm::EdDsa => (
                EncodingKey::from_ed_pem(private_bytes),
                DecodingKey::from_ed_pem(public_bytes),
            ),
        };

        let encoding = encoding.map_err(|e| {
            AuthError::KeyMaterialUnavailable(format!("Invalid private key: {}", e))
        })?;
        let decoding = decoding
            .map_err(|e| AuthError::KeyMaterialUnavailable(format!("Invalid public key: {}", e)))?;

        Self::checked(algorithm, encoding, decoding)
    }

    fn checked(
        algorithm: SigningAlgorithm,
        encoding: EncodingKey,
        decoding: DecodingKey,
    ) -> Result<Self, AuthError> {
        let material = Self {
            signing: SigningKey {
                algorithm,
                key: encoding,
            },
            verifying: VerifyingKey {
                algorithm,
                key: decoding,
            },
        };

        let probe = Claims {
            sub: "key-probe".to_string(),
            iat: 0,
            exp: 1,
            iss: None,
            roles: Vec::new(),
        };
        let token = sign_token(&probe, &material.signing).map_err(|e| {
            AuthError::KeyMaterialUnavailable(format!("Probe signing failed: {}", e))
        })?;
        verify_signature(&token, &material.verifying).map_err(|_| {
            AuthError::KeyMaterialUnavailable(
                "Public key does not verify signatures made by the private key".to_string(),
            )
        })?;

        Ok(material)
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.signing.algorithm
    }

    /// Split into the signing and verifying halves.
    pub fn into_parts(self) -> (SigningKey, VerifyingKey) {
        (self.signing, self.verifying)
    }
}

// ============================================================================
// Sign / verify
// ============================================================================

/// Sign a payload with the private key.
#[instrument(skip_all)]
pub fn sign_token<T: Serialize>(claims: &T, key: &SigningKey) -> Result<String, AuthError> {
    let mut header = Header::new(key.algorithm.jwt_algorithm());
    header.typ = Some("JWT".to_string());

    encode(&header, claims, &key.key)
        .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {}", e)))
}

/// Verify the signature and return the raw payload.
///
/// Only the signature and the header algorithm are checked here. Every claim
/// check is left to the caller, which must treat the payload as untrusted in
/// shape.
#[instrument(skip_all)]
pub fn verify_signature(token: &str, key: &VerifyingKey) -> Result<serde_json::Value, AuthError> {
    let mut validation = Validation::new(key.algorithm.jwt_algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<serde_json::Value>(token, &key.key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "songify_auth.crypto", error = %e, "Token verification failed");
            AuthError::InvalidToken(format!("signature verification failed: {}", e))
        })
}

// ============================================================================
// Passwords
// ============================================================================

/// Checks a plaintext password against a stored credential.
pub trait PasswordVerifier: Send + Sync {
    /// Returns `Ok(false)` on mismatch.
    fn verify(&self, plaintext: &SecretString, stored: &SecretString) -> Result<bool, AuthError>;

    /// Burn the same work as [`verify`](Self::verify) for a principal that
    /// does not exist. Always returns `false`.
    fn verify_absent(&self, plaintext: &SecretString) -> bool;
}

/// bcrypt-backed verifier.
#[derive(Clone)]
pub struct BcryptPasswordVerifier {
    dummy_hash: SecretString,
}

impl BcryptPasswordVerifier {
    pub fn new() -> Self {
        Self {
            dummy_hash: SecretString::from(DUMMY_BCRYPT_HASH),
        }
    }

    /// Use a different dummy hash, e.g. one with the same cost as the store's
    /// real hashes.
    pub fn with_dummy_hash(dummy_hash: SecretString) -> Self {
        Self { dummy_hash }
    }
}

impl Default for BcryptPasswordVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BcryptPasswordVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BcryptPasswordVerifier").finish_non_exhaustive()
    }
}

impl PasswordVerifier for BcryptPasswordVerifier {
    #[instrument(skip_all)]
    fn verify(&self, plaintext: &SecretString, stored: &SecretString) -> Result<bool, AuthError> {
        match bcrypt::verify(plaintext.expose_secret(), stored.expose_secret()) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                tracing::warn!(target: "songify_auth.crypto", error = %e, "Stored password hash is malformed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    #[instrument(skip_all)]
    fn verify_absent(&self, plaintext: &SecretString) -> bool {
        let _ = bcrypt::verify(plaintext.expose_secret(), self.dummy_hash.expose_secret());
        false
    }
}
