use crate::config::{Config, KeySource};
use crate::crypto::KeyMaterial;
use crate::errors::AuthError;
use crate::observability::metrics::record_key_material_init;
use common::secret::SecretString;
use std::path::Path;
use tracing::instrument;

/// Produce the process key pair from the configured source.
///
/// Called exactly once at startup. Any error here is fatal: the binary must
/// not start serving without usable key material.
#[instrument(skip_all, fields(algorithm = %config.signing_algorithm))]
pub fn initialize_key_material(config: &Config) -> Result<KeyMaterial, AuthError> {
    let (source, result) = match &config.key_source {
        KeySource::Generate => ("generate", KeyMaterial::generate(config.signing_algorithm)),
        KeySource::Files {
            private_key_path,
            public_key_path,
        } => (
            "file",
            load_key_files(config, private_key_path, public_key_path),
        ),
    };

    match &result {
        Ok(_) => {
            record_key_material_init(source, "success");
            tracing::info!(target: "songify_auth.keys", source = source, "Signing key material ready");
        }
        Err(e) => {
            record_key_material_init(source, "error");
            tracing::error!(target: "songify_auth.keys", source = source, error = %e, "Signing key material unavailable");
        }
    }

    result
}

fn load_key_files(
    config: &Config,
    private_key_path: &Path,
    public_key_path: &Path,
) -> Result<KeyMaterial, AuthError> {
    let private_pem = std::fs::read_to_string(private_key_path)
        .map(SecretString::from)
        .map_err(|e| {
            AuthError::KeyMaterialUnavailable(format!(
                "Failed to read private key {}: {}",
                private_key_path.display(),
                e
            ))
        })?;
    let public_pem = std::fs::read_to_string(public_key_path).map_err(|e| {
        AuthError::KeyMaterialUnavailable(format!(
            "Failed to read public key {}: {}",
            public_key_path.display(),
            e
        ))
    })?;

    KeyMaterial::from_pem(config.signing_algorithm, &private_pem, &public_pem)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::crypto::SigningAlgorithm;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn keys_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/keys")
    }

    fn config_with(vars: &[(&str, String)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Config::from_vars(&map).unwrap()
    }

    #[test]
    fn test_initialize_from_files() {
        let dir = keys_dir();
        let config = config_with(&[
            ("JWT_KEY_SOURCE", "file".to_string()),
            (
                "JWT_PRIVATE_KEY_PATH",
                dir.join("rsa_private.pem").display().to_string(),
            ),
            (
                "JWT_PUBLIC_KEY_PATH",
                dir.join("rsa_public.pem").display().to_string(),
            ),
        ]);

        let material = initialize_key_material(&config).unwrap();
        assert_eq!(material.algorithm(), SigningAlgorithm::Rs256);
    }

    #[test]
    fn test_initialize_ed25519_from_files() {
        let dir = keys_dir();
        let config = config_with(&[
            ("JWT_ALGORITHM", "EdDSA".to_string()),
            ("JWT_KEY_SOURCE", "file".to_string()),
            (
                "JWT_PRIVATE_KEY_PATH",
                dir.join("ed25519_private.pem").display().to_string(),
            ),
            (
                "JWT_PUBLIC_KEY_PATH",
                dir.join("ed25519_public.pem").display().to_string(),
            ),
        ]);

        let material = initialize_key_material(&config).unwrap();
        assert_eq!(material.algorithm(), SigningAlgorithm::EdDsa);
    }

    #[test]
    fn test_missing_key_file_is_unavailable() {
        let dir = keys_dir();
        let config = config_with(&[
            ("JWT_KEY_SOURCE", "file".to_string()),
            (
                "JWT_PRIVATE_KEY_PATH",
                dir.join("does_not_exist.pem").display().to_string(),
            ),
            (
                "JWT_PUBLIC_KEY_PATH",
                dir.join("rsa_public.pem").display().to_string(),
            ),
        ]);

        let result = initialize_key_material(&config);
        assert!(matches!(result, Err(AuthError::KeyMaterialUnavailable(msg)) if msg.contains("private key")));
    }

    #[test]
    fn test_mismatched_key_files_are_unavailable() {
        let dir = keys_dir();
        let config = config_with(&[
            ("JWT_KEY_SOURCE", "file".to_string()),
            (
                "JWT_PRIVATE_KEY_PATH",
                dir.join("rsa_private.pem").display().to_string(),
            ),
            (
                "JWT_PUBLIC_KEY_PATH",
                dir.join("rsa_other_public.pem").display().to_string(),
            ),
        ]);

        assert!(matches!(
            initialize_key_material(&config),
            Err(AuthError::KeyMaterialUnavailable(_))
        ));
    }

    #[test]
    fn test_generate_source() {
        let config = config_with(&[("JWT_ALGORITHM", "EdDSA".to_string())]);
        let material = initialize_key_material(&config).unwrap();
        assert_eq!(material.algorithm(), SigningAlgorithm::EdDsa);
    }
}
