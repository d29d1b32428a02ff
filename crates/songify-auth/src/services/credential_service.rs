//! Username/password authentication.

use crate::crypto::PasswordVerifier;
use crate::errors::AuthError;
use crate::models::Principal;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_login;
use crate::repositories::PrincipalStore;
use common::secret::SecretString;
use std::sync::Arc;
use tracing::instrument;

/// Verifies credentials against the principal store.
///
/// Every failure is `InvalidCredentials`, whether the user is unknown, the
/// password is wrong or the principal is disabled. The password check always
/// runs, using a dummy hash for unknown users.
#[derive(Clone)]
pub struct CredentialAuthenticator {
    store: Arc<dyn PrincipalStore>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl CredentialAuthenticator {
    pub fn new(store: Arc<dyn PrincipalStore>, verifier: Arc<dyn PasswordVerifier>) -> Self {
        Self { store, verifier }
    }

    #[instrument(skip_all, fields(user = %hash_for_correlation(username)))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Principal, AuthError> {
        let result = self.check(username, password).await;

        match &result {
            Ok(_) => {
                record_login("success");
                tracing::info!(target: "songify_auth.credentials", "Login succeeded");
            }
            Err(AuthError::InvalidCredentials) => {
                record_login("error");
                tracing::info!(target: "songify_auth.credentials", "Login rejected");
            }
            Err(e) => {
                record_login("error");
                tracing::warn!(target: "songify_auth.credentials", error = %e, "Login failed");
            }
        }

        result
    }

    async fn check(&self, username: &str, password: &SecretString) -> Result<Principal, AuthError> {
        let principal = self.store.find_by_username(username).await?;

        let Some(principal) = principal else {
            self.verifier.verify_absent(password);
            tracing::debug!(target: "songify_auth.credentials", reason = "unknown_user", "Credential check failed");
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = self.verifier.verify(password, &principal.password_hash)?;

        if !password_ok {
            tracing::debug!(target: "songify_auth.credentials", reason = "bad_password", "Credential check failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !principal.enabled {
            tracing::debug!(target: "songify_auth.credentials", reason = "disabled", "Credential check failed");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(principal)
    }
}
