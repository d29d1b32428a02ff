//! Current principal handler.

use crate::errors::AuthError;
use crate::middleware::ContextExt;
use crate::models::MeResponse;
use axum::{extract::Request, Json};
use tracing::instrument;

/// Handler for GET /me
///
/// Returns what the verified token says about its holder. The access policy
/// middleware supplies the context; a caller it let through anonymously gets
/// `MissingToken`.
///
/// ```json
/// {
///   "subject": "alice",
///   "roles": ["ADMIN"],
///   "iat": 1700000000,
///   "exp": 1700003600
/// }
/// ```
#[instrument(skip_all, name = "songify_auth.handlers.me")]
pub async fn get_me(req: Request) -> Result<Json<MeResponse>, AuthError> {
    let ctx = req.auth_context().ok_or_else(|| {
        tracing::debug!(target: "songify_auth.handlers.me", "No authenticated context on request");
        AuthError::MissingToken
    })?;

    tracing::debug!(target: "songify_auth.handlers.me", "Returning token context");
    Ok(Json(MeResponse::from(ctx)))
}
