use crate::errors::AuthError;
use crate::middleware::ACCESS_TOKEN_COOKIE;
use crate::models::{LoginRequest, LoginResponse};
use crate::routes::AppState;
use crate::services::IssuedToken;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle login
///
/// POST /token
///
/// Returns the signed token in the body and as an http-only cookie whose
/// `Max-Age` equals the token lifetime.
#[instrument(skip_all, name = "songify_auth.handlers.login")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = state
        .authenticator
        .authenticate(&payload.username, &payload.password)
        .await?;

    let issued = state.issuer.issue(&principal, state.clock.now())?;
    let cookie = access_token_cookie(&issued, state.config.cookie_secure)?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token: issued.token,
        }),
    ))
}

/// Build the `Set-Cookie` value carrying the token.
pub fn access_token_cookie(issued: &IssuedToken, secure: bool) -> Result<HeaderValue, AuthError> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        ACCESS_TOKEN_COOKIE,
        issued.token,
        issued.lifetime_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|e| {
        tracing::error!(target: "songify_auth.handlers", error = %e, "Token is not a valid cookie value");
        AuthError::Internal
    })
}
