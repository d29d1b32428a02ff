//! Songify auth error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Token
//! failures share one client-facing message so callers cannot tell an expired
//! token from a forged one. Details go to the server log only.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised on every 401.
const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"songify\", error=\"invalid_token\"";

/// Message returned for every inbound token failure.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token issuer mismatch")]
    TokenIssuerMismatch,

    #[error("Insufficient authority: required {required}, provided {provided:?}")]
    InsufficientAuthority {
        required: String,
        provided: Vec<String>,
    },

    #[error("Key material unavailable: {0}")]
    KeyMaterialUnavailable(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Principal store error: {0}")]
    PrincipalStore(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provided_authorities: Option<Vec<String>>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message, required_authority, provided_authorities) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
                None,
                None,
            ),
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication is required to access this resource".to_string(),
                None,
                None,
            ),
            AuthError::InvalidToken(reason) => {
                tracing::debug!(target: "songify_auth.errors", reason = %reason, "Rejecting invalid token");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    INVALID_TOKEN_MESSAGE.to_string(),
                    None,
                    None,
                )
            }
            AuthError::TokenExpired | AuthError::TokenIssuerMismatch => {
                tracing::debug!(target: "songify_auth.errors", error = %self, "Rejecting token");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    INVALID_TOKEN_MESSAGE.to_string(),
                    None,
                    None,
                )
            }
            AuthError::InsufficientAuthority { required, provided } => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                format!("Requires authority: {}", required),
                Some(required.clone()),
                Some(provided.clone()),
            ),
            AuthError::KeyMaterialUnavailable(reason) => {
                tracing::error!(target: "songify_auth.crypto", reason = %reason, "Key material unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
            AuthError::Crypto(reason) => {
                tracing::error!(target: "songify_auth.crypto", reason = %reason, "Cryptographic operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CRYPTO_ERROR",
                    "An internal cryptographic error occurred".to_string(),
                    None,
                    None,
                )
            }
            AuthError::PrincipalStore(reason) => {
                tracing::error!(target: "songify_auth.principals", reason = %reason, "Principal store failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
                None,
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                required_authority,
                provided_authorities,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}

impl From<common::jwt::JwtValidationError> for AuthError {
    fn from(err: common::jwt::JwtValidationError) -> Self {
        AuthError::InvalidToken(format!("{:?}", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let response = AuthError::InvalidCredentials.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["error"]["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_token_failures_are_indistinguishable() {
        let errors = vec![
            AuthError::InvalidToken("signature mismatch".into()),
            AuthError::TokenExpired,
            AuthError::TokenIssuerMismatch,
        ];

        for error in errors {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let www_auth = response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            assert_eq!(www_auth, "Bearer realm=\"songify\", error=\"invalid_token\"");

            let body = read_body_json(response.into_body()).await;
            assert_eq!(body["error"]["code"], "INVALID_TOKEN");
            assert_eq!(body["error"]["message"], INVALID_TOKEN_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_missing_token_response() {
        let response = AuthError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_insufficient_authority_response() {
        let error = AuthError::InsufficientAuthority {
            required: "ADMIN".to_string(),
            provided: vec!["USER".to_string()],
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["required_authority"], "ADMIN");
        assert_eq!(body["error"]["provided_authorities"][0], "USER");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = AuthError::PrincipalStore("connection refused to 10.0.0.5".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn test_jwt_validation_error_maps_to_invalid_token() {
        let err: AuthError = common::jwt::JwtValidationError::TokenTooLarge.into();
        assert!(matches!(err, AuthError::InvalidToken(reason) if reason == "TokenTooLarge"));
    }
}
