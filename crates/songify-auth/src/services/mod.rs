pub mod claims_converter;
pub mod credential_service;
pub mod key_management_service;
pub mod token_service;

pub use claims_converter::ClaimsAuthorizationConverter;
pub use credential_service::CredentialAuthenticator;
pub use token_service::{IssuedToken, TokenIssuer};
