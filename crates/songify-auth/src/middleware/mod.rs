pub mod auth;

pub use auth::{enforce_access_policy, extract_token, ContextExt, ACCESS_TOKEN_COOKIE};
