pub mod cors;
pub mod jwt;
pub mod log_sanitizer;

pub use cors::{create_cors_layer, CorsConfig};
pub use jwt::{
    extract_bearer_token, AuthError, Claims, IdentityVerifier, JwtAlgorithm, JwtConfig,
    VerifiedIdentity,
};
pub use log_sanitizer::{sanitize_for_log, sanitize_log_value};
