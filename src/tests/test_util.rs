use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Once;

use crate::security::jwt::{Claims, JwtAlgorithm, JwtConfig};

static INIT: Once = Once::new();

pub const TEST_SECRET: &str = "forumserver-test-secret-at-least-32-bytes";

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        algorithm: JwtAlgorithm::HS256,
        audience: None,
        issuer: None,
        leeway_seconds: 5,
    }
}

/// Sign `claims` with HS256, the way the identity provider does.
pub fn issue_token(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
}
