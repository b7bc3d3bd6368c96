//! Helpers shared by the integration tests.
#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};

use forumserver::security::jwt::Claims;

/// Sign `claims` with HS256, the way the identity provider does.
pub fn issue_token(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// `TEST_DATABASE_URL`, or `None` with a skip notice.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            println!("Skipping test - TEST_DATABASE_URL not set");
            None
        }
    }
}
