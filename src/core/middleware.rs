use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use log::debug;
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::forum::types::User;
use crate::forum::{store, with_conn, ForumError};
use crate::security::jwt::AuthError;
use crate::security::log_sanitizer::{sanitize_for_log, sanitize_log_value};

// ============================================================================
// Authenticated User
// ============================================================================

/// Caller identity, verified from the bearer token and backed by a `users` row.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    profile: User,
}

impl AuthenticatedUser {
    pub fn from_user(profile: User) -> Self {
        Self {
            user_id: profile.id.clone(),
            username: profile.username.clone(),
            profile,
        }
    }

    pub fn into_user(self) -> User {
        self.profile
    }
}

// ============================================================================
// Axum Extractors
// ============================================================================

/// Verifies the `Authorization: Bearer` header and provisions the user on
/// first sight. Rejects with 401 before touching the database.
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ForumError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::InvalidFormat))
            .transpose()?;

        let identity = state.verifier.verify_header(header).map_err(|e| {
            debug!(
                "Rejected request to {}: {}",
                sanitize_for_log(parts.uri.path()),
                sanitize_log_value(&e)
            );
            ForumError::from(e)
        })?;

        let profile = with_conn(state.conn.clone(), move |conn| {
            store::provision_user(conn, &identity)
        })
        .await?;

        Ok(Self::from_user(profile))
    }
}
