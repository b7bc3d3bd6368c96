pub mod extract;
pub mod handlers;
pub mod ranking;
pub mod store;
pub mod threads;
pub mod types;
pub mod votes;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;
use log::error;
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::shared::utils::DbPool;
use crate::security::jwt::AuthError;

pub use threads::{
    build_comment_tree, check_reply_depth, CommentForest, CommentNode, OrphanPolicy, ReplyTooDeep,
    MAX_REPLY_DEPTH,
};
pub use types::*;
pub use votes::{apply_vote, resolve_vote, VoteAction, VoteOutcome, VoteReceipt, VoteTarget, VoteType};

#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForumError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForumError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            Self::NotFound(msg)
            | Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::InvalidArgument(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Database(msg) | Self::Internal(msg) => {
                error!("{}: {}", self.kind(), msg);
                "Internal server error".to_string()
            }
        };
        (
            self.status(),
            Json(serde_json::json!({ "error": self.kind(), "message": message })),
        )
            .into_response()
    }
}

impl From<DieselError> for ForumError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("Resource not found".to_string()),
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::UniqueViolation => {
                        Self::Conflict(message)
                    }
                    DatabaseErrorKind::ForeignKeyViolation | DatabaseErrorKind::CheckViolation => {
                        Self::InvalidArgument(message)
                    }
                    _ => Self::Database(message),
                }
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<ReplyTooDeep> for ForumError {
    fn from(err: ReplyTooDeep) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<AuthError> for ForumError {
    fn from(err: AuthError) -> Self {
        Self::Unauthenticated(err.to_string())
    }
}

/// Runs `f` on a pooled connection off the async runtime.
pub async fn with_conn<T, F>(pool: DbPool, f: F) -> Result<T, ForumError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, ForumError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| ForumError::Database(e.to_string()))?;
        f(&mut *conn)
    })
    .await
    .map_err(|e| ForumError::Internal(e.to_string()))?
}

pub fn configure_forum_routes() -> Router<Arc<AppState>> {
    use handlers::*;

    Router::new()
        .route("/api/forums", get(handle_list_forums))
        .route("/api/forums/{id}", get(handle_get_forum))
        .route("/api/posts", get(handle_list_posts).post(handle_create_post))
        .route("/api/posts/popular", get(handle_popular_posts))
        .route("/api/posts/{id}", get(handle_get_post).put(handle_update_post).delete(handle_delete_post))
        .route("/api/posts/{id}/comments", get(handle_get_comments).post(handle_create_comment))
        .route("/api/posts/{id}/vote", post(handle_vote_post))
        .route("/api/posts/{id}/score", get(handle_post_score))
        .route("/api/comments/{id}/vote", post(handle_vote_comment))
        .route("/api/comments/{id}/score", get(handle_comment_score))
        .route("/api/me", get(handle_get_me).put(handle_update_me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ForumError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ForumError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ForumError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ForumError::InvalidArgument("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ForumError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ForumError::Database("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ForumError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: ForumError = DieselError::NotFound.into();
        assert!(matches!(err, ForumError::NotFound(_)));

        let err: ForumError = DieselError::RollbackTransaction.into();
        assert!(matches!(err, ForumError::Database(_)));
    }

    #[test]
    fn test_auth_error_maps_to_unauthenticated() {
        let err: ForumError = AuthError::TokenExpired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("Token expired"));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ForumError::Forbidden("Only the author can delete this post".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["error"], "forbidden");
        assert_eq!(value["message"], "Only the author can delete this post");
    }

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let response = ForumError::Database("relation \"posts\" does not exist".into()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["error"], "internal");
        assert_eq!(value["message"], "Internal server error");
    }
}
