//! Request extractors whose rejections use the forum error body.
//!
//! axum's own `Path`, `Query` and `Json` reject with plain-text 400/415/422
//! responses. These wrappers route the same failures through [`ForumError`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use super::ForumError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ForumError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ForumError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ForumError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ForumError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for ForumError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for ForumError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::types::{PostListQuery, VoteRequest};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn router() -> Router {
        Router::new()
            .route(
                "/vote",
                post(|ApiJson(req): ApiJson<VoteRequest>| async move { req.vote_type }),
            )
            .route(
                "/items/{id}",
                get(|ApiPath(id): ApiPath<Uuid>| async move { id.to_string() }),
            )
            .route(
                "/items",
                get(|ApiQuery(query): ApiQuery<PostListQuery>| async move {
                    format!("{:?}", query.limit)
                }),
            )
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    fn vote(body: &str) -> Request<Body> {
        Request::post("/vote")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn test_bad_vote_bodies_get_error_json() {
        for body in ["{}", r#"{"vote_type":5}"#, "not json"] {
            let (status, value) = send(vote(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(value["error"], "invalid_argument", "body {body}");
            assert!(value["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_gets_error_json() {
        let request = Request::post("/vote")
            .body(Body::from(r#"{"vote_type":"up"}"#))
            .expect("request");
        let (status, value) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_malformed_path_id_gets_error_json() {
        let request = Request::get("/items/not-a-uuid").body(Body::empty()).expect("request");
        let (status, value) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_malformed_query_gets_error_json() {
        let request = Request::get("/items?limit=lots").body(Body::empty()).expect("request");
        let (status, value) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_good_input_passes_through() {
        let response = router().oneshot(vote(r#"{"vote_type":"up"}"#)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], b"up");
    }
}
