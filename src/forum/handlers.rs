use axum::{extract::State, http::StatusCode, Json};
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::ranking::{clamp_limit, clamp_offset};
use super::threads::{build_comment_tree, CommentNode};
use super::types::*;
use super::votes::{apply_vote, audit_score, VoteTarget, VoteType};
use super::{store, with_conn, ForumError};
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::state::AppState;
use crate::security::log_sanitizer::sanitize_for_log;

pub async fn handle_list_forums(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ForumSummary>>, ForumError> {
    let forums = with_conn(state.conn.clone(), store::list_forums).await?;
    Ok(Json(forums))
}

pub async fn handle_get_forum(
    State(state): State<Arc<AppState>>,
    ApiPath(forum_id): ApiPath<String>,
) -> Result<Json<Forum>, ForumError> {
    let forum = with_conn(state.conn.clone(), move |conn| store::get_forum(conn, &forum_id)).await?;
    Ok(Json(forum))
}

pub async fn handle_list_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> Result<Json<Vec<Post>>, ForumError> {
    let limit = clamp_limit(query.limit);
    let offset = clamp_offset(query.offset);
    let posts = with_conn(state.conn.clone(), move |conn| {
        store::list_posts(conn, query.forum_id, limit, offset)
    })
    .await?;
    Ok(Json(posts))
}

pub async fn handle_popular_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PopularQuery>,
) -> Result<Json<Vec<PopularPost>>, ForumError> {
    let limit = clamp_limit(query.limit);
    let posts = with_conn(state.conn.clone(), move |conn| store::popular_posts(conn, limit)).await?;
    Ok(Json(posts))
}

pub async fn handle_create_post(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ForumError> {
    let author_id = user.user_id.clone();
    let post = with_conn(state.conn.clone(), move |conn| {
        store::create_post(conn, &author_id, req)
    })
    .await?;
    info!(
        "Post {} created in forum {} by {} ({})",
        post.id,
        sanitize_for_log(&post.forum_id),
        sanitize_for_log(&user.username),
        sanitize_for_log(&user.user_id)
    );
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn handle_get_post(
    State(state): State<Arc<AppState>>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<Post>, ForumError> {
    let post = with_conn(state.conn.clone(), move |conn| store::get_post(conn, post_id)).await?;
    Ok(Json(post))
}

pub async fn handle_update_post(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Result<Json<Post>, ForumError> {
    let post = with_conn(state.conn.clone(), move |conn| {
        store::update_post(conn, post_id, &user.user_id, req)
    })
    .await?;
    Ok(Json(post))
}

pub async fn handle_delete_post(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<serde_json::Value>, ForumError> {
    let user_id = user.user_id.clone();
    with_conn(state.conn.clone(), move |conn| store::delete_post(conn, post_id, &user_id)).await?;
    info!(
        "Post {post_id} deleted by {} ({})",
        sanitize_for_log(&user.username),
        sanitize_for_log(&user.user_id)
    );
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn handle_get_comments(
    State(state): State<Arc<AppState>>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<Vec<CommentNode>>, ForumError> {
    let comments = with_conn(state.conn.clone(), move |conn| store::list_comments(conn, post_id)).await?;
    let policy = state.config.forum.orphan_policy;
    let forest = build_comment_tree(comments, policy);
    if !forest.orphans.is_empty() {
        warn!(
            "Post {post_id}: {} orphaned replies ({policy}): {:?}",
            forest.orphans.len(),
            forest.orphans
        );
    }
    Ok(Json(forest.roots))
}

pub async fn handle_create_comment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ForumError> {
    let author_id = user.user_id.clone();
    let comment = with_conn(state.conn.clone(), move |conn| {
        store::create_comment(conn, post_id, &author_id, req)
    })
    .await?;
    info!(
        "Comment {} on post {post_id} by {}",
        comment.id,
        sanitize_for_log(&user.username)
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn cast_vote(
    state: &AppState,
    user: AuthenticatedUser,
    target: VoteTarget,
    req: VoteRequest,
) -> Result<Json<VoteResponse>, ForumError> {
    let requested: VoteType = req.vote_type.parse()?;
    let user_id = user.user_id.clone();
    let receipt = with_conn(state.conn.clone(), move |conn| {
        apply_vote(conn, &user_id, target, requested)
    })
    .await?;
    info!(
        "{} {} {:?} by {}: {} -> score {}",
        target.kind(),
        target.id(),
        receipt.action,
        sanitize_for_log(&user.username),
        requested,
        receipt.score
    );
    Ok(Json(VoteResponse {
        score: receipt.score,
        user_vote: receipt.user_vote,
    }))
}

pub async fn handle_vote_post(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> Result<Json<VoteResponse>, ForumError> {
    cast_vote(&state, user, VoteTarget::Post(post_id), req).await
}

pub async fn handle_vote_comment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(comment_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> Result<Json<VoteResponse>, ForumError> {
    cast_vote(&state, user, VoteTarget::Comment(comment_id), req).await
}

async fn score_audit(state: &AppState, target: VoteTarget) -> Result<Json<ScoreAudit>, ForumError> {
    let audit = with_conn(state.conn.clone(), move |conn| audit_score(conn, target)).await?;
    if !audit.consistent {
        warn!(
            "{} {} score drift: cached {} tallied {}",
            target.kind(),
            target.id(),
            audit.cached,
            audit.tallied
        );
    }
    Ok(Json(audit))
}

pub async fn handle_post_score(
    State(state): State<Arc<AppState>>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<ScoreAudit>, ForumError> {
    score_audit(&state, VoteTarget::Post(post_id)).await
}

pub async fn handle_comment_score(
    State(state): State<Arc<AppState>>,
    ApiPath(comment_id): ApiPath<Uuid>,
) -> Result<Json<ScoreAudit>, ForumError> {
    score_audit(&state, VoteTarget::Comment(comment_id)).await
}

pub async fn handle_get_me(user: AuthenticatedUser) -> Json<User> {
    Json(user.into_user())
}

pub async fn handle_update_me(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ForumError> {
    let updated = with_conn(state.conn.clone(), move |conn| {
        store::update_user(conn, &user.user_id, req)
    })
    .await?;
    Ok(Json(updated))
}
