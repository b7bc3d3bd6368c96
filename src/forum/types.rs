use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::models::{DbComment, DbForum, DbPost, DbUser};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub post_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub forum_id: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub forum_id: String,
    pub forum_name: String,
    pub vote_count: i32,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: String,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteResponse {
    pub score: i32,
    pub user_vote: Option<super::votes::VoteType>,
}

/// Cached score next to the score recomputed from vote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreAudit {
    pub cached: i32,
    pub tallied: i64,
    pub consistent: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub forum_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub forum_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

pub(crate) fn db_user_to_user(db: DbUser) -> User {
    User {
        id: db.id,
        username: db.username,
        email: db.email,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub(crate) fn db_forum_to_forum(db: DbForum) -> Forum {
    Forum {
        id: db.id,
        name: db.name,
        description: db.description,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub(crate) fn db_post_to_post(db: DbPost) -> Post {
    Post {
        id: db.id,
        title: db.title,
        content: db.content,
        author_id: db.author_id,
        forum_id: db.forum_id,
        score: db.score,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub(crate) fn db_comment_to_comment(db: DbComment) -> Comment {
    Comment {
        id: db.id,
        post_id: db.post_id,
        author_id: db.author_id,
        parent_id: db.parent_id,
        content: db.content,
        score: db.score,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}
