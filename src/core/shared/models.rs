use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::schema;

pub use super::schema::{comments, forums, posts, users, votes};

/// Row of `users`. Field order follows the table definition.
#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = forums)]
pub struct DbForum {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = posts)]
pub struct DbPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub forum_id: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = comments)]
pub struct DbComment {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exactly one of `post_id` / `comment_id` is set; the table enforces it.
#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = votes)]
pub struct DbVote {
    pub id: Uuid,
    pub user_id: String,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub vote_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
