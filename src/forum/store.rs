//! Diesel queries behind the forum endpoints. Every function takes the
//! caller's connection; none of them opens its own.

use chrono::{DateTime, Utc};
use diesel::dsl::{count, max};
use diesel::prelude::*;
use diesel::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use super::ranking::{rank_popular, summarize_forums, ForumStats};
use super::threads::check_reply_depth;
use super::types::*;
use super::ForumError;
use crate::core::shared::models::{
    comments, forums, posts, users, DbComment, DbForum, DbPost, DbUser,
};
use crate::security::jwt::VerifiedIdentity;

pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 254;

#[derive(AsChangeset)]
#[diesel(table_name = posts)]
struct PostChanges {
    title: Option<String>,
    content: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct UserChanges {
    username: Option<String>,
    email: Option<String>,
    updated_at: DateTime<Utc>,
}

pub fn validate_title(title: &str) -> Result<String, ForumError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ForumError::InvalidArgument("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ForumError::InvalidArgument(format!(
            "Title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

pub fn validate_content(content: &str) -> Result<String, ForumError> {
    if content.trim().is_empty() {
        return Err(ForumError::InvalidArgument("Content must not be empty".into()));
    }
    Ok(content.to_string())
}

pub fn validate_username(username: &str) -> Result<String, ForumError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ForumError::InvalidArgument(format!(
            "Username must be 1 to {MAX_USERNAME_CHARS} characters"
        )));
    }
    Ok(username.to_string())
}

pub fn validate_email(email: &str) -> Result<String, ForumError> {
    let email = email.trim();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(ForumError::InvalidArgument("Email must look like name@domain".into()));
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(ForumError::InvalidArgument(format!(
            "Email must be at most {MAX_EMAIL_CHARS} characters"
        )));
    }
    Ok(email.to_string())
}

// Users

/// Insert the caller on first sight, then return the stored row.
pub fn provision_user(conn: &mut PgConnection, identity: &VerifiedIdentity) -> Result<User, ForumError> {
    let now = Utc::now();
    diesel::insert_into(users::table)
        .values(&DbUser {
            id: identity.user_id.clone(),
            username: identity.username.clone(),
            email: identity.email.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
        .on_conflict(users::id)
        .do_nothing()
        .execute(conn)?;
    get_user(conn, &identity.user_id)
}

pub fn get_user(conn: &mut PgConnection, user_id: &str) -> Result<User, ForumError> {
    users::table
        .find(user_id)
        .first::<DbUser>(conn)
        .optional()?
        .map(db_user_to_user)
        .ok_or_else(|| ForumError::NotFound("User not found".into()))
}

pub fn update_user(
    conn: &mut PgConnection,
    user_id: &str,
    req: UpdateProfileRequest,
) -> Result<User, ForumError> {
    let changes = UserChanges {
        username: req.username.as_deref().map(validate_username).transpose()?,
        email: req.email.as_deref().map(validate_email).transpose()?,
        updated_at: Utc::now(),
    };
    diesel::update(users::table.find(user_id))
        .set(&changes)
        .get_result::<DbUser>(conn)
        .optional()?
        .map(db_user_to_user)
        .ok_or_else(|| ForumError::NotFound("User not found".into()))
}

// Forums

pub fn list_forums(conn: &mut PgConnection) -> Result<Vec<ForumSummary>, ForumError> {
    let all: Vec<Forum> = forums::table
        .load::<DbForum>(conn)?
        .into_iter()
        .map(db_forum_to_forum)
        .collect();

    let stats: HashMap<String, ForumStats> = posts::table
        .group_by(posts::forum_id)
        .select((posts::forum_id, count(posts::id), max(posts::created_at)))
        .load::<(String, i64, Option<DateTime<Utc>>)>(conn)?
        .into_iter()
        .map(|(forum_id, post_count, last_activity)| {
            (
                forum_id,
                ForumStats {
                    post_count,
                    last_activity,
                },
            )
        })
        .collect();

    Ok(summarize_forums(all, &stats))
}

pub fn get_forum(conn: &mut PgConnection, forum_id: &str) -> Result<Forum, ForumError> {
    forums::table
        .find(forum_id)
        .first::<DbForum>(conn)
        .optional()?
        .map(db_forum_to_forum)
        .ok_or_else(|| ForumError::NotFound("Forum not found".into()))
}

// Posts

pub fn list_posts(
    conn: &mut PgConnection,
    forum_id: Option<String>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, ForumError> {
    let mut query = posts::table.into_boxed();
    if let Some(forum_id) = forum_id {
        query = query.filter(posts::forum_id.eq(forum_id));
    }
    let rows = query
        .order((posts::created_at.desc(), posts::id.asc()))
        .limit(limit)
        .offset(offset)
        .load::<DbPost>(conn)?;
    Ok(rows.into_iter().map(db_post_to_post).collect())
}

pub fn popular_posts(conn: &mut PgConnection, limit: i64) -> Result<Vec<PopularPost>, ForumError> {
    let rows: Vec<(DbPost, String, String)> = posts::table
        .inner_join(users::table)
        .inner_join(forums::table)
        .select((posts::all_columns, users::username, forums::name))
        .order((posts::score.desc(), posts::created_at.desc(), posts::id.asc()))
        .limit(limit)
        .load(conn)?;

    let ids: Vec<Uuid> = rows.iter().map(|(post, _, _)| post.id).collect();
    let comment_counts: HashMap<Uuid, i64> = comments::table
        .filter(comments::post_id.eq_any(&ids))
        .group_by(comments::post_id)
        .select((comments::post_id, count(comments::id)))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect();

    let popular = rows
        .into_iter()
        .map(|(post, author_name, forum_name)| PopularPost {
            comment_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            author_name,
            forum_id: post.forum_id,
            forum_name,
            vote_count: post.score,
            created_at: post.created_at,
        })
        .collect();

    Ok(rank_popular(popular, usize::try_from(limit).unwrap_or(0)))
}

pub fn get_post(conn: &mut PgConnection, post_id: Uuid) -> Result<Post, ForumError> {
    find_post(conn, post_id).map(db_post_to_post)
}

pub fn create_post(
    conn: &mut PgConnection,
    author_id: &str,
    req: CreatePostRequest,
) -> Result<Post, ForumError> {
    let title = validate_title(&req.title)?;
    let content = validate_content(&req.content)?;
    let forum_id = req.forum_id.trim().to_string();

    let forum_exists = forums::table
        .find(&forum_id)
        .select(forums::id)
        .first::<String>(conn)
        .optional()?
        .is_some();
    if !forum_exists {
        return Err(ForumError::NotFound("Forum not found".into()));
    }

    let now = Utc::now();
    let row = diesel::insert_into(posts::table)
        .values(&DbPost {
            id: Uuid::new_v4(),
            title,
            content,
            author_id: author_id.to_string(),
            forum_id,
            score: 0,
            created_at: now,
            updated_at: now,
        })
        .get_result::<DbPost>(conn)?;
    Ok(db_post_to_post(row))
}

pub fn update_post(
    conn: &mut PgConnection,
    post_id: Uuid,
    user_id: &str,
    req: UpdatePostRequest,
) -> Result<Post, ForumError> {
    let existing = find_post(conn, post_id)?;
    if existing.author_id != user_id {
        return Err(ForumError::Forbidden("Only the author can edit this post".into()));
    }

    let changes = PostChanges {
        title: req.title.as_deref().map(validate_title).transpose()?,
        content: req.content.as_deref().map(validate_content).transpose()?,
        updated_at: Utc::now(),
    };
    let row = diesel::update(posts::table.find(post_id))
        .set(&changes)
        .get_result::<DbPost>(conn)?;
    Ok(db_post_to_post(row))
}

/// Delete a post with its comments and votes.
pub fn delete_post(conn: &mut PgConnection, post_id: Uuid, user_id: &str) -> Result<(), ForumError> {
    let existing = find_post(conn, post_id)?;
    if existing.author_id != user_id {
        return Err(ForumError::Forbidden("Only the author can delete this post".into()));
    }
    diesel::delete(posts::table.find(post_id)).execute(conn)?;
    Ok(())
}

fn find_post(conn: &mut PgConnection, post_id: Uuid) -> Result<DbPost, ForumError> {
    posts::table
        .find(post_id)
        .first::<DbPost>(conn)
        .optional()?
        .ok_or_else(|| ForumError::NotFound("Post not found".into()))
}

// Comments

/// All comments of a post, oldest first.
pub fn list_comments(conn: &mut PgConnection, post_id: Uuid) -> Result<Vec<Comment>, ForumError> {
    find_post(conn, post_id)?;
    let rows = comments::table
        .filter(comments::post_id.eq(post_id))
        .order((comments::created_at.asc(), comments::id.asc()))
        .load::<DbComment>(conn)?;
    Ok(rows.into_iter().map(db_comment_to_comment).collect())
}

pub fn create_comment(
    conn: &mut PgConnection,
    post_id: Uuid,
    author_id: &str,
    req: CreateCommentRequest,
) -> Result<Comment, ForumError> {
    let content = validate_content(&req.content)?;
    find_post(conn, post_id)?;

    if let Some(parent_id) = req.parent_id {
        let grandparent = comments::table
            .filter(comments::id.eq(parent_id))
            .filter(comments::post_id.eq(post_id))
            .select(comments::parent_id)
            .first::<Option<Uuid>>(conn)
            .optional()?
            .ok_or_else(|| {
                ForumError::NotFound("Parent comment not found or does not belong to this post".into())
            })?;
        check_reply_depth(grandparent, |ancestor| -> Result<Option<Uuid>, ForumError> {
            let parent = comments::table
                .find(ancestor)
                .select(comments::parent_id)
                .first::<Option<Uuid>>(conn)
                .optional()?;
            Ok(parent.flatten())
        })?;
    }

    let now = Utc::now();
    let row = diesel::insert_into(comments::table)
        .values(&DbComment {
            id: Uuid::new_v4(),
            content,
            author_id: author_id.to_string(),
            post_id,
            parent_id: req.parent_id,
            score: 0,
            created_at: now,
            updated_at: now,
        })
        .get_result::<DbComment>(conn)?;
    Ok(db_comment_to_comment(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation() {
        assert_eq!(crate::assert_ok!(validate_title("  Hello  ")), "Hello");
        let err = crate::assert_err!(validate_title("   "));
        assert!(matches!(err, ForumError::InvalidArgument(_)));
        assert!(validate_title(&"x".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_CHARS + 1)).is_err());
        assert!(validate_title(&"é".repeat(MAX_TITLE_CHARS)).is_ok());
    }

    #[test]
    fn test_content_validation_keeps_body() {
        assert_eq!(validate_content("  body\n").ok().as_deref(), Some("  body\n"));
        assert!(matches!(validate_content("\n\t "), Err(ForumError::InvalidArgument(_))));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email(" bob@example.com ").ok().as_deref(), Some("bob@example.com"));
        for bad in ["", "   ", "bob", "@example.com", "bob@", "bob@@example.com", "bo b@example.com"] {
            assert!(
                matches!(validate_email(bad), Err(ForumError::InvalidArgument(_))),
                "accepted {bad:?}"
            );
        }
        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_CHARS));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_username_validation() {
        assert_eq!(validate_username(" alice ").ok().as_deref(), Some("alice"));
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_CHARS + 1)).is_err());
    }
}
