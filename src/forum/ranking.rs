use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{Forum, ForumSummary, PopularPost};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Highest score first, newest first on ties, then by id.
pub fn popular_order(a: &PopularPost, b: &PopularPost) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank_popular(mut posts: Vec<PopularPost>, limit: usize) -> Vec<PopularPost> {
    posts.sort_by(popular_order);
    posts.truncate(limit);
    posts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForumStats {
    pub post_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Attach post statistics to each forum, sorted by name then id.
pub fn summarize_forums(forums: Vec<Forum>, stats: &HashMap<String, ForumStats>) -> Vec<ForumSummary> {
    let mut summaries: Vec<ForumSummary> = forums
        .into_iter()
        .map(|forum| {
            let stat = stats.get(&forum.id).copied().unwrap_or_default();
            ForumSummary {
                id: forum.id,
                name: forum.name,
                description: forum.description,
                created_at: forum.created_at,
                post_count: stat.post_count,
                last_activity: stat.last_activity,
            }
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    summaries
}
