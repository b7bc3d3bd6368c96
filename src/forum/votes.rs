//! Vote ledger.
//!
//! A user holds at most one vote per post or comment. Repeating a vote
//! retracts it, voting the other way flips it, and every change moves the
//! target's cached `score` by the matching delta inside the same transaction.

use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::types::ScoreAudit;
use super::ForumError;
use crate::core::shared::models::{comments, posts, votes, DbVote};
use crate::security::log_sanitizer::sanitize_for_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Contribution of one vote of this type to a score.
    pub fn weight(&self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(ForumError::InvalidArgument(format!(
                "vote_type must be 'up' or 'down', got '{}'",
                sanitize_for_log(s)
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl VoteTarget {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Post(id) | Self::Comment(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post(_) => "Post",
            Self::Comment(_) => "Comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Cast,
    Retract,
    Flip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub delta: i32,
    /// The caller's vote once the outcome is applied.
    pub resulting: Option<VoteType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub action: VoteAction,
    pub score: i32,
    pub user_vote: Option<VoteType>,
}

pub fn resolve_vote(existing: Option<VoteType>, requested: VoteType) -> VoteOutcome {
    match existing {
        None => VoteOutcome {
            action: VoteAction::Cast,
            delta: requested.weight(),
            resulting: Some(requested),
        },
        Some(current) if current == requested => VoteOutcome {
            action: VoteAction::Retract,
            delta: -current.weight(),
            resulting: None,
        },
        Some(current) => VoteOutcome {
            action: VoteAction::Flip,
            delta: requested.weight() - current.weight(),
            resulting: Some(requested),
        },
    }
}

/// Net score of a set of votes.
pub fn tally<'a>(votes: impl IntoIterator<Item = &'a VoteType>) -> i64 {
    votes.into_iter().map(|v| i64::from(v.weight())).sum()
}

/// Record `requested` from `user_id` on `target` and return the new score.
///
/// Runs in one transaction holding a row lock on the target, so concurrent
/// votes on the same target apply one after another.
pub fn apply_vote(
    conn: &mut PgConnection,
    user_id: &str,
    target: VoteTarget,
    requested: VoteType,
) -> Result<VoteReceipt, ForumError> {
    conn.transaction::<_, ForumError, _>(|conn| {
        lock_target(conn, target)?;

        let existing = find_vote(conn, user_id, target)?;
        let current = existing
            .as_ref()
            .map(|row| stored_vote_type(&row.vote_type))
            .transpose()?;
        let outcome = resolve_vote(current, requested);

        match (outcome.action, existing) {
            (VoteAction::Cast, _) => {
                let now = Utc::now();
                let (post_id, comment_id) = match target {
                    VoteTarget::Post(id) => (Some(id), None),
                    VoteTarget::Comment(id) => (None, Some(id)),
                };
                diesel::insert_into(votes::table)
                    .values(&DbVote {
                        id: Uuid::new_v4(),
                        user_id: user_id.to_string(),
                        post_id,
                        comment_id,
                        vote_type: requested.as_str().to_string(),
                        created_at: now,
                        updated_at: now,
                    })
                    .execute(conn)?;
            }
            (VoteAction::Retract, Some(row)) => {
                diesel::delete(votes::table.find(row.id)).execute(conn)?;
            }
            (VoteAction::Flip, Some(row)) => {
                diesel::update(votes::table.find(row.id))
                    .set((
                        votes::vote_type.eq(requested.as_str()),
                        votes::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }
            (action, None) => {
                return Err(ForumError::Internal(format!(
                    "{action:?} resolved without an existing vote"
                )))
            }
        }

        let score = adjust_score(conn, target, outcome.delta)?;
        Ok(VoteReceipt {
            action: outcome.action,
            score,
            user_vote: outcome.resulting,
        })
    })
}

/// Compare the cached score of `target` with the net of its vote rows.
pub fn audit_score(conn: &mut PgConnection, target: VoteTarget) -> Result<ScoreAudit, ForumError> {
    let cached = match target {
        VoteTarget::Post(id) => posts::table
            .find(id)
            .select(posts::score)
            .first::<i32>(conn)
            .optional()?,
        VoteTarget::Comment(id) => comments::table
            .find(id)
            .select(comments::score)
            .first::<i32>(conn)
            .optional()?,
    }
    .ok_or_else(|| not_found(target))?;

    let rows: Vec<String> = match target {
        VoteTarget::Post(id) => votes::table
            .filter(votes::post_id.eq(id))
            .select(votes::vote_type)
            .load(conn)?,
        VoteTarget::Comment(id) => votes::table
            .filter(votes::comment_id.eq(id))
            .select(votes::vote_type)
            .load(conn)?,
    };
    let cast = rows
        .iter()
        .map(|raw| stored_vote_type(raw.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let tallied = tally(&cast);

    Ok(ScoreAudit {
        cached,
        tallied,
        consistent: i64::from(cached) == tallied,
    })
}

fn lock_target(conn: &mut PgConnection, target: VoteTarget) -> Result<i32, ForumError> {
    let score = match target {
        VoteTarget::Post(id) => posts::table
            .find(id)
            .select(posts::score)
            .for_update()
            .first::<i32>(conn)
            .optional()?,
        VoteTarget::Comment(id) => comments::table
            .find(id)
            .select(comments::score)
            .for_update()
            .first::<i32>(conn)
            .optional()?,
    };
    score.ok_or_else(|| not_found(target))
}

fn find_vote(
    conn: &mut PgConnection,
    user_id: &str,
    target: VoteTarget,
) -> Result<Option<DbVote>, ForumError> {
    let query = votes::table.filter(votes::user_id.eq(user_id)).into_boxed();
    let query = match target {
        VoteTarget::Post(id) => query.filter(votes::post_id.eq(id)),
        VoteTarget::Comment(id) => query.filter(votes::comment_id.eq(id)),
    };
    Ok(query.first::<DbVote>(conn).optional()?)
}

fn adjust_score(conn: &mut PgConnection, target: VoteTarget, delta: i32) -> Result<i32, ForumError> {
    let score = match target {
        VoteTarget::Post(id) => diesel::update(posts::table.find(id))
            .set(posts::score.eq(posts::score + delta))
            .returning(posts::score)
            .get_result::<i32>(conn)?,
        VoteTarget::Comment(id) => diesel::update(comments::table.find(id))
            .set(comments::score.eq(comments::score + delta))
            .returning(comments::score)
            .get_result::<i32>(conn)?,
    };
    Ok(score)
}

fn stored_vote_type(raw: &str) -> Result<VoteType, ForumError> {
    raw.parse::<VoteType>()
        .map_err(|_| ForumError::Internal(format!("Unknown stored vote type '{raw}'")))
}

fn not_found(target: VoteTarget) -> ForumError {
    ForumError::NotFound(format!("{} not found", target.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory model of one user's vote on one target.
    #[derive(Default)]
    struct Ledger {
        vote: Option<VoteType>,
        score: i32,
    }

    impl Ledger {
        fn vote(&mut self, requested: VoteType) -> VoteOutcome {
            let outcome = resolve_vote(self.vote, requested);
            self.vote = outcome.resulting;
            self.score += outcome.delta;
            outcome
        }
    }

    #[test]
    fn test_cast_on_empty() {
        let up = resolve_vote(None, VoteType::Up);
        assert_eq!(up.action, VoteAction::Cast);
        assert_eq!(up.delta, 1);
        assert_eq!(up.resulting, Some(VoteType::Up));

        let down = resolve_vote(None, VoteType::Down);
        assert_eq!(down.delta, -1);
        assert_eq!(down.resulting, Some(VoteType::Down));
    }

    #[test]
    fn test_same_type_retracts() {
        let outcome = resolve_vote(Some(VoteType::Up), VoteType::Up);
        assert_eq!(outcome.action, VoteAction::Retract);
        assert_eq!(outcome.delta, -1);
        assert_eq!(outcome.resulting, None);

        let outcome = resolve_vote(Some(VoteType::Down), VoteType::Down);
        assert_eq!(outcome.delta, 1);
        assert_eq!(outcome.resulting, None);
    }

    #[test]
    fn test_opposite_type_flips_by_two() {
        let outcome = resolve_vote(Some(VoteType::Up), VoteType::Down);
        assert_eq!(outcome.action, VoteAction::Flip);
        assert_eq!(outcome.delta, -2);
        assert_eq!(outcome.resulting, Some(VoteType::Down));

        let outcome = resolve_vote(Some(VoteType::Down), VoteType::Up);
        assert_eq!(outcome.delta, 2);
        assert_eq!(outcome.resulting, Some(VoteType::Up));
    }

    #[test]
    fn test_double_vote_is_a_no_op() {
        let mut ledger = Ledger::default();
        ledger.vote(VoteType::Up);
        ledger.vote(VoteType::Up);
        assert_eq!(ledger.vote, None);
        assert_eq!(ledger.score, 0);

        ledger.vote(VoteType::Up);
        assert_eq!(ledger.vote, Some(VoteType::Up));
        assert_eq!(ledger.score, 1);
    }

    #[test]
    fn test_flip_and_flip_back_restores_score() {
        let mut ledger = Ledger::default();
        ledger.vote(VoteType::Up);
        let before = ledger.score;

        ledger.vote(VoteType::Down);
        assert_eq!(ledger.score, before - 2);
        ledger.vote(VoteType::Up);
        assert_eq!(ledger.score, before);
    }

    #[test]
    fn test_upvote_downvote_downvote_scenario() {
        let mut ledger = Ledger::default();

        assert_eq!(ledger.vote(VoteType::Up).action, VoteAction::Cast);
        assert_eq!(ledger.score, 1);

        assert_eq!(ledger.vote(VoteType::Down).action, VoteAction::Flip);
        assert_eq!(ledger.score, -1);

        assert_eq!(ledger.vote(VoteType::Down).action, VoteAction::Retract);
        assert_eq!(ledger.score, 0);
        assert_eq!(ledger.vote, None);
    }

    #[test]
    fn test_score_always_matches_tally() {
        let sequence = [
            VoteType::Up,
            VoteType::Down,
            VoteType::Down,
            VoteType::Down,
            VoteType::Up,
            VoteType::Up,
            VoteType::Down,
        ];
        let mut ledger = Ledger::default();
        for requested in sequence {
            ledger.vote(requested);
            let rows: Vec<VoteType> = ledger.vote.into_iter().collect();
            assert_eq!(i64::from(ledger.score), tally(&rows));
        }
    }

    #[test]
    fn test_tally_mixed_votes() {
        let votes = [VoteType::Up, VoteType::Up, VoteType::Down, VoteType::Up];
        assert_eq!(tally(&votes), 2);
        assert_eq!(tally(&[]), 0);
    }

    #[test]
    fn test_vote_type_parsing() {
        assert_eq!("up".parse::<VoteType>().ok(), Some(VoteType::Up));
        assert_eq!(" Down ".parse::<VoteType>().ok(), Some(VoteType::Down));

        let err = "sideways".parse::<VoteType>().expect_err("invalid vote type");
        assert!(matches!(err, ForumError::InvalidArgument(_)));
        assert!(stored_vote_type("meh").is_err());
    }

    #[test]
    fn test_vote_type_serializes_lowercase() {
        assert_eq!(serde_json::json!(VoteType::Down), serde_json::json!("down"));
        assert_eq!(VoteType::Up.to_string(), "up");
    }

    #[test]
    fn test_target_accessors() {
        let id = Uuid::new_v4();
        assert_eq!(VoteTarget::Post(id).id(), id);
        assert_eq!(VoteTarget::Comment(id).kind(), "Comment");
        assert!(not_found(VoteTarget::Post(id)).to_string().contains("Post not found"));
    }
}
