//! Reply threading for a post's comments.
//!
//! Comments arrive flat and oldest-first. [`build_comment_tree`] nests them
//! under their parents in a single pass over an index arena, leaving the
//! loaded rows untouched.
//!
//! Building, counting and dropping a tree use explicit stacks, so a long
//! reply chain never recurses on the caller's stack. Serialization does
//! recurse, which is why new replies are capped at [`MAX_REPLY_DEPTH`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::types::Comment;

/// Deepest reply level accepted on insert. Top-level comments are level 0.
pub const MAX_REPLY_DEPTH: usize = 64;

/// What to do with a reply whose parent is not among the post's comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave the orphan, and everything beneath it, out of the tree.
    #[default]
    Drop,
    /// Show the orphan as a top-level comment.
    Promote,
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Promote => write!(f, "promote"),
        }
    }
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "promote" | "root" => Ok(Self::Promote),
            other => Err(format!("expected 'drop' or 'promote', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.replies.iter());
        }
        count
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        // Unlink descendants first so each node drops with no replies.
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentForest {
    pub roots: Vec<CommentNode>,
    /// Comments whose parent could not be resolved, in input order.
    pub orphans: Vec<Uuid>,
}

impl CommentForest {
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(CommentNode::size).sum()
    }
}

/// Level a new reply would sit at, given its parent's own `parent_id`.
///
/// Walks up through `parent_of` one ancestor at a time and stops as soon as
/// the chain passes [`MAX_REPLY_DEPTH`], so the walk is bounded even if the
/// stored chain loops.
pub fn check_reply_depth<F, E>(grandparent: Option<Uuid>, mut parent_of: F) -> Result<usize, E>
where
    F: FnMut(Uuid) -> Result<Option<Uuid>, E>,
    E: From<ReplyTooDeep>,
{
    let mut depth = 1;
    let mut ancestor = grandparent;
    while let Some(id) = ancestor {
        depth += 1;
        if depth > MAX_REPLY_DEPTH {
            return Err(ReplyTooDeep.into());
        }
        ancestor = parent_of(id)?;
    }
    Ok(depth)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Replies can be nested at most {MAX_REPLY_DEPTH} levels deep")]
pub struct ReplyTooDeep;

/// Nest `comments` (one post, oldest first) into a reply forest.
///
/// Sibling order follows input order. A reply whose parent is missing is an
/// orphan and is handled per `policy`; replies below a dropped orphan go with
/// it. Reply cycles never reach a root and are not emitted.
pub fn build_comment_tree(comments: Vec<Comment>, policy: OrphanPolicy) -> CommentForest {
    let index: HashMap<Uuid, usize> = comments
        .iter()
        .enumerate()
        .map(|(slot, c)| (c.id, slot))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots: Vec<usize> = Vec::new();
    let mut orphans: Vec<Uuid> = Vec::new();

    for (slot, comment) in comments.iter().enumerate() {
        match comment.parent_id {
            None => roots.push(slot),
            Some(parent) => match index.get(&parent) {
                Some(&parent_slot) if parent_slot != slot => children[parent_slot].push(slot),
                _ => {
                    orphans.push(comment.id);
                    if policy == OrphanPolicy::Promote {
                        roots.push(slot);
                    }
                }
            },
        }
    }

    let mut arena: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let roots = roots
        .into_iter()
        .filter_map(|slot| assemble(slot, &mut arena, &children))
        .collect();

    CommentForest { roots, orphans }
}

fn assemble(
    root: usize,
    arena: &mut [Option<Comment>],
    children: &[Vec<usize>],
) -> Option<CommentNode> {
    // Taking the comment out marks the slot visited.
    let comment = arena[root].take()?;
    // (slot, node under construction, next child to visit)
    let mut stack = vec![(root, CommentNode::leaf(comment), 0usize)];

    loop {
        let (slot, _, next) = stack.last_mut()?;
        if let Some(&child) = children[*slot].get(*next) {
            *next += 1;
            if let Some(comment) = arena[child].take() {
                stack.push((child, CommentNode::leaf(comment), 0));
            }
            continue;
        }

        let (_, node, _) = stack.pop()?;
        match stack.last_mut() {
            Some((_, parent, _)) => parent.replies.push(node),
            None => return Some(node),
        }
    }
}
