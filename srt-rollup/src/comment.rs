//! Free-text comments attached to indicators
//!
//! One comment per indicator per school. Comments travel with score flushes
//! but never feed a verdict.

use serde::{Deserialize, Serialize};

/// Longest comment kept, in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// A comment as exchanged with the persistence service
///
/// An empty `comment` deletes the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub indicator_code: String,
    pub comment: String,
}

impl CommentRecord {
    pub fn is_removal(&self) -> bool {
        self.comment.is_empty()
    }
}

/// Trim surrounding whitespace and cap the length
pub fn sanitize_comment(comment: &str) -> String {
    comment.trim().chars().take(MAX_COMMENT_LENGTH).collect()
}
