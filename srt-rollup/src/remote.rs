//! Cache of confirmed scores and comments as last read from the persistence
//! service

use crate::comment::CommentRecord;
use crate::model::{ScoreKey, ScoreRecord};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct RemoteScores {
    records: HashMap<ScoreKey, ScoreRecord>,
    comments: HashMap<String, String>,
}

impl RemoteScores {
    pub fn from_records(records: impl IntoIterator<Item = ScoreRecord>) -> Self {
        let mut scores = Self::default();
        scores.apply(records);
        scores
    }

    pub fn get(&self, key: &ScoreKey) -> Option<&ScoreRecord> {
        self.records.get(key)
    }

    /// Overwrite cached entries with committed records
    pub fn apply(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        for record in records {
            self.records.insert(record.key(), record);
        }
    }

    /// Swap in a freshly fetched set
    pub fn replace(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        self.records.clear();
        self.apply(records);
    }

    pub fn comment(&self, indicator_code: &str) -> Option<&str> {
        self.comments.get(indicator_code).map(String::as_str)
    }

    /// Apply committed comments; an empty comment removes the entry
    pub fn apply_comments(&mut self, comments: impl IntoIterator<Item = CommentRecord>) {
        for record in comments {
            if record.is_removal() {
                self.comments.remove(&record.indicator_code);
            } else {
                self.comments.insert(record.indicator_code, record.comment);
            }
        }
    }

    pub fn replace_comments(&mut self, comments: impl IntoIterator<Item = CommentRecord>) {
        self.comments.clear();
        self.apply_comments(comments);
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.comments.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(code: &str, text: &str) -> CommentRecord {
        CommentRecord {
            indicator_code: code.to_string(),
            comment: text.to_string(),
        }
    }

    #[test]
    fn test_empty_comment_removes_cached_entry() {
        let mut remote = RemoteScores::default();
        remote.apply_comments(vec![comment("A", "keep"), comment("B", "drop")]);
        remote.apply_comments(vec![comment("B", "")]);

        assert_eq!(remote.comment("A"), Some("keep"));
        assert_eq!(remote.comment("B"), None);
        assert_eq!(remote.comment_count(), 1);
    }

    #[test]
    fn test_replace_scores_keeps_comments() {
        let mut remote = RemoteScores::default();
        remote.apply_comments(vec![comment("A", "keep")]);
        remote.replace(Vec::new());

        assert_eq!(remote.comment("A"), Some("keep"));
        remote.clear();
        assert_eq!(remote.comment("A"), None);
    }
}
