use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_REPLY_LEVEL;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// A threaded comment on a deal or a lead. `entity_id` is the id of the row
/// the thread hangs off; the store does not care which kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub entity_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub reply_level: u8,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Create a comment, deriving `reply_level` from the parent. The depth
    /// bound is enforced here, at write time, so readers never check it.
    pub fn create_comment(
        &self,
        entity_id: &str,
        author_id: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<Comment, StoreError> {
        if body.trim().is_empty() {
            return Err(StoreError::Validation(
                "Comment body must not be empty".to_string(),
            ));
        }

        let reply_level = match parent_id {
            None => 0,
            Some(pid) => {
                let parent =
                    self.get_comment(entity_id, pid)?
                        .ok_or_else(|| StoreError::NotFound {
                            entity: "comment".to_string(),
                            key: pid.to_string(),
                        })?;
                let level = parent.reply_level + 1;
                if level > MAX_REPLY_LEVEL {
                    return Err(StoreError::MaxDepthExceeded {
                        limit: MAX_REPLY_LEVEL,
                    });
                }
                level
            }
        };

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            author_id: author_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            reply_level,
            body: body.to_string(),
            created_at: Utc::now(),
        };

        let key = keys::comment_key(entity_id, &comment.id);
        self.comments
            .insert(key.as_bytes(), Self::serialize(&comment)?)?;
        Ok(comment)
    }

    pub fn get_comment(
        &self,
        entity_id: &str,
        comment_id: &str,
    ) -> Result<Option<Comment>, StoreError> {
        let key = keys::comment_key(entity_id, comment_id);
        match self.comments.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn delete_comment(&self, entity_id: &str, comment_id: &str) -> Result<(), StoreError> {
        let removed = self
            .comments
            .remove(keys::comment_key(entity_id, comment_id).as_bytes())?;
        if removed.is_none() {
            return Err(StoreError::NotFound {
                entity: "comment".to_string(),
                key: comment_id.to_string(),
            });
        }
        Ok(())
    }

    /// Flat comment list for one entity in creation order. Tree assembly is
    /// a pure read-side concern (`crate::comments::build_comment_tree`).
    pub fn list_comments(&self, entity_id: &str) -> Result<Vec<Comment>, StoreError> {
        let prefix = keys::comment_prefix(entity_id);
        let mut comments = Vec::new();
        for item in self.comments.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            comments.push(Self::deserialize::<Comment>(&value)?);
        }
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}
