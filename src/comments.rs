use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::store::operations::comments::Comment;

/// One node of the assembled reply tree. Replies are sorted ascending by
/// creation time; depth is already bounded at write time, so the tree is at
/// most four levels deep (root + three reply levels).
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Assemble a flat comment list into a forest of reply trees.
///
/// Roots keep their input order. A comment whose parent is not in the input
/// (a reply to a deleted comment) is dropped silently rather than surfacing
/// as an error or a fake root.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let known_ids: HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();

    let mut roots: Vec<Comment> = Vec::new();
    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();

    for comment in comments {
        match &comment.parent_id {
            None => roots.push(comment),
            Some(parent_id) if known_ids.contains(parent_id) => {
                children.entry(parent_id.clone()).or_default().push(comment);
            }
            // orphaned reply, parent no longer exists
            Some(_) => {}
        }
    }

    roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children))
        .collect()
}

fn attach_replies(comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> CommentNode {
    let mut replies = children.remove(&comment.id).unwrap_or_default();
    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    CommentNode {
        replies: replies
            .into_iter()
            .map(|reply| attach_replies(reply, children))
            .collect(),
        comment,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn comment(id: &str, parent: Option<&str>, level: u8, second: u32) -> Comment {
        Comment {
            id: id.to_string(),
            entity_id: "d1".to_string(),
            author_id: "u1".to_string(),
            parent_id: parent.map(str::to_string),
            reply_level: level,
            body: format!("comment {id}"),
            created_at: Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, second).unwrap(),
        }
    }

    #[test]
    fn orphaned_replies_are_dropped() {
        let tree = build_comment_tree(vec![
            comment("1", None, 0, 0),
            comment("2", Some("1"), 1, 1),
            comment("3", Some("99"), 1, 2),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, "1");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, "2");
    }

    #[test]
    fn replies_sort_by_created_at() {
        let tree = build_comment_tree(vec![
            comment("1", None, 0, 0),
            comment("late", Some("1"), 1, 30),
            comment("early", Some("1"), 1, 10),
        ]);

        let replies: Vec<&str> = tree[0]
            .replies
            .iter()
            .map(|n| n.comment.id.as_str())
            .collect();
        assert_eq!(replies, vec!["early", "late"]);
    }

    #[test]
    fn roots_keep_input_order() {
        let tree = build_comment_tree(vec![
            comment("b", None, 0, 20),
            comment("a", None, 0, 10),
        ]);
        assert_eq!(tree[0].comment.id, "b");
        assert_eq!(tree[1].comment.id, "a");
    }

    #[test]
    fn nested_chain_assembles_fully() {
        let tree = build_comment_tree(vec![
            comment("1", None, 0, 0),
            comment("2", Some("1"), 1, 1),
            comment("3", Some("2"), 2, 2),
            comment("4", Some("3"), 3, 3),
        ]);

        let level3 = &tree[0].replies[0].replies[0].replies[0];
        assert_eq!(level3.comment.id, "4");
        assert!(level3.replies.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }
}
