//! Recursive deletion of a comment thread.
//!
//! The thread under a comment is walked depth-first with an explicit work
//! list, so arbitrarily deep threads never grow the call stack. Each node is
//! deleted before its children are listed: a parent always precedes its
//! descendants in the result, and a node that is already gone (deleted by a
//! concurrent request or a post purge) ends its branch.

use crate::entities::comment::{Comment, DeleteCommentById, ListCommentsByParent};
use crate::entities::parse_id;
use crate::store::{CommentStore, StoreError};
use tracing::{debug, info};
use uuid::Uuid;

/// Delete the comment `root_id` and every comment transitively parented to it.
///
/// Returns the deleted records in pre-order. A malformed or unknown id
/// yields an empty result. A store failure aborts the walk; deletions
/// already performed stay deleted.
pub async fn delete_tree<S: CommentStore>(
    store: &S,
    root_id: &str,
) -> Result<Vec<Comment>, StoreError> {
    let Some(root) = parse_id(root_id) else {
        debug!(root_id, "Malformed comment id, nothing to delete");
        return Ok(Vec::new());
    };

    let mut deleted = Vec::new();
    let mut pending: Vec<Uuid> = vec![root];

    while let Some(id) = pending.pop() {
        let Some(comment) = store.process(DeleteCommentById { id }).await? else {
            debug!(comment_id = %id, "Comment already gone, skipping branch");
            continue;
        };
        deleted.push(comment);

        let children = store.process(ListCommentsByParent { parent_id: id }).await?;
        // reversed so the first child is popped first
        pending.extend(children.into_iter().rev().map(|child| child.id));
    }

    if !deleted.is_empty() {
        info!(root_id = %root, deleted = deleted.len(), "Deleted comment thread");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::comment::{GetCommentById, InsertComment};
    use crate::store::MemoryStore;
    use kanau::processor::Processor;

    async fn reply(store: &MemoryStore, post_id: Uuid, parent_id: Uuid, text: &str) -> Uuid {
        store
            .process(InsertComment {
                post_id,
                parent_id,
                author_id: "u1".to_string(),
                text: text.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn ids(comments: &[Comment]) -> Vec<Uuid> {
        comments.iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn test_subtree_deleted_sibling_kept() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let a = reply(&store, post, post, "A").await;
        let b = reply(&store, post, a, "B").await;
        let c = reply(&store, post, post, "C").await;

        let deleted = delete_tree(&store, &a.to_string()).await.unwrap();
        assert_eq!(ids(&deleted), vec![a, b]);
        assert_eq!(store.comment_ids().await, vec![c]);

        let deleted = delete_tree(&store, &c.to_string()).await.unwrap();
        assert_eq!(ids(&deleted), vec![c]);
        assert!(store.comment_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_pre_order_with_parent_first() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let root = reply(&store, post, post, "root").await;
        let left = reply(&store, post, root, "left").await;
        let right = reply(&store, post, root, "right").await;
        let left_child = reply(&store, post, left, "left child").await;
        let deep = reply(&store, post, left_child, "deep").await;
        let right_child = reply(&store, post, right, "right child").await;
        let untouched = reply(&store, post, post, "other thread").await;

        let deleted = delete_tree(&store, &root.to_string()).await.unwrap();
        assert_eq!(
            ids(&deleted),
            vec![root, left, left_child, deep, right, right_child]
        );

        for id in ids(&deleted) {
            let found = store.process(GetCommentById { id }).await.unwrap();
            assert!(found.is_none());
        }
        assert_eq!(store.comment_ids().await, vec![untouched]);
    }

    #[tokio::test]
    async fn test_second_call_is_empty() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let a = reply(&store, post, post, "A").await;
        reply(&store, post, a, "B").await;

        assert_eq!(delete_tree(&store, &a.to_string()).await.unwrap().len(), 2);
        assert!(delete_tree(&store, &a.to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_root_mutates_nothing() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let a = reply(&store, post, post, "A").await;

        let deleted = delete_tree(&store, &Uuid::now_v7().to_string())
            .await
            .unwrap();
        assert!(deleted.is_empty());
        assert_eq!(store.comment_ids().await, vec![a]);
    }

    #[tokio::test]
    async fn test_malformed_root_never_touches_store() {
        let store = MemoryStore::new();
        let before = store.operation_count().await;

        let deleted = delete_tree(&store, "650f0b7f1a2d3a1c12345678").await.unwrap();
        assert!(deleted.is_empty());
        assert_eq!(store.operation_count().await, before);
    }

    #[tokio::test]
    async fn test_deep_thread_does_not_recurse() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let root = reply(&store, post, post, "0").await;
        let mut parent = root;
        for depth in 1..2_000 {
            parent = reply(&store, post, parent, &depth.to_string()).await;
        }

        let deleted = delete_tree(&store, &root.to_string()).await.unwrap();
        assert_eq!(deleted.len(), 2_000);
        assert_eq!(deleted.last().map(|c| c.id), Some(parent));
    }

    #[tokio::test]
    async fn test_store_failure_keeps_committed_deletions() {
        let store = MemoryStore::new();
        let post = Uuid::now_v7();
        let a = reply(&store, post, post, "A").await;
        let b = reply(&store, post, a, "B").await;

        // delete A and list its children, then fail on B
        store.fail_after(2).await;
        let result = delete_tree(&store, &a.to_string()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.heal().await;
        assert_eq!(store.comment_ids().await, vec![b]);
    }
}
