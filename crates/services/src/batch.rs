//! # Batch validation
//!
//! Checks a post-create batch against the transaction it will be written in
//! and places every entry in the thread's forest. Nothing is written here; any
//! failure rejects the whole batch.

use std::collections::{BTreeSet, HashMap, HashSet};

use domains::{
    DomainError, DomainResult, NewPost, Placement, PlacedPost, StoreTx, ThreadKey, ThreadRef,
};
use tracing::debug;

/// A batch that passed validation, ready for the post writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub thread: ThreadKey,
    /// Distinct canonical author nicknames, in first-seen order.
    pub authors: Vec<String>,
    pub posts: Vec<PlacedPost>,
}

/// Validates `posts` for `thread` inside `tx`.
///
/// Checks run in order and stop at the first failure: the thread must exist,
/// then every author, then every non-zero parent must be a post of that same
/// thread.
pub async fn validate_batch(
    tx: &mut dyn StoreTx,
    thread: &ThreadRef,
    posts: Vec<NewPost>,
) -> DomainResult<ValidatedBatch> {
    // 1. Thread
    let key = tx
        .thread_key(thread)
        .await?
        .ok_or_else(|| DomainError::thread_not_found(thread.as_str()))?;

    // 2. Authors, one lookup per distinct nickname
    let mut seen = HashSet::new();
    let requested: Vec<String> = posts
        .iter()
        .filter(|post| seen.insert(post.author.to_lowercase()))
        .map(|post| post.author.clone())
        .collect();
    let canonical: HashMap<String, String> = if requested.is_empty() {
        HashMap::new()
    } else {
        tx.users_by_nickname(&requested)
            .await?
            .into_iter()
            .map(|user| (user.nickname.to_lowercase(), user.nickname))
            .collect()
    };
    let mut authors = Vec::with_capacity(requested.len());
    for nickname in &requested {
        match canonical.get(&nickname.to_lowercase()) {
            Some(stored) => authors.push(stored.clone()),
            None => return Err(DomainError::user_not_found(nickname.as_str())),
        }
    }

    // 3. Parents, scoped to this thread
    let parent_ids: Vec<i64> = posts
        .iter()
        .map(|post| post.parent)
        .filter(|parent| *parent != 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let parent_paths = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        tx.post_paths(key.id, &parent_ids).await?
    };

    let placed = posts
        .into_iter()
        .map(|post| {
            let placement = Placement::resolve(post.parent, parent_paths.get(&post.parent))?;
            let author = canonical
                .get(&post.author.to_lowercase())
                .cloned()
                .ok_or_else(|| DomainError::user_not_found(post.author.as_str()))?;
            Ok(PlacedPost {
                author,
                message: post.message,
                placement,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    debug!(
        thread = key.id,
        posts = placed.len(),
        authors = authors.len(),
        "post batch validated"
    );

    Ok(ValidatedBatch {
        thread: key,
        authors,
        posts: placed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::ScriptedTx;
    use domains::{PostPath, User};

    fn new_post(author: &str, parent: i64) -> NewPost {
        NewPost {
            author: author.into(),
            message: format!("from {author}"),
            parent,
        }
    }

    fn user(nickname: &str) -> User {
        User {
            nickname: nickname.into(),
            fullname: nickname.into(),
            email: format!("{nickname}@example.org"),
            about: String::new(),
        }
    }

    #[tokio::test]
    async fn unknown_thread_fails_before_user_lookup() {
        let mut tx = ScriptedTx::default();
        let err = validate_batch(&mut tx, &ThreadRef::from("nope"), vec![new_post("a", 0)])
            .await
            .unwrap_err();
        assert!(err.is_not_found(domains::Entity::Thread));
        assert!(tx.user_lookups.is_empty());
    }

    #[tokio::test]
    async fn authors_are_canonicalized_and_deduplicated() {
        let mut tx = ScriptedTx::with_thread(7, "rust");
        tx.users = vec![user("Alice"), user("bob")];
        let batch = validate_batch(
            &mut tx,
            &ThreadRef::from(7),
            vec![new_post("alice", 0), new_post("BOB", 0), new_post("ALICE", 0)],
        )
        .await
        .unwrap();

        assert_eq!(batch.authors, vec!["Alice".to_string(), "bob".to_string()]);
        assert_eq!(batch.posts[1].author, "bob");
        assert_eq!(batch.posts[2].author, "Alice");
        assert_eq!(tx.user_lookups, vec![vec!["alice".to_string(), "BOB".to_string()]]);
    }

    #[tokio::test]
    async fn missing_author_rejects_the_batch() {
        let mut tx = ScriptedTx::with_thread(7, "rust");
        tx.users = vec![user("alice")];
        let err = validate_batch(
            &mut tx,
            &ThreadRef::from(7),
            vec![new_post("alice", 0), new_post("ghost", 0)],
        )
        .await
        .unwrap_err();
        assert_eq!(err, DomainError::user_not_found("ghost"));
    }

    #[tokio::test]
    async fn parents_must_belong_to_the_thread() {
        let mut tx = ScriptedTx::with_thread(7, "rust");
        tx.users = vec![user("alice")];
        tx.paths.insert(3, PostPath::of_root(3));

        let batch = validate_batch(
            &mut tx,
            &ThreadRef::from(7),
            vec![new_post("alice", 3), new_post("alice", 0)],
        )
        .await
        .unwrap();
        assert_eq!(batch.posts[0].placement.path_for(10).parents, vec![3]);
        assert!(batch.posts[1].placement.is_root());

        let err = validate_batch(
            &mut tx,
            &ThreadRef::from(7),
            vec![new_post("alice", 3), new_post("alice", 99)],
        )
        .await
        .unwrap_err();
        assert_eq!(err, DomainError::ParentNotFound(99));
    }

    #[tokio::test]
    async fn empty_batch_only_checks_the_thread() {
        let mut tx = ScriptedTx::with_thread(7, "rust");
        let batch = validate_batch(&mut tx, &ThreadRef::from(7), Vec::new())
            .await
            .unwrap();
        assert!(batch.posts.is_empty());
        assert!(tx.user_lookups.is_empty());
    }
}
