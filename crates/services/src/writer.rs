//! Post writer: the write half of a post batch and of post edits. Every
//! function runs inside the caller's transaction and never commits.

use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, Post, StoreTx};
use tracing::debug;

use crate::batch::ValidatedBatch;

/// Inserts a validated batch with one shared creation time, then updates the
/// forum post counter and forum membership for its authors.
pub async fn write_batch(
    tx: &mut dyn StoreTx,
    batch: &ValidatedBatch,
    created: DateTime<Utc>,
) -> DomainResult<Vec<Post>> {
    if batch.posts.is_empty() {
        return Ok(Vec::new());
    }

    // 1. Posts, in request order
    let posts = tx.insert_posts(&batch.thread, created, &batch.posts).await?;
    if posts.len() != batch.posts.len() {
        return Err(DomainError::internal(format!(
            "inserted {} of {} posts",
            posts.len(),
            batch.posts.len()
        )));
    }

    // 2. Forum aggregates
    let forum = batch.thread.forum.as_str();
    tx.add_forum_posts(forum, posts.len() as i64).await?;
    tx.add_forum_members(forum, &batch.authors).await?;

    debug!(thread = batch.thread.id, forum, count = posts.len(), "posts written");
    Ok(posts)
}

/// Replaces the message of post `id`.
///
/// An absent message, or one equal to the stored text, leaves the post
/// untouched (and `isEdited` unchanged).
pub async fn edit_message(
    tx: &mut dyn StoreTx,
    id: i64,
    message: Option<&str>,
) -> DomainResult<Post> {
    let mut post = tx
        .post_for_update(id)
        .await?
        .ok_or_else(|| DomainError::post_not_found(id))?;

    match message {
        Some(message) if message != post.message => {
            tx.set_message(id, message).await?;
            post.message = message.to_owned();
            post.is_edited = true;
        }
        _ => {}
    }
    Ok(post)
}
