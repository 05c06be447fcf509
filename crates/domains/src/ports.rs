//! # Core Traits (Ports)
//!
//! Storage adapters implement these traits; services depend only on them.
//!
//! Simple aggregates (users, forums, threads) are served by repositories whose
//! methods are each atomic on their own. Multi-step mutations of the post
//! hierarchy and the vote ledger run inside a [`StoreTx`] obtained from
//! [`Transactional::begin`]: every read and write goes through the same
//! transaction and nothing is visible until [`StoreTx::commit`]. Dropping a
//! transaction without committing rolls it back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::DomainResult;
use crate::models::{
    Forum, Insertion, NewForum, NewThread, Post, Status, Thread, ThreadKey, ThreadListing,
    ThreadRef, ThreadUpdate, User, UserListing, UserUpdate, Vote,
};
use crate::paging::PagePlan;
use crate::path::{Placement, PostPath};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts `user` unless its nickname or email is taken, in which case
    /// every user holding either is returned instead.
    async fn create(&self, user: &User) -> DomainResult<Insertion<User, Vec<User>>>;

    /// Case-insensitive lookup.
    async fn find(&self, nickname: &str) -> DomainResult<Option<User>>;

    /// Applies the present fields. `Ok(None)` when the user does not exist;
    /// `Conflict` when the new email belongs to someone else.
    async fn update(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// `forum.user` must already be the canonical nickname of an existing user.
    async fn create(&self, forum: &NewForum) -> DomainResult<Insertion<Forum>>;

    async fn find(&self, slug: &str) -> DomainResult<Option<Forum>>;

    /// Members of a forum: authors of its threads and posts.
    async fn members(&self, slug: &str, listing: &UserListing) -> DomainResult<Vec<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// `thread.author` and `thread.forum` must already be canonical. Bumps the
    /// forum thread counter and records the author as a forum member.
    async fn create(&self, thread: &NewThread) -> DomainResult<Insertion<Thread>>;

    async fn find(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>>;

    async fn update(
        &self,
        thread: &ThreadRef,
        update: &ThreadUpdate,
    ) -> DomainResult<Option<Thread>>;

    async fn list_by_forum(&self, forum: &str, listing: &ThreadListing)
        -> DomainResult<Vec<Thread>>;
}

/// Read side of the post hierarchy.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find(&self, id: i64) -> DomainResult<Option<Post>>;

    /// `parents ++ [id]` of post `id` in `thread`.
    async fn path_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<Vec<i64>>>;

    /// Root id of post `id` in `thread`.
    async fn root_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<i64>>;

    /// Evaluates `plan` over the posts of `thread`, in plan order.
    async fn page(&self, thread: i64, plan: &PagePlan) -> DomainResult<Vec<Post>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn status(&self) -> DomainResult<Status>;

    /// Removes every row of every aggregate in one transaction.
    async fn clear(&self) -> DomainResult<()>;
}

/// Best-effort physical reorganization of post storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StorageMaintenance: Send + Sync {
    async fn reorganize(&self) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Transactional: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTx>>;
}

/// A post about to be written, already validated and placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedPost {
    /// Canonical author nickname.
    pub author: String,
    pub message: String,
    pub placement: Placement,
}

/// One open storage transaction.
#[async_trait]
pub trait StoreTx: Send {
    /// Resolves a slug-or-id reference to the thread id and its forum slug.
    async fn thread_key(&mut self, thread: &ThreadRef) -> DomainResult<Option<ThreadKey>>;

    /// The users among `nicknames` that exist, matched case-insensitively.
    async fn users_by_nickname(&mut self, nicknames: &[String]) -> DomainResult<Vec<User>>;

    /// Stored paths of those `ids` that are posts of `thread`.
    async fn post_paths(
        &mut self,
        thread: i64,
        ids: &[i64],
    ) -> DomainResult<HashMap<i64, PostPath>>;

    /// Inserts `posts` in order with a shared creation time and returns them
    /// with their assigned ids and final paths.
    async fn insert_posts(
        &mut self,
        thread: &ThreadKey,
        created: DateTime<Utc>,
        posts: &[PlacedPost],
    ) -> DomainResult<Vec<Post>>;

    async fn add_forum_posts(&mut self, forum: &str, count: i64) -> DomainResult<()>;

    /// Records each `(forum, nickname)` membership, ignoring those already present.
    async fn add_forum_members(&mut self, forum: &str, nicknames: &[String]) -> DomainResult<()>;

    /// Reads a post and locks it against concurrent updates.
    async fn post_for_update(&mut self, id: i64) -> DomainResult<Option<Post>>;

    /// Replaces the message and marks the post edited.
    async fn set_message(&mut self, id: i64, message: &str) -> DomainResult<()>;

    async fn find_vote(&mut self, nickname: &str, thread: i64) -> DomainResult<Option<Vote>>;

    /// Inserts a first vote or overwrites the stored direction.
    async fn save_vote(&mut self, vote: &Vote) -> DomainResult<()>;

    /// Adds `delta` to the thread rating and returns the updated thread.
    async fn add_thread_votes(&mut self, thread: i64, delta: i64) -> DomainResult<Thread>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;
}
