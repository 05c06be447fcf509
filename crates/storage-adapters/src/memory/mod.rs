//! # In-memory storage
//!
//! One [`MemoryState`] behind a Tokio mutex. Repository calls lock it for a
//! single operation. A [`MemoryTx`] holds the lock for its whole lifetime and
//! mutates a private copy, so uncommitted work is never visible and dropping
//! the transaction discards it.

mod state;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainResult, Forum, ForumRepository, Insertion, NewForum, NewThread, PagePlan, PlacedPost,
    Post, PostPath, PostRepository, Status, StatusRepository, StorageMaintenance, StoreTx, Thread,
    ThreadKey, ThreadListing, ThreadRef, ThreadRepository, ThreadUpdate, Transactional, User,
    UserListing, UserRepository, UserUpdate, Vote,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use state::MemoryState;

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> DomainResult<Insertion<User, Vec<User>>> {
        Ok(self.state.lock().await.create_user(user))
    }

    async fn find(&self, nickname: &str) -> DomainResult<Option<User>> {
        Ok(self.state.lock().await.find_user(nickname))
    }

    async fn update(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>> {
        self.state.lock().await.update_user(nickname, update)
    }
}

#[async_trait]
impl ForumRepository for MemoryStore {
    async fn create(&self, forum: &NewForum) -> DomainResult<Insertion<Forum>> {
        Ok(self.state.lock().await.create_forum(forum))
    }

    async fn find(&self, slug: &str) -> DomainResult<Option<Forum>> {
        Ok(self.state.lock().await.find_forum(slug))
    }

    async fn members(&self, slug: &str, listing: &UserListing) -> DomainResult<Vec<User>> {
        Ok(self.state.lock().await.forum_members(slug, listing))
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn create(&self, thread: &NewThread) -> DomainResult<Insertion<Thread>> {
        self.state.lock().await.create_thread(thread)
    }

    async fn find(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>> {
        Ok(self.state.lock().await.find_thread(thread))
    }

    async fn update(
        &self,
        thread: &ThreadRef,
        update: &ThreadUpdate,
    ) -> DomainResult<Option<Thread>> {
        Ok(self.state.lock().await.update_thread(thread, update))
    }

    async fn list_by_forum(
        &self,
        forum: &str,
        listing: &ThreadListing,
    ) -> DomainResult<Vec<Thread>> {
        Ok(self.state.lock().await.forum_threads(forum, listing))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn find(&self, id: i64) -> DomainResult<Option<Post>> {
        Ok(self.state.lock().await.find_post(id))
    }

    async fn path_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<Vec<i64>>> {
        Ok(self.state.lock().await.path_in_thread(thread, id))
    }

    async fn root_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<i64>> {
        Ok(self.state.lock().await.root_in_thread(thread, id))
    }

    async fn page(&self, thread: i64, plan: &PagePlan) -> DomainResult<Vec<Post>> {
        Ok(self.state.lock().await.page(thread, plan))
    }
}

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn status(&self) -> DomainResult<Status> {
        Ok(self.state.lock().await.status())
    }

    async fn clear(&self) -> DomainResult<()> {
        self.state.lock().await.clear();
        Ok(())
    }
}

#[async_trait]
impl StorageMaintenance for MemoryStore {
    async fn reorganize(&self) -> DomainResult<()> {
        debug!("memory store needs no reorganization");
        Ok(())
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

/// An open transaction over a [`MemoryStore`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn thread_key(&mut self, thread: &ThreadRef) -> DomainResult<Option<ThreadKey>> {
        Ok(self.work.thread_key(thread))
    }

    async fn users_by_nickname(&mut self, nicknames: &[String]) -> DomainResult<Vec<User>> {
        Ok(self.work.users_by_nickname(nicknames))
    }

    async fn post_paths(
        &mut self,
        thread: i64,
        ids: &[i64],
    ) -> DomainResult<HashMap<i64, PostPath>> {
        Ok(self.work.post_paths(thread, ids))
    }

    async fn insert_posts(
        &mut self,
        thread: &ThreadKey,
        created: DateTime<Utc>,
        posts: &[PlacedPost],
    ) -> DomainResult<Vec<Post>> {
        Ok(self.work.insert_posts(thread, created, posts))
    }

    async fn add_forum_posts(&mut self, forum: &str, count: i64) -> DomainResult<()> {
        self.work.add_forum_posts(forum, count)
    }

    async fn add_forum_members(&mut self, forum: &str, nicknames: &[String]) -> DomainResult<()> {
        self.work.add_forum_members(forum, nicknames);
        Ok(())
    }

    async fn post_for_update(&mut self, id: i64) -> DomainResult<Option<Post>> {
        Ok(self.work.find_post(id))
    }

    async fn set_message(&mut self, id: i64, message: &str) -> DomainResult<()> {
        self.work.set_message(id, message)
    }

    async fn find_vote(&mut self, nickname: &str, thread: i64) -> DomainResult<Option<Vote>> {
        Ok(self.work.find_vote(nickname, thread))
    }

    async fn save_vote(&mut self, vote: &Vote) -> DomainResult<()> {
        self.work.save_vote(vote);
        Ok(())
    }

    async fn add_thread_votes(&mut self, thread: i64, delta: i64) -> DomainResult<Thread> {
        self.work.add_thread_votes(thread, delta)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
