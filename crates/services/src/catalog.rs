//! # Catalog services
//!
//! Users, forums and threads: the aggregates around the post hierarchy.
//! References arriving from clients are resolved case-insensitively and
//! replaced by their stored spelling before anything is written.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, DomainResult, Forum, ForumRepository, Insertion, NewForum, NewThread, Thread,
    ThreadListing, ThreadRef, ThreadRepository, ThreadUpdate, User, UserListing, UserProfile,
    UserRepository, UserUpdate,
};
use tracing::{info, instrument};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Registers `nickname`. On a nickname or email clash nothing is written
    /// and every clashing user is returned.
    #[instrument(skip(self, profile))]
    pub async fn create(
        &self,
        nickname: &str,
        profile: UserProfile,
    ) -> DomainResult<Insertion<User, Vec<User>>> {
        let created = self.users.create(&User::new(nickname, profile)).await?;
        if let Insertion::Created(user) = &created {
            info!(nickname = %user.nickname, "user created");
        }
        Ok(created)
    }

    pub async fn profile(&self, nickname: &str) -> DomainResult<User> {
        self.users
            .find(nickname)
            .await?
            .ok_or_else(|| DomainError::user_not_found(nickname))
    }

    /// Applies the present fields of `update`; an empty update is a read.
    #[instrument(skip(self, update))]
    pub async fn update(&self, nickname: &str, update: &UserUpdate) -> DomainResult<User> {
        if update.is_empty() {
            return self.profile(nickname).await;
        }
        self.users
            .update(nickname, update)
            .await?
            .ok_or_else(|| DomainError::user_not_found(nickname))
    }
}

#[derive(Clone)]
pub struct ForumService {
    users: Arc<dyn UserRepository>,
    forums: Arc<dyn ForumRepository>,
    threads: Arc<dyn ThreadRepository>,
}

impl ForumService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        forums: Arc<dyn ForumRepository>,
        threads: Arc<dyn ThreadRepository>,
    ) -> Self {
        Self {
            users,
            forums,
            threads,
        }
    }

    /// Creates a forum owned by `forum.user`. A slug clash returns the
    /// existing forum.
    #[instrument(skip(self, forum), fields(slug = %forum.slug))]
    pub async fn create(&self, forum: NewForum) -> DomainResult<Insertion<Forum>> {
        let owner = self
            .users
            .find(&forum.user)
            .await?
            .ok_or_else(|| DomainError::user_not_found(forum.user.as_str()))?;

        let created = self
            .forums
            .create(&NewForum {
                user: owner.nickname,
                ..forum
            })
            .await?;
        if let Insertion::Created(forum) = &created {
            info!(slug = %forum.slug, owner = %forum.user, "forum created");
        }
        Ok(created)
    }

    pub async fn details(&self, slug: &str) -> DomainResult<Forum> {
        self.forums
            .find(slug)
            .await?
            .ok_or_else(|| DomainError::forum_not_found(slug))
    }

    /// Opens a thread in forum `slug`. A thread slug clash returns the
    /// existing thread. Without an explicit creation time the current time
    /// is used.
    #[instrument(skip(self, thread), fields(title = %thread.title))]
    pub async fn create_thread(
        &self,
        slug: &str,
        thread: NewThread,
    ) -> DomainResult<Insertion<Thread>> {
        let author = self
            .users
            .find(&thread.author)
            .await?
            .ok_or_else(|| DomainError::user_not_found(thread.author.as_str()))?;
        let forum = self.details(slug).await?;

        let created = self
            .threads
            .create(&NewThread {
                author: author.nickname,
                forum: forum.slug,
                created: Some(thread.created.unwrap_or_else(Utc::now)),
                slug: thread.slug.filter(|slug| !slug.is_empty()),
                ..thread
            })
            .await?;
        if let Insertion::Created(thread) = &created {
            info!(id = thread.id, forum = %thread.forum, "thread created");
        }
        Ok(created)
    }

    pub async fn threads(&self, slug: &str, listing: &ThreadListing) -> DomainResult<Vec<Thread>> {
        let forum = self.details(slug).await?;
        self.threads.list_by_forum(&forum.slug, listing).await
    }

    /// Users who opened a thread or wrote a post in forum `slug`.
    pub async fn members(&self, slug: &str, listing: &UserListing) -> DomainResult<Vec<User>> {
        let forum = self.details(slug).await?;
        self.forums.members(&forum.slug, listing).await
    }
}

#[derive(Clone)]
pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
}

impl ThreadService {
    pub fn new(threads: Arc<dyn ThreadRepository>) -> Self {
        Self { threads }
    }

    pub async fn details(&self, thread: &ThreadRef) -> DomainResult<Thread> {
        self.threads
            .find(thread)
            .await?
            .ok_or_else(|| DomainError::thread_not_found(thread.as_str()))
    }

    /// Applies the present fields of `update`; an empty update is a read.
    pub async fn update(&self, thread: &ThreadRef, update: &ThreadUpdate) -> DomainResult<Thread> {
        if update.title.is_none() && update.message.is_none() {
            return self.details(thread).await;
        }
        self.threads
            .update(thread, update)
            .await?
            .ok_or_else(|| DomainError::thread_not_found(thread.as_str()))
    }
}
