//! # PostService
//!
//! Batch creation, single-post reads with optional relations, message edits,
//! and thread listings. Writes run inside one storage transaction each.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, DomainResult, ForumRepository, NewPost, Post, PostDetails, PostListing,
    PostRepository, PostUpdate, Related, Relation, ThreadRef, ThreadRepository, Transactional,
    UserRepository,
};
use tracing::{info, instrument, warn};

use crate::batch::validate_batch;
use crate::maintenance::MaintenanceCounter;
use crate::pagination::PaginationEngine;
use crate::writer::{edit_message, write_batch};

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Transactional>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    forums: Arc<dyn ForumRepository>,
    threads: Arc<dyn ThreadRepository>,
    pages: PaginationEngine,
    maintenance: MaintenanceCounter,
}

impl PostService {
    pub fn new(
        store: Arc<dyn Transactional>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        forums: Arc<dyn ForumRepository>,
        threads: Arc<dyn ThreadRepository>,
        pages: PaginationEngine,
        maintenance: MaintenanceCounter,
    ) -> Self {
        Self {
            store,
            posts,
            users,
            forums,
            threads,
            pages,
            maintenance,
        }
    }

    /// Creates every post of `batch` in `thread`, or none of them.
    ///
    /// Returned posts keep request order and share one creation time.
    #[instrument(skip(self, batch), fields(size = batch.len()))]
    pub async fn create_posts(
        &self,
        thread: &ThreadRef,
        batch: Vec<NewPost>,
    ) -> DomainResult<Vec<Post>> {
        let mut tx = self.store.begin().await?;

        let validated = match validate_batch(tx.as_mut(), thread, batch).await {
            Ok(validated) => validated,
            Err(err) => {
                warn!(error = %err, "post batch rejected");
                return Err(err);
            }
        };

        let created = Utc::now();
        let posts = write_batch(tx.as_mut(), &validated, created).await?;
        tx.commit().await?;

        if !posts.is_empty() {
            info!(
                thread = validated.thread.id,
                forum = %validated.thread.forum,
                count = posts.len(),
                "posts created"
            );
            self.maintenance.maybe_reorganize(posts.len());
        }
        Ok(posts)
    }

    /// Reads post `id` and whichever of its author, forum and thread were
    /// requested.
    #[instrument(skip(self, related))]
    pub async fn details(&self, id: i64, related: &Related) -> DomainResult<PostDetails> {
        let post = self
            .posts
            .find(id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(id))?;

        let author = if related.contains(Relation::User) {
            Some(
                self.users
                    .find(&post.author)
                    .await?
                    .ok_or_else(|| DomainError::user_not_found(post.author.as_str()))?,
            )
        } else {
            None
        };

        let forum = if related.contains(Relation::Forum) {
            Some(
                self.forums
                    .find(&post.forum)
                    .await?
                    .ok_or_else(|| DomainError::forum_not_found(post.forum.as_str()))?,
            )
        } else {
            None
        };

        let thread = if related.contains(Relation::Thread) {
            Some(
                self.threads
                    .find(&ThreadRef::from(post.thread))
                    .await?
                    .ok_or_else(|| DomainError::thread_not_found(post.thread.to_string()))?,
            )
        } else {
            None
        };

        Ok(PostDetails {
            post,
            author,
            forum,
            thread,
        })
    }

    /// Replaces the message of post `id`. Absent or identical messages leave
    /// the post as it was.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: i64, update: &PostUpdate) -> DomainResult<Post> {
        let mut tx = self.store.begin().await?;
        let post = edit_message(tx.as_mut(), id, update.message.as_deref()).await?;
        tx.commit().await?;
        Ok(post)
    }

    pub async fn list(&self, thread: &ThreadRef, listing: &PostListing) -> DomainResult<Vec<Post>> {
        self.pages.list(thread, listing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::ScriptedTx;
    use domains::{
        MockForumRepository, MockPostRepository, MockStorageMaintenance, MockThreadRepository,
        MockTransactional, MockUserRepository, StoreTx, User,
    };
    use std::sync::Mutex;

    fn service(
        store: MockTransactional,
        posts: MockPostRepository,
        users: MockUserRepository,
    ) -> PostService {
        let threads: Arc<dyn ThreadRepository> = Arc::new(MockThreadRepository::new());
        let posts: Arc<dyn PostRepository> = Arc::new(posts);
        PostService::new(
            Arc::new(store),
            posts.clone(),
            Arc::new(users),
            Arc::new(MockForumRepository::new()),
            threads.clone(),
            PaginationEngine::new(threads, posts),
            MaintenanceCounter::new(Arc::new(MockStorageMaintenance::new()), 0),
        )
    }

    /// A `Transactional` whose single `begin` hands out `tx`.
    fn store_with(tx: ScriptedTx) -> MockTransactional {
        let slot = Mutex::new(Some(tx));
        let mut store = MockTransactional::new();
        store.expect_begin().times(1).returning(move || {
            let tx = slot.lock().unwrap().take().expect("begin called once");
            Ok(Box::new(tx) as Box<dyn StoreTx>)
        });
        store
    }

    fn alice() -> User {
        User {
            nickname: "alice".into(),
            fullname: "Alice".into(),
            email: "alice@example.org".into(),
            about: String::new(),
        }
    }

    #[tokio::test]
    async fn created_batch_is_committed() {
        let mut tx = ScriptedTx::with_thread(1, "rust");
        tx.users = vec![alice()];
        let journal = tx.journal();
        let svc = service(store_with(tx), MockPostRepository::new(), MockUserRepository::new());

        let posts = svc
            .create_posts(
                &ThreadRef::from(1),
                vec![
                    NewPost {
                        author: "ALICE".into(),
                        message: "first".into(),
                        parent: 0,
                    },
                    NewPost {
                        author: "alice".into(),
                        message: "second".into(),
                        parent: 0,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert!(posts[0].id < posts[1].id);
        assert_eq!(posts[0].author, "alice");
        let journal = journal.lock().unwrap();
        assert!(journal.committed);
        assert_eq!(journal.forum_posts, 2);
    }

    #[tokio::test]
    async fn rejected_batch_is_never_committed() {
        let mut tx = ScriptedTx::with_thread(1, "rust");
        tx.users = vec![alice()];
        let journal = tx.journal();
        let svc = service(store_with(tx), MockPostRepository::new(), MockUserRepository::new());

        let err = svc
            .create_posts(
                &ThreadRef::from(1),
                vec![NewPost {
                    author: "alice".into(),
                    message: "orphan".into(),
                    parent: 404,
                }],
            )
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::ParentNotFound(404));
        let journal = journal.lock().unwrap();
        assert!(!journal.committed);
        assert!(journal.inserted.is_empty());
    }

    #[tokio::test]
    async fn details_expand_requested_relations_only() {
        let mut posts = MockPostRepository::new();
        posts.expect_find().returning(|id| {
            Ok(Some(Post {
                id,
                message: "m".into(),
                created: Utc::now(),
                is_edited: false,
                author: "alice".into(),
                thread: 1,
                forum: "rust".into(),
                parent: 0,
                parents: vec![],
                root: id,
            }))
        });
        let mut users = MockUserRepository::new();
        users.expect_find().times(1).returning(|_| Ok(Some(alice())));

        let svc = service(MockTransactional::new(), posts, users);
        let details = svc
            .details(5, &Related::none().with(Relation::User))
            .await
            .unwrap();
        assert_eq!(details.post.id, 5);
        assert_eq!(details.author.map(|u| u.nickname), Some("alice".to_string()));
        assert!(details.forum.is_none());
        assert!(details.thread.is_none());
    }

    #[tokio::test]
    async fn details_of_missing_post_is_not_found() {
        let mut posts = MockPostRepository::new();
        posts.expect_find().returning(|_| Ok(None));
        let svc = service(MockTransactional::new(), posts, MockUserRepository::new());
        let err = svc.details(9, &Related::none()).await.unwrap_err();
        assert_eq!(err, DomainError::post_not_found(9));
    }
}
