//! # Pagination engine
//!
//! Turns a [`PostListing`] into a [`PagePlan`] and runs it against storage.
//! The `since` post id is decoded per mode:
//!
//! - `Id` / `Flat`: the id itself.
//! - `Tree`: the full path of that post within the thread. An unknown post
//!   decodes to the empty path, which every post sorts after.
//! - `ParentTree`: the root of that post within the thread, so a cursor taken
//!   from inside a subtree continues with the next subtree. An unknown post is
//!   used as the root bound directly.

use std::sync::Arc;

use domains::{
    Cursor, DomainError, DomainResult, PagePlan, Post, PostListing, PostRepository, SortMode,
    ThreadRef, ThreadRepository,
};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct PaginationEngine {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
}

impl PaginationEngine {
    pub fn new(threads: Arc<dyn ThreadRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { threads, posts }
    }

    /// Lists the posts of `thread` according to `listing`.
    #[instrument(skip(self, listing), fields(sort = listing.sort.as_str(), desc = listing.desc))]
    pub async fn list(&self, thread: &ThreadRef, listing: &PostListing) -> DomainResult<Vec<Post>> {
        let since = listing.since_id()?;

        let thread_id = self
            .threads
            .find(thread)
            .await?
            .ok_or_else(|| DomainError::thread_not_found(thread.as_str()))?
            .id;

        let plan = self.plan(thread_id, listing, since).await?;
        let page = self.posts.page(thread_id, &plan).await?;
        debug!(thread = thread_id, returned = page.len(), "post page served");
        Ok(page)
    }

    async fn plan(
        &self,
        thread: i64,
        listing: &PostListing,
        since: Option<i64>,
    ) -> DomainResult<PagePlan> {
        let mode = listing.sort;
        let plan = PagePlan::new(mode, listing.direction(), listing.limit());
        let Some(since) = since else {
            return Ok(plan);
        };

        let cursor = match mode {
            SortMode::Id | SortMode::Flat => Cursor::Id(since),
            SortMode::Tree => Cursor::Path(
                self.posts
                    .path_in_thread(thread, since)
                    .await?
                    .unwrap_or_default(),
            ),
            SortMode::ParentTree => Cursor::Root(
                self.posts
                    .root_in_thread(thread, since)
                    .await?
                    .unwrap_or(since),
            ),
        };
        plan.with_cursor(cursor)
    }
}
