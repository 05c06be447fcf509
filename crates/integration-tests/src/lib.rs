//! Shared fixtures for the cross-crate tests.
//!
//! Every fixture runs against a fresh store, so ids start at 1 in each test.

use std::sync::Arc;

use domains::{
    Insertion, NewForum, NewPost, NewThread, Post, PostListing, SortMode, Thread, ThreadRef,
    User, UserProfile,
};
use services::{Ports, Services};
use storage_adapters::MemoryStore;

pub const FORUM: &str = "rust";

/// Services over an empty memory store, with reorganization disabled.
pub fn services() -> Services {
    Services::new(Ports::shared(Arc::new(MemoryStore::new())), 0)
}

pub async fn user(services: &Services, nickname: &str) -> User {
    let profile = UserProfile {
        fullname: format!("{nickname} fullname"),
        email: format!("{nickname}@example.org"),
        about: String::new(),
    };
    match services.users.create(nickname, profile).await.unwrap() {
        Insertion::Created(user) => user,
        Insertion::Existing(users) => panic!("user {nickname} already exists: {users:?}"),
    }
}

pub async fn thread(services: &Services, author: &str, slug: Option<&str>) -> Thread {
    let thread = NewThread {
        title: "thread".into(),
        author: author.into(),
        message: "opening".into(),
        slug: slug.map(str::to_owned),
        created: None,
        forum: String::new(),
    };
    match services.forums.create_thread(FORUM, thread).await.unwrap() {
        Insertion::Created(thread) => thread,
        Insertion::Existing(thread) => panic!("thread already exists: {thread:?}"),
    }
}

/// A memory store seeded by [`seed`].
pub async fn seeded() -> (Services, Thread) {
    seed(services()).await
}

/// Adds users `alice` and `bob`, forum [`FORUM`] owned by alice and one
/// thread with slug `talk`.
pub async fn seed(services: Services) -> (Services, Thread) {
    user(&services, "alice").await;
    user(&services, "bob").await;
    services
        .forums
        .create(NewForum {
            slug: FORUM.into(),
            title: "Rust".into(),
            user: "alice".into(),
        })
        .await
        .unwrap();
    let thread = thread(&services, "alice", Some("talk")).await;
    (services, thread)
}

pub fn new_post(author: &str, parent: i64) -> NewPost {
    NewPost {
        author: author.into(),
        message: format!("reply to {parent}"),
        parent,
    }
}

/// Creates one batch whose posts have the given parents.
pub async fn reply(services: &Services, thread: &Thread, parents: &[i64]) -> Vec<Post> {
    let batch = parents.iter().map(|&parent| new_post("alice", parent)).collect();
    services
        .posts
        .create_posts(&ThreadRef::from(thread.id), batch)
        .await
        .unwrap()
}

pub fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|post| post.id).collect()
}

pub fn listing(sort: SortMode, limit: Option<u32>, since: Option<i64>, desc: bool) -> PostListing {
    PostListing {
        sort,
        limit,
        since: since.map(|id| id.to_string()),
        desc,
    }
}

/// Pages through the thread with `limit`, feeding the last returned id back
/// as `since`, and returns the concatenated ids.
pub async fn page_through(
    services: &Services,
    thread: &Thread,
    sort: SortMode,
    limit: u32,
    desc: bool,
) -> Vec<i64> {
    let reference = ThreadRef::from(thread.id);
    let mut seen = Vec::new();
    let mut since = None;
    loop {
        let page = services
            .posts
            .list(&reference, &listing(sort, Some(limit), since, desc))
            .await
            .unwrap();
        let Some(last) = page.last() else {
            return seen;
        };
        since = Some(last.id);
        seen.extend(ids(&page));
    }
}
