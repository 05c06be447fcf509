//! Row mappings between the relational model and the domain models.

use chrono::{DateTime, Utc};
use domains::{Forum, Post, PostPath, Thread, User, Vote, Voice};
use sqlx::FromRow;

pub(crate) const USER_COLUMNS: &str = "nickname, fullname, email, about";
pub(crate) const FORUM_COLUMNS: &str = "slug, title, owner, posts, threads";
pub(crate) const THREAD_COLUMNS: &str = "id, slug, title, message, forum, author, created, votes";
pub(crate) const POST_COLUMNS: &str =
    "id, thread_id, forum, author, message, is_edited, created, parent, parents, root";

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub nickname: String,
    pub fullname: String,
    pub email: String,
    pub about: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            nickname: row.nickname,
            fullname: row.fullname,
            email: row.email,
            about: row.about,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ForumRow {
    pub slug: String,
    pub title: String,
    pub owner: String,
    pub posts: i64,
    pub threads: i64,
}

impl From<ForumRow> for Forum {
    fn from(row: ForumRow) -> Self {
        Forum {
            slug: row.slug,
            title: row.title,
            user: row.owner,
            posts: row.posts,
            threads: row.threads,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ThreadRow {
    pub id: i64,
    pub slug: Option<String>,
    pub title: String,
    pub message: String,
    pub forum: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub votes: i64,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: row.id,
            slug: row.slug,
            title: row.title,
            message: row.message,
            forum: row.forum,
            author: row.author,
            created: row.created,
            votes: row.votes,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub thread_id: i64,
    pub forum: String,
    pub author: String,
    pub message: String,
    pub is_edited: bool,
    pub created: DateTime<Utc>,
    pub parent: i64,
    pub parents: Vec<i64>,
    pub root: i64,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            message: row.message,
            created: row.created,
            is_edited: row.is_edited,
            author: row.author,
            thread: row.thread_id,
            forum: row.forum,
            parent: row.parent,
            parents: row.parents,
            root: row.root,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PathRow {
    pub id: i64,
    pub parents: Vec<i64>,
    pub root: i64,
}

impl From<PathRow> for (i64, PostPath) {
    fn from(row: PathRow) -> Self {
        (
            row.id,
            PostPath {
                parents: row.parents,
                root: row.root,
            },
        )
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct VoteRow {
    pub nickname: String,
    pub thread_id: i64,
    pub up: bool,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            nickname: row.nickname,
            thread: row.thread_id,
            voice: Voice::from_up(row.up),
        }
    }
}
