//! # Domain Models
//!
//! These structs represent the core entities of the forum service.
//! Serialized field names follow the public wire format (`author`, `forum`,
//! `thread`, `isEdited`), which is why several fields carry serde renames.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::PostPath;
use crate::voting::Voice;

/// A registered forum participant. Nicknames and emails are unique
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    pub fullname: String,
    pub email: String,
    #[serde(default)]
    pub about: String,
}

/// Profile payload of a user-create request; the nickname comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub fullname: String,
    pub email: String,
    #[serde(default)]
    pub about: String,
}

impl User {
    pub fn new(nickname: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            nickname: nickname.into(),
            fullname: profile.fullname,
            email: profile.email,
            about: profile.about,
        }
    }
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none() && self.email.is_none() && self.about.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub slug: String,
    pub title: String,
    /// Nickname of the forum owner
    pub user: String,
    pub posts: i64,
    pub threads: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewForum {
    pub slug: String,
    pub title: String,
    pub user: String,
}

/// A discussion inside a forum. `votes` is the running rating aggregate and is
/// only ever changed by the vote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub message: String,
    pub forum: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// Filled from the request path; any value in the body is overridden.
    #[serde(default)]
    pub forum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
}

/// A thread reference as it arrives from clients: either a numeric id or a
/// slug. A reference matches a thread whose id equals it or whose slug equals
/// it case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadRef(String);

impl ThreadRef {
    pub fn new(slug_or_id: impl Into<String>) -> Self {
        Self(slug_or_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric interpretation of the reference, if it has one.
    pub fn as_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ThreadRef {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ThreadRef {
    fn from(slug_or_id: &str) -> Self {
        Self(slug_or_id.to_owned())
    }
}

/// The minimal thread identity a post batch needs: where the posts go and
/// which forum they are denormalized into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadKey {
    pub id: i64,
    pub forum: String,
}

/// A node in a thread's post forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub message: String,
    pub created: DateTime<Utc>,
    pub is_edited: bool,
    pub author: String,
    pub thread: i64,
    pub forum: String,
    /// Immediate parent id, `0` for a root post.
    pub parent: i64,
    /// Ancestor chain, thread-root post first and immediate parent last.
    #[serde(skip)]
    pub parents: Vec<i64>,
    /// Top-level ancestor; a root post is its own root.
    #[serde(skip)]
    pub root: i64,
}

impl Post {
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }

    /// `parents ++ [id]`, the key the tree orderings sort by.
    pub fn full_path(&self) -> Vec<i64> {
        let mut path = Vec::with_capacity(self.parents.len() + 1);
        path.extend_from_slice(&self.parents);
        path.push(self.id);
        path
    }

    pub fn stored_path(&self) -> PostPath {
        PostPath {
            parents: self.parents.clone(),
            root: self.root,
        }
    }
}

/// One entry of a post-create batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub parent: i64,
}

/// Partial post update; an absent message leaves the post untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostUpdate {
    pub message: Option<String>,
}

/// The relations a post read may expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    User,
    Forum,
    Thread,
}

/// Capability set of requested relations, parsed from `related=user,thread`.
/// Unknown names are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Related(HashSet<Relation>);

impl Related {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, relation: Relation) -> Self {
        self.0.insert(relation);
        self
    }

    pub fn contains(&self, relation: Relation) -> bool {
        self.0.contains(&relation)
    }
}

impl FromStr for Related {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let set = s
            .split(',')
            .filter_map(|name| match name.trim() {
                "user" => Some(Relation::User),
                "forum" => Some(Relation::Forum),
                "thread" => Some(Relation::Thread),
                _ => None,
            })
            .collect();
        Ok(Self(set))
    }
}

/// A post together with whichever relations were requested. Relations that
/// were not requested are absent from the serialized form, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

/// A stored vote: one per (user, thread).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub nickname: String,
    pub thread: i64,
    pub voice: Voice,
}

/// Vote request payload: `voice` is `1` or `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ballot {
    pub nickname: String,
    pub voice: i32,
}

/// Row counts reported by the service status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub user: i64,
    pub forum: i64,
    pub thread: i64,
    pub post: i64,
}

/// Outcome of an insert guarded by a uniqueness rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<T, E = T> {
    Created(T),
    /// Nothing was written; the conflicting entity (or entities) is returned.
    Existing(E),
}

/// Listing options for the threads of a forum. `since` is inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadListing {
    pub limit: Option<u32>,
    pub since: Option<DateTime<Utc>>,
    pub desc: bool,
}

/// Listing options for the members of a forum. `since` is a nickname and is
/// exclusive; ordering is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListing {
    pub limit: Option<u32>,
    pub since: Option<String>,
    pub desc: bool,
}
