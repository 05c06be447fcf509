//! A scripted [`StoreTx`] for unit tests. Reads come from public fields,
//! writes land in a shared [`Journal`] that outlives the boxed transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, DomainResult, PlacedPost, Post, PostPath, StoreTx, Thread, ThreadKey, ThreadRef,
    User, Vote,
};

#[derive(Debug, Default)]
pub struct Journal {
    pub committed: bool,
    pub inserted: Vec<Post>,
    pub forum_posts: i64,
    pub members: Vec<String>,
    pub messages: Vec<(i64, String)>,
    pub saved_votes: Vec<Vote>,
    pub deltas: Vec<i64>,
}

#[derive(Default)]
pub struct ScriptedTx {
    pub thread: Option<Thread>,
    pub users: Vec<User>,
    pub paths: HashMap<i64, PostPath>,
    pub posts: HashMap<i64, Post>,
    pub votes: Vec<Vote>,
    pub next_id: i64,
    pub user_lookups: Vec<Vec<String>>,
    pub journal: Arc<Mutex<Journal>>,
}

impl ScriptedTx {
    pub fn with_thread(id: i64, forum: &str) -> Self {
        Self {
            thread: Some(Thread {
                id,
                slug: Some(format!("thread-{id}")),
                title: "title".into(),
                message: "message".into(),
                forum: forum.into(),
                author: "owner".into(),
                created: Utc::now(),
                votes: 0,
            }),
            next_id: 100,
            ..Default::default()
        }
    }

    pub fn journal(&self) -> Arc<Mutex<Journal>> {
        self.journal.clone()
    }
}

#[async_trait]
impl StoreTx for ScriptedTx {
    async fn thread_key(&mut self, thread: &ThreadRef) -> DomainResult<Option<ThreadKey>> {
        Ok(self
            .thread
            .as_ref()
            .filter(|t| {
                thread.as_id() == Some(t.id)
                    || t.slug
                        .as_deref()
                        .is_some_and(|s| s.eq_ignore_ascii_case(thread.as_str()))
            })
            .map(|t| ThreadKey {
                id: t.id,
                forum: t.forum.clone(),
            }))
    }

    async fn users_by_nickname(&mut self, nicknames: &[String]) -> DomainResult<Vec<User>> {
        self.user_lookups.push(nicknames.to_vec());
        Ok(self
            .users
            .iter()
            .filter(|u| nicknames.iter().any(|n| n.eq_ignore_ascii_case(&u.nickname)))
            .cloned()
            .collect())
    }

    async fn post_paths(
        &mut self,
        _thread: i64,
        ids: &[i64],
    ) -> DomainResult<HashMap<i64, PostPath>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.paths.get(id).map(|path| (*id, path.clone())))
            .collect())
    }

    async fn insert_posts(
        &mut self,
        thread: &ThreadKey,
        created: DateTime<Utc>,
        posts: &[PlacedPost],
    ) -> DomainResult<Vec<Post>> {
        let mut out = Vec::new();
        for placed in posts {
            self.next_id += 1;
            let id = self.next_id;
            let path = placed.placement.path_for(id);
            out.push(Post {
                id,
                message: placed.message.clone(),
                created,
                is_edited: false,
                author: placed.author.clone(),
                thread: thread.id,
                forum: thread.forum.clone(),
                parent: placed.placement.parent(),
                parents: path.parents,
                root: path.root,
            });
        }
        self.lock().inserted.extend(out.iter().cloned());
        Ok(out)
    }

    async fn add_forum_posts(&mut self, _forum: &str, count: i64) -> DomainResult<()> {
        self.lock().forum_posts += count;
        Ok(())
    }

    async fn add_forum_members(&mut self, _forum: &str, nicknames: &[String]) -> DomainResult<()> {
        self.lock().members.extend(nicknames.iter().cloned());
        Ok(())
    }

    async fn post_for_update(&mut self, id: i64) -> DomainResult<Option<Post>> {
        Ok(self.posts.get(&id).cloned())
    }

    async fn set_message(&mut self, id: i64, message: &str) -> DomainResult<()> {
        self.lock().messages.push((id, message.to_owned()));
        Ok(())
    }

    async fn find_vote(&mut self, nickname: &str, thread: i64) -> DomainResult<Option<Vote>> {
        Ok(self
            .votes
            .iter()
            .find(|v| v.thread == thread && v.nickname.eq_ignore_ascii_case(nickname))
            .cloned())
    }

    async fn save_vote(&mut self, vote: &Vote) -> DomainResult<()> {
        self.lock().saved_votes.push(vote.clone());
        Ok(())
    }

    async fn add_thread_votes(&mut self, thread: i64, delta: i64) -> DomainResult<Thread> {
        self.lock().deltas.push(delta);
        let mut updated = self
            .thread
            .clone()
            .filter(|t| t.id == thread)
            .ok_or_else(|| DomainError::thread_not_found(thread.to_string()))?;
        updated.votes += delta;
        Ok(updated)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.lock().committed = true;
        Ok(())
    }
}

impl ScriptedTx {
    fn lock(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }
}
