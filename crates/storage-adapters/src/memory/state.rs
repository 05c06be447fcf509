//! The whole in-memory dataset. Every operation is synchronous; the adapter
//! wraps a [`MemoryState`] in an async mutex and transactions work on a
//! private copy that replaces the shared one on commit.
//!
//! Case-insensitive identities (nicknames, emails, forum and thread slugs)
//! are keyed by their lowercase form.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use domains::{
    DomainError, DomainResult, Forum, Insertion, NewForum, NewThread, PagePlan, PlacedPost, Post,
    PostPath, Status, Thread, ThreadKey, ThreadListing, ThreadRef, ThreadUpdate, User,
    UserListing, UserUpdate, Vote,
};

fn key(value: &str) -> String {
    value.to_lowercase()
}

fn take(limit: Option<u32>) -> usize {
    limit.filter(|l| *l > 0).map_or(usize::MAX, |l| l as usize)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    users: BTreeMap<String, User>,
    forums: BTreeMap<String, Forum>,
    threads: BTreeMap<i64, Thread>,
    posts: BTreeMap<i64, Post>,
    votes: HashMap<(String, i64), Vote>,
    /// forum slug key -> nickname keys
    members: HashMap<String, BTreeSet<String>>,
    last_thread_id: i64,
    last_post_id: i64,
}

impl MemoryState {
    // ── Users ───────────────────────────────────────────────────────────────

    pub fn create_user(&mut self, user: &User) -> Insertion<User, Vec<User>> {
        let email = key(&user.email);
        let clashes: Vec<User> = self
            .users
            .values()
            .filter(|u| key(&u.nickname) == key(&user.nickname) || key(&u.email) == email)
            .cloned()
            .collect();
        if !clashes.is_empty() {
            return Insertion::Existing(clashes);
        }
        self.users.insert(key(&user.nickname), user.clone());
        Insertion::Created(user.clone())
    }

    pub fn find_user(&self, nickname: &str) -> Option<User> {
        self.users.get(&key(nickname)).cloned()
    }

    pub fn update_user(
        &mut self,
        nickname: &str,
        update: &UserUpdate,
    ) -> DomainResult<Option<User>> {
        let id = key(nickname);
        if !self.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = &update.email {
            let taken = self
                .users
                .iter()
                .any(|(other, u)| *other != id && key(&u.email) == key(email));
            if taken {
                return Err(DomainError::Conflict(format!("email {email} is already taken")));
            }
        }
        let Some(user) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(fullname) = &update.fullname {
            user.fullname = fullname.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(about) = &update.about {
            user.about = about.clone();
        }
        Ok(Some(user.clone()))
    }

    pub fn users_by_nickname(&self, nicknames: &[String]) -> Vec<User> {
        nicknames
            .iter()
            .filter_map(|nickname| self.users.get(&key(nickname)).cloned())
            .collect()
    }

    // ── Forums ──────────────────────────────────────────────────────────────

    pub fn create_forum(&mut self, forum: &NewForum) -> Insertion<Forum> {
        if let Some(existing) = self.forums.get(&key(&forum.slug)) {
            return Insertion::Existing(existing.clone());
        }
        let created = Forum {
            slug: forum.slug.clone(),
            title: forum.title.clone(),
            user: forum.user.clone(),
            posts: 0,
            threads: 0,
        };
        self.forums.insert(key(&forum.slug), created.clone());
        Insertion::Created(created)
    }

    pub fn find_forum(&self, slug: &str) -> Option<Forum> {
        self.forums.get(&key(slug)).cloned()
    }

    pub fn forum_members(&self, slug: &str, listing: &UserListing) -> Vec<User> {
        let Some(members) = self.members.get(&key(slug)) else {
            return Vec::new();
        };
        let since = listing.since.as_deref().map(key);
        let past = |nickname: &&String| match &since {
            None => true,
            Some(since) if listing.desc => nickname.as_str() < since.as_str(),
            Some(since) => nickname.as_str() > since.as_str(),
        };
        let ordered: Box<dyn Iterator<Item = &String>> = if listing.desc {
            Box::new(members.iter().rev())
        } else {
            Box::new(members.iter())
        };
        ordered
            .filter(past)
            .filter_map(|nickname| self.users.get(nickname).cloned())
            .take(take(listing.limit))
            .collect()
    }

    pub fn add_forum_posts(&mut self, slug: &str, count: i64) -> DomainResult<()> {
        let forum = self
            .forums
            .get_mut(&key(slug))
            .ok_or_else(|| DomainError::forum_not_found(slug))?;
        forum.posts += count;
        Ok(())
    }

    pub fn add_forum_members(&mut self, slug: &str, nicknames: &[String]) {
        let members = self.members.entry(key(slug)).or_default();
        members.extend(nicknames.iter().map(|nickname| key(nickname)));
    }

    // ── Threads ─────────────────────────────────────────────────────────────

    pub fn create_thread(&mut self, thread: &NewThread) -> DomainResult<Insertion<Thread>> {
        if let Some(slug) = &thread.slug {
            if let Some(existing) = self.thread_by_slug(slug) {
                return Ok(Insertion::Existing(existing.clone()));
            }
        }
        let forum = self
            .forums
            .get_mut(&key(&thread.forum))
            .ok_or_else(|| DomainError::forum_not_found(thread.forum.as_str()))?;
        forum.threads += 1;

        self.last_thread_id += 1;
        let created = Thread {
            id: self.last_thread_id,
            slug: thread.slug.clone(),
            title: thread.title.clone(),
            message: thread.message.clone(),
            forum: thread.forum.clone(),
            author: thread.author.clone(),
            created: thread.created.unwrap_or_else(Utc::now),
            votes: 0,
        };
        self.threads.insert(created.id, created.clone());
        self.add_forum_members(&thread.forum, std::slice::from_ref(&thread.author));
        Ok(Insertion::Created(created))
    }

    fn thread_by_slug(&self, slug: &str) -> Option<&Thread> {
        let slug = key(slug);
        self.threads
            .values()
            .find(|t| t.slug.as_deref().is_some_and(|s| key(s) == slug))
    }

    fn thread_id(&self, thread: &ThreadRef) -> Option<i64> {
        thread
            .as_id()
            .filter(|id| self.threads.contains_key(id))
            .or_else(|| self.thread_by_slug(thread.as_str()).map(|t| t.id))
    }

    pub fn find_thread(&self, thread: &ThreadRef) -> Option<Thread> {
        self.thread_id(thread)
            .and_then(|id| self.threads.get(&id))
            .cloned()
    }

    pub fn thread_key(&self, thread: &ThreadRef) -> Option<ThreadKey> {
        self.find_thread(thread).map(|t| ThreadKey {
            id: t.id,
            forum: t.forum,
        })
    }

    pub fn update_thread(&mut self, thread: &ThreadRef, update: &ThreadUpdate) -> Option<Thread> {
        let id = self.thread_id(thread)?;
        let stored = self.threads.get_mut(&id)?;
        if let Some(title) = &update.title {
            stored.title = title.clone();
        }
        if let Some(message) = &update.message {
            stored.message = message.clone();
        }
        Some(stored.clone())
    }

    pub fn forum_threads(&self, slug: &str, listing: &ThreadListing) -> Vec<Thread> {
        let forum = key(slug);
        let mut threads: Vec<&Thread> = self
            .threads
            .values()
            .filter(|t| key(&t.forum) == forum)
            .filter(|t| match listing.since {
                None => true,
                Some(since) if listing.desc => t.created <= since,
                Some(since) => t.created >= since,
            })
            .collect();
        threads.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        if listing.desc {
            threads.reverse();
        }
        threads
            .into_iter()
            .take(take(listing.limit))
            .cloned()
            .collect()
    }

    pub fn add_thread_votes(&mut self, thread: i64, delta: i64) -> DomainResult<Thread> {
        let stored = self
            .threads
            .get_mut(&thread)
            .ok_or_else(|| DomainError::thread_not_found(thread.to_string()))?;
        stored.votes += delta;
        Ok(stored.clone())
    }

    // ── Votes ───────────────────────────────────────────────────────────────

    pub fn find_vote(&self, nickname: &str, thread: i64) -> Option<Vote> {
        self.votes.get(&(key(nickname), thread)).cloned()
    }

    pub fn save_vote(&mut self, vote: &Vote) {
        self.votes
            .insert((key(&vote.nickname), vote.thread), vote.clone());
    }

    // ── Posts ───────────────────────────────────────────────────────────────

    pub fn find_post(&self, id: i64) -> Option<Post> {
        self.posts.get(&id).cloned()
    }

    fn post_in_thread(&self, thread: i64, id: i64) -> Option<&Post> {
        self.posts.get(&id).filter(|p| p.thread == thread)
    }

    pub fn path_in_thread(&self, thread: i64, id: i64) -> Option<Vec<i64>> {
        self.post_in_thread(thread, id).map(Post::full_path)
    }

    pub fn root_in_thread(&self, thread: i64, id: i64) -> Option<i64> {
        self.post_in_thread(thread, id).map(|p| p.root)
    }

    pub fn post_paths(&self, thread: i64, ids: &[i64]) -> HashMap<i64, PostPath> {
        ids.iter()
            .filter_map(|id| self.post_in_thread(thread, *id))
            .map(|p| (p.id, p.stored_path()))
            .collect()
    }

    pub fn page(&self, thread: i64, plan: &PagePlan) -> Vec<Post> {
        let posts: Vec<Post> = self
            .posts
            .values()
            .filter(|p| p.thread == thread)
            .cloned()
            .collect();
        plan.select(&posts)
    }

    pub fn insert_posts(
        &mut self,
        thread: &ThreadKey,
        created: DateTime<Utc>,
        posts: &[PlacedPost],
    ) -> Vec<Post> {
        posts
            .iter()
            .map(|placed| {
                self.last_post_id += 1;
                let id = self.last_post_id;
                let path = placed.placement.path_for(id);
                let post = Post {
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
                };
                self.posts.insert(id, post.clone());
                post
            })
            .collect()
    }

    pub fn set_message(&mut self, id: i64, message: &str) -> DomainResult<()> {
        let post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| DomainError::post_not_found(id))?;
        post.message = message.to_owned();
        post.is_edited = true;
        Ok(())
    }

    // ── Service ─────────────────────────────────────────────────────────────

    pub fn status(&self) -> Status {
        Status {
            user: self.users.len() as i64,
            forum: self.forums.len() as i64,
            thread: self.threads.len() as i64,
            post: self.posts.len() as i64,
        }
    }

    /// Drops every row. Id sequences keep counting.
    pub fn clear(&mut self) {
        self.users.clear();
        self.forums.clear();
        self.threads.clear();
        self.posts.clear();
        self.votes.clear();
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Placement;

    fn user(nickname: &str, email: &str) -> User {
        User {
            nickname: nickname.into(),
            fullname: "Name".into(),
            email: email.into(),
            about: String::new(),
        }
    }

    fn seeded() -> MemoryState {
        let mut state = MemoryState::default();
        state.create_user(&user("Alice", "alice@example.org"));
        state.create_user(&user("bob", "bob@example.org"));
        state.create_forum(&NewForum {
            slug: "Rust".into(),
            title: "Rust".into(),
            user: "Alice".into(),
        });
        state
            .create_thread(&NewThread {
                title: "t".into(),
                author: "Alice".into(),
                message: "m".into(),
                slug: Some("Talk".into()),
                created: None,
                forum: "Rust".into(),
            })
            .unwrap();
        state
    }

    #[test]
    fn user_clash_returns_every_conflicting_user() {
        let mut state = seeded();
        let outcome = state.create_user(&user("ALICE", "BOB@example.org"));
        match outcome {
            Insertion::Existing(users) => assert_eq!(users.len(), 2),
            Insertion::Created(_) => panic!("expected a clash"),
        }
    }

    #[test]
    fn email_update_conflicts_with_other_users_only() {
        let mut state = seeded();
        let update = UserUpdate {
            email: Some("Bob@example.org".into()),
            ..Default::default()
        };
        assert!(matches!(
            state.update_user("alice", &update),
            Err(DomainError::Conflict(_))
        ));
        let own = UserUpdate {
            email: Some("ALICE@example.org".into()),
            ..Default::default()
        };
        assert!(state.update_user("alice", &own).unwrap().is_some());
        assert!(state.update_user("nobody", &own).unwrap().is_none());
    }

    #[test]
    fn thread_refs_resolve_by_id_or_slug() {
        let state = seeded();
        assert_eq!(state.find_thread(&ThreadRef::from(1)).unwrap().id, 1);
        assert_eq!(state.find_thread(&ThreadRef::from("talk")).unwrap().id, 1);
        assert!(state.find_thread(&ThreadRef::from(2)).is_none());
        assert_eq!(state.find_forum("rust").unwrap().threads, 1);
    }

    #[test]
    fn posts_outside_the_thread_have_no_path() {
        let mut state = seeded();
        let key = state.thread_key(&ThreadRef::from(1)).unwrap();
        let posts = state.insert_posts(
            &key,
            Utc::now(),
            &[PlacedPost {
                author: "Alice".into(),
                message: "hi".into(),
                placement: Placement::Root,
            }],
        );
        let id = posts[0].id;
        assert_eq!(state.path_in_thread(1, id), Some(vec![id]));
        assert_eq!(state.root_in_thread(1, id), Some(id));
        assert_eq!(state.path_in_thread(2, id), None);
        assert!(state.post_paths(2, &[id]).is_empty());
    }

    #[test]
    fn members_are_ordered_case_insensitively_with_strict_since() {
        let mut state = seeded();
        state.add_forum_members("rust", &["bob".to_string(), "Alice".to_string()]);

        let all = state.forum_members("RUST", &UserListing::default());
        let names: Vec<_> = all.iter().map(|u| u.nickname.as_str()).collect();
        assert_eq!(names, vec!["Alice", "bob"]);

        let after = state.forum_members(
            "rust",
            &UserListing {
                since: Some("ALICE".into()),
                ..Default::default()
            },
        );
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].nickname, "bob");

        let desc = state.forum_members(
            "rust",
            &UserListing {
                desc: true,
                limit: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(desc[0].nickname, "bob");
    }

    #[test]
    fn clear_keeps_sequences() {
        let mut state = seeded();
        state.clear();
        assert_eq!(state.status(), Status::default());
        state.create_forum(&NewForum {
            slug: "f".into(),
            title: "f".into(),
            user: "x".into(),
        });
        let thread = state
            .create_thread(&NewThread {
                title: "t".into(),
                author: "x".into(),
                message: "m".into(),
                slug: None,
                created: None,
                forum: "f".into(),
            })
            .unwrap();
        assert!(matches!(thread, Insertion::Created(t) if t.id == 2));
    }
}
