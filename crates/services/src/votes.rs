//! # Vote ledger
//!
//! One vote per (user, thread). A thread's `votes` field is the running sum of
//! its votes and is only changed here, by the delta a cast introduces.

use std::sync::Arc;

use domains::{
    Ballot, DomainError, DomainResult, Thread, ThreadRef, Transactional, Voice, Vote,
};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn Transactional>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn Transactional>) -> Self {
        Self { store }
    }

    /// Records `ballot` on `thread` and returns the thread with its new rating.
    ///
    /// The user is checked before the thread; both missing reports the user.
    #[instrument(skip(self, ballot), fields(nickname = %ballot.nickname, voice = ballot.voice))]
    pub async fn cast(&self, thread: &ThreadRef, ballot: &Ballot) -> DomainResult<Thread> {
        let voice = Voice::from_rating(ballot.voice)?;
        let mut tx = self.store.begin().await?;

        // 1. Voter
        let nickname = tx
            .users_by_nickname(std::slice::from_ref(&ballot.nickname))
            .await?
            .into_iter()
            .next()
            .map(|user| user.nickname)
            .ok_or_else(|| DomainError::user_not_found(ballot.nickname.as_str()))?;

        // 2. Thread
        let key = tx
            .thread_key(thread)
            .await?
            .ok_or_else(|| DomainError::thread_not_found(thread.as_str()))?;

        // 3. Ledger entry and rating delta
        let prior = tx.find_vote(&nickname, key.id).await?.map(|vote| vote.voice);
        let delta = voice.delta_over(prior);
        if prior != Some(voice) {
            tx.save_vote(&Vote {
                nickname,
                thread: key.id,
                voice,
            })
            .await?;
        }
        let updated = tx.add_thread_votes(key.id, delta).await?;
        tx.commit().await?;

        debug!(thread = updated.id, delta, votes = updated.votes, "vote recorded");
        Ok(updated)
    }
}
