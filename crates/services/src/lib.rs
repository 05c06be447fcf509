//! services/src/lib.rs
//!
//! Use-case orchestration for the forum service. Every service holds its
//! ports behind `Arc<dyn …>` so one set of adapters can be shared by all of
//! them and by every request worker.

pub mod batch;
pub mod catalog;
pub mod maintenance;
pub mod pagination;
pub mod posts;
pub mod status;
pub mod votes;
pub mod writer;

#[cfg(test)]
mod tests_support;

use std::sync::Arc;

use domains::{
    ForumRepository, PostRepository, StatusRepository, StorageMaintenance, ThreadRepository,
    Transactional, UserRepository,
};

pub use batch::{validate_batch, ValidatedBatch};
pub use catalog::{ForumService, ThreadService, UserService};
pub use maintenance::MaintenanceCounter;
pub use pagination::PaginationEngine;
pub use posts::PostService;
pub use status::StatusService;
pub use votes::VoteLedger;

/// The set of storage ports a deployment provides.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub forums: Arc<dyn ForumRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub status: Arc<dyn StatusRepository>,
    pub store: Arc<dyn Transactional>,
    pub maintenance: Arc<dyn StorageMaintenance>,
}

impl Ports {
    /// Serves every port from one store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ForumRepository
            + ThreadRepository
            + PostRepository
            + StatusRepository
            + Transactional
            + StorageMaintenance
            + 'static,
    {
        Self {
            users: store.clone(),
            forums: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            status: store.clone(),
            store: store.clone(),
            maintenance: store,
        }
    }
}

/// Every service, wired against one [`Ports`] set.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub forums: ForumService,
    pub threads: ThreadService,
    pub posts: PostService,
    pub votes: VoteLedger,
    pub status: StatusService,
}

impl Services {
    /// `reorganize_every` is the number of inserted posts between storage
    /// reorganizations; `0` disables them.
    pub fn new(ports: Ports, reorganize_every: u64) -> Self {
        let counter = MaintenanceCounter::new(ports.maintenance.clone(), reorganize_every);
        let pages = PaginationEngine::new(ports.threads.clone(), ports.posts.clone());
        Self {
            users: UserService::new(ports.users.clone()),
            forums: ForumService::new(
                ports.users.clone(),
                ports.forums.clone(),
                ports.threads.clone(),
            ),
            threads: ThreadService::new(ports.threads.clone()),
            posts: PostService::new(
                ports.store.clone(),
                ports.posts.clone(),
                ports.users.clone(),
                ports.forums.clone(),
                ports.threads.clone(),
                pages,
                counter,
            ),
            votes: VoteLedger::new(ports.store.clone()),
            status: StatusService::new(ports.status),
        }
    }
}
