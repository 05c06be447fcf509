use std::sync::Arc;

use domains::{DomainResult, Status, StatusRepository};
use tracing::{info, instrument};

/// Service-wide counters and the full reset.
#[derive(Clone)]
pub struct StatusService {
    status: Arc<dyn StatusRepository>,
}

impl StatusService {
    pub fn new(status: Arc<dyn StatusRepository>) -> Self {
        Self { status }
    }

    pub async fn status(&self) -> DomainResult<Status> {
        self.status.status().await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> DomainResult<()> {
        self.status.clear().await?;
        info!("all forum data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MockStatusRepository;

    #[tokio::test]
    async fn status_passes_counts_through() {
        let mut repo = MockStatusRepository::new();
        repo.expect_status().returning(|| {
            Ok(Status {
                user: 2,
                forum: 1,
                thread: 3,
                post: 10,
            })
        });
        let status = StatusService::new(Arc::new(repo)).status().await.unwrap();
        assert_eq!(status.post, 10);
    }
}
