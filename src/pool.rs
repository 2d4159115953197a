use crate::error::{Result, TransportError};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of concurrent connections per protocol client.
pub const DEFAULT_CONNECTION_LIMIT: usize = 8;

/// A bounded set of connections shared by all requests of one client.
///
/// Each client owns its group, so independently configured clients never
/// starve each other. Callers beyond the limit queue for a free permit.
#[derive(Debug, Clone)]
pub struct ConnectionGroup {
    name: String,
    limit: usize,
    permits: Arc<Semaphore>,
}

impl ConnectionGroup {
    pub fn new(name: impl Into<String>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            name: name.into(),
            limit,
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a free connection slot. The slot is released when the
    /// permit is dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::PoolClosed(self.name.clone()).into())
    }
}
