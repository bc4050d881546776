//! Last-started-wins snapshots for data reloaded on change notifications.
//!
//! A reload takes a ticket before it queries and commits with it afterwards.
//! A commit whose ticket is older than the one already committed is dropped,
//! so a slow reload can never overwrite a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

struct Committed<T> {
    version: u64,
    value: Option<Arc<T>>,
}

pub struct VersionedSnapshot<T> {
    issued: AtomicU64,
    committed: RwLock<Committed<T>>,
}

impl<T> Default for VersionedSnapshot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionedSnapshot<T> {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            committed: RwLock::new(Committed {
                version: 0,
                value: None,
            }),
        }
    }

    /// Call before starting the reload.
    pub fn begin(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns false when a newer reload already committed.
    pub fn commit(&self, ticket: Ticket, value: T) -> bool {
        let mut committed = self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if ticket.0 <= committed.version {
            tracing::debug!(
                ticket = ticket.0,
                committed = committed.version,
                "Discarding out-of-order reload"
            );
            return false;
        }

        committed.version = ticket.0;
        committed.value = Some(Arc::new(value));
        true
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Current value. When nothing has been committed yet, runs `load`
    /// first and commits its result.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Option<Arc<T>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get() {
            return Ok(Some(value));
        }

        let ticket = self.begin();
        let value = load().await?;
        self.commit(ticket, value);
        Ok(self.get())
    }

    pub fn version(&self) -> u64 {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }
}
