//! In-process table change notifications.
//!
//! Every confirmed write publishes the table it touched. Subscribers get
//! table-level events only, with no row data, and reload what they show.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use tokio::sync::broadcast;
use utoipa::ToSchema;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Employees,
    Attendance,
    Requests,
    SystemSettings,
    EmployeeSchedules,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TableChange {
    pub table: Table,
    /// Increases by one per published change.
    pub seq: u64,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<TableChange>,
    seq: Arc<AtomicU64>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn publish(&self, table: Table) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // no subscribers is fine
        let _ = self.tx.send(TableChange { table, seq });
        tracing::debug!(table = %table, seq, "Published change");
        seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn subscribers_see_changes_in_order() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        feed.publish(Table::Attendance);
        feed.publish(Table::SystemSettings);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.table, Table::Attendance);
        assert_eq!(second.table, Table::SystemSettings);
        assert!(second.seq > first.seq);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.publish(Table::Requests), 1);
        assert_eq!(feed.publish(Table::Requests), 2);
    }

    #[test]
    fn table_names_match_storage() {
        assert_eq!(Table::EmployeeSchedules.as_ref(), "employee_schedules");
        assert_eq!(
            serde_json::to_string(&Table::SystemSettings).unwrap(),
            "\"system_settings\""
        );
    }
}
