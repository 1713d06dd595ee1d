//! In-process store used for dry runs and tests.

use super::{StoreError, TabularStore};
use crate::models::Row;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument};

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a partition with existing rows (header included).
    pub fn with_partition(mut self, partition: &str, rows: Vec<Row>) -> Self {
        self.partitions
            .get_mut()
            .insert(partition.to_string(), rows);
        self
    }

    /// Copy `partitions` out of another store. Absent partitions stay absent.
    #[instrument(level = "info", skip(source))]
    pub async fn snapshot_of<S: TabularStore>(
        source: &S,
        partitions: &[&str],
    ) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for &partition in partitions {
            if let Some(rows) = source.read_rows(partition).await? {
                info!(partition, rows = rows.len(), "Snapshotted partition");
                store = store.with_partition(partition, rows);
            }
        }
        Ok(store)
    }

    /// Snapshot of a partition's rows.
    pub async fn rows(&self, partition: &str) -> Option<Vec<Row>> {
        self.partitions.lock().await.get(partition).cloned()
    }
}

impl TabularStore for MemoryStore {
    async fn partition_exists(&self, partition: &str) -> Result<bool, StoreError> {
        Ok(self.partitions.lock().await.contains_key(partition))
    }

    async fn read_rows(&self, partition: &str) -> Result<Option<Vec<Row>>, StoreError> {
        Ok(self.rows(partition).await)
    }

    async fn create_partition(&self, partition: &str, header: &[&str]) -> Result<(), StoreError> {
        self.partitions
            .lock()
            .await
            .entry(partition.to_string())
            .or_insert_with(|| vec![header.iter().map(|h| h.to_string()).collect()]);
        Ok(())
    }

    async fn append_rows(&self, partition: &str, rows: &[Row]) -> Result<(), StoreError> {
        let mut partitions = self.partitions.lock().await;
        let existing = partitions
            .get_mut(partition)
            .ok_or_else(|| StoreError::MissingPartition(partition.to_string()))?;
        existing.extend_from_slice(rows);
        Ok(())
    }
}
