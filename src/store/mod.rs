//! Persistent tabular store: one partition per news source.
//!
//! Every partition holds four-column rows (`title`, `url`, `published_at`,
//! `source`). Row 0 is the header written when the partition is created.
//!
//! # Implementations
//!
//! - [`file::JsonLinesStore`]: one `<partition>.jsonl` file per partition
//! - [`memory::MemoryStore`]: in-process map, for dry runs and tests

pub mod file;
pub mod memory;

use crate::models::Row;
use std::collections::HashSet;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer holds the partition, or a quota was hit. Worth retrying.
    #[error("store busy or over quota: {0}")]
    Contention(String),
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed row in partition {partition} at line {line}: {message}")]
    Malformed {
        partition: String,
        line: usize,
        message: String,
    },
    #[error("partition {0} does not exist")]
    MissingPartition(String),
}

impl StoreError {
    /// Default transient classification used by the writer's retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Contention(_) => true,
            StoreError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ),
            StoreError::Malformed { .. } | StoreError::MissingPartition(_) => false,
        }
    }
}

/// Row-oriented store with append-only writes.
pub trait TabularStore {
    async fn partition_exists(&self, partition: &str) -> Result<bool, StoreError>;

    /// All rows including the header, or `None` when the partition is absent.
    async fn read_rows(&self, partition: &str) -> Result<Option<Vec<Row>>, StoreError>;

    /// Create an empty partition holding only `header`. Creating a partition
    /// that already exists is not an error.
    async fn create_partition(&self, partition: &str, header: &[&str]) -> Result<(), StoreError>;

    /// Append `rows` after the existing ones, preserving column order.
    async fn append_rows(&self, partition: &str, rows: &[Row]) -> Result<(), StoreError>;
}

/// URLs already stored in one partition. Built per run, used once for dedup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownUrlSet(HashSet<String>);

impl KnownUrlSet {
    /// Collect column 1 of every row after the header; short rows are ignored.
    pub fn from_rows(rows: &[Row]) -> Self {
        Self(
            rows.iter()
                .skip(1)
                .filter_map(|row| row.get(1))
                .cloned()
                .collect(),
        )
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownUrlSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
