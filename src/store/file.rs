//! On-disk store keeping each partition in a JSON Lines file.
//!
//! # Layout
//!
//! ```text
//! store_dir/
//! ├── Google.jsonl
//! ├── Yahoo.jsonl
//! └── MSN.jsonl
//! ```
//!
//! Each line is a JSON array of four strings; line 1 is the header. Appends
//! are written with a single `write_all` on a file opened in append mode.

use super::{StoreError, TabularStore};
use crate::models::Row;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    root: PathBuf,
}

impl JsonLinesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File backing `partition`. Characters outside `[A-Za-z0-9_-]` become `_`.
    pub fn partition_path(&self, partition: &str) -> PathBuf {
        let name: String = partition
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.jsonl"))
    }
}

fn encode_lines(rows: &[Row]) -> Result<String, StoreError> {
    let mut buf = String::new();
    for row in rows {
        let line = serde_json::to_string(row)
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        buf.push_str(&line);
        buf.push('\n');
    }
    Ok(buf)
}

impl TabularStore for JsonLinesStore {
    async fn partition_exists(&self, partition: &str) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.partition_path(partition)).await?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn read_rows(&self, partition: &str) -> Result<Option<Vec<Row>>, StoreError> {
        let raw = match fs::read_to_string(self.partition_path(partition)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Row = serde_json::from_str(line).map_err(|e| StoreError::Malformed {
                partition: partition.to_string(),
                line: idx + 1,
                message: e.to_string(),
            })?;
            rows.push(row);
        }
        debug!(rows = rows.len(), "Read partition");
        Ok(Some(rows))
    }

    #[instrument(level = "debug", skip(self, header))]
    async fn create_partition(&self, partition: &str, header: &[&str]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        let header: Row = header.iter().map(|h| h.to_string()).collect();
        let line = encode_lines(&[header])?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.partition_path(partition))
            .await
        {
            Ok(mut file) => {
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
                debug!("Created partition with header row");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    async fn append_rows(&self, partition: &str, rows: &[Row]) -> Result<(), StoreError> {
        let mut file = match OpenOptions::new()
            .append(true)
            .open(self.partition_path(partition))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::MissingPartition(partition.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(encode_lines(rows)?.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
