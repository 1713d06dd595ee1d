//! Store writes with bounded exponential backoff.
//!
//! [`StoreWriter`] is the only component that talks to a [`TabularStore`]. It
//! reads the known-URL set for a partition and appends new rows, running every
//! store call through a [`RetryPolicy`].
//!
//! # Retry Strategy
//!
//! - At most 5 attempts by default
//! - Only errors the policy classifies as transient are retried
//! - Exponential backoff from a base delay, capped at a maximum
//! - Random jitter added so racing writers spread out
//!
//! ```text
//! delay(n) = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=jitter)
//! ```
//!
//! Running out of attempts, or any non-transient error, fails only the
//! partition being written.

use crate::models::{Article, Row, STORE_HEADER};
use crate::store::{KnownUrlSet, StoreError, TabularStore};
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Hard cap on store round-trips per operation.
pub const MAX_ATTEMPTS: usize = 5;

/// Decides whether a store error is worth another attempt.
pub type TransientPredicate = fn(&StoreError) -> bool;

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles with each further attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub jitter: Duration,
    pub is_transient: TransientPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_secs(5),
            is_transient: StoreError::is_transient,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish()
    }
}

/// A store operation on one partition that could not be completed.
#[derive(Debug, Error)]
#[error("{operation} on partition {partition} failed after {attempts} attempt(s): {source}")]
pub struct StoreWriteFailure {
    pub operation: &'static str,
    pub partition: String,
    pub attempts: usize,
    #[source]
    pub source: StoreError,
}

impl RetryPolicy {
    /// Sleep before attempt `attempt + 1`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay);
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng().random_range(0..=jitter_ms))
        };
        delay + jitter
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent.
    ///
    /// # Arguments
    ///
    /// * `operation` - Short name for logs and the failure (`"read"`, `"append"`)
    /// * `partition` - Partition the operation targets
    /// * `op` - Produces one attempt; called again after each transient error
    ///
    /// # Returns
    ///
    /// The value and the number of attempts used, or a [`StoreWriteFailure`]
    /// carrying the last error. Attempts never exceed [`MAX_ATTEMPTS`].
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        partition: &str,
        mut op: F,
    ) -> Result<(T, usize), StoreWriteFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.clamp(1, MAX_ATTEMPTS);
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) => {
                    let transient = (self.is_transient)(&e);
                    let elapsed_ms_total = total_t0.elapsed().as_millis() as u64;

                    if !transient || attempt >= max_attempts {
                        error!(
                            operation,
                            partition,
                            attempt,
                            max = max_attempts,
                            transient,
                            elapsed_ms_total,
                            error = %e,
                            "store operation failed"
                        );
                        return Err(StoreWriteFailure {
                            operation,
                            partition: partition.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        partition,
                        attempt,
                        max = max_attempts,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "store operation contended; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    pub appended: usize,
    /// Store round-trips used; zero for an empty batch.
    pub attempts: usize,
    /// Whether the partition was created (with its header) by this append.
    pub created: bool,
}

/// Reads and appends partitions of a [`TabularStore`] under a [`RetryPolicy`].
#[derive(Debug)]
pub struct StoreWriter<'a, S> {
    store: &'a S,
    policy: &'a RetryPolicy,
}

impl<'a, S: TabularStore> StoreWriter<'a, S> {
    pub fn new(store: &'a S, policy: &'a RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// URLs already present in `partition`; empty when it does not exist yet.
    #[instrument(level = "info", skip(self))]
    pub async fn load_known_urls(&self, partition: &str) -> Result<KnownUrlSet, StoreWriteFailure> {
        let store = self.store;
        let (rows, _) = self
            .policy
            .run("read", partition, move || async move { store.read_rows(partition).await })
            .await?;
        let known = rows.map(|rows| KnownUrlSet::from_rows(&rows)).unwrap_or_default();
        info!(known = known.len(), "Loaded known URLs");
        Ok(known)
    }

    /// Append `batch` to `partition`, creating it with the header row first if
    /// needed.
    ///
    /// # Arguments
    ///
    /// * `partition` - Target partition (`Google`, `Yahoo`, `MSN`)
    /// * `batch` - Deduplicated articles, written in order
    ///
    /// # Returns
    ///
    /// An [`AppendOutcome`] with rows written and attempts used. An empty batch
    /// makes no store call and reports zero attempts.
    ///
    /// # Errors
    ///
    /// [`StoreWriteFailure`] after a non-transient error or once the retry
    /// budget is spent. Only this partition is affected.
    #[instrument(level = "info", skip(self, batch), fields(count = batch.len()))]
    pub async fn append(
        &self,
        partition: &str,
        batch: Vec<Article>,
    ) -> Result<AppendOutcome, StoreWriteFailure> {
        if batch.is_empty() {
            info!("No new articles to append");
            return Ok(AppendOutcome::default());
        }

        let rows: Vec<Row> = batch.into_iter().map(Article::into_row).collect();
        let store = self.store;
        let rows_ref = &rows;

        let (created, attempts) = self
            .policy
            .run("append", partition, move || async move {
                let created = if store.partition_exists(partition).await? {
                    false
                } else {
                    store.create_partition(partition, &STORE_HEADER).await?;
                    true
                };
                store.append_rows(partition, rows_ref).await?;
                Ok::<_, StoreError>(created)
            })
            .await?;

        info!(appended = rows.len(), attempts, created, "Appended articles");
        Ok(AppendOutcome {
            appended: rows.len(),
            attempts,
            created,
        })
    }
}
