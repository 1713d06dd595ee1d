//! Per-source collection run.
//!
//! For every configured source, in order:
//!
//! ```text
//! render → extract → resolve times → sanitize → load known URLs → dedupe → append
//! ```
//!
//! A failure in one source is recorded in its [`SourceReport`] and the run
//! moves on to the next source.

use crate::config::PipelineConfig;
use crate::dedup::dedupe;
use crate::freshness::FreshnessProbe;
use crate::models::{Article, RawCandidate};
use crate::render::{RenderError, Renderer};
use crate::sanitize::sanitize;
use crate::scrapers::{SourceAdapter, SourceKind, resolve_times};
use crate::store::TabularStore;
use crate::utils::truncate_for_log;
use crate::writer::{RetryPolicy, StoreWriteFailure, StoreWriter};
use chrono::{DateTime, FixedOffset};
use scraper::Html;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Why a source produced no appended rows.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Store(#[from] StoreWriteFailure),
}

/// Counts for one source. `error` is set when the source failed part-way;
/// counts reached before the failure are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub partition: String,
    pub extracted: usize,
    pub sanitized: usize,
    pub new: usize,
    pub appended: usize,
    pub error: Option<String>,
}

impl SourceReport {
    fn new(kind: SourceKind) -> Self {
        Self {
            source: kind,
            partition: kind.partition().to_string(),
            extracted: 0,
            sanitized: 0,
            new: 0,
            appended: 0,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub keyword: String,
    pub reference_time: String,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    /// True when at least one source ran and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(SourceReport::failed)
    }
}

pub struct Pipeline<R, S, P> {
    renderer: R,
    store: S,
    probe: P,
    config: PipelineConfig,
}

impl<R: Renderer, S: TabularStore, P: FreshnessProbe> Pipeline<R, S, P> {
    pub fn new(renderer: R, store: S, probe: P, config: PipelineConfig) -> Self {
        Self {
            renderer,
            store,
            probe,
            config,
        }
    }

    /// Run every configured source, in order, against one reference time.
    ///
    /// # Arguments
    ///
    /// * `keyword` - Search keyword sent to every source
    /// * `reference` - The run's "now"; relative time labels resolve against it
    ///
    /// # Returns
    ///
    /// A [`RunReport`] with one [`SourceReport`] per source. A source that
    /// fails has its `error` set; the remaining sources still run.
    #[instrument(level = "info", skip(self), fields(sources = self.config.sources.len()))]
    pub async fn run(&self, keyword: &str, reference: DateTime<FixedOffset>) -> RunReport {
        let policy = self.config.retry.policy();
        let mut sources = Vec::with_capacity(self.config.sources.len());

        for &kind in &self.config.sources {
            let t0 = Instant::now();
            let mut report = SourceReport::new(kind);
            match self.run_source(kind, keyword, reference, &policy, &mut report).await {
                Ok(()) => info!(
                    source = %kind,
                    extracted = report.extracted,
                    sanitized = report.sanitized,
                    new = report.new,
                    appended = report.appended,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Source done"
                ),
                Err(e) => {
                    error!(source = %kind, error = %e, "Source failed");
                    report.error = Some(e.to_string());
                }
            }
            sources.push(report);
        }

        RunReport {
            keyword: keyword.to_string(),
            reference_time: reference.to_rfc3339(),
            sources,
        }
    }

    #[instrument(level = "info", skip(self, kind, reference, policy, report), fields(source = %kind))]
    async fn run_source(
        &self,
        kind: SourceKind,
        keyword: &str,
        reference: DateTime<FixedOffset>,
        policy: &RetryPolicy,
        report: &mut SourceReport,
    ) -> Result<(), SourceError> {
        let adapter = kind.adapter();
        let request = adapter.render_request(keyword, &self.config.render);
        let markup = self.renderer.render(&request).await?;

        let candidates = collect(adapter, &markup);
        report.extracted = candidates.len();

        let candidates =
            resolve_times(candidates, adapter, reference, &self.probe, &self.config.freshness).await;

        let batch: Vec<Article> = candidates
            .into_iter()
            .filter_map(|candidate| match sanitize(candidate, adapter, reference) {
                Ok(article) => Some(article),
                Err(reason) => {
                    debug!(%reason, "rejected candidate");
                    None
                }
            })
            .collect();
        report.sanitized = batch.len();

        let writer = StoreWriter::new(&self.store, policy);
        let known = writer.load_known_urls(kind.partition()).await?;
        let fresh = dedupe(batch, &known);
        report.new = fresh.len();

        let outcome = writer.append(kind.partition(), fresh).await?;
        report.appended = outcome.appended;
        Ok(())
    }
}

/// Parse `markup` and pull every usable candidate out of it.
fn collect(adapter: &dyn SourceAdapter, markup: &str) -> Vec<RawCandidate> {
    let document = Html::parse_document(markup);
    let candidates: Vec<RawCandidate> = adapter.extract(&document).collect();
    if candidates.is_empty() {
        debug!(
            source = %adapter.kind(),
            page = %truncate_for_log(markup, 200),
            "no candidates in page"
        );
    }
    candidates
}
