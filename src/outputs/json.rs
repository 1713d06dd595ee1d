//! JSON run report.
//!
//! ```json
//! {
//!   "keyword": "ホンダ",
//!   "reference_time": "2024-05-01T10:00:00+09:00",
//!   "sources": [
//!     { "source": "google", "partition": "Google", "extracted": 40,
//!       "sanitized": 38, "new": 5, "appended": 5, "error": null }
//!   ]
//! }
//! ```

use crate::pipeline::RunReport;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` to `path`, creating parent directories as needed.
#[instrument(level = "info", skip(report))]
pub async fn write_report(report: &RunReport, path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(sources = report.sources.len(), "Wrote run report");
    Ok(())
}
