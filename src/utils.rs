//! Utility functions for text cleanup, log truncation and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace normalization for scraped text
//! - Text access on parsed elements (all descendants, or a lone text child)
//! - String truncation for logging, safe on multi-byte text
//! - File system validation for the store directory

use scraper::ElementRef;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a \n\t b "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text below `element`, concatenated as rendered and whitespace collapsed.
///
/// Inline markup adds no separator: `<em>ホンダ</em>、新型` reads `ホンダ、新型`.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of an element whose only child is a single text node, collapsed.
/// `None` for empty elements and for any mix of text and child elements.
pub fn sole_text(element: ElementRef<'_>) -> Option<String> {
    let mut children = element.children();
    match (children.next(), children.next()) {
        (Some(only), None) => only.value().as_text().map(|text| collapse_whitespace(text)),
        _ => None,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended. Cuts on a character boundary, so Japanese
/// titles are safe.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Store directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
