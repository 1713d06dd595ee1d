//! Command-line interface definitions.
//!
//! Keyword and store directory resolve as flag, then environment variable,
//! then built-in default.

use crate::scrapers::SourceKind;
use clap::Parser;

/// Collect news for a keyword and append new articles to the store.
///
/// # Examples
///
/// ```sh
/// # Default keyword and store
/// keyword_news_collector
///
/// # Another keyword, Google and Bing only, with a run report
/// keyword_news_collector -k トヨタ --source google --source bing --report ./report.json
///
/// # Keyword and store from the environment
/// NEWS_KEYWORD=マツダ NEWS_STORE=/var/lib/news keyword_news_collector
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search keyword
    #[arg(short, long, env = "NEWS_KEYWORD", default_value = "ホンダ")]
    pub keyword: String,

    /// Store directory; one partition file per source
    #[arg(short, long, env = "NEWS_STORE", default_value = "./news_store")]
    pub store: String,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run only these sources (repeatable); overrides the config file
    #[arg(long = "source", value_enum)]
    pub sources: Vec<SourceKind>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Skip the Last-Modified probe for articles without a usable time
    #[arg(long)]
    pub no_freshness: bool,

    /// Dedupe against the store but write nothing to it
    #[arg(long)]
    pub dry_run: bool,
}
