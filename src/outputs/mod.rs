//! Run output written after collection.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`RunReport`](crate::pipeline::RunReport) as pretty JSON

pub mod json;
