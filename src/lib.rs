//! Daily nutrition, cost and food-waste summaries for a residential meal
//! program.
//!
//! Input tables are loaded as text, normalized, joined into one row per
//! scheduled meal, enriched with cost and waste metrics, and rolled up per
//! calendar day. The daily summary is the artifact the dashboard report reads.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;

pub use error::PipelineError;
pub use pipeline::{normalize_tables, run_pipeline, run_tables};
