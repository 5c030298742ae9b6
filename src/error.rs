use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures the pipeline cannot recover from.
///
/// Field-level parse problems never show up here: they become nulls during
/// normalization and surface as missing joins or metrics instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "plate counts are not unique per (date, recipe_id): {duplicate_keys} key(s) repeat, e.g. {sample}"
    )]
    JoinCardinality {
        duplicate_keys: usize,
        sample: String,
    },

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
