use crate::models::DAY;
use crate::processor::SchemaNormalizer;
use crate::processor::schema_normalizer::{days_since_epoch, has_column};
use crate::storage::read_table;
use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

const CHECK_SUFFIX: &str = "_ok";

/// Daily pass/fail flags produced outside the pipeline, one `*_ok` column per
/// rule. Flags are held as Boolean columns next to an optional `day` date.
#[derive(Debug, Clone)]
pub struct ComplianceChecks {
    frame: DataFrame,
}

impl ComplianceChecks {
    /// Returns `None` when the artifact has not been produced.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            info!("No compliance checks at {}", path.display());
            return Ok(None);
        }

        let df = read_table(path)?;
        Ok(Some(Self::from_frame(&df)?))
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut frame = df.clone();
        if has_column(&frame, DAY) {
            SchemaNormalizer.coerce_date_column(&mut frame, "compliance_checks", DAY)?;
        }

        let checks: Vec<String> = check_columns(&frame);
        for name in &checks {
            let text = frame.column(name)?.cast(&DataType::String)?;
            let flags: Vec<Option<bool>> =
                text.str()?.into_iter().map(|v| v.and_then(parse_flag)).collect();
            frame.with_column(Series::new(name.as_str().into(), flags))?;
        }

        let mut keep: Vec<Expr> = Vec::new();
        if has_column(&frame, DAY) {
            keep.push(col(DAY));
        }
        keep.extend(checks.iter().map(|name| col(name.as_str())));

        let frame = frame.lazy().select(keep).collect()?;
        Ok(ComplianceChecks { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn checks(&self) -> Vec<String> {
        check_columns(&self.frame)
    }

    /// Rows whose day falls within `[start, end]`. Without a readable day
    /// column nothing can be placed, so every row is kept.
    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> Result<ComplianceChecks> {
        let placeable = has_column(&self.frame, DAY)
            && self.frame.column(DAY)?.null_count() < self.frame.height();
        if !placeable {
            return Ok(self.clone());
        }

        let day = col(DAY).cast(DataType::Int32);
        let frame = self
            .frame
            .clone()
            .lazy()
            .filter(
                day.clone()
                    .gt_eq(lit(days_since_epoch(start)))
                    .and(day.lt_eq(lit(days_since_epoch(end)))),
            )
            .collect()?;

        Ok(ComplianceChecks { frame })
    }

    pub fn rows(&self) -> usize {
        self.frame.height()
    }

    /// Mean over check columns of each column's pass rate, in percent. Null
    /// flags are not scored.
    pub fn pass_rate(&self) -> Result<Option<f64>> {
        let checks = self.checks();
        if checks.is_empty() {
            return Ok(None);
        }

        let rates = self
            .frame
            .clone()
            .lazy()
            .select(
                checks
                    .iter()
                    .map(|name| col(name.as_str()).cast(DataType::Float64).mean())
                    .collect::<Vec<_>>(),
            )
            .collect()?;

        let mut scored = Vec::new();
        for name in &checks {
            if let Some(rate) = rates.column(name)?.f64()?.get(0) {
                scored.push(rate);
            }
        }

        if scored.is_empty() {
            return Ok(None);
        }
        Ok(Some(scored.iter().sum::<f64>() / scored.len() as f64 * 100.0))
    }
}

fn check_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.ends_with(CHECK_SUFFIX))
        .map(|name| name.to_string())
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}
