use crate::models::*;
use crate::processor::SchemaNormalizer;
use crate::processor::schema_normalizer::{date_from_epoch_days, days_since_epoch, has_column};
use crate::storage::read_table;
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

/// The daily summary artifact as the report reads it: `day` as a date and
/// every other column as Float64.
#[derive(Debug, Clone)]
pub struct DailyView {
    frame: DataFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub residents: usize,
    pub avg_cost_per_resident_day: Option<f64>,
    /// Already scaled to percent.
    pub avg_waste_pct: Option<f64>,
    pub days_in_view: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WasteRow {
    pub day: NaiveDate,
    pub prepared: Option<f64>,
    pub served: Option<f64>,
    pub leftover: Option<f64>,
    pub waste_pct: Option<f64>,
}

impl DailyView {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!(
                "{} not found; run `meal-pipeline run` first to generate the daily summary",
                path.display()
            ));
        }

        let df = read_table(path)?;
        Self::from_frame(&df).with_context(|| format!("Unreadable daily summary {}", path.display()))
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        if !has_column(df, DAY) {
            return Err(anyhow!("daily summary has no '{}' column", DAY));
        }

        let mut df = df.clone();
        SchemaNormalizer.coerce_date_column(&mut df, "daily_summary", DAY)?;

        let columns: Vec<Expr> = df
            .get_column_names()
            .iter()
            .map(|name| match name.as_str() {
                DAY => col(DAY),
                other => col(other).cast(DataType::Float64),
            })
            .collect();

        // Rows whose day cannot be read are not reportable.
        let frame = df
            .lazy()
            .select(columns)
            .filter(col(DAY).is_not_null())
            .collect()?;

        Ok(DailyView { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        has_column(&self.frame, name)
    }

    pub fn days(&self) -> Result<Vec<NaiveDate>> {
        let days = self.frame.column(DAY)?.cast(&DataType::Int32)?;
        Ok(days
            .i32()?
            .into_iter()
            .flatten()
            .filter_map(date_from_epoch_days)
            .collect())
    }

    /// Values of a metric column aligned with `days()`, None when absent.
    pub fn column(&self, name: &str) -> Result<Option<Vec<Option<f64>>>> {
        if !self.has_column(name) {
            return Ok(None);
        }
        let values = self.frame.column(name)?.f64()?.into_iter().collect();
        Ok(Some(values))
    }

    pub fn date_bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let bounds = self
            .frame
            .clone()
            .lazy()
            .select([
                col(DAY).cast(DataType::Int32).min().alias("first"),
                col(DAY).cast(DataType::Int32).max().alias("last"),
            ])
            .collect()?;

        let first = bounds.column("first")?.i32()?.get(0);
        let last = bounds.column("last")?.i32()?.get(0);
        Ok(first
            .and_then(date_from_epoch_days)
            .zip(last.and_then(date_from_epoch_days)))
    }

    /// Keeps days within `[start, end]`; an open bound is unbounded.
    pub fn filter_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DailyView> {
        let day = col(DAY).cast(DataType::Int32);
        let mut predicate = lit(true);
        if let Some(start) = start {
            predicate = predicate.and(day.clone().gt_eq(lit(days_since_epoch(start))));
        }
        if let Some(end) = end {
            predicate = predicate.and(day.lt_eq(lit(days_since_epoch(end))));
        }

        let frame = self.frame.clone().lazy().filter(predicate).collect()?;
        Ok(DailyView { frame })
    }

    pub fn kpis(&self, residents: usize) -> Result<Kpis> {
        Ok(Kpis {
            residents,
            avg_cost_per_resident_day: self.column_mean(COST_PER_RESIDENT_DAY)?,
            avg_waste_pct: self.column_mean(WASTE_PCT)?.map(|ratio| ratio * 100.0),
            days_in_view: self.len(),
        })
    }

    /// Mean of the non-null values, None when the column is absent or empty.
    pub fn column_mean(&self, name: &str) -> Result<Option<f64>> {
        if !self.has_column(name) {
            return Ok(None);
        }
        let out = self
            .frame
            .clone()
            .lazy()
            .select([col(name).mean()])
            .collect()?;
        Ok(out.column(name)?.f64()?.get(0))
    }

    /// count/mean/std/min/max per nutrition column, std with one degree of
    /// freedom.
    pub fn nutrition_stats(&self) -> Result<Vec<ColumnStats>> {
        let mut stats = Vec::new();
        for name in NUTRITION_FIELDS {
            if !self.has_column(name) {
                continue;
            }

            let out = self
                .frame
                .clone()
                .lazy()
                .select([
                    col(name).count().cast(DataType::Int64).alias("count"),
                    col(name).mean().alias("mean"),
                    col(name).std(1).alias("std"),
                    col(name).min().alias("min"),
                    col(name).max().alias("max"),
                ])
                .collect()?;

            let stat = |field: &str| -> Result<Option<f64>> {
                Ok(out.column(field)?.cast(&DataType::Float64)?.f64()?.get(0))
            };

            stats.push(ColumnStats {
                column: name.to_string(),
                count: out.column("count")?.i64()?.get(0).unwrap_or(0) as usize,
                mean: stat("mean")?,
                std: stat("std")?,
                min: stat("min")?,
                max: stat("max")?,
            });
        }
        Ok(stats)
    }

    /// Waste per day with `waste_pct` in percent, one decimal. None when the
    /// summary carries no waste ratio.
    pub fn waste_table(&self) -> Result<Option<Vec<WasteRow>>> {
        if !self.has_column(WASTE_PCT) {
            return Ok(None);
        }

        let quantity = |name: &str| {
            if self.has_column(name) {
                col(name)
            } else {
                lit(NULL).cast(DataType::Float64).alias(name)
            }
        };

        let table = self
            .frame
            .clone()
            .lazy()
            .select([
                col(DAY).cast(DataType::Int32),
                quantity(PREPARED),
                quantity(SERVED),
                quantity(LEFTOVER),
                (col(WASTE_PCT) * lit(100.0)).alias(WASTE_PCT),
            ])
            .collect()?;

        let days = table.column(DAY)?.i32()?;
        let prepared = table.column(PREPARED)?.f64()?;
        let served = table.column(SERVED)?.f64()?;
        let leftover = table.column(LEFTOVER)?.f64()?;
        let waste = table.column(WASTE_PCT)?.f64()?;

        let rows = (0..table.height())
            .filter_map(|i| {
                let day = days.get(i).and_then(date_from_epoch_days)?;
                Some(WasteRow {
                    day,
                    prepared: prepared.get(i),
                    served: served.get(i),
                    leftover: leftover.get(i),
                    waste_pct: waste.get(i).map(|pct| (pct * 10.0).round() / 10.0),
                })
            })
            .collect();

        Ok(Some(rows))
    }
}
