use crate::models::*;
use crate::processor::metric_deriver::waste_ratio_expr;
use crate::processor::schema_normalizer::has_column;
use anyhow::Result;
use polars::prelude::*;
use tracing::{info, warn};

/// Rolls meal detail up to one row per calendar day.
pub struct DailyAggregator {
    resident_count: usize,
}

impl DailyAggregator {
    pub fn new(resident_count: usize) -> Self {
        if resident_count == 0 {
            warn!("Resident roster is empty; per-resident-day cost uses a census of 1");
        }
        DailyAggregator { resident_count }
    }

    /// Census used as divisor, never zero.
    pub fn census(&self) -> f64 {
        self.resident_count.max(1) as f64
    }

    pub fn aggregate(&self, detail: &MealDetail) -> Result<DailySummary> {
        let df = detail.frame();

        let summed: Vec<&str> = NUTRITION_FIELDS
            .into_iter()
            .chain(PLATE_QUANTITIES)
            .chain(std::iter::once(COST_SERVED))
            .filter(|name| has_column(df, name))
            .collect();

        let undated = df.column(DATE)?.null_count();
        if undated > 0 {
            warn!("Dropping {} meal row(s) without a valid date from the daily summary", undated);
        }

        let mut daily = df
            .clone()
            .lazy()
            .filter(col(DATE).is_not_null())
            .group_by([col(DATE).alias(DAY)])
            .agg(summed.iter().map(|name| col(*name).sum()).collect::<Vec<_>>());

        let mut derived = Vec::new();
        if has_column(df, PREPARED) && has_column(df, LEFTOVER) {
            derived.push(waste_ratio_expr(col(LEFTOVER), col(PREPARED)).alias(WASTE_PCT));
        }
        if has_column(df, COST_SERVED) {
            derived.push(
                (col(COST_SERVED).cast(DataType::Float64) / lit(self.census()))
                    .alias(COST_PER_RESIDENT_DAY),
            );
        }
        if !derived.is_empty() {
            daily = daily.with_columns(derived);
        }

        // Column order is part of the artifact contract.
        let mut ordered = vec![col(DAY)];
        ordered.extend(summed.iter().map(|name| col(*name)));
        if has_column(df, PREPARED) && has_column(df, LEFTOVER) {
            ordered.push(col(WASTE_PCT));
        }
        if has_column(df, COST_SERVED) {
            ordered.push(col(COST_PER_RESIDENT_DAY));
        }

        let daily = daily
            .select(ordered)
            .sort([DAY], SortMultipleOptions::default())
            .collect()?;

        info!(
            "Aggregated {} meal rows into {} days",
            df.height() - undated,
            daily.height()
        );

        Ok(DailySummary(daily))
    }
}
