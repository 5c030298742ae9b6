use crate::models::*;
use crate::processor::schema_normalizer::has_column;
use anyhow::Result;
use polars::prelude::*;
use tracing::{info, warn};

pub struct MetricDeriver;

impl MetricDeriver {
    /// Adds `cost_served` and `waste_pct` to each joined meal. A metric whose
    /// input columns are absent is left out of the detail.
    pub fn derive(&self, joined: JoinedMeals) -> Result<MealDetail> {
        let df = joined.into_frame();
        let mut metrics = Vec::new();

        if has_column(&df, COST_PER_SERVING) && has_column(&df, SERVED) {
            metrics.push(cost_served_expr(col(COST_PER_SERVING), col(SERVED)));
        } else {
            warn!("Skipping {}: needs {} and {}", COST_SERVED, COST_PER_SERVING, SERVED);
        }

        if has_column(&df, LEFTOVER) && has_column(&df, PREPARED) {
            metrics.push(waste_ratio_expr(col(LEFTOVER), col(PREPARED)).alias(WASTE_PCT));
        } else {
            warn!("Skipping {}: needs {} and {}", WASTE_PCT, LEFTOVER, PREPARED);
        }

        if metrics.is_empty() {
            return Ok(MealDetail(df));
        }

        let detail = df.lazy().with_columns(metrics).collect()?;
        info!("Derived metrics for {} meal rows", detail.height());

        Ok(MealDetail(detail))
    }
}

fn cost_served_expr(cost_per_serving: Expr, served: Expr) -> Expr {
    (cost_per_serving.cast(DataType::Float64) * served.cast(DataType::Float64)).alias(COST_SERVED)
}

/// `leftover / prepared`, null unless `prepared > 0`. Shared by the meal and
/// day levels.
pub fn waste_ratio_expr(leftover: Expr, prepared: Expr) -> Expr {
    when(prepared.clone().gt(lit(0)))
        .then(leftover.cast(DataType::Float64) / prepared.cast(DataType::Float64))
        .otherwise(lit(NULL).cast(DataType::Float64))
}
