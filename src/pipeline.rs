use crate::config::{JoinOptions, PipelineConfig};
use crate::models::*;
use crate::processor::{DailyAggregator, JoinEngine, MetricDeriver, SchemaNormalizer, has_column};
use crate::storage::{RawTables, TableStore};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

pub fn normalize_tables(raw: RawTables) -> Result<NormalizedTables> {
    let normalizer = SchemaNormalizer;

    Ok(NormalizedTables {
        residents: normalizer.normalize_table(raw.residents, "residents")?,
        recipes: normalizer.normalize_table(raw.recipes, "recipes")?,
        menu: normalizer.normalize_table(raw.menu, "menu")?,
        plate_counts: normalizer.normalize_table(raw.plate_counts, "plate_counts")?,
        standards: raw
            .standards
            .map(|df| normalizer.normalize_table(df, "standards"))
            .transpose()?,
    })
}

/// Join, derive and aggregate already-normalized tables. No I/O.
pub fn run_tables(
    tables: &NormalizedTables,
    options: &JoinOptions,
) -> Result<(MealDetail, DailySummary)> {
    let joined = JoinEngine::new(options.clone()).build_detail(
        &tables.menu,
        &tables.recipes,
        &tables.plate_counts,
    )?;
    let detail = MetricDeriver.derive(joined)?;
    let daily = DailyAggregator::new(tables.resident_count()).aggregate(&detail)?;

    Ok((detail, daily))
}

/// Full batch run: load, normalize, join, derive, aggregate, write.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate()?;

    let raw = TableStore::load_inputs(config)?;
    let tables = normalize_tables(raw)?;
    info!("Normalized all input tables");

    let (detail, daily) = run_tables(&tables, &config.join)?;

    let unmatched_menu_rows = rows_without_plate_counts(&detail)?;

    let detail_path = if config.output.write_detail {
        let mut frame = detail.frame().clone();
        let path = config.detail_path();
        Some(
            TableStore::write_table(&mut frame, &path, config.output.format)
                .context("Failed to write meal detail")?,
        )
    } else {
        None
    };

    let days = daily.height();
    let mut summary_frame = daily.into_frame();
    let output_path = TableStore::write_table(
        &mut summary_frame,
        &config.summary_path(),
        config.output.format,
    )
    .context("Failed to write daily summary")?;

    Ok(RunSummary {
        resident_count: tables.resident_count(),
        menu_rows: tables.menu.height(),
        plate_count_rows: tables.plate_counts.height(),
        detail_rows: detail.height(),
        unmatched_menu_rows,
        days,
        standards_rows: tables.standards.as_ref().map(|df| df.height()),
        output_path,
        detail_path,
    })
}

/// Meal rows where every plate quantity is null, i.e. no plate count matched.
/// Zero when the detail carries no plate quantities at all.
pub fn rows_without_plate_counts(detail: &MealDetail) -> Result<usize> {
    let present: Vec<&str> = PLATE_QUANTITIES
        .into_iter()
        .filter(|name| has_column(detail.frame(), name))
        .collect();
    if present.is_empty() {
        return Ok(0);
    }

    let predicate = present
        .into_iter()
        .fold(lit(true), |acc, name| acc.and(col(name).is_null()));

    let unmatched = detail.frame().clone().lazy().filter(predicate).collect()?;
    Ok(unmatched.height())
}
