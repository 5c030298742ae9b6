use crate::models::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

// 1970-01-01 counted from 0001-01-01, the offset polars `Date` values are stored against.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Brings every input table onto one schema: lowercase names, typed keys and
/// measures. Coercion never fails a value; anything unparseable becomes null.
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    pub fn normalize_table(&self, mut df: DataFrame, table: &str) -> Result<DataFrame> {
        self.normalize_column_names(&mut df)
            .with_context(|| format!("Failed to normalize column names of '{}'", table))?;

        if has_column(&df, DATE) {
            self.coerce_date_column(&mut df, table, DATE)?;
        }

        if has_column(&df, RECIPE_ID) {
            self.coerce_integer_column(&mut df, table, RECIPE_ID)?;
        }

        if has_column(&df, MEAL_TYPE) {
            self.normalize_meal_type(&mut df)?;
        }

        for quantity in PLATE_QUANTITIES {
            if has_column(&df, quantity) {
                self.coerce_integer_column(&mut df, table, quantity)?;
            }
        }

        for measure in std::iter::once(COST_PER_SERVING).chain(NUTRITION_FIELDS) {
            if has_column(&df, measure) {
                self.coerce_float_column(&mut df, table, measure)?;
            }
        }

        debug!(
            "Normalized '{}': {} rows, columns {:?}",
            table,
            df.height(),
            df.get_column_names()
        );

        Ok(df)
    }

    /// Trims and lowercases headers; inner whitespace runs become `_`.
    pub fn normalize_column_names(&self, df: &mut DataFrame) -> Result<()> {
        let whitespace = Regex::new(r"\s+")?;

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| {
                whitespace
                    .replace_all(name.as_str().trim(), "_")
                    .to_lowercase()
            })
            .collect();

        df.set_column_names(names)
            .context("Column names collide after normalization")?;

        Ok(())
    }

    pub fn coerce_date_column(&self, df: &mut DataFrame, table: &str, col_name: &str) -> Result<()> {
        let text = df.column(col_name)?.cast(&DataType::String)?;
        let values = text.str()?;

        let mut failed = 0usize;
        let days: Vec<Option<i32>> = values
            .into_iter()
            .map(|value| {
                let parsed = value.and_then(parse_date).map(days_since_epoch);
                if value.is_some_and(|v| !v.trim().is_empty()) && parsed.is_none() {
                    failed += 1;
                }
                parsed
            })
            .collect();

        report_failures(table, col_name, failed);

        let series = Series::new(col_name.into(), days).cast(&DataType::Date)?;
        df.with_column(series)?;

        Ok(())
    }

    pub fn coerce_integer_column(
        &self,
        df: &mut DataFrame,
        table: &str,
        col_name: &str,
    ) -> Result<()> {
        let text = df.column(col_name)?.cast(&DataType::String)?;
        let values = text.str()?;

        let mut failed = 0usize;
        let normalized: Vec<Option<i64>> = values
            .into_iter()
            .map(|value| {
                let parsed = value.and_then(parse_integer);
                if value.is_some_and(|v| !v.trim().is_empty()) && parsed.is_none() {
                    failed += 1;
                }
                parsed
            })
            .collect();

        report_failures(table, col_name, failed);

        df.with_column(Series::new(col_name.into(), normalized))?;

        Ok(())
    }

    pub fn coerce_float_column(&self, df: &mut DataFrame, table: &str, col_name: &str) -> Result<()> {
        let text = df.column(col_name)?.cast(&DataType::String)?;
        let values = text.str()?;

        let mut failed = 0usize;
        let normalized: Vec<Option<f64>> = values
            .into_iter()
            .map(|value| {
                let parsed = value.and_then(parse_float);
                if value.is_some_and(|v| !v.trim().is_empty()) && parsed.is_none() {
                    failed += 1;
                }
                parsed
            })
            .collect();

        report_failures(table, col_name, failed);

        df.with_column(Series::new(col_name.into(), normalized))?;

        Ok(())
    }

    fn normalize_meal_type(&self, df: &mut DataFrame) -> Result<()> {
        let text = df.column(MEAL_TYPE)?.cast(&DataType::String)?;
        let values = text.str()?;

        let normalized: Vec<Option<String>> = values
            .into_iter()
            .map(|value| {
                value
                    .map(|v| v.trim().to_lowercase())
                    .filter(|v| !v.is_empty())
            })
            .collect();

        df.with_column(Series::new(MEAL_TYPE.into(), normalized))?;

        Ok(())
    }
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Accepts plain dates and timestamps; the time of day is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(s, format) {
            return Some(timestamp.date());
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

fn clean_numeric(raw: &str) -> String {
    raw.replace(['$', ','], "").trim().to_string()
}

/// Whole numbers only: "7" and "7.0" parse, "7.5" does not.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = clean_numeric(raw);
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }

    let value = cleaned.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

pub fn parse_float(raw: &str) -> Option<f64> {
    clean_numeric(raw)
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn report_failures(table: &str, col_name: &str, failed: usize) {
    if failed > 0 {
        warn!(
            "{} value(s) in '{}.{}' could not be parsed and were set to null",
            failed, table, col_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_trimmed_and_lowercased() {
        let df = df!(
            " Recipe_ID " => ["7"],
            "Calories KCal" => ["300"],
            "DATE" => ["2024-01-01"]
        )
        .unwrap();

        let df = SchemaNormalizer.normalize_table(df, "recipes").unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        assert_eq!(names, vec!["recipe_id", "calories_kcal", "date"]);
    }

    #[test]
    fn test_colliding_names_are_an_error() {
        let df = df!("Date" => ["2024-01-01"], "date " => ["2024-01-02"]).unwrap();
        assert!(SchemaNormalizer.normalize_table(df, "menu").is_err());
    }

    #[test]
    fn test_recipe_id_coercion_is_fail_soft() {
        let df = df!("recipe_id" => ["7", " 12 ", "abc", "3.0", "4.5", ""]).unwrap();
        let df = SchemaNormalizer.normalize_table(df, "menu").unwrap();

        let ids: Vec<Option<i64>> = df
            .column("recipe_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(ids, vec![Some(7), Some(12), None, Some(3), None, None]);
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let df = df!("recipe_id" => [Some(5i64), None]).unwrap();
        let df = SchemaNormalizer.normalize_table(df, "menu").unwrap();

        assert_eq!(df.column("recipe_id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("recipe_id").unwrap().i64().unwrap().get(0), Some(5));
        assert_eq!(df.column("recipe_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_date_coercion() {
        let df = df!(
            "date" => ["2024-01-01", "2024-01-02 08:30:00", "01/03/2024", "not a date"]
        )
        .unwrap();
        let df = SchemaNormalizer.normalize_table(df, "plate_counts").unwrap();

        let column = df.column("date").unwrap();
        assert_eq!(column.dtype(), &DataType::Date);

        let days: Vec<Option<NaiveDate>> = column
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .map(|d| d.and_then(date_from_epoch_days))
            .collect();

        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1),
                NaiveDate::from_ymd_opt(2024, 1, 2),
                NaiveDate::from_ymd_opt(2024, 1, 3),
                None,
            ]
        );
    }

    #[test]
    fn test_measures_and_meal_type() {
        let df = df!(
            "estimated_cost_per_serving_usd" => ["$2.50", "1,200.75", "n/a"],
            "prepared" => ["20", "x", "0"],
            "meal_type" => [" Lunch ", "", "DINNER"]
        )
        .unwrap();
        let df = SchemaNormalizer.normalize_table(df, "recipes").unwrap();

        let cost: Vec<Option<f64>> = df
            .column(COST_PER_SERVING)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(cost, vec![Some(2.5), Some(1200.75), None]);

        let prepared: Vec<Option<i64>> = df
            .column(PREPARED)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(prepared, vec![Some(20), None, Some(0)]);

        let meals: Vec<Option<&str>> = df
            .column(MEAL_TYPE)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(meals, vec![Some("lunch"), None, Some("dinner")]);
    }

    #[test]
    fn test_epoch_round_trip_anchor() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);
        assert_eq!(date_from_epoch_days(19723), NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
