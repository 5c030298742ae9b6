use crate::config::GeneratorConfig;
use crate::models::*;
use crate::processor::schema_normalizer::{date_from_epoch_days, has_column};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::{info, warn};

/// Prepared/served/leftover for one scheduled meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedPlate {
    pub prepared: i64,
    pub served: i64,
    pub leftover: i64,
}

/// Synthesizes plausible plate counts from the menu and the census.
pub struct PlateCountGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl PlateCountGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        PlateCountGenerator { config, rng }
    }

    /// One plate-count row per menu row; expects a normalized menu.
    pub fn generate(&mut self, menu: &DataFrame, census: usize) -> Result<DataFrame> {
        let dates = menu.column(DATE)?.cast(&DataType::Int32)?;
        let ids = menu.column(RECIPE_ID)?.cast(&DataType::Int64)?;
        let meals = if has_column(menu, MEAL_TYPE) {
            Some(menu.column(MEAL_TYPE)?.cast(&DataType::String)?)
        } else {
            None
        };
        let meal_values: Vec<Option<&str>> = match &meals {
            Some(column) => column.str()?.into_iter().collect(),
            None => vec![None; menu.height()],
        };

        let mut out_dates = Vec::with_capacity(menu.height());
        let mut out_meals = Vec::with_capacity(menu.height());
        let mut out_ids = Vec::with_capacity(menu.height());
        let mut prepared = Vec::with_capacity(menu.height());
        let mut served = Vec::with_capacity(menu.height());
        let mut leftover = Vec::with_capacity(menu.height());
        let mut skipped = 0usize;

        let rows = dates
            .i32()?
            .into_iter()
            .zip(ids.i64()?.into_iter())
            .zip(meal_values);

        for ((date, recipe_id), meal) in rows {
            let (Some(days), Some(recipe_id)) = (date, recipe_id) else {
                skipped += 1;
                continue;
            };
            let Some(date) = date_from_epoch_days(days) else {
                skipped += 1;
                continue;
            };

            let meal = meal
                .map(|m| m.to_string())
                .unwrap_or_else(|| self.config.default_meal_type.clone());
            let plate = self.plate_for(date, &meal, census);

            out_dates.push(days);
            out_meals.push(meal);
            out_ids.push(recipe_id);
            prepared.push(plate.prepared);
            served.push(plate.served);
            leftover.push(plate.leftover);
        }

        if skipped > 0 {
            warn!("Skipped {} menu row(s) without a valid date or recipe_id", skipped);
        }

        let mut df = df!(
            DATE => out_dates.clone(),
            MEAL_TYPE => out_meals,
            RECIPE_ID => out_ids,
            PREPARED => prepared,
            SERVED => served,
            LEFTOVER => leftover
        )?;
        df.with_column(Series::new(DATE.into(), out_dates).cast(&DataType::Date)?)?;

        info!(
            "Generated {} plate counts for a census of {}",
            df.height(),
            census
        );

        Ok(df)
    }

    pub fn plate_for(&mut self, date: NaiveDate, meal_type: &str, census: usize) -> GeneratedPlate {
        let census = census as f64;
        let weekday = date.weekday().num_days_from_monday() as usize;

        let attendance = clamp(
            self.config.attendance_for(meal_type)
                + self.config.dow_attendance_adj[weekday]
                + self.normal(0.0, 0.015),
            0.75,
            0.98,
        );

        let jitter = self.config.overprep_jitter;
        let overprep = clamp(
            self.config.overprep_base + self.rng.gen_range(-jitter..=jitter),
            0.02,
            0.18,
        );

        let mut waste_target = clamp(
            self.rng
                .gen_range(self.config.waste_target_min..=self.config.waste_target_max)
                + self.normal(0.0, 0.005),
            0.02,
            0.20,
        );

        if self.rng.gen_bool(self.config.event_prob) {
            let event = self
                .rng
                .gen_range(self.config.event_waste_adj_min..=self.config.event_waste_adj_max);
            waste_target = clamp(waste_target + event, 0.01, 0.25);
        }

        let expected_diners = (census * attendance).round() as i64;
        let prepared = ((expected_diners as f64) * (1.0 + overprep)).round().max(0.0) as i64;

        let mut leftover = ((prepared as f64) * waste_target).round() as i64;
        leftover = leftover.clamp(0, prepared);
        let mut served = prepared - leftover;

        // Serving more than a few percent over the expected turnout is implausible.
        let ceiling = expected_diners + (0.05 * census) as i64;
        if served > ceiling {
            served = ceiling;
            leftover = prepared - served;
        }

        GeneratedPlate {
            prepared,
            served,
            leftover,
        }
    }

    // Box-Muller transform
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}
