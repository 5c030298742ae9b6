use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DATE: &str = "date";
pub const DAY: &str = "day";
pub const RECIPE_ID: &str = "recipe_id";
pub const MEAL_TYPE: &str = "meal_type";
pub const RECIPE_MEAL_TYPE: &str = "recipe_meal_type";
pub const MENU_MEAL_TYPE: &str = "menu_meal_type";
pub const PLATE_MEAL_TYPE: &str = "plate_meal_type";

pub const COST_PER_SERVING: &str = "estimated_cost_per_serving_usd";
pub const PREPARED: &str = "prepared";
pub const SERVED: &str = "served";
pub const LEFTOVER: &str = "leftover";
pub const COST_SERVED: &str = "cost_served";
pub const WASTE_PCT: &str = "waste_pct";
pub const COST_PER_RESIDENT_DAY: &str = "approx_cost_per_resident_day_usd";

pub const NUTRITION_FIELDS: [&str; 6] = [
    "calories_kcal",
    "protein_g",
    "carbs_g",
    "fat_g",
    "sodium_mg",
    "fiber_g",
];

pub const PLATE_QUANTITIES: [&str; 3] = [PREPARED, SERVED, LEFTOVER];

/// The five input tables after column names and types have been normalized.
#[derive(Debug, Clone)]
pub struct NormalizedTables {
    pub residents: DataFrame,
    pub recipes: DataFrame,
    pub menu: DataFrame,
    pub plate_counts: DataFrame,
    pub standards: Option<DataFrame>,
}

impl NormalizedTables {
    /// Census used as the per-resident-day denominator.
    pub fn resident_count(&self) -> usize {
        self.residents.height()
    }
}

/// Menu rows joined with their recipe and plate count, before metrics.
#[derive(Debug, Clone)]
pub struct JoinedMeals(pub DataFrame);

/// One row per scheduled meal with `cost_served` and `waste_pct` attached.
#[derive(Debug, Clone)]
pub struct MealDetail(pub DataFrame);

/// One row per calendar day. This is the artifact the dashboard reads.
#[derive(Debug, Clone)]
pub struct DailySummary(pub DataFrame);

macro_rules! frame_accessors {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                pub fn frame(&self) -> &DataFrame {
                    &self.0
                }

                pub fn into_frame(self) -> DataFrame {
                    self.0
                }

                pub fn height(&self) -> usize {
                    self.0.height()
                }
            }
        )*
    };
}

frame_accessors!(JoinedMeals, MealDetail, DailySummary);

/// What a pipeline run did, logged at the end and returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub resident_count: usize,
    pub menu_rows: usize,
    pub plate_count_rows: usize,
    pub detail_rows: usize,
    pub unmatched_menu_rows: usize,
    pub days: usize,
    pub standards_rows: Option<usize>,
    pub output_path: PathBuf,
    pub detail_path: Option<PathBuf>,
}
