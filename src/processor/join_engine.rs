use crate::config::JoinOptions;
use crate::error::PipelineError;
use crate::models::*;
use crate::processor::schema_normalizer::{date_from_epoch_days, has_column};
use anyhow::Result;
use polars::prelude::*;
use tracing::{info, warn};

// How many offending keys a cardinality error spells out.
const DUPLICATE_SAMPLE: usize = 5;

const PLATE_MATCHED: &str = "plate_matched";
const MEAL_TYPE_CONFLICT: &str = "meal_type_conflict";

/// Merges menu, recipe and plate-count tables into one row per scheduled meal.
///
/// Every column that could collide across inputs is renamed before it enters a
/// join, so the output schema never depends on join suffixes:
///
/// * recipe `meal_type` joins as `recipe_meal_type` and only fills gaps in the
///   menu's value;
/// * plate `meal_type` joins as `plate_meal_type`. It fills a null detail
///   value and, with `match_meal_type`, detaches a plate count whose non-null
///   value disagrees with the detail's.
///
/// Plate counts always join on `(date, recipe_id)`, which `ensure_many_to_one`
/// keeps unique, so a null `meal_type` on either side never loses a match.
pub struct JoinEngine {
    options: JoinOptions,
}

impl JoinEngine {
    pub fn new(options: JoinOptions) -> Self {
        JoinEngine { options }
    }

    pub fn build_detail(
        &self,
        menu: &DataFrame,
        recipes: &DataFrame,
        plate_counts: &DataFrame,
    ) -> Result<JoinedMeals> {
        require_columns(menu, "menu", &[DATE, RECIPE_ID])?;
        require_columns(recipes, "recipes", &[RECIPE_ID])?;
        require_columns(plate_counts, "plate_counts", &[DATE, RECIPE_ID])?;

        let menu_detail = self.join_menu_recipes(menu, recipes)?;
        info!(
            "Joined {} menu rows with {} recipes",
            menu_detail.height(),
            recipes.height()
        );

        let plates = self.backfill_plate_meal_type(plate_counts, &menu_detail)?;
        ensure_many_to_one(&plates)?;

        let joined = self.join_plate_counts(menu_detail, plates)?;
        Ok(JoinedMeals(joined))
    }

    /// Left join of menu onto recipes with `meal_type` resolved menu-first.
    pub fn join_menu_recipes(&self, menu: &DataFrame, recipes: &DataFrame) -> Result<DataFrame> {
        warn_on_duplicate_recipes(recipes)?;

        let menu_has_meal = has_column(menu, MEAL_TYPE);
        let recipe_has_meal = has_column(recipes, MEAL_TYPE);

        let mut menu_cols = vec![col(DATE), col(RECIPE_ID)];
        if menu_has_meal {
            menu_cols.push(col(MEAL_TYPE));
        }

        let recipe_measures: Vec<&str> = std::iter::once(COST_PER_SERVING)
            .chain(NUTRITION_FIELDS)
            .filter(|name| has_column(recipes, name))
            .collect();

        let mut recipe_cols = vec![col(RECIPE_ID)];
        if recipe_has_meal {
            recipe_cols.push(col(MEAL_TYPE).alias(RECIPE_MEAL_TYPE));
        }
        recipe_cols.extend(recipe_measures.iter().map(|name| col(*name)));

        let joined = menu
            .clone()
            .lazy()
            .select(menu_cols)
            .join(
                recipes.clone().lazy().select(recipe_cols),
                [col(RECIPE_ID)],
                [col(RECIPE_ID)],
                JoinArgs::new(JoinType::Left),
            );

        let mut output = vec![col(DATE), col(RECIPE_ID)];
        match (menu_has_meal, recipe_has_meal) {
            (true, true) => output.push(
                col(MEAL_TYPE)
                    .fill_null(col(RECIPE_MEAL_TYPE))
                    .alias(MEAL_TYPE),
            ),
            (true, false) => output.push(col(MEAL_TYPE)),
            (false, true) => output.push(col(RECIPE_MEAL_TYPE).alias(MEAL_TYPE)),
            (false, false) => {}
        }
        output.extend(recipe_measures.iter().map(|name| col(*name)));

        Ok(joined.select(output).collect()?)
    }

    /// Fills plate-count `meal_type` from the (date, recipe_id) mapping of the
    /// menu rows when the column is missing or has nulls. Given the resolved
    /// menu detail, recipe-supplied meal types take part too. Plates are
    /// returned untouched when they already carry a complete `meal_type`, or
    /// when the menu has none.
    pub fn backfill_plate_meal_type(
        &self,
        plate_counts: &DataFrame,
        menu: &DataFrame,
    ) -> Result<DataFrame> {
        let plate_has_meal = has_column(plate_counts, MEAL_TYPE);
        let nulls = if plate_has_meal {
            plate_counts.column(MEAL_TYPE)?.null_count()
        } else {
            plate_counts.height()
        };

        if nulls == 0 && plate_has_meal {
            return Ok(plate_counts.clone());
        }

        if !has_column(menu, MEAL_TYPE) {
            warn!("Plate-count meal_type is incomplete and the menu has none to backfill from");
            return Ok(plate_counts.clone());
        }

        if plate_has_meal && nulls < plate_counts.height() {
            info!("Filling {} null plate-count meal_type value(s) from the menu", nulls);
        } else {
            info!("Backfilling plate-count meal_type from the menu");
        }

        // One meal_type per (date, recipe_id); the first scheduled one wins so
        // the backfill join can never add plate rows.
        let mapping = menu
            .clone()
            .lazy()
            .filter(col(MEAL_TYPE).is_not_null())
            .group_by_stable([col(DATE), col(RECIPE_ID)])
            .agg([col(MEAL_TYPE).first().alias(MENU_MEAL_TYPE)]);

        let passthrough: Vec<Expr> = plate_counts
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != MEAL_TYPE)
            .map(|name| col(name.as_str()))
            .collect();

        let resolved = if plate_has_meal {
            col(MEAL_TYPE).fill_null(col(MENU_MEAL_TYPE)).alias(MEAL_TYPE)
        } else {
            col(MENU_MEAL_TYPE).alias(MEAL_TYPE)
        };

        let mut output = passthrough;
        output.push(resolved);

        let backfilled = plate_counts
            .clone()
            .lazy()
            .join(
                mapping,
                [col(DATE), col(RECIPE_ID)],
                [col(DATE), col(RECIPE_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .select(output)
            .collect()?;

        Ok(backfilled)
    }

    fn join_plate_counts(&self, menu_detail: DataFrame, plates: DataFrame) -> Result<DataFrame> {
        let detail_has_meal = has_column(&menu_detail, MEAL_TYPE);
        let plate_has_meal = has_column(&plates, MEAL_TYPE);
        let keys = [col(DATE), col(RECIPE_ID)];

        let quantities: Vec<&str> = PLATE_QUANTITIES
            .into_iter()
            .filter(|name| has_column(&plates, name))
            .collect();
        for missing in PLATE_QUANTITIES.iter().filter(|name| !quantities.contains(name)) {
            warn!("Plate counts have no '{}' column; dependent metrics are skipped", missing);
        }

        let mut plate_cols = keys.to_vec();
        if plate_has_meal {
            plate_cols.push(col(MEAL_TYPE).alias(PLATE_MEAL_TYPE));
        }
        plate_cols.extend(quantities.iter().map(|name| col(*name)));

        // Non-null after the join only where a menu row found its plate count.
        plate_cols.push(lit(true).alias(PLATE_MATCHED));

        let plate_rows = plates.height();
        let mut joined = menu_detail
            .lazy()
            .join(
                plates.lazy().select(plate_cols),
                keys.clone(),
                keys,
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;

        if self.options.match_meal_type && detail_has_meal && plate_has_meal {
            joined = detach_conflicting_meal_types(joined, &quantities)?;
        }

        let marker = joined.column(PLATE_MATCHED)?;
        let matched = marker.len() - marker.null_count();
        let unmatched = joined.height() - matched;
        if unmatched > 0 {
            warn!("{} menu row(s) have no matching plate count", unmatched);
        }
        if plate_rows > matched {
            warn!(
                "{} plate-count row(s) did not match any menu row",
                plate_rows - matched
            );
        }

        let mut output: Vec<Expr> = joined
            .get_column_names()
            .iter()
            .map(|name| name.as_str())
            .filter(|name| *name != PLATE_MATCHED && *name != PLATE_MEAL_TYPE)
            .map(|name| {
                if name == MEAL_TYPE && plate_has_meal {
                    col(MEAL_TYPE).fill_null(col(PLATE_MEAL_TYPE)).alias(MEAL_TYPE)
                } else {
                    col(name)
                }
            })
            .collect();
        if !detail_has_meal && plate_has_meal {
            output.push(col(PLATE_MEAL_TYPE).alias(MEAL_TYPE));
        }

        let detail = joined
            .lazy()
            .select(output)
            .sort(
                [DATE, RECIPE_ID],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;

        Ok(detail)
    }
}

/// Nulls the plate quantities of rows whose detail and plate `meal_type` are
/// both present and differ. Such rows count as unmatched.
fn detach_conflicting_meal_types(joined: DataFrame, quantities: &[&str]) -> Result<DataFrame> {
    let conflict = col(MEAL_TYPE)
        .is_not_null()
        .and(col(PLATE_MEAL_TYPE).is_not_null())
        .and(col(MEAL_TYPE).neq(col(PLATE_MEAL_TYPE)));

    let flagged = joined
        .lazy()
        .with_column(conflict.alias(MEAL_TYPE_CONFLICT))
        .collect()?;

    let conflicts = flagged
        .column(MEAL_TYPE_CONFLICT)?
        .bool()?
        .into_iter()
        .filter(|flag| *flag == Some(true))
        .count();
    if conflicts == 0 {
        return Ok(flagged.drop(MEAL_TYPE_CONFLICT)?);
    }
    warn!(
        "{} plate count(s) recorded under a different meal_type than the menu; left unmatched",
        conflicts
    );

    let mut detached = Vec::new();
    for name in quantities.iter().copied().chain([PLATE_MATCHED, PLATE_MEAL_TYPE]) {
        let dtype = flagged.column(name)?.dtype().clone();
        detached.push(
            when(col(MEAL_TYPE_CONFLICT))
                .then(lit(NULL).cast(dtype))
                .otherwise(col(name))
                .alias(name),
        );
    }

    let detached = flagged
        .lazy()
        .with_columns(detached)
        .collect()?
        .drop(MEAL_TYPE_CONFLICT)?;
    Ok(detached)
}

impl Default for JoinEngine {
    fn default() -> Self {
        Self::new(JoinOptions::default())
    }
}

fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    for column in columns {
        if !has_column(df, column) {
            return Err(PipelineError::missing_column(table, column).into());
        }
    }
    Ok(())
}

/// Each (date, recipe_id) may appear on at most one plate-count row. Rows with a
/// null key cannot match anything and are not counted.
pub fn ensure_many_to_one(plates: &DataFrame) -> Result<()> {
    let duplicates = plates
        .clone()
        .lazy()
        .filter(col(DATE).is_not_null().and(col(RECIPE_ID).is_not_null()))
        .group_by([col(DATE), col(RECIPE_ID)])
        .agg([len().alias("rows")])
        .filter(col("rows").gt(lit(1)))
        .select([
            col(DATE).cast(DataType::Int32),
            col(RECIPE_ID).cast(DataType::Int64),
            col("rows").cast(DataType::Int64),
        ])
        .sort([DATE, RECIPE_ID], SortMultipleOptions::default())
        .collect()?;

    if duplicates.height() == 0 {
        return Ok(());
    }

    let dates = duplicates.column(DATE)?.i32()?;
    let ids = duplicates.column(RECIPE_ID)?.i64()?;
    let rows = duplicates.column("rows")?.i64()?;

    let sample = dates
        .into_iter()
        .zip(ids.into_iter())
        .zip(rows.into_iter())
        .take(DUPLICATE_SAMPLE)
        .filter_map(|((date, recipe_id), rows)| {
            let day = date.and_then(date_from_epoch_days)?;
            Some(format!("({}, {}) x{}", day, recipe_id?, rows?))
        })
        .collect::<Vec<_>>()
        .join(", ");

    Err(PipelineError::JoinCardinality {
        duplicate_keys: duplicates.height(),
        sample,
    }
    .into())
}

fn warn_on_duplicate_recipes(recipes: &DataFrame) -> Result<()> {
    let repeated = recipes
        .clone()
        .lazy()
        .filter(col(RECIPE_ID).is_not_null())
        .group_by([col(RECIPE_ID)])
        .agg([len().alias("rows")])
        .filter(col("rows").gt(lit(1)))
        .collect()?
        .height();

    if repeated > 0 {
        warn!(
            "{} recipe_id value(s) appear more than once in recipes; matching menu rows will repeat",
            repeated
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::SchemaNormalizer;

    fn normalized(df: DataFrame, table: &str) -> DataFrame {
        SchemaNormalizer.normalize_table(df, table).unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_menu_meal_type_wins_over_recipe() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["1", "2"],
                "meal_type" => [Some("breakfast"), None]
            )
            .unwrap(),
            "menu",
        );
        let recipes = normalized(
            df!(
                "recipe_id" => ["1", "2"],
                "meal_type" => ["dinner", "lunch"],
                "calories_kcal" => ["100", "200"]
            )
            .unwrap(),
            "recipes",
        );

        let engine = JoinEngine::default();
        let joined = engine.join_menu_recipes(&menu, &recipes).unwrap();

        assert!(!has_column(&joined, RECIPE_MEAL_TYPE));
        assert_eq!(
            strings(&joined, MEAL_TYPE),
            vec![Some("breakfast".to_string()), Some("lunch".to_string())]
        );
    }

    #[test]
    fn test_recipe_meal_type_used_when_menu_has_none() {
        let menu = normalized(
            df!("date" => ["2024-01-01"], "recipe_id" => ["3"]).unwrap(),
            "menu",
        );
        let recipes = normalized(
            df!("recipe_id" => ["3"], "meal_type" => ["Dinner"]).unwrap(),
            "recipes",
        );

        let joined = JoinEngine::default()
            .join_menu_recipes(&menu, &recipes)
            .unwrap();
        assert_eq!(strings(&joined, MEAL_TYPE), vec![Some("dinner".to_string())]);
    }

    #[test]
    fn test_backfill_meal_type_from_menu() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["5", "6"],
                "meal_type" => ["lunch", "dinner"]
            )
            .unwrap(),
            "menu",
        );
        let recipes = normalized(
            df!("recipe_id" => ["5", "6"], "calories_kcal" => ["500", "600"]).unwrap(),
            "recipes",
        );
        let plates = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["5", "6"],
                "prepared" => ["10", "12"],
                "served" => ["9", "10"],
                "leftover" => ["1", "2"]
            )
            .unwrap(),
            "plate_counts",
        );

        let joined = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap();
        let detail = joined.frame();

        assert_eq!(detail.height(), 2);
        assert_eq!(
            strings(detail, MEAL_TYPE),
            vec![Some("lunch".to_string()), Some("dinner".to_string())]
        );
        let prepared: Vec<Option<i64>> = detail
            .column(PREPARED)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(prepared, vec![Some(10), Some(12)]);
    }

    #[test]
    fn test_fully_null_plate_meal_type_is_backfilled() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["5"],
                "meal_type" => ["lunch"]
            )
            .unwrap(),
            "menu",
        );
        let plates = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["5"],
                "meal_type" => [None::<&str>],
                "prepared" => ["10"]
            )
            .unwrap(),
            "plate_counts",
        );

        let backfilled = JoinEngine::default()
            .backfill_plate_meal_type(&plates, &menu)
            .unwrap();
        assert_eq!(strings(&backfilled, MEAL_TYPE), vec![Some("lunch".to_string())]);
        assert_eq!(backfilled.height(), 1);
    }

    fn ints(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name).unwrap().i64().unwrap().into_iter().collect()
    }

    fn single_plate() -> DataFrame {
        normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["7"],
                "prepared" => ["20"],
                "served" => ["18"],
                "leftover" => ["2"]
            )
            .unwrap(),
            "plate_counts",
        )
    }

    fn menu_without_meal_type() -> DataFrame {
        normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["7"],
                "meal_type" => [None::<&str>]
            )
            .unwrap(),
            "menu",
        )
    }

    #[test]
    fn test_null_menu_meal_type_still_matches_plate_count() {
        let recipes = normalized(
            df!("recipe_id" => ["7"], "calories_kcal" => ["300"]).unwrap(),
            "recipes",
        );

        let joined = JoinEngine::default()
            .build_detail(&menu_without_meal_type(), &recipes, &single_plate())
            .unwrap();
        let detail = joined.frame();

        assert_eq!(detail.height(), 1);
        assert_eq!(ints(detail, PREPARED), vec![Some(20)]);
        assert_eq!(ints(detail, SERVED), vec![Some(18)]);
        assert_eq!(ints(detail, LEFTOVER), vec![Some(2)]);
        assert_eq!(strings(detail, MEAL_TYPE), vec![None]);
    }

    #[test]
    fn test_recipe_meal_type_backfills_plate_and_matches() {
        let recipes = normalized(
            df!("recipe_id" => ["7"], "meal_type" => ["breakfast"]).unwrap(),
            "recipes",
        );

        let joined = JoinEngine::default()
            .build_detail(&menu_without_meal_type(), &recipes, &single_plate())
            .unwrap();
        let detail = joined.frame();

        assert_eq!(ints(detail, SERVED), vec![Some(18)]);
        assert_eq!(strings(detail, MEAL_TYPE), vec![Some("breakfast".to_string())]);
    }

    fn conflicting_inputs() -> (DataFrame, DataFrame, DataFrame) {
        let menu = normalized(
            df!("date" => ["2024-01-01"], "recipe_id" => ["7"], "meal_type" => ["lunch"]).unwrap(),
            "menu",
        );
        let recipes = normalized(df!("recipe_id" => ["7"]).unwrap(), "recipes");
        let plates = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["7"],
                "meal_type" => ["dinner"],
                "served" => ["18"]
            )
            .unwrap(),
            "plate_counts",
        );
        (menu, recipes, plates)
    }

    #[test]
    fn test_conflicting_meal_type_detaches_plate_count() {
        let (menu, recipes, plates) = conflicting_inputs();

        let joined = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap();
        let detail = joined.frame();

        assert_eq!(ints(detail, SERVED), vec![None]);
        assert_eq!(strings(detail, MEAL_TYPE), vec![Some("lunch".to_string())]);
        assert!(!has_column(detail, PLATE_MATCHED));
        assert!(!has_column(detail, MEAL_TYPE_CONFLICT));
    }

    #[test]
    fn test_conflicting_meal_type_kept_when_matching_is_off() {
        let (menu, recipes, plates) = conflicting_inputs();

        let engine = JoinEngine::new(JoinOptions {
            match_meal_type: false,
        });
        let joined = engine.build_detail(&menu, &recipes, &plates).unwrap();

        assert_eq!(ints(joined.frame(), SERVED), vec![Some(18)]);
        assert_eq!(strings(joined.frame(), MEAL_TYPE), vec![Some("lunch".to_string())]);
    }

    #[test]
    fn test_backfill_never_adds_plate_rows() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["5", "5"],
                "meal_type" => ["lunch", "dinner"]
            )
            .unwrap(),
            "menu",
        );
        let plates = normalized(
            df!("date" => ["2024-01-01"], "recipe_id" => ["5"], "prepared" => ["10"]).unwrap(),
            "plate_counts",
        );

        let backfilled = JoinEngine::default()
            .backfill_plate_meal_type(&plates, &menu)
            .unwrap();
        assert_eq!(backfilled.height(), 1);
        assert_eq!(strings(&backfilled, MEAL_TYPE), vec![Some("lunch".to_string())]);
        assert!(ensure_many_to_one(&backfilled).is_ok());
    }

    #[test]
    fn test_duplicate_plate_counts_are_fatal() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["7"],
                "meal_type" => ["breakfast"]
            )
            .unwrap(),
            "menu",
        );
        let recipes = normalized(df!("recipe_id" => ["7"]).unwrap(), "recipes");
        let plates = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["7", "7"],
                "prepared" => ["20", "25"]
            )
            .unwrap(),
            "plate_counts",
        );

        let err = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::JoinCardinality {
                duplicate_keys,
                sample,
            }) => {
                assert_eq!(*duplicate_keys, 1);
                assert!(sample.contains("2024-01-01"));
                assert!(sample.contains("7"));
            }
            other => panic!("expected a join cardinality error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicates_differing_only_in_meal_type_are_fatal() {
        let plates = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["7", "7"],
                "meal_type" => ["lunch", "dinner"]
            )
            .unwrap(),
            "plate_counts",
        );
        assert!(ensure_many_to_one(&plates).is_err());
    }

    #[test]
    fn test_null_keys_do_not_trip_cardinality() {
        let plates = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-01"],
                "recipe_id" => ["bad", "also bad"]
            )
            .unwrap(),
            "plate_counts",
        );
        assert!(ensure_many_to_one(&plates).is_ok());
    }

    #[test]
    fn test_unmatched_menu_rows_keep_nulls() {
        let menu = normalized(
            df!(
                "date" => ["2024-01-01", "2024-01-02", "2024-01-02"],
                "recipe_id" => ["1", "1", "oops"],
                "meal_type" => ["lunch", "lunch", "lunch"]
            )
            .unwrap(),
            "menu",
        );
        let recipes = normalized(
            df!("recipe_id" => ["1"], "calories_kcal" => ["400"]).unwrap(),
            "recipes",
        );
        let plates = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["1"],
                "meal_type" => ["lunch"],
                "prepared" => ["10"],
                "served" => ["8"],
                "leftover" => ["2"]
            )
            .unwrap(),
            "plate_counts",
        );

        let joined = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap();
        let detail = joined.frame();

        assert_eq!(detail.height(), 3);
        assert_eq!(detail.column(SERVED).unwrap().null_count(), 2);
        // The unparseable recipe id keeps its menu row but gets no recipe data.
        assert_eq!(detail.column("calories_kcal").unwrap().null_count(), 1);
    }

    #[test]
    fn test_plate_meal_type_fills_missing_menu_value() {
        let menu = normalized(
            df!("date" => ["2024-01-01"], "recipe_id" => ["9"]).unwrap(),
            "menu",
        );
        let recipes = normalized(df!("recipe_id" => ["9"]).unwrap(), "recipes");
        let plates = normalized(
            df!(
                "date" => ["2024-01-01"],
                "recipe_id" => ["9"],
                "meal_type" => ["Dinner"],
                "served" => ["4"]
            )
            .unwrap(),
            "plate_counts",
        );

        let joined = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap();
        assert_eq!(strings(joined.frame(), MEAL_TYPE), vec![Some("dinner".to_string())]);
        assert!(!has_column(joined.frame(), PLATE_MEAL_TYPE));
    }

    #[test]
    fn test_missing_key_column_is_reported() {
        let menu = normalized(df!("recipe_id" => ["1"]).unwrap(), "menu");
        let recipes = normalized(df!("recipe_id" => ["1"]).unwrap(), "recipes");
        let plates = normalized(
            df!("date" => ["2024-01-01"], "recipe_id" => ["1"]).unwrap(),
            "plate_counts",
        );

        let err = JoinEngine::default()
            .build_detail(&menu, &recipes, &plates)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { .. })
        ));
    }
}
