use crate::error::PipelineError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunable knobs for the synthetic plate-count generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub overprep_base: f64,
    pub overprep_jitter: f64,
    pub waste_target_min: f64,
    pub waste_target_max: f64,
    /// Average fraction of the census attending each meal.
    pub meal_attendance: BTreeMap<String, f64>,
    pub default_attendance: f64,
    /// Attendance shift per weekday, Monday first.
    pub dow_attendance_adj: [f64; 7],
    pub event_prob: f64,
    pub event_waste_adj_min: f64,
    pub event_waste_adj_max: f64,
    pub default_meal_type: String,
}

impl GeneratorConfig {
    pub fn attendance_for(&self, meal_type: &str) -> f64 {
        self.meal_attendance
            .get(meal_type)
            .copied()
            .unwrap_or(self.default_attendance)
    }

    pub fn validate(&self) -> Result<()> {
        if self.waste_target_min > self.waste_target_max {
            return Err(PipelineError::Config(format!(
                "generator waste target range is inverted: {} > {}",
                self.waste_target_min, self.waste_target_max
            ))
            .into());
        }

        if self.event_waste_adj_min > self.event_waste_adj_max {
            return Err(PipelineError::Config(format!(
                "generator event waste range is inverted: {} > {}",
                self.event_waste_adj_min, self.event_waste_adj_max
            ))
            .into());
        }

        if !(0.0..=1.0).contains(&self.event_prob) {
            return Err(PipelineError::Config(format!(
                "generator event_prob must be within [0, 1], got {}",
                self.event_prob
            ))
            .into());
        }

        if self.overprep_jitter < 0.0 {
            return Err(PipelineError::Config(
                "generator overprep_jitter cannot be negative".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let mut meal_attendance = BTreeMap::new();
        meal_attendance.insert("breakfast".to_string(), 0.85);
        meal_attendance.insert("lunch".to_string(), 0.92);
        meal_attendance.insert("dinner".to_string(), 0.90);

        Self {
            seed: 42,
            overprep_base: 0.08,
            overprep_jitter: 0.04,
            waste_target_min: 0.05,
            waste_target_max: 0.15,
            meal_attendance,
            default_attendance: 0.90,
            dow_attendance_adj: [-0.01, 0.00, 0.00, 0.01, 0.02, -0.02, -0.03],
            event_prob: 0.08,
            event_waste_adj_min: -0.04,
            event_waste_adj_max: 0.06,
            default_meal_type: "lunch".to_string(),
        }
    }
}
