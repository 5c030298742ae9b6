use crate::config::GeneratorConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "MEAL_PIPELINE_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "MEAL_PIPELINE_OUTPUT_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub join: JoinOptions,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    // Defaults to data_dir when unset
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub residents: String,
    pub recipes: String,
    pub menu: String,
    pub plate_counts: String,
    pub standards: String,
    pub compliance_checks: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub name: String,
    pub detail_name: String,
    pub format: OutputFormat,
    pub write_detail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
    Json,
}

/// Knobs for the plate-count join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    /// Leave a plate count unattached when its `meal_type` and the menu row's
    /// are both present and disagree. A null on either side always matches.
    pub match_meal_type: bool,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "parquet" => Some(OutputFormat::Parquet),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            "json" => Ok(OutputFormat::Json),
            other => Err(PipelineError::Config(format!(
                "unknown output format '{}' (expected csv, parquet or json)",
                other
            ))),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        Ok(config)
    }

    /// Loads `path` when given, otherwise starts from defaults, then applies
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.paths.data_dir = PathBuf::from(dir);
            }
        }

        if let Ok(dir) = env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                self.paths.output_dir = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn input_path(&self, file_name: &str) -> PathBuf {
        self.paths.data_dir.join(file_name)
    }

    pub fn output_dir(&self) -> &Path {
        self.paths
            .output_dir
            .as_deref()
            .unwrap_or(self.paths.data_dir.as_path())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir()
            .join(format!("{}.{}", self.output.name, self.output.format.extension()))
    }

    pub fn detail_path(&self) -> PathBuf {
        self.output_dir().join(format!(
            "{}.{}",
            self.output.detail_name,
            self.output.format.extension()
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.data_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("data_dir cannot be empty".to_string()).into());
        }

        let required = [
            ("residents", &self.inputs.residents),
            ("recipes", &self.inputs.recipes),
            ("menu", &self.inputs.menu),
            ("plate_counts", &self.inputs.plate_counts),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(
                    PipelineError::Config(format!("inputs.{} cannot be empty", key)).into(),
                );
            }
        }

        if self.output.name.trim().is_empty() {
            return Err(PipelineError::Config("output name cannot be empty".to_string()).into());
        }

        self.generator.validate()?;

        Ok(())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: None,
        }
    }
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            residents: "residents.csv".to_string(),
            recipes: "recipes.csv".to_string(),
            menu: "menu_calendar.csv".to_string(),
            plate_counts: "plate_counts.csv".to_string(),
            standards: "nutrition_standards_daily.csv".to_string(),
            compliance_checks: "daily_checks_with_plate_counts.csv".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: "daily_summary_with_plate_counts".to_string(),
            detail_name: "meal_detail_with_plate_counts".to_string(),
            format: OutputFormat::Csv,
            write_detail: false,
        }
    }
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            match_meal_type: true,
        }
    }
}
