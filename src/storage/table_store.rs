use crate::config::{OutputFormat, PipelineConfig};
use crate::error::PipelineError;
use anyhow::Result;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The five input tables exactly as read: every column is text.
#[derive(Debug, Clone)]
pub struct RawTables {
    pub residents: DataFrame,
    pub recipes: DataFrame,
    pub menu: DataFrame,
    pub plate_counts: DataFrame,
    pub standards: Option<DataFrame>,
}

pub struct TableStore;

impl TableStore {
    pub fn load_inputs(config: &PipelineConfig) -> Result<RawTables> {
        let residents = Self::read_input(config, &config.inputs.residents)?;
        let recipes = Self::read_input(config, &config.inputs.recipes)?;
        let menu = Self::read_input(config, &config.inputs.menu)?;
        let plate_counts = Self::read_input(config, &config.inputs.plate_counts)?;

        let standards_path = config.input_path(&config.inputs.standards);
        let standards = if standards_path.exists() {
            Some(read_table(&standards_path)?)
        } else {
            warn!("No nutrition standards at {}", standards_path.display());
            None
        };

        info!(
            "Loaded inputs from {}: {} residents, {} recipes, {} menu rows, {} plate counts",
            config.paths.data_dir.display(),
            residents.height(),
            recipes.height(),
            menu.height(),
            plate_counts.height()
        );

        Ok(RawTables {
            residents,
            recipes,
            menu,
            plate_counts,
            standards,
        })
    }

    fn read_input(config: &PipelineConfig, file_name: &str) -> Result<DataFrame> {
        read_table(&config.input_path(file_name))
    }

    /// Writes `df` to `path`, replacing any previous file. The frame is staged
    /// next to the target and renamed into place.
    pub fn write_table(df: &mut DataFrame, path: &Path, format: OutputFormat) -> Result<PathBuf> {
        write_frame(df, path, format).map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Wrote {} rows to {}", df.height(), path.display());
        Ok(path.to_path_buf())
    }
}

/// Reads a table, choosing the reader from the file extension (CSV when
/// unknown). CSV columns are all read as text.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let format = OutputFormat::from_path(path).unwrap_or(OutputFormat::Csv);
    let df = read_frame(path, format).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(df)
}

fn read_frame(path: &Path, format: OutputFormat) -> PolarsResult<DataFrame> {
    match format {
        OutputFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish(),
        OutputFormat::Parquet => ParquetReader::new(File::open(path)?).finish(),
        OutputFormat::Json => JsonReader::new(File::open(path)?)
            .with_json_format(JsonFormat::Json)
            .finish(),
    }
}

fn write_frame(df: &mut DataFrame, path: &Path, format: OutputFormat) -> PolarsResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);

    {
        let mut file = File::create(&staged)?;
        match format {
            OutputFormat::Csv => {
                CsvWriter::new(&mut file).include_header(true).finish(df)?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(&mut file).finish(df)?;
            }
            OutputFormat::Json => {
                JsonWriter::new(&mut file)
                    .with_json_format(JsonFormat::Json)
                    .finish(df)?;
            }
        }
    }

    fs::rename(&staged, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let mut df = df!("recipe_id" => [7i64, 8], "meal_type" => ["lunch", "dinner"]).unwrap();
        TableStore::write_table(&mut df, &path, OutputFormat::Csv).unwrap();

        let read = read_table(&path).unwrap();
        assert_eq!(read.height(), 2);
        assert_eq!(read.column("recipe_id").unwrap().dtype(), &DataType::String);
        assert_eq!(read.column("recipe_id").unwrap().str().unwrap().get(1), Some("8"));
    }

    #[test]
    fn test_write_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.parquet");

        let mut first = df!("prepared" => [1i64, 2, 3]).unwrap();
        TableStore::write_table(&mut first, &path, OutputFormat::Parquet).unwrap();
        let mut second = df!("prepared" => [9i64]).unwrap();
        TableStore::write_table(&mut second, &path, OutputFormat::Parquet).unwrap();

        let read = read_table(&path).unwrap();
        assert_eq!(read.height(), 1);
        assert_eq!(read.column("prepared").unwrap().i64().unwrap().get(0), Some(9));
    }

    #[test]
    fn test_write_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "file in the way").unwrap();
        let path = blocker.join("summary.csv");

        let mut df = df!("day" => ["2024-01-01"]).unwrap();
        let err = TableStore::write_table(&mut df, &path, OutputFormat::Csv).unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::Write { path: failed, .. }) => assert_eq!(failed, &path),
            other => panic!("expected a write error, got {:?}", other),
        }
        assert!(err.to_string().contains("summary.csv"));
    }

    #[test]
    fn test_missing_input_names_path() {
        let err = read_table(Path::new("/definitely/missing/menu_calendar.csv")).unwrap_err();
        assert!(err.to_string().contains("menu_calendar.csv"));
    }
}
