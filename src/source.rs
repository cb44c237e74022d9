//! Read side of the report boundary: named tables, optionally filtered.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use log::debug;
use polars::prelude::*;

use crate::error::UsageError;

/// Anything that can hand out the rows of a named table.
///
/// The predicate is applied before the frame is returned, so implementations
/// backed by a real database are free to push it down.
pub trait TableSource {
    fn fetch(&self, table: &str, predicate: Option<Expr>) -> Result<DataFrame, UsageError>;
}

fn apply_predicate(df: DataFrame, predicate: Option<Expr>) -> Result<DataFrame, UsageError> {
    match predicate {
        Some(expr) => Ok(df.lazy().filter(expr).collect()?),
        None => Ok(df),
    }
}

// ── Directory of exported tables ────────────────────────────────────────────

/// Tables exported from the GIS database as `<table>.parquet` or `<table>.csv`.
pub struct DirectorySource {
    base_path: PathBuf,
}

impl DirectorySource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Read a CSV file with all columns as String dtype.
    /// Trims whitespace from column names.
    fn read_csv_as_strings(&self, path: PathBuf) -> Result<DataFrame, UsageError> {
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        Ok(df)
    }
}

impl TableSource for DirectorySource {
    fn fetch(&self, table: &str, predicate: Option<Expr>) -> Result<DataFrame, UsageError> {
        let parquet = self.base_path.join(format!("{table}.parquet"));
        let csv = self.base_path.join(format!("{table}.csv"));

        let df = if parquet.is_file() {
            debug!("reading {}", parquet.display());
            ParquetReader::new(File::open(&parquet)?).finish()?
        } else if csv.is_file() {
            debug!("reading {}", csv.display());
            self.read_csv_as_strings(csv)?
        } else {
            return Err(UsageError::MissingTable(format!(
                "{table} (looked in {})",
                self.base_path.display()
            )));
        };

        apply_predicate(df, predicate)
    }
}

// ── In-memory tables ────────────────────────────────────────────────────────

/// Named frames held in memory; used by the Python bindings and tests.
#[derive(Default, Clone)]
pub struct MemorySource {
    tables: HashMap<String, DataFrame>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, df: DataFrame) -> Self {
        self.tables.insert(name.into(), df);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, df: DataFrame) {
        self.tables.insert(name.into(), df);
    }
}

impl TableSource for MemorySource {
    fn fetch(&self, table: &str, predicate: Option<Expr>) -> Result<DataFrame, UsageError> {
        let df = self
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| UsageError::MissingTable(table.to_string()))?;
        apply_predicate(df, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_filters_rows() {
        let source = MemorySource::new().with_table(
            "trips",
            df!("trip_id" => ["a", "b", "c"], "business_name" => ["X", "Y", "X"]).unwrap(),
        );
        let df = source
            .fetch("trips", Some(col("business_name").eq(lit("X"))))
            .unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn missing_table_is_an_error() {
        let source = MemorySource::new();
        assert!(matches!(
            source.fetch("nope", None),
            Err(UsageError::MissingTable(_))
        ));
    }

    #[test]
    fn directory_source_reads_csv_as_strings() {
        let dir = std::env::temp_dir().join(format!("permit_usage_src_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("locations.csv"), " location_id ,full_name\n7,North Arm\n").unwrap();

        let df = DirectorySource::new(&dir).fetch("locations", None).unwrap();
        assert_eq!(df.height(), 1);
        let ids = df.column("location_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("7"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
