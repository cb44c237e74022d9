use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::aggregation::{aggregate, Dimension};
use crate::assemblers::SourceSystem;
use crate::config::{ReportConfig, SeasonScheme};
use crate::error::UsageError;
use crate::occurrence::OccurrenceSet;
use crate::report::{ReportKind, ReportRunner, DATA_QUALITY_SHEET};
use crate::source::{DirectorySource, TableSource};
use crate::taxonomy::Taxonomy;

/// Report engine over a directory of exported tables.
#[pyclass]
pub struct UsageEngine {
    source: DirectorySource,
    taxonomy: Taxonomy,
}

#[pymethods]
impl UsageEngine {
    #[new]
    #[pyo3(signature = (base_path, taxonomy_path=None))]
    fn new(base_path: String, taxonomy_path: Option<String>) -> PyResult<Self> {
        let taxonomy = match taxonomy_path {
            Some(path) => Taxonomy::from_path(PathBuf::from(path))?,
            None => Taxonomy::builtin()?,
        };
        Ok(Self {
            source: DirectorySource::new(base_path),
            taxonomy,
        })
    }

    /// Load one table the way the assemblers see it.
    fn load_table(&self, name: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.source.fetch(name, None)?))
    }

    /// Run a report and return `(sheet name, table)` pairs in sheet order.
    ///
    /// A "Data Quality" sheet is appended when the run recovered from bad data.
    #[pyo3(signature = (
        report,
        start_year,
        end_year,
        business_name=None,
        sources=None,
        season_scheme=None,
        grand_total=false,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn run_report(
        &self,
        report: &str,
        start_year: i32,
        end_year: i32,
        business_name: Option<String>,
        sources: Option<Vec<String>>,
        season_scheme: Option<&str>,
        grand_total: bool,
    ) -> PyResult<Vec<(String, PyDataFrame)>> {
        let mut config = ReportConfig::new(start_year, end_year).with_grand_total(grand_total);
        if let Some(name) = business_name {
            config = config.with_business(name);
        }
        if let Some(sources) = sources {
            let sources = sources
                .iter()
                .map(|s| s.parse::<SourceSystem>())
                .collect::<Result<Vec<_>, UsageError>>()?;
            config = config.with_sources(&sources);
        }
        if let Some(scheme) = season_scheme {
            config = config.with_season_scheme(scheme.parse::<SeasonScheme>()?);
        }
        self.run(report, config)
    }

    /// Run a report configured by a JSON file.
    fn run_report_from_config(
        &self,
        report: &str,
        config_path: &str,
    ) -> PyResult<Vec<(String, PyDataFrame)>> {
        let config = ReportConfig::from_json_file(config_path)?;
        self.run(report, config)
    }

    /// Service days of an enriched occurrence frame along `dimensions`.
    #[staticmethod]
    fn aggregate(occurrences: PyDataFrame, dimensions: Vec<String>) -> PyResult<PyDataFrame> {
        let dimensions = dimensions
            .iter()
            .map(|d| d.parse::<Dimension>())
            .collect::<Result<Vec<_>, UsageError>>()?;
        let set = OccurrenceSet::from_frame(occurrences.0)?;
        Ok(PyDataFrame(aggregate(&set, &dimensions)?.into_frame()))
    }

    /// `(activity, mapped)` for one raw label.
    fn normalize_activity(&self, raw: &str) -> (String, bool) {
        let hit = self.taxonomy.normalize(raw);
        (hit.as_str().to_string(), hit.is_mapped())
    }

    #[getter]
    fn taxonomy_version(&self) -> u32 {
        self.taxonomy.version()
    }
}

impl UsageEngine {
    fn run(&self, report: &str, config: ReportConfig) -> PyResult<Vec<(String, PyDataFrame)>> {
        let kind = report.parse::<ReportKind>()?;
        let output = ReportRunner::new(&self.source, config)?
            .with_default_taxonomy(self.taxonomy.clone())
            .run(kind)?;

        let mut sheets: Vec<(String, PyDataFrame)> = output
            .tables
            .into_iter()
            .map(|t| (t.name, PyDataFrame(t.pivot)))
            .collect();
        if !output.quality.is_clean() {
            sheets.push((
                DATA_QUALITY_SHEET.to_string(),
                PyDataFrame(output.quality.to_frame()?),
            ));
        }
        Ok(sheets)
    }
}
