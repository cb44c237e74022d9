//! Report runs: assemble every configured source, normalize, enrich,
//! aggregate per grouping, combine across sources and pivot by year.

use std::fs::{self, File};
use std::path::PathBuf;

use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregation::{
    aggregate, aggregate_events, inconsistent_trip_totals, AggregateTable, Dimension, Measure,
};
use crate::assemblers::{Assembled, SourceSystem};
use crate::combiner::{combine, CombinedTable};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::location::{enrich, LocationReference};
use crate::occurrence::{HuntEvents, OccurrenceSet};
use crate::pivot::pivot_years;
use crate::schema::occurrence;
use crate::source::TableSource;
use crate::taxonomy::{normalize_activities, Taxonomy, UnmappedActivity};

pub const DATA_QUALITY_SHEET: &str = "Data Quality";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    FiveYearReview,
    VisitationSummary,
    WildernessSummary,
    RvdReport,
    AllocationStatus,
}

use Dimension::*;

const FIVE_YEAR_REVIEW: &[&[Dimension]] = &[
    &[Activity],
    &[UseLocation],
    &[UseArea],
    &[Wilderness],
    &[Season],
    &[RangerDistrict],
];
const VISITATION_SUMMARY: &[&[Dimension]] = &[&[Activity], &[UseArea], &[Season]];
const WILDERNESS_SUMMARY: &[&[Dimension]] = &[
    &[Wilderness],
    &[Wilderness, UseLocation],
    &[Wilderness, Season],
];
const RVD_REPORT: &[&[Dimension]] = &[&[Activity, RangerDistrict], &[UseArea, Season]];
const ALLOCATION_STATUS: &[&[Dimension]] = &[&[UseArea, Business], &[UseLocation, Business]];

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        Self::FiveYearReview,
        Self::VisitationSummary,
        Self::WildernessSummary,
        Self::RvdReport,
        Self::AllocationStatus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::FiveYearReview => "Five Year Review",
            Self::VisitationSummary => "Visitation Summary",
            Self::WildernessSummary => "Wilderness Summary",
            Self::RvdReport => "RVD Report",
            Self::AllocationStatus => "Allocation Status",
        }
    }

    /// Each grouping becomes one sheet; every one is aggregated separately.
    pub fn groupings(self) -> &'static [&'static [Dimension]] {
        match self {
            Self::FiveYearReview => FIVE_YEAR_REVIEW,
            Self::VisitationSummary => VISITATION_SUMMARY,
            Self::WildernessSummary => WILDERNESS_SUMMARY,
            Self::RvdReport => RVD_REPORT,
            Self::AllocationStatus => ALLOCATION_STATUS,
        }
    }

    /// Rows the report considers at all, applied after enrichment.
    pub fn occurrence_filter(self) -> Option<Expr> {
        match self {
            Self::WildernessSummary => Some(
                col(occurrence::WILDERNESS)
                    .is_not_null()
                    .and(col(occurrence::WILDERNESS).neq(lit(""))),
            ),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|k| k.label().to_lowercase().replace(' ', "_") == wanted)
            .ok_or_else(|| UsageError::InvalidConfig(format!("Unknown report: '{s}'")))
    }
}

fn sheet_name(grouping: &[Dimension], measure: Measure) -> String {
    let name = grouping
        .iter()
        .map(|d| d.label())
        .collect::<Vec<_>>()
        .join(" by ");
    match measure {
        Measure::ServiceDays => name,
        Measure::Hunts => format!("{name} (Hunts)"),
    }
}

// ── Data quality ────────────────────────────────────────────────────────────

/// Conditions a run recovered from, for the operator to review.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataQuality {
    pub unmapped_activities: Vec<UnmappedActivity>,
    pub unmatched_location_rows: usize,
    /// `(source, trip_id)` pairs whose rows disagree on total clients.
    pub inconsistent_trips: Vec<(SourceSystem, String)>,
    pub empty_sources: Vec<SourceSystem>,
}

impl DataQuality {
    pub fn is_clean(&self) -> bool {
        self.unmapped_activities.is_empty()
            && self.unmatched_location_rows == 0
            && self.inconsistent_trips.is_empty()
            && self.empty_sources.is_empty()
    }

    fn add_unmapped(&mut self, found: Vec<UnmappedActivity>) {
        for item in found {
            match self
                .unmapped_activities
                .iter_mut()
                .find(|u| u.label == item.label)
            {
                Some(existing) => existing.rows += item.rows,
                None => self.unmapped_activities.push(item),
            }
        }
    }

    /// `issue | detail | rows`, one line per condition.
    pub fn to_frame(&self) -> Result<DataFrame, UsageError> {
        let mut issue = Vec::new();
        let mut detail = Vec::new();
        let mut rows: Vec<Option<u64>> = Vec::new();

        for u in &self.unmapped_activities {
            issue.push("Unmapped activity".to_string());
            detail.push(u.label.clone());
            rows.push(Some(u.rows));
        }
        if self.unmatched_location_rows > 0 {
            issue.push("Unknown location".to_string());
            detail.push(String::new());
            rows.push(Some(self.unmatched_location_rows as u64));
        }
        for (system, trip) in &self.inconsistent_trips {
            issue.push("Inconsistent total clients".to_string());
            detail.push(format!("{system}: {trip}"));
            rows.push(None);
        }
        for system in &self.empty_sources {
            issue.push("No activity in range".to_string());
            detail.push(system.label().to_string());
            rows.push(None);
        }

        Ok(DataFrame::new(vec![
            Column::new("issue".into(), issue),
            Column::new("detail".into(), detail),
            Column::new("rows".into(), rows),
        ])?)
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

/// One aggregated grouping, long-form and pivoted.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub name: String,
    pub combined: CombinedTable,
    pub pivot: DataFrame,
}

#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub kind: ReportKind,
    pub tables: Vec<ReportTable>,
    pub quality: DataQuality,
}

impl ReportOutput {
    pub fn table(&self, name: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Hand every pivot, then the data-quality sheet if needed, to `sink`.
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> Result<(), UsageError> {
        for table in &self.tables {
            let mut frame = table.pivot.clone();
            sink.write_sheet(&table.name, &mut frame)?;
        }
        if !self.quality.is_clean() {
            let mut frame = self.quality.to_frame()?;
            sink.write_sheet(DATA_QUALITY_SHEET, &mut frame)?;
        }
        Ok(())
    }
}

/// Write side of the report boundary. Null cells mean "no activity".
pub trait ReportSink {
    fn write_sheet(&mut self, name: &str, frame: &mut DataFrame) -> Result<(), UsageError>;
}

/// One CSV file per sheet inside a directory.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, UsageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_name(sheet: &str) -> String {
        let stem: String = sheet
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{}.csv", stem.trim_matches('_'))
    }
}

impl ReportSink for CsvSink {
    fn write_sheet(&mut self, name: &str, frame: &mut DataFrame) -> Result<(), UsageError> {
        let path = self.dir.join(Self::file_name(name));
        let file = File::create(&path)?;
        CsvWriter::new(file).include_header(true).finish(frame)?;
        info!("wrote {} ({} rows)", path.display(), frame.height());
        Ok(())
    }
}

/// Sheets kept in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub sheets: Vec<(String, DataFrame)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&DataFrame> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, df)| df)
    }
}

impl ReportSink for MemorySink {
    fn write_sheet(&mut self, name: &str, frame: &mut DataFrame) -> Result<(), UsageError> {
        self.sheets.push((name.to_string(), frame.clone()));
        Ok(())
    }
}

// ── Runner ──────────────────────────────────────────────────────────────────

/// Occurrences of one source after normalization and enrichment.
struct Prepared {
    system: SourceSystem,
    occurrences: Option<OccurrenceSet>,
    hunt_events: Option<HuntEvents>,
}

pub struct ReportRunner<'a> {
    source: &'a (dyn TableSource + Sync),
    taxonomy: Taxonomy,
    config: ReportConfig,
}

impl<'a> ReportRunner<'a> {
    /// Validates `config` and loads its taxonomy override, if any.
    pub fn new(source: &'a (dyn TableSource + Sync), config: ReportConfig) -> Result<Self, UsageError> {
        config.validate()?;
        let taxonomy = match &config.taxonomy_path {
            Some(path) => Taxonomy::from_path(path)?,
            None => Taxonomy::builtin()?,
        };
        Ok(Self {
            source,
            taxonomy,
            config,
        })
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    /// Use `taxonomy` unless the config names its own taxonomy file.
    pub fn with_default_taxonomy(self, taxonomy: Taxonomy) -> Self {
        match self.config.taxonomy_path {
            Some(_) => self,
            None => self.with_taxonomy(taxonomy),
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn run(&self, kind: ReportKind) -> Result<ReportOutput, UsageError> {
        info!(
            "{kind}: {}..={} over {} sources",
            self.config.start_year,
            self.config.end_year,
            self.config.sources.len()
        );
        let locations = LocationReference::load(self.source)?;
        let assembled = self.assemble_all()?;

        let mut quality = DataQuality::default();
        for (system, a) in &assembled {
            if a.is_empty() {
                quality.empty_sources.push(*system);
            }
        }
        if assembled.iter().all(|(_, a)| a.is_empty()) {
            return Err(UsageError::NoActivities {
                start_year: self.config.start_year,
                end_year: self.config.end_year,
            });
        }
        if !quality.empty_sources.is_empty() {
            warn!("no activity in range for {:?}", quality.empty_sources);
        }

        let mut prepared = Vec::with_capacity(assembled.len());
        for (system, a) in assembled {
            prepared.push(self.prepare(system, a, kind, &locations, &mut quality)?);
        }

        let mut tables = Vec::new();
        for grouping in kind.groupings() {
            let service_days = prepared
                .iter()
                .map(|p| {
                    let table = p
                        .occurrences
                        .as_ref()
                        .map(|set| aggregate(set, grouping))
                        .transpose()?;
                    Ok((p.system, table))
                })
                .collect::<Result<Vec<_>, UsageError>>()?;
            self.push_table(&mut tables, grouping, Measure::ServiceDays, &service_days)?;

            let hunts = prepared
                .iter()
                .map(|p| {
                    let table = p
                        .hunt_events
                        .as_ref()
                        .map(|events| aggregate_events(events, grouping))
                        .transpose()?;
                    Ok((p.system, table))
                })
                .collect::<Result<Vec<_>, UsageError>>()?;
            self.push_table(&mut tables, grouping, Measure::Hunts, &hunts)?;
        }

        info!("{kind}: {} tables", tables.len());
        Ok(ReportOutput {
            kind,
            tables,
            quality,
        })
    }

    fn push_table(
        &self,
        tables: &mut Vec<ReportTable>,
        grouping: &[Dimension],
        measure: Measure,
        parts: &[(SourceSystem, Option<AggregateTable>)],
    ) -> Result<(), UsageError> {
        if let Some(combined) = combine(parts, self.config.years())? {
            let pivot = pivot_years(&combined, self.config.grand_total)?;
            tables.push(ReportTable {
                name: sheet_name(grouping, measure),
                combined,
                pivot,
            });
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn assemble_all(&self) -> Result<Vec<(SourceSystem, Assembled)>, UsageError> {
        use rayon::prelude::*;

        self.config
            .sources
            .par_iter()
            .map(|system| Ok((*system, system.assemble(self.source, &self.config)?)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn assemble_all(&self) -> Result<Vec<(SourceSystem, Assembled)>, UsageError> {
        self.config
            .sources
            .iter()
            .map(|system| Ok((*system, system.assemble(self.source, &self.config)?)))
            .collect()
    }

    fn prepare(
        &self,
        system: SourceSystem,
        assembled: Assembled,
        kind: ReportKind,
        locations: &LocationReference,
        quality: &mut DataQuality,
    ) -> Result<Prepared, UsageError> {
        let occurrences = match assembled.occurrences {
            Some(set) => {
                // Every assembled row counts, whatever the report filters out.
                for trip in inconsistent_trip_totals(&set)? {
                    quality.inconsistent_trips.push((system, trip));
                }
                self.enrich(&set, kind, locations, quality)?
            }
            None => None,
        };
        let hunt_events = match assembled.hunt_events {
            Some(events) => self
                .enrich(events.occurrences(), kind, locations, quality)?
                .map(HuntEvents::new),
            None => None,
        };
        Ok(Prepared {
            system,
            occurrences,
            hunt_events,
        })
    }

    /// Normalize, enrich and apply the report's filter. `None` when nothing is left.
    fn enrich(
        &self,
        set: &OccurrenceSet,
        kind: ReportKind,
        locations: &LocationReference,
        quality: &mut DataQuality,
    ) -> Result<Option<OccurrenceSet>, UsageError> {
        let (normalized, unmapped) = normalize_activities(set, &self.taxonomy)?;
        quality.add_unmapped(unmapped);

        let enriched = enrich(&normalized, locations, self.config.season_scheme)?;
        quality.unmatched_location_rows += enriched.unmatched_rows;

        let set = match kind.occurrence_filter() {
            Some(predicate) => enriched.occurrences.filter(predicate)?,
            None => enriched.occurrences,
        };
        Ok((!set.is_empty()).then_some(set))
    }
}
