//! Service-day aggregation for outfitter/guide permit reports.
//!
//! Activity records from six source systems are assembled into flat
//! occurrences, normalized onto a canonical activity taxonomy, enriched with
//! location attributes, and aggregated per grouping with the trip head-count
//! as a ceiling. Per-source aggregates are then combined and pivoted by year.

pub mod aggregation;
pub mod assemblers;
pub mod combiner;
pub mod config;
pub mod error;
pub mod location;
pub mod occurrence;
pub mod pivot;
pub mod report;
pub mod schema;
pub mod source;
pub mod taxonomy;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{aggregate, aggregate_events, AggregateTable, Dimension, Measure};
pub use assemblers::{Assembled, SourceAssembler, SourceSystem};
pub use combiner::{combine, CombinedTable};
pub use config::{ReportConfig, SeasonScheme};
pub use error::UsageError;
pub use location::{enrich, LocationReference};
pub use occurrence::{ActivityOccurrence, HuntEvents, OccurrenceSet};
pub use pivot::pivot_years;
pub use report::{CsvSink, DataQuality, MemorySink, ReportKind, ReportOutput, ReportRunner, ReportSink};
pub use source::{DirectorySource, MemorySource, TableSource};
pub use taxonomy::{normalize_activities, Taxonomy};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Occurrence
    let occurrence = PyModule::new(m.py(), "occurrence")?;
    occurrence.add("TRIP_ID", schema::occurrence::TRIP_ID)?;
    occurrence.add("YEAR", schema::occurrence::YEAR)?;
    occurrence.add("MONTH", schema::occurrence::MONTH)?;
    occurrence.add("RAW_ACTIVITY", schema::occurrence::RAW_ACTIVITY)?;
    occurrence.add("ACTIVITY", schema::occurrence::ACTIVITY)?;
    occurrence.add("ACTIVITY_MAPPED", schema::occurrence::ACTIVITY_MAPPED)?;
    occurrence.add("LOCATION_ID", schema::occurrence::LOCATION_ID)?;
    occurrence.add("USE_LOCATION", schema::occurrence::USE_LOCATION)?;
    occurrence.add("USE_AREA", schema::occurrence::USE_AREA)?;
    occurrence.add("RANGER_DISTRICT", schema::occurrence::RANGER_DISTRICT)?;
    occurrence.add("WILDERNESS", schema::occurrence::WILDERNESS)?;
    occurrence.add("SEASON", schema::occurrence::SEASON)?;
    occurrence.add("BUSINESS_NAME", schema::occurrence::BUSINESS_NAME)?;
    occurrence.add("FOREST_NAME", schema::occurrence::FOREST_NAME)?;
    occurrence.add("TOTAL_CLIENTS", schema::occurrence::TOTAL_CLIENTS)?;
    occurrence.add("ACTIVITY_CLIENTS", schema::occurrence::ACTIVITY_CLIENTS)?;
    m.add_submodule(&occurrence)?;

    // Location
    let location = PyModule::new(m.py(), "location")?;
    location.add("TABLE", schema::location::TABLE)?;
    location.add("LOCATION_ID", schema::location::LOCATION_ID)?;
    location.add("USE_LOCATION", schema::location::USE_LOCATION)?;
    location.add("FULL_NAME", schema::location::FULL_NAME)?;
    location.add("ZONE_NAME", schema::location::ZONE_NAME)?;
    location.add("RANGER_DISTRICT", schema::location::RANGER_DISTRICT)?;
    location.add("WILDERNESS", schema::location::WILDERNESS)?;
    location.add("SEASON", schema::location::SEASON)?;
    m.add_submodule(&location)?;

    // Fallbacks
    let fallback = PyModule::new(m.py(), "fallback")?;
    fallback.add("USE_LOCATION", schema::fallback::USE_LOCATION)?;
    fallback.add("USE_AREA", schema::fallback::USE_AREA)?;
    fallback.add("RANGER_DISTRICT", schema::fallback::RANGER_DISTRICT)?;
    fallback.add("SEASON", schema::fallback::SEASON)?;
    fallback.add("ACTIVITY", schema::fallback::ACTIVITY)?;
    m.add_submodule(&fallback)?;

    // Aggregate
    let aggregate = PyModule::new(m.py(), "aggregate")?;
    aggregate.add("SERVICE_DAYS", schema::aggregate::SERVICE_DAYS)?;
    aggregate.add("HUNTS", schema::aggregate::HUNTS)?;
    aggregate.add("SOURCE", schema::aggregate::SOURCE)?;
    aggregate.add("TOTAL", schema::aggregate::TOTAL)?;
    m.add_submodule(&aggregate)?;

    // Source tables
    let tables = PyModule::new(m.py(), "tables")?;
    tables.add("GUIDED_TRIPS", schema::guided::TRIPS)?;
    tables.add("GUIDED_DAYS", schema::guided::DAYS)?;
    tables.add("GUIDED_STOPS", schema::guided::STOPS)?;
    tables.add("GUIDED_ACTIVITIES", schema::guided::ACTIVITIES)?;
    tables.add("HUNTING_TRIPS", schema::hunting::TRIPS)?;
    tables.add("HUNTING_LOCATIONS", schema::hunting::LOCATIONS)?;
    tables.add("HELISKI_TRIPS", schema::heliski::TRIPS)?;
    tables.add("HELISKI_ACTIVITIES", schema::heliski::ACTIVITIES)?;
    tables.add("OUTFITTING_TRIPS", schema::outfitting::TRIPS)?;
    tables.add("OUTFITTING_SERVICES", schema::outfitting::SERVICES)?;
    tables.add("ICEFIELD_MONTHLY", schema::icefield::TABLE)?;
    tables.add("MENDENHALL_MONTHLY", schema::mendenhall::TABLE)?;
    m.add_submodule(&tables)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::UsageEngine>()?;
    add_schema_exports(m)?;
    Ok(())
}
