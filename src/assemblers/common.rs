use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use polars::prelude::*;

use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::occurrence::OccurrenceSet;
use crate::schema::{monthly, occurrence, trip};
use crate::source::TableSource;

const IN_RANGE: &str = "_in_range";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

// Spellings flag columns use for "yes" once cast to strings.
const TRUTHY: [&str; 9] = ["Y", "y", "Yes", "YES", "yes", "true", "True", "1", "1.0"];

pub(super) fn text(name: &str) -> Expr {
    col(name).cast(DataType::String)
}

const WHITESPACE: &str = " \t\r\n";

fn stripped(name: &str) -> Expr {
    col(name).cast(DataType::String).str().strip_chars(lit(WHITESPACE))
}

/// Padded exports (`" 6 "`) read as numbers; anything else unreadable is null.
pub(super) fn number(name: &str) -> Expr {
    stripped(name).cast(DataType::Float64)
}

pub(super) fn integer(name: &str) -> Expr {
    number(name).cast(DataType::Int32)
}

/// Warn once per column about non-blank values that do not read as numbers.
pub(super) fn warn_unreadable_numbers(df: &DataFrame, columns: &[&str]) -> Result<(), UsageError> {
    for &name in columns {
        if df.column(name).is_err() {
            continue;
        }
        let counted = df
            .clone()
            .lazy()
            .select([stripped(name)
                .neq(lit(""))
                .and(number(name).is_null())
                .sum()
                .alias(name)])
            .collect()?;
        let unreadable = counted
            .column(name)?
            .cast(&DataType::UInt64)?
            .u64()?
            .get(0)
            .unwrap_or(0);
        if unreadable > 0 {
            warn!("{unreadable} {name} values are not numbers; counting them as missing");
        }
    }
    Ok(())
}

pub(super) fn truthy(name: &str) -> Expr {
    let value = col(name).cast(DataType::String);
    TRUTHY
        .iter()
        .map(|t| value.clone().eq(lit(*t)))
        .reduce(|a, b| a.or(b))
        .unwrap_or_else(|| lit(false))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
}

/// Add `year` and `month` from a date column and keep rows inside the
/// configured date range. Unparsable dates are dropped with a warning.
pub(super) fn with_calendar(
    mut df: DataFrame,
    date_column: &str,
    config: &ReportConfig,
) -> Result<DataFrame, UsageError> {
    let (start, end) = config.date_range()?;
    let dates = df
        .column(date_column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let dates = dates.str()?;

    let mut years = Vec::with_capacity(df.height());
    let mut months = Vec::with_capacity(df.height());
    let mut keep = Vec::with_capacity(df.height());
    let mut unparsable = 0usize;

    for value in dates.into_iter() {
        match value.and_then(parse_date) {
            Some(d) => {
                years.push(Some(d.year()));
                months.push(Some(d.month() as i32));
                keep.push(d >= start && d <= end);
            }
            None => {
                unparsable += 1;
                years.push(None);
                months.push(None);
                keep.push(false);
            }
        }
    }
    if unparsable > 0 {
        warn!("{unparsable} rows have an unreadable {date_column}; skipping them");
    }

    df.with_column(Column::new(occurrence::YEAR.into(), years))?;
    df.with_column(Column::new(occurrence::MONTH.into(), months))?;
    df.with_column(Column::new(IN_RANGE.into(), keep))?;

    let df = df.lazy().filter(col(IN_RANGE)).collect()?;
    Ok(df.drop(IN_RANGE)?)
}

/// Project to the assembled occurrence columns with canonical dtypes.
pub(super) fn project(lf: LazyFrame) -> LazyFrame {
    lf.select([
        text(occurrence::TRIP_ID),
        integer(occurrence::YEAR),
        integer(occurrence::MONTH),
        text(occurrence::RAW_ACTIVITY),
        text(occurrence::LOCATION_ID),
        text(occurrence::BUSINESS_NAME),
        text(occurrence::FOREST_NAME),
        number(occurrence::TOTAL_CLIENTS),
        number(occurrence::ACTIVITY_CLIENTS),
    ])
}

/// Collect an assembled frame; an empty result means the source had no data.
pub(super) fn finish(lf: LazyFrame) -> Result<Option<OccurrenceSet>, UsageError> {
    let df = project(lf).collect()?;
    if df.height() == 0 {
        return Ok(None);
    }
    Ok(Some(OccurrenceSet::from_frame(df)?))
}

/// Trip-level columns shared by every trip table, plus the parsed calendar.
pub(super) fn trip_header(df: DataFrame, date_column: &str, config: &ReportConfig) -> Result<LazyFrame, UsageError> {
    warn_unreadable_numbers(&df, &[trip::TOTAL_CLIENTS])?;
    let df = with_calendar(df, date_column, config)?;
    Ok(df.lazy().select([
        text(trip::TRIP_ID),
        text(trip::BUSINESS_NAME),
        text(trip::FOREST_NAME),
        col(occurrence::YEAR),
        col(occurrence::MONTH),
        number(trip::TOTAL_CLIENTS).alias(occurrence::TOTAL_CLIENTS),
    ]))
}

/// Sources that record activities directly against a trip:
/// `trips(trip_id, business_name, forest_name, trip_date, total_clients)`
/// joined to `activities(trip_id, location_id, activity, clients)`.
pub(super) fn trip_activity_occurrences(
    source: &dyn TableSource,
    config: &ReportConfig,
    trips_table: &str,
    activities_table: &str,
) -> Result<Option<OccurrenceSet>, UsageError> {
    let trips = source.fetch(trips_table, config.business_predicate())?;
    if trips.height() == 0 {
        debug!("{trips_table}: no trips");
        return Ok(None);
    }
    let trips = trip_header(trips, trip::TRIP_DATE, config)?;

    let activities = source.fetch(activities_table, None)?;
    warn_unreadable_numbers(&activities, &[trip::CLIENTS])?;
    let activities = activities.lazy().select([
        text(trip::TRIP_ID),
        text(trip::LOCATION_ID),
        text(trip::ACTIVITY).alias(occurrence::RAW_ACTIVITY),
        number(trip::CLIENTS).alias(occurrence::ACTIVITY_CLIENTS),
    ]);

    finish(trips.join(
        activities,
        [col(trip::TRIP_ID)],
        [col(trip::TRIP_ID)],
        JoinArgs::new(JoinType::Inner),
    ))
}

/// Turn count columns into one row per (input row, column) with a positive
/// count, labelled with the column's raw activity.
pub(super) fn unpivot_counts(
    lf: LazyFrame,
    available: &DataFrame,
    columns: &[(&str, &str)],
) -> Result<Option<OccurrenceSet>, UsageError> {
    let names: Vec<&str> = columns.iter().map(|(column, _)| *column).collect();
    warn_unreadable_numbers(available, &names)?;

    let mut parts = Vec::new();
    for &(column, label) in columns {
        if available.column(column).is_err() {
            debug!("count column {column} absent; treating as zero");
            continue;
        }
        parts.push(project(
            lf.clone()
                .filter(number(column).gt(lit(0.0)))
                .with_columns([
                    lit(label).alias(occurrence::RAW_ACTIVITY),
                    number(column).alias(occurrence::ACTIVITY_CLIENTS),
                ]),
        ));
    }
    if parts.is_empty() {
        return Ok(None);
    }
    finish(concat(parts, UnionArgs::default())?)
}

/// A yes/no column on a monthly report and the client fields it implies.
pub(super) struct FlagColumn {
    pub flag: &'static str,
    pub raw_activity: &'static str,
    pub client_fields: &'static [&'static str],
}

/// Monthly aggregate sources: one row per report (business, location,
/// month) with a flag column per activity. Each set flag becomes one
/// occurrence whose client count is the sum of the flag's client fields.
pub(super) fn expand_monthly_flags(
    source: &dyn TableSource,
    config: &ReportConfig,
    table: &str,
    flags: &[FlagColumn],
) -> Result<Option<OccurrenceSet>, UsageError> {
    let df = source.fetch(table, config.business_predicate())?;
    if df.height() == 0 {
        debug!("{table}: no monthly reports");
        return Ok(None);
    }
    let mut numeric = vec![monthly::YEAR, monthly::MONTH, monthly::TOTAL_CLIENTS];
    numeric.extend(flags.iter().flat_map(|f| f.client_fields.iter().copied()));
    warn_unreadable_numbers(&df, &numeric)?;

    let (start, end) = config.date_range()?;
    let start_key = start.year() * 100 + start.month() as i32;
    let end_key = end.year() * 100 + end.month() as i32;
    let month_key = col(occurrence::YEAR) * lit(100) + col(occurrence::MONTH);

    let base = df
        .clone()
        .lazy()
        .with_columns([
            text(monthly::REPORT_ID).alias(occurrence::TRIP_ID),
            integer(monthly::YEAR).alias(occurrence::YEAR),
            integer(monthly::MONTH).alias(occurrence::MONTH),
            text(monthly::LOCATION_ID).alias(occurrence::LOCATION_ID),
            number(monthly::TOTAL_CLIENTS).alias(occurrence::TOTAL_CLIENTS),
        ])
        .filter(
            month_key
                .clone()
                .gt_eq(lit(start_key))
                .and(month_key.lt_eq(lit(end_key))),
        );

    let mut parts = Vec::new();
    for entry in flags {
        if df.column(entry.flag).is_err() {
            debug!("{table}: flag column {} absent", entry.flag);
            continue;
        }
        let clients = entry
            .client_fields
            .iter()
            .filter(|f| df.column(f).is_ok())
            .map(|f| number(f).fill_null(lit(0.0)))
            .reduce(|a, b| a + b)
            .unwrap_or_else(|| lit(NULL).cast(DataType::Float64));

        parts.push(project(
            base.clone().filter(truthy(entry.flag)).with_columns([
                lit(entry.raw_activity).alias(occurrence::RAW_ACTIVITY),
                clients.alias(occurrence::ACTIVITY_CLIENTS),
            ]),
        ));
    }
    if parts.is_empty() {
        return Ok(None);
    }
    finish(concat(parts, UnionArgs::default())?)
}
