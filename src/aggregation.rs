use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::occurrence::{require_columns, HuntEvents, OccurrenceSet};
use crate::schema::{aggregate, occurrence};

const TRIP_CEILING: &str = "_trip_ceiling";
const RAW_SUM: &str = "_raw_sum";
const CEILING_VALUES: &str = "_ceiling_values";

/// A field occurrences can be grouped along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Activity,
    UseLocation,
    UseArea,
    Wilderness,
    RangerDistrict,
    Season,
    Business,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Self::Activity,
        Self::UseLocation,
        Self::UseArea,
        Self::Wilderness,
        Self::RangerDistrict,
        Self::Season,
        Self::Business,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Activity => occurrence::ACTIVITY,
            Self::UseLocation => occurrence::USE_LOCATION,
            Self::UseArea => occurrence::USE_AREA,
            Self::Wilderness => occurrence::WILDERNESS,
            Self::RangerDistrict => occurrence::RANGER_DISTRICT,
            Self::Season => occurrence::SEASON,
            Self::Business => occurrence::BUSINESS_NAME,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Activity => "Activity",
            Self::UseLocation => "Use Location",
            Self::UseArea => "Use Area",
            Self::Wilderness => "Wilderness",
            Self::RangerDistrict => "Ranger District",
            Self::Season => "Season",
            Self::Business => "Business",
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|d| d.column() == wanted || d.label().to_lowercase().replace(' ', "_") == wanted)
            .ok_or_else(|| {
                UsageError::InvalidConfig(format!(
                    "Invalid dimension: '{s}'. Must be one of activity, use_location, use_area, \
                     wilderness, ranger_district, season, business"
                ))
            })
    }
}

/// What an aggregate's measure column counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Client days, clamped to each trip's head-count.
    ServiceDays,
    /// Hunt events, summed as recorded.
    Hunts,
}

impl Measure {
    pub fn column(self) -> &'static str {
        match self {
            Self::ServiceDays => aggregate::SERVICE_DAYS,
            Self::Hunts => aggregate::HUNTS,
        }
    }
}

/// `(group_key..., year) -> measure`, sorted by key then year.
///
/// Zero and null measures are stored as null: no activity, not "nobody came".
#[derive(Debug, Clone)]
pub struct AggregateTable {
    frame: DataFrame,
    dimensions: Vec<Dimension>,
    measure: Measure,
}

impl AggregateTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Measure value for one key and year, if that row exists.
    pub fn value(&self, key: &[&str], year: i32) -> Result<Option<f64>, UsageError> {
        if key.len() != self.dimensions.len() {
            return Err(UsageError::General(format!(
                "expected {} key values, got {}",
                self.dimensions.len(),
                key.len()
            )));
        }
        let predicate = self
            .dimensions
            .iter()
            .zip(key)
            .fold(col(occurrence::YEAR).eq(lit(year)), |acc, (d, v)| {
                acc.and(col(d.column()).eq(lit(*v)))
            });
        let hit = self.frame.clone().lazy().filter(predicate).collect()?;
        if hit.height() == 0 {
            return Ok(None);
        }
        Ok(hit.column(self.measure.column())?.f64()?.get(0))
    }
}

fn key_exprs(dimensions: &[Dimension]) -> Vec<Expr> {
    dimensions.iter().map(|d| col(d.column())).collect()
}

fn check_dimensions(set: &OccurrenceSet, dimensions: &[Dimension]) -> Result<(), UsageError> {
    if dimensions.is_empty() {
        return Err(UsageError::InvalidConfig(
            "aggregation needs at least one dimension".into(),
        ));
    }
    let columns: Vec<&str> = dimensions.iter().map(|d| d.column()).collect();
    require_columns(set.frame(), &columns)
}

/// Null out zero and null totals, then sort.
fn finalize(lf: LazyFrame, dimensions: &[Dimension], measure: Measure) -> Result<AggregateTable, UsageError> {
    let m = measure.column();
    let mut order: Vec<String> = dimensions.iter().map(|d| d.column().to_string()).collect();
    order.push(occurrence::YEAR.to_string());

    let frame = lf
        .with_column(
            when(col(m).eq(lit(0.0)).or(col(m).is_null()))
                .then(lit(NULL).cast(DataType::Float64))
                .otherwise(col(m))
                .alias(m),
        )
        .sort(order, SortMultipleOptions::default())
        .collect()?;

    Ok(AggregateTable {
        frame,
        dimensions: dimensions.to_vec(),
        measure,
    })
}

/// Service days per `(group_key, year)`.
///
/// For every `(trip_id, group_key)`: the ceiling is the largest
/// `total_clients_on_group_day` seen anywhere on that trip, the raw sum is the
/// sum of `activity_client_count`, and the group's service days are the raw
/// sum clamped to the ceiling. Groups are then summed per key and year.
pub fn aggregate(
    set: &OccurrenceSet,
    dimensions: &[Dimension],
) -> Result<AggregateTable, UsageError> {
    check_dimensions(set, dimensions)?;
    debug!(
        "aggregating {} occurrences by {:?}",
        set.len(),
        dimensions
    );

    let mut trip_keys = vec![col(occurrence::TRIP_ID)];
    trip_keys.extend(key_exprs(dimensions));
    let mut out_keys = key_exprs(dimensions);
    out_keys.push(col(occurrence::YEAR));

    let per_trip = set
        .frame()
        .clone()
        .lazy()
        .with_column(
            col(occurrence::TOTAL_CLIENTS)
                .cast(DataType::Float64)
                .max()
                .over([col(occurrence::TRIP_ID)])
                .alias(TRIP_CEILING),
        )
        .group_by_stable(trip_keys)
        .agg([
            col(occurrence::YEAR).first(),
            col(TRIP_CEILING).first(),
            col(occurrence::ACTIVITY_CLIENTS)
                .cast(DataType::Float64)
                .sum()
                .alias(RAW_SUM),
        ])
        .with_column(
            when(col(RAW_SUM).gt(col(TRIP_CEILING)))
                .then(col(TRIP_CEILING))
                .otherwise(col(RAW_SUM))
                .alias(aggregate::SERVICE_DAYS),
        );

    let grouped = per_trip
        .group_by_stable(out_keys)
        .agg([col(aggregate::SERVICE_DAYS).sum()]);

    finalize(grouped, dimensions, Measure::ServiceDays)
}

/// Hunt events per `(group_key, year)`: a plain sum, never clamped.
pub fn aggregate_events(
    events: &HuntEvents,
    dimensions: &[Dimension],
) -> Result<AggregateTable, UsageError> {
    let set = events.occurrences();
    check_dimensions(set, dimensions)?;

    let mut out_keys = key_exprs(dimensions);
    out_keys.push(col(occurrence::YEAR));

    let grouped = set
        .frame()
        .clone()
        .lazy()
        .group_by_stable(out_keys)
        .agg([col(occurrence::ACTIVITY_CLIENTS)
            .cast(DataType::Float64)
            .sum()
            .alias(aggregate::HUNTS)]);

    finalize(grouped, dimensions, Measure::Hunts)
}

/// Trip ids whose rows disagree on `total_clients_on_group_day`.
///
/// A missing value disagrees with a present one. Aggregation still uses the
/// largest value; this only surfaces the rows.
pub fn inconsistent_trip_totals(set: &OccurrenceSet) -> Result<Vec<String>, UsageError> {
    let df = set
        .frame()
        .clone()
        .lazy()
        .with_column(col(occurrence::TOTAL_CLIENTS).cast(DataType::Float64))
        .group_by_stable([col(occurrence::TRIP_ID)])
        .agg([col(occurrence::TOTAL_CLIENTS).n_unique().alias(CEILING_VALUES)])
        .filter(col(CEILING_VALUES).gt(lit(1)))
        .collect()?;

    let ids: Vec<String> = df
        .column(occurrence::TRIP_ID)?
        .as_materialized_series()
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

    if !ids.is_empty() {
        warn!(
            "{} trips report different total clients across rows; using the largest",
            ids.len()
        );
    }
    Ok(ids)
}
