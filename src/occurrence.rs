use polars::prelude::*;

use crate::error::UsageError;
use crate::schema::occurrence::*;

/// One recorded activity row, the unit the aggregator consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOccurrence {
    pub trip_id: String,
    pub year: i32,
    pub month: Option<i32>,
    pub raw_activity: String,
    pub activity: String,
    pub activity_mapped: bool,
    pub location_id: Option<String>,
    pub use_location: String,
    pub use_area: String,
    pub ranger_district: String,
    pub wilderness: String,
    pub season: String,
    pub business_name: String,
    pub forest_name: String,
    pub total_clients_on_group_day: Option<f64>,
    pub activity_client_count: Option<f64>,
}

/// A table of activity occurrences.
///
/// Assemblers produce sets holding only [`ASSEMBLED`] columns; normalization
/// and enrichment add the [`DERIVED`] ones. Each stage returns a new set.
#[derive(Debug, Clone)]
pub struct OccurrenceSet {
    frame: DataFrame,
}

impl OccurrenceSet {
    /// Wrap a frame that carries at least the assembled columns.
    pub fn from_frame(frame: DataFrame) -> Result<Self, UsageError> {
        require_columns(&frame, &ASSEMBLED)?;
        Ok(Self { frame })
    }

    pub fn from_records(records: &[ActivityOccurrence]) -> Result<Self, UsageError> {
        macro_rules! column {
            ($name:expr, $field:ident) => {
                Column::new(
                    $name.into(),
                    records.iter().map(|r| r.$field.clone()).collect::<Vec<_>>(),
                )
            };
        }

        let frame = DataFrame::new(vec![
            column!(TRIP_ID, trip_id),
            column!(YEAR, year),
            column!(MONTH, month),
            column!(RAW_ACTIVITY, raw_activity),
            column!(LOCATION_ID, location_id),
            column!(BUSINESS_NAME, business_name),
            column!(FOREST_NAME, forest_name),
            column!(TOTAL_CLIENTS, total_clients_on_group_day),
            column!(ACTIVITY_CLIENTS, activity_client_count),
            column!(ACTIVITY, activity),
            column!(ACTIVITY_MAPPED, activity_mapped),
            column!(USE_LOCATION, use_location),
            column!(USE_AREA, use_area),
            column!(RANGER_DISTRICT, ranger_district),
            column!(WILDERNESS, wilderness),
            column!(SEASON, season),
        ])?;
        Self::from_frame(frame)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn is_enriched(&self) -> bool {
        DERIVED.iter().all(|c| self.frame.column(c).is_ok())
    }

    /// Keep only rows matching `predicate`.
    pub fn filter(&self, predicate: Expr) -> Result<Self, UsageError> {
        let frame = self.frame.clone().lazy().filter(predicate).collect()?;
        Ok(Self { frame })
    }

    /// Row view of an enriched set.
    pub fn records(&self) -> Result<Vec<ActivityOccurrence>, UsageError> {
        require_columns(&self.frame, &DERIVED)?;
        let df = &self.frame;
        let text = |name: &str| -> Result<StringChunked, UsageError> {
            Ok(df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::String)?
                .str()?
                .clone())
        };
        let number = |name: &str| -> Result<Float64Chunked, UsageError> {
            Ok(df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .clone())
        };
        let integer = |name: &str| -> Result<Int32Chunked, UsageError> {
            Ok(df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Int32)?
                .i32()?
                .clone())
        };

        let trip_id = text(TRIP_ID)?;
        let year = integer(YEAR)?;
        let month = integer(MONTH)?;
        let raw_activity = text(RAW_ACTIVITY)?;
        let activity = text(ACTIVITY)?;
        let mapped = df
            .column(ACTIVITY_MAPPED)?
            .as_materialized_series()
            .cast(&DataType::Boolean)?
            .bool()?
            .clone();
        let location_id = text(LOCATION_ID)?;
        let use_location = text(USE_LOCATION)?;
        let use_area = text(USE_AREA)?;
        let ranger_district = text(RANGER_DISTRICT)?;
        let wilderness = text(WILDERNESS)?;
        let season = text(SEASON)?;
        let business_name = text(BUSINESS_NAME)?;
        let forest_name = text(FOREST_NAME)?;
        let total = number(TOTAL_CLIENTS)?;
        let clients = number(ACTIVITY_CLIENTS)?;

        let owned = |v: Option<&str>| v.unwrap_or_default().to_string();
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let year = year.get(i).ok_or_else(|| {
                UsageError::InvalidData(format!("Null year at row {i}"))
            })?;
            out.push(ActivityOccurrence {
                trip_id: owned(trip_id.get(i)),
                year,
                month: month.get(i),
                raw_activity: owned(raw_activity.get(i)),
                activity: owned(activity.get(i)),
                activity_mapped: mapped.get(i).unwrap_or(false),
                location_id: location_id.get(i).map(str::to_string),
                use_location: owned(use_location.get(i)),
                use_area: owned(use_area.get(i)),
                ranger_district: owned(ranger_district.get(i)),
                wilderness: owned(wilderness.get(i)),
                season: owned(season.get(i)),
                business_name: owned(business_name.get(i)),
                forest_name: owned(forest_name.get(i)),
                total_clients_on_group_day: total.get(i),
                activity_client_count: clients.get(i),
            });
        }
        Ok(out)
    }
}

/// Hunt events: occurrence-shaped rows whose `activity_client_count` holds a
/// number of hunts rather than a number of clients.
///
/// Kept as a separate type so the clamp rule can never be applied to it.
#[derive(Debug, Clone)]
pub struct HuntEvents(pub(crate) OccurrenceSet);

impl HuntEvents {
    pub fn new(set: OccurrenceSet) -> Self {
        Self(set)
    }

    pub fn occurrences(&self) -> &OccurrenceSet {
        &self.0
    }

    pub fn map<F>(&self, f: F) -> Result<Self, UsageError>
    where
        F: FnOnce(&OccurrenceSet) -> Result<OccurrenceSet, UsageError>,
    {
        Ok(Self(f(&self.0)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), UsageError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(UsageError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Drop any of `names` present in `df`.
pub(crate) fn drop_existing(mut df: DataFrame, names: &[&str]) -> Result<DataFrame, UsageError> {
    for name in names {
        if df.column(name).is_ok() {
            df = df.drop(name)?;
        }
    }
    Ok(df)
}

const ROW_ORDER: &str = "_row_order";

/// Left join on a single key column, keeping the left frame's row order.
pub(crate) fn ordered_left_join(
    left: DataFrame,
    right: LazyFrame,
    key: &str,
) -> Result<DataFrame, UsageError> {
    let joined = left
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(right, [col(key)], [col(key)], JoinArgs::new(JoinType::Left))
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .collect()?;
    Ok(joined.drop(ROW_ORDER)?)
}
