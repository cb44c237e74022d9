//! Joins occurrences to the location reference table.
//!
//! Rows whose location is unknown are kept with fallback attributes; client
//! counts must never disappear from downstream totals.

use log::{info, warn};
use polars::prelude::*;

use crate::config::SeasonScheme;
use crate::error::UsageError;
use crate::occurrence::{drop_existing, ordered_left_join, require_columns, OccurrenceSet};
use crate::schema::{fallback, location, occurrence};
use crate::source::TableSource;

// Prefixed so reference attributes never collide with occurrence columns.
const REF_PREFIX: &str = "_ref_";
const MATCHED: &str = "_ref_matched";

fn ref_col(name: &str) -> String {
    format!("{REF_PREFIX}{name}")
}

/// Null or empty-after-trim counts as missing.
fn present(name: &str) -> Expr {
    col(name)
        .is_not_null()
        .and(col(name).str().strip_chars(lit(" \t\r\n")).neq(lit("")))
}

fn first_present(candidates: &[&str], default: &str) -> Expr {
    candidates
        .iter()
        .rev()
        .fold(lit(default), |acc, name| {
            when(present(name)).then(col(*name)).otherwise(acc)
        })
}

/// Location attributes keyed by `location_id`, one row per id.
#[derive(Debug, Clone)]
pub struct LocationReference {
    frame: DataFrame,
}

impl LocationReference {
    pub fn from_frame(df: DataFrame) -> Result<Self, UsageError> {
        require_columns(&df, &[location::LOCATION_ID])?;
        let rows_in = df.height();

        let mut lazy = df.lazy();
        for name in location::OPTIONAL {
            lazy = lazy.with_column(lit(NULL).cast(DataType::String).alias(ref_col(name)));
        }
        let frame = Self::select_attributes(lazy)?;
        if frame.height() < rows_in {
            warn!(
                "location reference has {} duplicate ids; keeping the first row of each",
                rows_in - frame.height()
            );
        }
        Ok(Self { frame })
    }

    /// Load the `locations` table.
    pub fn load(source: &dyn TableSource) -> Result<Self, UsageError> {
        let df = source.fetch(location::TABLE, None)?;
        info!("loaded {} location reference rows", df.height());
        Self::from_frame(df)
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    fn select_attributes(lazy: LazyFrame) -> Result<DataFrame, UsageError> {
        // Attributes the caller supplied overwrite the null placeholders.
        let available = lazy.clone().limit(0).collect()?;
        let mut aggs = Vec::new();
        for name in location::OPTIONAL {
            let source_col = if available.column(name).is_ok() {
                col(name).cast(DataType::String)
            } else {
                col(ref_col(name))
            };
            aggs.push(source_col.first().alias(ref_col(name)));
        }

        Ok(lazy
            .with_column(col(location::LOCATION_ID).cast(DataType::String))
            .group_by_stable([col(location::LOCATION_ID)])
            .agg(aggs)
            .with_column(lit(true).alias(MATCHED))
            .collect()?)
    }
}

/// Outcome of [`enrich`].
#[derive(Debug, Clone)]
pub struct Enriched {
    pub occurrences: OccurrenceSet,
    /// Rows whose `location_id` was absent from the reference table.
    pub unmatched_rows: usize,
}

/// Attach use location, use area, ranger district, wilderness and season.
///
/// `use_area` prefers the full name, then the zone name. `season` prefers the
/// location's own season, then the occurrence month under `scheme`.
pub fn enrich(
    set: &OccurrenceSet,
    reference: &LocationReference,
    scheme: SeasonScheme,
) -> Result<Enriched, UsageError> {
    let base = drop_existing(
        set.frame().clone(),
        &[
            occurrence::USE_LOCATION,
            occurrence::USE_AREA,
            occurrence::RANGER_DISTRICT,
            occurrence::WILDERNESS,
            occurrence::SEASON,
        ],
    )?;
    let base = base
        .lazy()
        .with_column(col(occurrence::LOCATION_ID).cast(DataType::String))
        .collect()?;

    let joined = ordered_left_join(base, reference.frame.clone().lazy(), occurrence::LOCATION_ID)?;

    let unmatched_rows = joined.column(MATCHED)?.null_count();
    if unmatched_rows > 0 {
        warn!("{unmatched_rows} occurrence rows reference unknown locations; using fallbacks");
    }

    let use_location = ref_col(location::USE_LOCATION);
    let full_name = ref_col(location::FULL_NAME);
    let zone_name = ref_col(location::ZONE_NAME);
    let district = ref_col(location::RANGER_DISTRICT);
    let wilderness = ref_col(location::WILDERNESS);
    let season = ref_col(location::SEASON);
    let month_season = "_month_season";

    let enriched = joined
        .lazy()
        .with_column(scheme.season_expr(occurrence::MONTH).alias(month_season))
        .with_columns([
            first_present(&[use_location.as_str()], fallback::USE_LOCATION)
                .alias(occurrence::USE_LOCATION),
            first_present(&[full_name.as_str(), zone_name.as_str()], fallback::USE_AREA)
                .alias(occurrence::USE_AREA),
            first_present(&[district.as_str()], fallback::RANGER_DISTRICT)
                .alias(occurrence::RANGER_DISTRICT),
            first_present(&[wilderness.as_str()], fallback::WILDERNESS)
                .alias(occurrence::WILDERNESS),
            first_present(&[season.as_str(), month_season], fallback::SEASON)
                .alias(occurrence::SEASON),
        ])
        .collect()?;

    let enriched = drop_existing(
        enriched,
        &[
            use_location.as_str(),
            full_name.as_str(),
            zone_name.as_str(),
            district.as_str(),
            wilderness.as_str(),
            season.as_str(),
            MATCHED,
            month_season,
        ],
    )?;

    Ok(Enriched {
        occurrences: OccurrenceSet::from_frame(enriched)?,
        unmatched_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::fixtures::occurrence;

    fn reference() -> LocationReference {
        LocationReference::from_frame(
            df!(
                "location_id" => ["L1", "L2", "L3"],
                "use_location" => [Some("Mendenhall Glacier"), Some("Taku Inlet"), None],
                "full_name" => [Some("Juneau Icefield"), None, Some("  ")],
                "zone_name" => [Some("Zone 1"), Some("Zone 2"), None],
                "ranger_district" => [Some("Juneau"), None, Some("Admiralty")],
                "wilderness" => [None, Some("Tracy Arm-Fords Terror"), None]
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn at(location: Option<&str>) -> crate::occurrence::ActivityOccurrence {
        let mut row = occurrence("T1", 2021, 4.0, 4.0);
        row.location_id = location.map(str::to_string);
        row
    }

    #[test]
    fn use_area_falls_back_in_order() {
        let set =
            OccurrenceSet::from_records(&[at(Some("L1")), at(Some("L2")), at(Some("L3"))]).unwrap();
        let out = enrich(&set, &reference(), SeasonScheme::FiveSeason).unwrap();
        let rows = out.occurrences.records().unwrap();

        assert_eq!(out.unmatched_rows, 0);
        assert_eq!(rows[0].use_area, "Juneau Icefield");
        assert_eq!(rows[1].use_area, "Zone 2");
        assert_eq!(rows[2].use_area, "Use Area Unknown");
        assert_eq!(rows[1].ranger_district, "Ranger District Unknown");
        assert_eq!(rows[2].use_location, "Use Location Other or Unknown");
        assert_eq!(rows[1].wilderness, "Tracy Arm-Fords Terror");
        assert_eq!(rows[0].wilderness, "");
    }

    #[test]
    fn unknown_location_is_kept_with_defaults() {
        let set = OccurrenceSet::from_records(&[at(Some("L1")), at(Some("L99")), at(None)]).unwrap();
        let out = enrich(&set, &reference(), SeasonScheme::FiveSeason).unwrap();
        let rows = out.occurrences.records().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(out.unmatched_rows, 2);
        assert_eq!(rows[1].use_area, "Use Area Unknown");
        assert_eq!(rows[1].ranger_district, "Ranger District Unknown");
        assert_eq!(rows[2].use_location, "Use Location Other or Unknown");
        assert_eq!(rows[1].activity_client_count, Some(4.0));
    }

    #[test]
    fn duplicate_reference_ids_do_not_multiply_rows() {
        let reference = LocationReference::from_frame(
            df!(
                "location_id" => ["L1", "L1"],
                "full_name" => ["First", "Second"]
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(reference.len(), 1);

        let set = OccurrenceSet::from_records(&[at(Some("L1"))]).unwrap();
        let rows = enrich(&set, &reference, SeasonScheme::FiveSeason)
            .unwrap()
            .occurrences
            .records()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].use_area, "First");
    }

    #[test]
    fn season_comes_from_location_then_month() {
        let reference = LocationReference::from_frame(
            df!(
                "location_id" => ["L1", "L2"],
                "season" => [Some("Winter"), None]
            )
            .unwrap(),
        )
        .unwrap();
        let mut spring = at(Some("L2"));
        spring.month = Some(4);
        let mut undated = at(Some("L2"));
        undated.month = None;
        let set = OccurrenceSet::from_records(&[at(Some("L1")), spring, undated]).unwrap();

        let rows = enrich(&set, &reference, SeasonScheme::FiveSeason)
            .unwrap()
            .occurrences
            .records()
            .unwrap();
        assert_eq!(rows[0].season, "Winter");
        assert_eq!(rows[1].season, "Early Spring");
        assert_eq!(rows[2].season, "Season Unknown");
    }
}
