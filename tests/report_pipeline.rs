//! End-to-end report runs over in-memory tables.
//!
//! Exercises: assemble → normalize → enrich → aggregate → combine → pivot,
//! with guided recreation, heliski and an icefield export that has no rows,
//! then hunting with the two monthly flag sources, then padded CSV exports.

use permit_usage::schema::{guided, heliski, hunting, icefield, location, mendenhall};
use permit_usage::{
    CsvSink, Dimension, DirectorySource, MemorySink, MemorySource, ReportConfig, ReportKind,
    ReportRunner, SourceSystem, Taxonomy, UsageError,
};
use polars::prelude::*;

// ── Fixtures ───────────────────────────────────────────────────────────

fn tables() -> MemorySource {
    MemorySource::new()
        .with_table(
            location::TABLE,
            df!(
                "location_id" => ["L1", "L2", "L3"],
                "use_location" => ["Mendenhall Glacier", "Mendenhall Lake", "Sawyer Glacier"],
                "full_name" => ["Juneau Icefield", "Juneau Icefield", "Taku Inlet Area"],
                "ranger_district" => ["Juneau", "Juneau", "Juneau"],
                "wilderness" => [None, None, Some("Tracy Arm-Fords Terror")]
            )
            .unwrap(),
        )
        .with_table(
            guided::TRIPS,
            df!(
                "trip_id" => ["T1", "T2"],
                "business_name" => ["Alaska Boat & Kayak", "Alaska Boat & Kayak"],
                "forest_name" => ["Tongass", "Tongass"]
            )
            .unwrap(),
        )
        .with_table(
            guided::DAYS,
            df!(
                "day_id" => ["D1", "D2"],
                "trip_id" => ["T1", "T2"],
                "trip_date" => ["2020-06-15", "2021-07-10"],
                "total_clients" => ["10", "10"]
            )
            .unwrap(),
        )
        .with_table(
            guided::STOPS,
            df!(
                "stop_id" => ["S1", "S2", "S3", "S4"],
                "day_id" => ["D1", "D1", "D2", "D2"],
                "location_id" => ["L1", "L2", "L1", "L3"]
            )
            .unwrap(),
        )
        .with_table(
            guided::ACTIVITIES,
            df!(
                "stop_id" => ["S1", "S2", "S3", "S4"],
                "activity" => ["Hiking", "Kayaking", "Hiking (Mendenhall form)", "Kayaking"],
                "clients" => ["6", "7", "6", "7"]
            )
            .unwrap(),
        )
        .with_table(
            heliski::TRIPS,
            df!(
                "trip_id" => ["HX"],
                "business_name" => ["Coastal Heli"],
                "forest_name" => ["Tongass"],
                "trip_date" => ["2021-02-01"],
                "total_clients" => ["4"]
            )
            .unwrap(),
        )
        .with_table(
            heliski::ACTIVITIES,
            df!(
                "trip_id" => ["HX", "HX"],
                "location_id" => ["L99", "L1"],
                "activity" => ["Heliski", "Snowshoe Safari"],
                "clients" => ["4", "2"]
            )
            .unwrap(),
        )
        .with_table(
            icefield::TABLE,
            df!(
                "report_id" => Vec::<&str>::new(),
                "business_name" => Vec::<&str>::new(),
                "year" => Vec::<i32>::new(),
                "month" => Vec::<i32>::new(),
                "location_id" => Vec::<&str>::new(),
                "total_clients" => Vec::<f64>::new()
            )
            .unwrap(),
        )
}

fn config() -> ReportConfig {
    ReportConfig::new(2019, 2021).with_sources(&[
        SourceSystem::GuidedRecreation,
        SourceSystem::Heliski,
        SourceSystem::Icefield,
    ])
}

fn cell(df: &DataFrame, key_column: &str, key: &str, year: &str) -> Option<f64> {
    let keys = df.column(key_column).unwrap().str().unwrap();
    let values = df.column(year).unwrap().f64().unwrap();
    (0..df.height())
        .find(|&i| keys.get(i) == Some(key))
        .and_then(|i| values.get(i))
}

// ── Clamping and fallbacks ─────────────────────────────────────────────

#[test]
fn same_use_area_is_clamped_to_the_day_total() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();
    let pivot = &output.table("Use Area").unwrap().pivot;

    // D1: 6 + 7 clients in one use area, but only 10 people on the day.
    // 2021 adds 6 from D2 and 2 from the heliski trip.
    assert_eq!(cell(pivot, "Use Area", "Juneau Icefield", "2020"), Some(10.0));
    assert_eq!(cell(pivot, "Use Area", "Juneau Icefield", "2021"), Some(8.0));
}

#[test]
fn different_use_areas_are_not_clamped_together() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();
    let pivot = &output.table("Use Area").unwrap().pivot;

    assert_eq!(cell(pivot, "Use Area", "Taku Inlet Area", "2021"), Some(7.0));
    assert_eq!(cell(pivot, "Use Area", "Taku Inlet Area", "2020"), None);
}

#[test]
fn mendenhall_hiking_and_hiking_share_an_activity() {
    let taxonomy = Taxonomy::builtin().unwrap();
    assert_eq!(
        taxonomy.normalize("Hiking (Mendenhall form)").as_str(),
        taxonomy.normalize("Hiking").as_str()
    );

    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::VisitationSummary)
        .unwrap();
    let pivot = &output.table("Activity").unwrap().pivot;
    assert_eq!(
        cell(pivot, "Activity", "Nature Tours - Remote Setting", "2021"),
        Some(6.0)
    );
}

#[test]
fn unknown_location_still_reaches_the_combined_table() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();

    let combined = output.table("Use Area").unwrap().combined.frame();
    let areas = combined.column("use_area").unwrap().str().unwrap();
    let sources = combined.column("source").unwrap().str().unwrap();
    let hit = (0..combined.height())
        .find(|&i| areas.get(i) == Some("Use Area Unknown"))
        .expect("unknown use area row");
    assert_eq!(sources.get(hit), Some("Heliski"));
    assert_eq!(output.quality.unmatched_location_rows, 1);
}

#[test]
fn empty_source_contributes_nothing_and_does_not_fail() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();

    assert_eq!(output.quality.empty_sources, vec![SourceSystem::Icefield]);
    let combined = output.table("Activity").unwrap().combined.frame();
    let sources: Vec<Option<&str>> = combined
        .column("source")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert!(sources.contains(&Some("Guided Recreation")));
    assert!(sources.contains(&Some("Heliski")));
    assert!(!sources.contains(&Some("Icefield")));
}

// ── Report-level behaviour ─────────────────────────────────────────────

#[test]
fn every_year_in_range_is_present() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();

    for table in &output.tables {
        let years = table.combined.years_present().unwrap();
        assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2019, 2020, 2021], "{}", table.name);
        let names: Vec<&str> = table
            .pivot
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str())
            .collect();
        assert!(names.ends_with(&["2019", "2020", "2021"]), "{}", table.name);
    }
}

#[test]
fn unmapped_labels_are_kept_and_reported() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::VisitationSummary)
        .unwrap();

    let pivot = &output.table("Activity").unwrap().pivot;
    assert_eq!(cell(pivot, "Activity", "Snowshoe Safari", "2021"), Some(2.0));
    assert_eq!(output.quality.unmapped_activities.len(), 1);
    assert_eq!(output.quality.unmapped_activities[0].label, "Snowshoe Safari");
}

#[test]
fn wilderness_summary_only_counts_wilderness_rows() {
    let source = tables();
    let output = ReportRunner::new(&source, config())
        .unwrap()
        .run(ReportKind::WildernessSummary)
        .unwrap();

    let pivot = &output.table("Wilderness").unwrap().pivot;
    assert_eq!(pivot.height(), 1);
    assert_eq!(
        cell(pivot, "Wilderness", "Tracy Arm-Fords Terror", "2021"),
        Some(7.0)
    );
    let by_location = &output.table("Wilderness by Use Location").unwrap().pivot;
    assert_eq!(by_location.height(), 1);
}

#[test]
fn nothing_in_range_short_circuits() {
    let source = tables();
    let config = ReportConfig::new(2010, 2011).with_sources(&[
        SourceSystem::GuidedRecreation,
        SourceSystem::Heliski,
        SourceSystem::Icefield,
    ]);
    let result = ReportRunner::new(&source, config)
        .unwrap()
        .run(ReportKind::FiveYearReview);
    assert!(matches!(
        result,
        Err(UsageError::NoActivities {
            start_year: 2010,
            end_year: 2011
        })
    ));
}

#[test]
fn missing_table_is_fatal() {
    let source = tables();
    let config = ReportConfig::new(2019, 2021).with_sources(&[SourceSystem::Mendenhall]);
    let result = ReportRunner::new(&source, config)
        .unwrap()
        .run(ReportKind::FiveYearReview);
    assert!(matches!(result, Err(UsageError::MissingTable(t)) if t == "mendenhall_monthly"));
}

#[test]
fn business_filter_limits_every_source() {
    let source = tables();
    let output = ReportRunner::new(&source, config().with_business("Coastal Heli"))
        .unwrap()
        .run(ReportKind::AllocationStatus)
        .unwrap();

    let pivot = &output.table("Use Area by Business").unwrap().pivot;
    let businesses: Vec<Option<&str>> = pivot
        .column(Dimension::Business.label())
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert!(businesses.iter().all(|b| *b == Some("Coastal Heli")));
    assert!(output
        .quality
        .empty_sources
        .contains(&SourceSystem::GuidedRecreation));
}

#[test]
fn grand_total_and_sinks() {
    let source = tables();
    let output = ReportRunner::new(&source, config().with_grand_total(true))
        .unwrap()
        .run(ReportKind::VisitationSummary)
        .unwrap();

    let mut sink = MemorySink::new();
    output.write_to(&mut sink).unwrap();
    let season = sink.sheet("Season").unwrap();
    assert!(season.column("Total").is_ok());
    assert!(sink.sheet("Data Quality").is_some());

    let dir = std::env::temp_dir().join(format!("permit-usage-{}", std::process::id()));
    let mut csv = CsvSink::new(&dir).unwrap();
    output.write_to(&mut csv).unwrap();
    assert!(dir.join("activity.csv").exists());
    assert!(dir.join("data_quality.csv").exists());
    std::fs::remove_dir_all(&dir).unwrap();
}

// ── Hunting and monthly sources ────────────────────────────────────────

fn field_tables() -> MemorySource {
    MemorySource::new()
        .with_table(
            location::TABLE,
            df!(
                "location_id" => ["L1", "L3", "L4", "L5"],
                "use_location" => ["Mendenhall Glacier", "Sawyer Glacier", "Admiralty West", "Mendenhall Lake"],
                "full_name" => ["Juneau Icefield", "Taku Inlet Area", "Admiralty Island", "Mendenhall Lake Area"],
                "ranger_district" => ["Juneau", "Juneau", "Admiralty", "Juneau"],
                "wilderness" => [None, Some("Tracy Arm-Fords Terror"), None, None]
            )
            .unwrap(),
        )
        .with_table(
            hunting::TRIPS,
            df!(
                "trip_id" => ["H1"],
                "business_name" => ["Admiralty Outfitters"],
                "forest_name" => ["Tongass"],
                "start_date" => ["2021-09-12"],
                "total_clients" => ["2"]
            )
            .unwrap(),
        )
        .with_table(
            hunting::LOCATIONS,
            df!(
                "trip_id" => ["H1", "H1"],
                "location_id" => ["L4", "L4"],
                "waterfowl" => ["2", "2"],
                "bear" => ["1", "1"]
            )
            .unwrap(),
        )
        .with_table(
            icefield::TABLE,
            df!(
                "report_id" => ["R1", "R1"],
                "business_name" => ["Icefield Treks", "Icefield Treks"],
                "year" => ["2021", "2021"],
                "month" => ["7", "7"],
                "location_id" => ["L1", "L3"],
                "total_clients" => ["5", ""],
                "land_tour" => ["Y", "N"],
                "glacier_trek_clients" => ["3", ""],
                "hike_clients" => ["1", ""],
                "dog_sled" => ["N", "Y"],
                "dog_sled_clients" => ["", "2"]
            )
            .unwrap(),
        )
        .with_table(
            mendenhall::TABLE,
            df!(
                "report_id" => ["M1"],
                "business_name" => ["Lake Tours"],
                "year" => ["2020"],
                "month" => ["6"],
                "location_id" => ["L5"],
                "total_clients" => ["8"],
                "canoe" => ["Y"],
                "canoe_clients" => ["5"],
                "hike" => ["Y"],
                "hike_clients" => ["4"]
            )
            .unwrap(),
        )
}

fn field_config() -> ReportConfig {
    ReportConfig::new(2019, 2021).with_sources(&[
        SourceSystem::Hunting,
        SourceSystem::Icefield,
        SourceSystem::Mendenhall,
    ])
}

#[test]
fn hunts_are_summed_apart_from_clamped_service_days() {
    let source = field_tables();
    let output = ReportRunner::new(&source, field_config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();

    // Waterfowl 2 + 2 on a two-hunter trip clamps to 2; bear 1 + 1 is two hunts.
    let days = &output.table("Use Area").unwrap().pivot;
    assert_eq!(cell(days, "Use Area", "Admiralty Island", "2021"), Some(2.0));
    let hunts = &output.table("Use Area (Hunts)").unwrap().pivot;
    assert_eq!(cell(hunts, "Use Area", "Admiralty Island", "2021"), Some(2.0));
    assert_eq!(hunts.height(), 1);

    let activity_hunts = &output.table("Activity (Hunts)").unwrap().pivot;
    assert_eq!(cell(activity_hunts, "Activity", "Hunting - Bear", "2021"), Some(2.0));
    assert_eq!(
        cell(activity_hunts, "Activity", "Hunting - Small Game/Waterfowl/Wolf", "2021"),
        None
    );
    let activity = &output.table("Activity").unwrap().pivot;
    assert_eq!(
        cell(activity, "Activity", "Hunting - Small Game/Waterfowl/Wolf", "2021"),
        Some(2.0)
    );
    assert_eq!(cell(activity, "Activity", "Hunting - Bear", "2021"), None);

    let combined = output.table("Use Area (Hunts)").unwrap().combined.frame();
    assert!(combined.column("hunts").is_ok());
    assert!(combined.column("service_days").is_err());
}

#[test]
fn monthly_flags_become_activities() {
    let source = field_tables();
    let output = ReportRunner::new(&source, field_config())
        .unwrap()
        .run(ReportKind::FiveYearReview)
        .unwrap();

    // Land tour clients are glacier trek plus hike.
    let areas = &output.table("Use Area").unwrap().pivot;
    assert_eq!(cell(areas, "Use Area", "Juneau Icefield", "2021"), Some(4.0));
    assert_eq!(cell(areas, "Use Area", "Taku Inlet Area", "2021"), Some(2.0));
    // Canoe 5 and hike 4 on an eight-client report.
    assert_eq!(cell(areas, "Use Area", "Mendenhall Lake Area", "2020"), Some(8.0));

    let activity = &output.table("Activity").unwrap().pivot;
    assert_eq!(
        cell(activity, "Activity", "Nature Tours - Remote Setting", "2021"),
        Some(4.0)
    );
    assert_eq!(
        cell(activity, "Activity", "Nature Tours - Remote Setting", "2020"),
        Some(4.0)
    );
    assert_eq!(cell(activity, "Activity", "Boating", "2020"), Some(5.0));
    assert_eq!(cell(activity, "Activity", "Dog Sled Tours", "2021"), Some(2.0));
    assert!(output.quality.unmapped_activities.is_empty());
}

#[test]
fn inconsistent_trips_do_not_depend_on_the_report() {
    let source = field_tables();
    let runner = ReportRunner::new(&source, field_config()).unwrap();
    let expected = vec![(SourceSystem::Icefield, "R1".to_string())];

    for kind in [ReportKind::FiveYearReview, ReportKind::WildernessSummary] {
        let output = runner.run(kind).unwrap();
        assert_eq!(output.quality.inconsistent_trips, expected, "{kind}");
    }
}

// ── Directory exports ──────────────────────────────────────────────────

#[test]
fn padded_csv_counts_are_not_lost() {
    let dir = std::env::temp_dir().join(format!("permit-usage-csv-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("locations.csv"),
        "location_id,use_location,full_name,ranger_district\nL1,Mendenhall Glacier,Juneau Icefield,Juneau\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("heliski_trips.csv"),
        "trip_id,business_name,forest_name,trip_date,total_clients\nHX,Coastal Heli,Tongass,2021-02-01, 10 \n",
    )
    .unwrap();
    std::fs::write(
        dir.join("heliski_activities.csv"),
        "trip_id,location_id,activity,clients\nHX,L1,Heliski, 6 \n",
    )
    .unwrap();

    let source = DirectorySource::new(&dir);
    let config = ReportConfig::new(2021, 2021).with_sources(&[SourceSystem::Heliski]);
    let output = ReportRunner::new(&source, config)
        .unwrap()
        .run(ReportKind::VisitationSummary)
        .unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    let pivot = &output.table("Use Area").unwrap().pivot;
    assert_eq!(cell(pivot, "Use Area", "Juneau Icefield", "2021"), Some(6.0));
}
