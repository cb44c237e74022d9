//! Properties of the service-day clamp over generated occurrence sets.

use std::collections::HashMap;

use permit_usage::{aggregate, ActivityOccurrence, Dimension, OccurrenceSet};

// ── Helpers ────────────────────────────────────────────────────────────

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

const AREAS: [&str; 3] = ["Juneau Icefield", "Taku Inlet Area", "Use Area Unknown"];

fn row(trip: usize, year: i32, area: &str, total: f64, clients: f64) -> ActivityOccurrence {
    ActivityOccurrence {
        trip_id: format!("T{trip}"),
        year,
        month: Some(7),
        raw_activity: "Hiking".into(),
        activity: "Nature Tours - Remote Setting".into(),
        activity_mapped: true,
        location_id: None,
        use_location: "Use Location Other or Unknown".into(),
        use_area: area.into(),
        ranger_district: "Juneau".into(),
        wilderness: String::new(),
        season: "Summer".into(),
        business_name: "Above & Beyond".into(),
        forest_name: "Tongass".into(),
        total_clients_on_group_day: Some(total),
        activity_client_count: Some(clients),
    }
}

/// One trip per year so every cell has exactly one contributing trip.
fn generated(seed: u64) -> Vec<ActivityOccurrence> {
    let mut rng = Lcg(seed);
    let mut rows = Vec::new();
    for trip in 0..12 {
        let year = 2000 + trip as i32;
        let ceiling = 1.0 + rng.next(15) as f64;
        for _ in 0..1 + rng.next(5) {
            let area = AREAS[rng.next(AREAS.len() as u64) as usize];
            // A corrupted, lower ceiling on some rows; the trip max still wins.
            let total = if rng.next(4) == 0 { ceiling / 2.0 } else { ceiling };
            rows.push(row(trip, year, area, total, rng.next(12) as f64));
        }
        // Keep the true ceiling present on at least one row.
        rows.push(row(trip, year, AREAS[0], ceiling, 0.0));
    }
    rows
}

fn cells(table: &permit_usage::AggregateTable) -> HashMap<(String, i32), Option<f64>> {
    let df = table.frame();
    let keys = df.column("use_area").unwrap().str().unwrap();
    let years = df.column("year").unwrap().i32().unwrap();
    let days = df.column("service_days").unwrap().f64().unwrap();
    (0..df.height())
        .map(|i| {
            (
                (keys.get(i).unwrap().to_string(), years.get(i).unwrap()),
                days.get(i),
            )
        })
        .collect()
}

// ── Properties ─────────────────────────────────────────────────────────

#[test]
fn service_days_respect_the_trip_maximum() {
    for seed in 1..20 {
        let rows = generated(seed);
        let set = OccurrenceSet::from_records(&rows).unwrap();
        let table = aggregate(&set, &[Dimension::UseArea]).unwrap();

        let mut ceiling: HashMap<i32, f64> = HashMap::new();
        let mut raw: HashMap<(String, i32), f64> = HashMap::new();
        for r in &rows {
            let c = ceiling.entry(r.year).or_insert(0.0);
            *c = c.max(r.total_clients_on_group_day.unwrap());
            *raw.entry((r.use_area.clone(), r.year)).or_insert(0.0) +=
                r.activity_client_count.unwrap();
        }

        for ((area, year), value) in cells(&table) {
            let ceiling = ceiling[&year];
            let raw_sum = raw[&(area.clone(), year)];
            let expected = raw_sum.min(ceiling);
            if expected == 0.0 {
                assert_eq!(value, None, "seed {seed} {area} {year}");
            } else {
                assert_eq!(value, Some(expected), "seed {seed} {area} {year}");
                assert!(expected <= ceiling);
            }
        }
    }
}

#[test]
fn aggregation_is_idempotent() {
    let set = OccurrenceSet::from_records(&generated(7)).unwrap();
    for dims in [
        vec![Dimension::UseArea],
        vec![Dimension::Activity, Dimension::Season],
    ] {
        let first = aggregate(&set, &dims).unwrap();
        let second = aggregate(&set, &dims).unwrap();
        assert!(first.frame().equals_missing(second.frame()));
    }
}

#[test]
fn grouping_changes_what_gets_clamped() {
    // Two use areas on one 10-person trip: each area stays under the ceiling,
    // but grouped by activity the 13 clients clamp to 10.
    let rows = vec![
        row(1, 2020, "Juneau Icefield", 10.0, 6.0),
        row(1, 2020, "Taku Inlet Area", 10.0, 7.0),
    ];
    let set = OccurrenceSet::from_records(&rows).unwrap();

    let by_area = cells(&aggregate(&set, &[Dimension::UseArea]).unwrap());
    assert_eq!(by_area[&("Juneau Icefield".to_string(), 2020)], Some(6.0));
    assert_eq!(by_area[&("Taku Inlet Area".to_string(), 2020)], Some(7.0));

    let by_activity = aggregate(&set, &[Dimension::Activity]).unwrap();
    assert_eq!(
        by_activity
            .value(&["Nature Tours - Remote Setting"], 2020)
            .unwrap(),
        Some(10.0)
    );
}
