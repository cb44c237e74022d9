use super::common::trip_activity_occurrences;
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::schema::outfitting;
use crate::source::TableSource;

/// Outfitting: services recorded directly against the trip.
pub struct Outfitting;

impl SourceAssembler for Outfitting {
    fn system(&self) -> SourceSystem {
        SourceSystem::Outfitting
    }

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        Ok(Assembled {
            occurrences: trip_activity_occurrences(
                source,
                config,
                outfitting::TRIPS,
                outfitting::SERVICES,
            )?,
            hunt_events: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::occurrence;
    use crate::source::MemorySource;
    use polars::prelude::*;

    #[test]
    fn trips_join_their_services() {
        let source = MemorySource::new()
            .with_table(
                outfitting::TRIPS,
                df!(
                    "trip_id" => [1i64, 2],
                    "business_name" => ["Drop Camps LLC", "Drop Camps LLC"],
                    "forest_name" => ["Chugach", "Chugach"],
                    "trip_date" => ["2022-09-10", "2022-09-18"],
                    "total_clients" => [3.0, 2.0]
                )
                .unwrap(),
            )
            .with_table(
                outfitting::SERVICES,
                df!(
                    "trip_id" => [1i64, 1, 2],
                    "location_id" => ["L4", "L5", "L4"],
                    "activity" => ["Drop Camp", "Equipment Rental", "Drop Camp"],
                    "clients" => [3.0, 1.0, 2.0]
                )
                .unwrap(),
            );

        let set = Outfitting
            .assemble(&source, &ReportConfig::new(2022, 2022))
            .unwrap()
            .occurrences
            .unwrap();
        assert_eq!(set.len(), 3);
        let clients = set.frame().column(occurrence::ACTIVITY_CLIENTS).unwrap().f64().unwrap();
        assert_eq!(clients.sum(), Some(6.0));
        let trip_ids = set.frame().column(occurrence::TRIP_ID).unwrap().str().unwrap();
        assert!(trip_ids.into_iter().all(|t| matches!(t, Some("1") | Some("2"))));
    }

    #[test]
    fn no_trips_yields_no_occurrences() {
        let source = MemorySource::new().with_table(
            outfitting::TRIPS,
            df!(
                "trip_id" => Vec::<String>::new(),
                "business_name" => Vec::<String>::new(),
                "forest_name" => Vec::<String>::new(),
                "trip_date" => Vec::<String>::new(),
                "total_clients" => Vec::<f64>::new()
            )
            .unwrap(),
        );
        let assembled = Outfitting
            .assemble(&source, &ReportConfig::new(2022, 2022))
            .unwrap();
        assert!(assembled.is_empty());
    }
}
