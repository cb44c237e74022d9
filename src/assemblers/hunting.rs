use log::debug;
use polars::prelude::*;

use super::common::{text, trip_header, unpivot_counts};
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::occurrence::HuntEvents;
use crate::schema::{hunting, occurrence};
use crate::source::TableSource;

/// Species columns count hunts, one per hunt.
const SPECIES: [(&str, &str); 6] = [
    (hunting::BEAR, "Bear"),
    (hunting::DEER, "Deer"),
    (hunting::ELK, "Elk"),
    (hunting::GOAT, "Goat"),
    (hunting::MOOSE, "Moose"),
    (hunting::SHEEP, "Sheep"),
];

/// Small game, waterfowl and wolf columns count clients (service days).
const SERVICE_DAY_HUNTS: [(&str, &str); 3] = [
    (hunting::SMALL_GAME, "Small Game"),
    (hunting::WATERFOWL, "Waterfowl"),
    (hunting::WOLF, "Wolf"),
];

/// Hunting: trip → location, with one count column per quarry.
///
/// Produces two separate measures: hunt events for the big-game species and
/// service-day occurrences for small game, waterfowl and wolf.
pub struct Hunting;

impl SourceAssembler for Hunting {
    fn system(&self) -> SourceSystem {
        SourceSystem::Hunting
    }

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        let trips = source.fetch(hunting::TRIPS, config.business_predicate())?;
        if trips.height() == 0 {
            debug!("{}: no trips", hunting::TRIPS);
            return Ok(Assembled::default());
        }
        let trips = trip_header(trips, hunting::START_DATE, config)?;

        let locations = source.fetch(hunting::LOCATIONS, None)?;
        let joined = trips.join(
            locations
                .clone()
                .lazy()
                .with_columns([
                    text(hunting::TRIP_ID),
                    text(hunting::LOCATION_ID).alias(occurrence::LOCATION_ID),
                ]),
            [col(hunting::TRIP_ID)],
            [col(hunting::TRIP_ID)],
            JoinArgs::new(JoinType::Inner),
        );

        let occurrences = unpivot_counts(joined.clone(), &locations, &SERVICE_DAY_HUNTS)?;
        let hunt_events = unpivot_counts(joined, &locations, &SPECIES)?.map(HuntEvents::new);

        Ok(Assembled {
            occurrences,
            hunt_events,
        })
    }
}
