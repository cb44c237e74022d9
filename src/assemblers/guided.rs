use log::debug;
use polars::prelude::*;

use super::common::{finish, number, text, warn_unreadable_numbers, with_calendar};
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::schema::{guided, occurrence, trip};
use crate::source::TableSource;

/// Guided recreation: trip → day → stop → activity, recorded per day.
///
/// The day is the head-count grain, so the day id becomes the occurrence
/// `trip_id` and the day's `total_clients` is the ceiling.
pub struct GuidedRecreation;

impl SourceAssembler for GuidedRecreation {
    fn system(&self) -> SourceSystem {
        SourceSystem::GuidedRecreation
    }

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        let trips = source.fetch(guided::TRIPS, config.business_predicate())?;
        if trips.height() == 0 {
            debug!("{}: no trips", guided::TRIPS);
            return Ok(Assembled::default());
        }
        let trips = trips.lazy().select([
            text(guided::TRIP_ID),
            text(trip::BUSINESS_NAME),
            text(trip::FOREST_NAME),
        ]);

        let days = source.fetch(guided::DAYS, None)?;
        warn_unreadable_numbers(&days, &[guided::TOTAL_CLIENTS])?;
        let days = with_calendar(days, guided::TRIP_DATE, config)?;
        let days = days.lazy().select([
            text(guided::DAY_ID),
            text(guided::TRIP_ID),
            col(occurrence::YEAR),
            col(occurrence::MONTH),
            number(guided::TOTAL_CLIENTS).alias(occurrence::TOTAL_CLIENTS),
        ]);

        let stops = source.fetch(guided::STOPS, None)?.lazy().select([
            text(guided::STOP_ID),
            text(guided::DAY_ID),
            text(guided::LOCATION_ID),
        ]);

        let activities = source.fetch(guided::ACTIVITIES, None)?;
        warn_unreadable_numbers(&activities, &[guided::CLIENTS])?;
        let activities = activities.lazy().select([
            text(guided::STOP_ID),
            text(guided::ACTIVITY).alias(occurrence::RAW_ACTIVITY),
            number(guided::CLIENTS).alias(occurrence::ACTIVITY_CLIENTS),
        ]);

        let inner = || JoinArgs::new(JoinType::Inner);
        let joined = trips
            .join(days, [col(guided::TRIP_ID)], [col(guided::TRIP_ID)], inner())
            .join(stops, [col(guided::DAY_ID)], [col(guided::DAY_ID)], inner())
            .join(activities, [col(guided::STOP_ID)], [col(guided::STOP_ID)], inner())
            .with_column(col(guided::DAY_ID).alias(occurrence::TRIP_ID));

        Ok(Assembled {
            occurrences: finish(joined)?,
            hunt_events: None,
        })
    }
}
