use super::common::trip_activity_occurrences;
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::schema::heliski;
use crate::source::TableSource;

/// Heliski: activities recorded directly against the trip.
pub struct Heliski;

impl SourceAssembler for Heliski {
    fn system(&self) -> SourceSystem {
        SourceSystem::Heliski
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
                heliski::TRIPS,
                heliski::ACTIVITIES,
            )?,
            hunt_events: None,
        })
    }
}
