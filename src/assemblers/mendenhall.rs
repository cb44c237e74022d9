use super::common::{expand_monthly_flags, FlagColumn};
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::schema::mendenhall;
use crate::source::TableSource;

const FLAGS: [FlagColumn; 4] = [
    FlagColumn {
        flag: mendenhall::CANOE,
        raw_activity: "Canoeing (Mendenhall form)",
        client_fields: &[mendenhall::CANOE_CLIENTS],
    },
    FlagColumn {
        flag: mendenhall::HIKE,
        raw_activity: "Hiking (Mendenhall form)",
        client_fields: &[mendenhall::HIKE_CLIENTS],
    },
    FlagColumn {
        flag: mendenhall::TRANSPORT,
        raw_activity: "Visitor Center Transport (Mendenhall form)",
        client_fields: &[mendenhall::TRANSPORT_CLIENTS],
    },
    FlagColumn {
        flag: mendenhall::ROAD_TOUR,
        raw_activity: "Road Based Nature Tour (Mendenhall form)",
        client_fields: &[mendenhall::ROAD_TOUR_CLIENTS],
    },
];

/// Mendenhall Glacier recreation area: monthly report rows with flags.
pub struct Mendenhall;

impl SourceAssembler for Mendenhall {
    fn system(&self) -> SourceSystem {
        SourceSystem::Mendenhall
    }

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        Ok(Assembled {
            occurrences: expand_monthly_flags(source, config, mendenhall::TABLE, &FLAGS)?,
            hunt_events: None,
        })
    }
}
