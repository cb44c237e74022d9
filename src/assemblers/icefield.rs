use super::common::{expand_monthly_flags, FlagColumn};
use super::{Assembled, SourceAssembler, SourceSystem};
use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::schema::icefield;
use crate::source::TableSource;

const FLAGS: [FlagColumn; 4] = [
    FlagColumn {
        flag: icefield::LAND_TOUR,
        raw_activity: "Land Tour",
        client_fields: &[icefield::GLACIER_TREK_CLIENTS, icefield::HIKE_CLIENTS],
    },
    FlagColumn {
        flag: icefield::DOG_SLED,
        raw_activity: "Dog Sledding",
        client_fields: &[icefield::DOG_SLED_CLIENTS],
    },
    FlagColumn {
        flag: icefield::FLIGHTSEEING,
        raw_activity: "Flightseeing",
        client_fields: &[icefield::FLIGHTSEEING_CLIENTS],
    },
    FlagColumn {
        flag: icefield::HELI_LANDING,
        raw_activity: "Glacier Landing",
        client_fields: &[icefield::HELI_LANDING_CLIENTS],
    },
];

/// Icefield: monthly report rows with one yes/no flag per activity.
pub struct Icefield;

impl SourceAssembler for Icefield {
    fn system(&self) -> SourceSystem {
        SourceSystem::Icefield
    }

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        Ok(Assembled {
            occurrences: expand_monthly_flags(source, config, icefield::TABLE, &FLAGS)?,
            hunt_events: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::OccurrenceSet;
    use crate::schema::occurrence;
    use crate::source::MemorySource;
    use polars::prelude::*;

    fn clients_for(set: &OccurrenceSet, raw: &str) -> Vec<Option<f64>> {
        set.frame()
            .clone()
            .lazy()
            .filter(col(occurrence::RAW_ACTIVITY).eq(lit(raw)))
            .collect()
            .unwrap()
            .column(occurrence::ACTIVITY_CLIENTS)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn land_tour_sums_trek_and_hike_clients() {
        let source = MemorySource::new().with_table(
            icefield::TABLE,
            df!(
                "report_id" => ["R1", "R2", "R3"],
                "business_name" => ["Icefield Treks", "Icefield Treks", "Icefield Treks"],
                "forest_name" => ["Tongass", "Tongass", "Tongass"],
                "year" => ["2021", "2021", "2023"],
                "month" => ["7", "8", "7"],
                "location_id" => ["L1", "L1", "L1"],
                "total_clients" => ["30", "12", "5"],
                "land_tour" => ["Y", "N", "Y"],
                "glacier_trek_clients" => [Some("12"), None, Some("5")],
                "hike_clients" => [Some("9"), Some("4"), None],
                "dog_sled" => ["Y", "Y", "N"],
                "dog_sled_clients" => ["20", "12", "0"]
            )
            .unwrap(),
        );

        let set = Icefield
            .assemble(&source, &ReportConfig::new(2021, 2022))
            .unwrap()
            .occurrences
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(clients_for(&set, "Land Tour"), vec![Some(21.0)]);
        let mut sled = clients_for(&set, "Dog Sledding");
        sled.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sled, vec![Some(12.0), Some(20.0)]);
    }
}
