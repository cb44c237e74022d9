/// Column and table name constants for permit-usage.
/// Single source of truth - exported to Python via PyO3.

// ── Activity occurrence columns ─────────────────────────────────────────────
pub mod occurrence {
    pub const TRIP_ID: &str = "trip_id";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const RAW_ACTIVITY: &str = "raw_activity";
    pub const ACTIVITY: &str = "activity";
    pub const ACTIVITY_MAPPED: &str = "activity_mapped";
    pub const LOCATION_ID: &str = "location_id";
    pub const USE_LOCATION: &str = "use_location";
    pub const USE_AREA: &str = "use_area";
    pub const RANGER_DISTRICT: &str = "ranger_district";
    pub const WILDERNESS: &str = "wilderness";
    pub const SEASON: &str = "season";
    pub const BUSINESS_NAME: &str = "business_name";
    pub const FOREST_NAME: &str = "forest_name";
    pub const TOTAL_CLIENTS: &str = "total_clients_on_group_day";
    pub const ACTIVITY_CLIENTS: &str = "activity_client_count";

    /// Columns every assembler emits, in order.
    pub const ASSEMBLED: [&str; 9] = [
        TRIP_ID,
        YEAR,
        MONTH,
        RAW_ACTIVITY,
        LOCATION_ID,
        BUSINESS_NAME,
        FOREST_NAME,
        TOTAL_CLIENTS,
        ACTIVITY_CLIENTS,
    ];

    /// Columns added by normalization and enrichment.
    pub const DERIVED: [&str; 7] = [
        ACTIVITY,
        ACTIVITY_MAPPED,
        USE_LOCATION,
        USE_AREA,
        RANGER_DISTRICT,
        WILDERNESS,
        SEASON,
    ];
}

// ── Location reference columns ──────────────────────────────────────────────
pub mod location {
    pub const TABLE: &str = "locations";
    pub const LOCATION_ID: &str = "location_id";
    pub const USE_LOCATION: &str = "use_location";
    pub const FULL_NAME: &str = "full_name";
    pub const ZONE_NAME: &str = "zone_name";
    pub const RANGER_DISTRICT: &str = "ranger_district";
    pub const WILDERNESS: &str = "wilderness";
    pub const SEASON: &str = "season";

    pub const OPTIONAL: [&str; 6] = [
        USE_LOCATION,
        FULL_NAME,
        ZONE_NAME,
        RANGER_DISTRICT,
        WILDERNESS,
        SEASON,
    ];
}

// ── Fallback values ─────────────────────────────────────────────────────────
pub mod fallback {
    pub const USE_LOCATION: &str = "Use Location Other or Unknown";
    pub const USE_AREA: &str = "Use Area Unknown";
    pub const RANGER_DISTRICT: &str = "Ranger District Unknown";
    pub const WILDERNESS: &str = "";
    pub const SEASON: &str = "Season Unknown";
    pub const ACTIVITY: &str = "Activity Unknown";
}

// ── Aggregate / combined table columns ──────────────────────────────────────
pub mod aggregate {
    pub const SERVICE_DAYS: &str = "service_days";
    pub const HUNTS: &str = "hunts";
    pub const SOURCE: &str = "source";
    pub const TOTAL: &str = "Total";
}

// ── Guided recreation tables (trip → day → stop → activity) ────────────────
pub mod guided {
    pub const TRIPS: &str = "guided_trips";
    pub const DAYS: &str = "guided_days";
    pub const STOPS: &str = "guided_stops";
    pub const ACTIVITIES: &str = "guided_activities";

    pub const TRIP_ID: &str = "trip_id";
    pub const DAY_ID: &str = "day_id";
    pub const STOP_ID: &str = "stop_id";
    pub const TRIP_DATE: &str = "trip_date";
    pub const LOCATION_ID: &str = "location_id";
    pub const TOTAL_CLIENTS: &str = "total_clients";
    pub const ACTIVITY: &str = "activity";
    pub const CLIENTS: &str = "clients";
}

// ── Hunting tables (trip → location) ────────────────────────────────────────
pub mod hunting {
    pub const TRIPS: &str = "hunting_trips";
    pub const LOCATIONS: &str = "hunting_locations";

    pub const TRIP_ID: &str = "trip_id";
    pub const START_DATE: &str = "start_date";
    pub const LOCATION_ID: &str = "location_id";
    pub const TOTAL_CLIENTS: &str = "total_clients";

    // Hunt counts per species.
    pub const BEAR: &str = "bear";
    pub const DEER: &str = "deer";
    pub const ELK: &str = "elk";
    pub const GOAT: &str = "goat";
    pub const MOOSE: &str = "moose";
    pub const SHEEP: &str = "sheep";

    // Client counts (service days).
    pub const SMALL_GAME: &str = "small_game";
    pub const WATERFOWL: &str = "waterfowl";
    pub const WOLF: &str = "wolf";
}

// ── Heliski tables (trip → activity) ────────────────────────────────────────
pub mod heliski {
    pub const TRIPS: &str = "heliski_trips";
    pub const ACTIVITIES: &str = "heliski_activities";
}

// ── Outfitting tables (trip → service) ──────────────────────────────────────
pub mod outfitting {
    pub const TRIPS: &str = "outfitting_trips";
    pub const SERVICES: &str = "outfitting_services";
}

// ── Shared trip-grain columns (heliski, outfitting) ─────────────────────────
pub mod trip {
    pub const TRIP_ID: &str = "trip_id";
    pub const TRIP_DATE: &str = "trip_date";
    pub const TOTAL_CLIENTS: &str = "total_clients";
    pub const LOCATION_ID: &str = "location_id";
    pub const ACTIVITY: &str = "activity";
    pub const CLIENTS: &str = "clients";
    pub const BUSINESS_NAME: &str = "business_name";
    pub const FOREST_NAME: &str = "forest_name";
}

// ── Monthly report tables (icefield, mendenhall) ────────────────────────────
pub mod monthly {
    pub const REPORT_ID: &str = "report_id";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const LOCATION_ID: &str = "location_id";
    pub const TOTAL_CLIENTS: &str = "total_clients";
}

pub mod icefield {
    pub const TABLE: &str = "icefield_monthly";

    pub const LAND_TOUR: &str = "land_tour";
    pub const GLACIER_TREK_CLIENTS: &str = "glacier_trek_clients";
    pub const HIKE_CLIENTS: &str = "hike_clients";
    pub const DOG_SLED: &str = "dog_sled";
    pub const DOG_SLED_CLIENTS: &str = "dog_sled_clients";
    pub const FLIGHTSEEING: &str = "flightseeing";
    pub const FLIGHTSEEING_CLIENTS: &str = "flightseeing_clients";
    pub const HELI_LANDING: &str = "heli_landing";
    pub const HELI_LANDING_CLIENTS: &str = "heli_landing_clients";
}

pub mod mendenhall {
    pub const TABLE: &str = "mendenhall_monthly";

    pub const CANOE: &str = "canoe";
    pub const CANOE_CLIENTS: &str = "canoe_clients";
    pub const HIKE: &str = "hike";
    pub const HIKE_CLIENTS: &str = "hike_clients";
    pub const TRANSPORT: &str = "transport";
    pub const TRANSPORT_CLIENTS: &str = "transport_clients";
    pub const ROAD_TOUR: &str = "road_tour";
    pub const ROAD_TOUR_CLIENTS: &str = "road_tour_clients";
}
