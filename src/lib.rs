pub use cluster::{
    count_distinct, percentile, HotspotClusterer, HotspotFeature, KMeans, Partition, Partitioner,
};
pub use config::{
    ClusterCountPolicy, HotspotConfig, DEFAULT_K_DAY, DEFAULT_K_NIGHT, DEFAULT_MAX_BUFFER_M,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_BUFFER_M, DEFAULT_RESTARTS, DEFAULT_SEED,
    DEFAULT_SUBSAMPLE_CAP, DEFAULT_TOLERANCE,
};
pub use error::{HotspotError, HotspotResult};
pub use event::{
    parse_date, ClassifiedPoints, DateWindow, EventColumns, EventReader, EventRecord, LoadStats,
    PointSet,
};
pub use feature_collection::{feature_collection, save_feature_collection, write_feature_collection};
pub use geo::{
    great_circle_distance, meters_to_deg_lat, meters_to_deg_lon, square_ring, Coord, Ring, Vertex,
};
pub use kml::{save_kml, KmlFile, KmlWriter};
pub use pipeline::{build_hotspots, run, write_hotspots, Hotspots, OutputPaths, RunSummary};
pub use time_of_day::{is_night, TemporalClass, TimeOfDay};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod cluster;
mod config;
mod error;
mod event;
mod feature_collection;
mod geo;
mod kml;
mod pipeline;
mod time_of_day;
