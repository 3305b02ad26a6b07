use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Convenience alias used throughout the crate.
pub type HotspotResult<T> = Result<T, HotspotError>;

/// Everything that can go wrong while building hotspots.
#[derive(Debug)]
pub enum HotspotError {
    /// Failure reading the input or writing an output file.
    Io(std::io::Error),
    /// The input table could not be parsed.
    Csv(csv::Error),
    /// A feature collection could not be serialized.
    Json(serde_json::Error),
    /// A required column was not found in the header of the input table.
    MissingColumn(String),
    /// A cluster count of zero was requested.
    InvalidClusterCount { requested: usize },
    /// More clusters were requested than there are distinct points to partition.
    TooManyClusters { requested: usize, distinct: usize },
    /// A longitude offset was requested at a latitude where it is undefined.
    PolarProjection { lat: f64 },
    /// A configuration or command line value made no sense.
    InvalidArgument(String),
    /// A worker thread died before reporting its result.
    WorkerPanicked(String),
}

impl Display for HotspotError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        use HotspotError::*;

        match self {
            Io(err) => write!(f, "i/o error: {}", err),
            Csv(err) => write!(f, "error reading input table: {}", err),
            Json(err) => write!(f, "error serializing geojson: {}", err),
            MissingColumn(name) => write!(f, "missing required column: {}", name),
            InvalidClusterCount { requested } => {
                write!(f, "invalid cluster count requested: {}", requested)
            }
            TooManyClusters {
                requested,
                distinct,
            } => write!(
                f,
                "requested {} clusters but only {} distinct points are available",
                requested, distinct
            ),
            PolarProjection { lat } => write!(
                f,
                "longitude offset is undefined at latitude {:.6} (too close to a pole)",
                lat
            ),
            InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            WorkerPanicked(name) => write!(f, "worker thread {} panicked", name),
        }
    }
}

impl Error for HotspotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HotspotError::Io(err) => Some(err),
            HotspotError::Csv(err) => Some(err),
            HotspotError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HotspotError {
    fn from(err: std::io::Error) -> Self {
        HotspotError::Io(err)
    }
}

impl From<csv::Error> for HotspotError {
    fn from(err: csv::Error) -> Self {
        HotspotError::Csv(err)
    }
}

impl From<serde_json::Error> for HotspotError {
    fn from(err: serde_json::Error) -> Self {
        HotspotError::Json(err)
    }
}
