/*!
 * Geographic calculations.
 *
 * Simple (approximate) spherical Earth calculations used to size hotspots. Nothing here attempts
 * to be geodetically exact; the errors involved are well below the size of a city block.
 */
use crate::error::{HotspotError, HotspotResult};

const DEG2RAD: f64 = 2.0 * std::f64::consts::PI / 360.0;

/// Mean radius of the Earth used for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude (and of longitude at the equator) in meters.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Below this value of cos(latitude) a longitude offset is treated as undefined.
const MIN_COS_LAT: f64 = 1.0e-9;

/// A vertex of a polygon ring in (longitude, latitude) order, as GeoJSON expects.
pub type Vertex = [f64; 2];

/// A closed ring of 5 vertices, the last one equal to the first.
pub type Ring = [Vertex; 5];

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    /// Create a new coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Coord { lat, lon }
    }

    /// Check that the latitude and longitude are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Coord) -> f64 {
        great_circle_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Check if two coordinates are within `eps` degrees of each other in both components.
    pub fn is_close(&self, other: &Coord, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lon - other.lon).abs() <= eps
    }
}

/**
 * The simple great circle distance calculation using the haversine formula.
 *
 * #Arguments
 * * lat1 - the latitude of the first point in degrees.
 * * lon1 - the longitude of the first point in degrees.
 * * lat2 - the latitude of the second point in degrees.
 * * lon2 - the longitude of the second point in degrees.
 *
 * #Returns
 * The distance between the points in meters.
 */
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1 * DEG2RAD;
    let lon1_r = lon1 * DEG2RAD;
    let lat2_r = lat2 * DEG2RAD;
    let lon2_r = lon2 * DEG2RAD;

    let dlat2 = (lat2_r - lat1_r) / 2.0;
    let dlon2 = (lon2_r - lon1_r) / 2.0;

    let sin2_dlat = f64::powi(f64::sin(dlat2), 2);
    let sin2_dlon = f64::powi(f64::sin(dlon2), 2);

    // Rounding can push this just outside of [0, 1] for coincident or antipodal points.
    let h = (sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r)).clamp(0.0, 1.0);

    let arc = 2.0 * f64::asin(f64::sqrt(h));

    arc * EARTH_RADIUS_M
}

/// Convert a north-south distance in meters to degrees of latitude.
pub fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/**
 * Convert an east-west distance in meters to degrees of longitude.
 *
 * #Arguments
 * * meters - the distance to convert.
 * * lat - the latitude in degrees where the offset is applied.
 *
 * #Returns
 * The offset in degrees of longitude, or an error if `lat` is so close to a pole that a degree
 * of longitude has (nearly) no length.
 */
pub fn meters_to_deg_lon(meters: f64, lat: f64) -> HotspotResult<f64> {
    let cos_lat = f64::cos(lat * DEG2RAD);

    if !(cos_lat.abs() >= MIN_COS_LAT) {
        return Err(HotspotError::PolarProjection { lat });
    }

    Ok(meters / (METERS_PER_DEGREE * cos_lat))
}

/**
 * Build a closed square ring around a center point.
 *
 * The square is axis aligned in degree space with the longitude extent corrected for the
 * latitude of the center. Vertices go bottom-left, bottom-right, top-right, top-left and back to
 * bottom-left.
 *
 * #Arguments
 * * center - the center of the square.
 * * half_size_m - the distance in meters from the center to each side.
 */
pub fn square_ring(center: Coord, half_size_m: f64) -> HotspotResult<Ring> {
    let dlat = meters_to_deg_lat(half_size_m);
    let dlon = meters_to_deg_lon(half_size_m, center.lat)?;

    let Coord { lat, lon } = center;

    let bottom_left = [lon - dlon, lat - dlat];

    Ok([
        bottom_left,
        [lon + dlon, lat - dlat],
        [lon + dlon, lat + dlat],
        [lon - dlon, lat + dlat],
        bottom_left,
    ])
}
