//! Geospatial helpers for radius search.
//!
//! Distances are measured on a sphere. A search radius in miles is turned
//! into an angle (radians) by dividing by the Earth's radius; a point is in
//! range when its great-circle angle to the centre is within that angle.

mod geocoder;

pub use geocoder::{GeocodeError, Geocoder, MapQuestGeocoder};

#[cfg(test)]
pub use geocoder::StaticGeocoder;

use serde::Serialize;

/// Earth's radius in miles used for radius search
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Convert a distance in miles into the angular radius of a spherical cap
pub fn miles_to_radians(miles: f64) -> f64 {
    miles / EARTH_RADIUS_MILES
}

/// Great-circle angle between two points in radians (haversine form).
///
/// Identical points yield exactly 0.0, which keeps a zero-radius search
/// limited to coincident points.
pub fn angular_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// True when `point` lies inside the cap of `radius` radians around `center`
pub fn within_radius(center: GeoPoint, point: GeoPoint, radius: f64) -> bool {
    angular_distance(center, point) <= radius
}
