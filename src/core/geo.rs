//! Great-circle geometry for courier-route
//!
//! Pure functions over coordinate pairs; used directly by the fallback path
//! of the distance provider and anywhere a geometric estimate suffices.

use crate::core::model::GeoPoint;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Convert degrees to radians
pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Haversine great-circle distance between two points, in kilometers
pub fn haversine_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = to_radians(from.latitude);
    let lat2 = to_radians(to.latitude);
    let delta_lat = to_radians(to.latitude - from.latitude);
    let delta_lon = to_radians(to.longitude - from.longitude);

    let a = (delta_lat / 2.0).sin() * (delta_lat / 2.0).sin()
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin() * (delta_lon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}
