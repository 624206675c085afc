//! Data model for the courier-route engine
//!
//! Value types exchanged with the surrounding service layer. The engine
//! never mutates store-owned records; everything here is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Reserved station id for the driver's current position in plan output
pub const DRIVER_POSITION_ID: i64 = -1;

/// Reserved station id for a raw trip destination in plan output
pub const TRIP_DESTINATION_ID: i64 = -2;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
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

    /// Reject coordinates outside the valid degree ranges
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(Error::InvalidInput(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || self.longitude.abs() > 180.0 {
            return Err(Error::InvalidInput(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// A delivery station, read-only from the store's point of view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub location: GeoPoint,
}

impl Station {
    /// Synthetic station standing in for the driver's current position
    pub fn driver_position(location: GeoPoint) -> Self {
        Self {
            id: DRIVER_POSITION_ID,
            name: "driver position".to_string(),
            location,
        }
    }

    /// Synthetic station standing in for a raw trip destination
    pub fn trip_destination(location: GeoPoint) -> Self {
        Self {
            id: TRIP_DESTINATION_ID,
            name: "trip destination".to_string(),
            location,
        }
    }
}

/// A package waiting at a station, candidate for inclusion in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageCandidate {
    pub id: i64,
    pub origin_station_id: i64,
    pub destination_station_id: i64,
    /// Cargo volume in cubic centimeters
    pub volume_cm3: f64,
    /// Cargo weight in kilograms
    pub weight_kg: f64,
}

impl PackageCandidate {
    /// Build a candidate from measured dimensions in centimeters
    pub fn with_dimensions(
        id: i64,
        origin_station_id: i64,
        destination_station_id: i64,
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
        weight_kg: f64,
    ) -> Self {
        Self {
            id,
            origin_station_id,
            destination_station_id,
            volume_cm3: length_cm * width_cm * height_cm,
            weight_kg,
        }
    }
}

/// Volume/weight budget of the vehicle doing the trip
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleCapacity {
    /// Maximum cargo volume in cubic centimeters
    pub max_volume_cm3: f64,
    /// Maximum cargo weight in kilograms
    pub max_weight_kg: f64,
}

impl Default for VehicleCapacity {
    fn default() -> Self {
        // 8 cubic meters, 2 metric tons
        Self {
            max_volume_cm3: 8_000_000.0,
            max_weight_kg: 2_000.0,
        }
    }
}

impl VehicleCapacity {
    pub fn validate(&self) -> Result<()> {
        if self.max_volume_cm3 < 0.0 || self.max_weight_kg < 0.0 {
            return Err(Error::InvalidInput(
                "vehicle capacity must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that a single package fits the vehicle at all
    pub fn admit(&self, package: &PackageCandidate) -> Result<()> {
        if package.volume_cm3 > self.max_volume_cm3 || package.weight_kg > self.max_weight_kg {
            return Err(Error::CapacityInfeasible {
                package_id: package.id,
            });
        }
        Ok(())
    }
}

/// Packages and their stations that together fit one vehicle load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityGroup {
    /// Unique stations, seed (driver position) first
    pub stations: Vec<Station>,
    pub packages: Vec<PackageCandidate>,
    pub total_volume_cm3: f64,
    pub total_weight_kg: f64,
}

/// Result of partitioning a package pool by vehicle capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingOutcome {
    pub groups: Vec<CapacityGroup>,
    /// Packages that individually exceed the vehicle capacity
    pub skipped: Vec<PackageCandidate>,
}

/// One driving leg between two stops of a planned route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from_station_id: i64,
    pub to_station_id: i64,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub toll_cost: f64,
    /// Opaque encoded geometry from the provider; empty for fallback legs
    pub polyline: String,
    pub instructions: Vec<String>,
    /// True when this leg was synthesized from geometry instead of routing data
    pub approximate: bool,
}

/// Arrival/departure bounds for one stop under sequential scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub station_id: i64,
    pub earliest_arrival: DateTime<Utc>,
    pub latest_arrival: DateTime<Utc>,
    pub estimated_departure: DateTime<Utc>,
}

/// The terminal output artifact of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub ordered_stations: Vec<Station>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub packages: Vec<PackageCandidate>,
    pub estimated_earnings: f64,
    pub time_windows: Vec<TimeWindow>,
    /// True when any underlying distance or leg was geometrically estimated
    pub approximate: bool,
}

/// One candidate plan per capacity group, plus the packages left behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStopPlan {
    pub plans: Vec<RoutePlan>,
    pub skipped: Vec<PackageCandidate>,
}

/// Point-to-point cheapest path through the station graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSummary {
    pub stations: Vec<Station>,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub estimated_earnings: f64,
    pub approximate: bool,
}

/// A committed trip with pickups threaded along the way
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnRoutePlan {
    pub plan: RoutePlan,
    /// Packages that individually exceed the vehicle capacity
    pub skipped: Vec<PackageCandidate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(45.0, 120.0).validate().is_ok());
        assert!(GeoPoint::new(90.0, 180.0).validate().is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).validate().is_ok());
        assert!(GeoPoint::new(90.5, 0.0).validate().is_err());
        assert!(GeoPoint::new(0.0, -180.5).validate().is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_with_dimensions_derives_volume() {
        let pkg = PackageCandidate::with_dimensions(7, 1, 2, 40.0, 30.0, 20.0, 3.5);
        assert_eq!(pkg.volume_cm3, 24_000.0);
        assert_eq!(pkg.weight_kg, 3.5);
        assert_eq!(pkg.origin_station_id, 1);
        assert_eq!(pkg.destination_station_id, 2);
    }

    #[test]
    fn test_capacity_admit() {
        let capacity = VehicleCapacity::default();
        let fits = PackageCandidate::with_dimensions(1, 1, 2, 100.0, 100.0, 100.0, 500.0);
        assert!(capacity.admit(&fits).is_ok());

        let too_big = PackageCandidate::with_dimensions(2, 1, 2, 300.0, 300.0, 100.0, 10.0);
        match capacity.admit(&too_big) {
            Err(Error::CapacityInfeasible { package_id }) => assert_eq!(package_id, 2),
            other => panic!("Expected CapacityInfeasible, got {other:?}"),
        }

        let too_heavy = PackageCandidate::with_dimensions(3, 1, 2, 10.0, 10.0, 10.0, 2_500.0);
        assert!(capacity.admit(&too_heavy).is_err());
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let capacity = VehicleCapacity {
            max_volume_cm3: -1.0,
            max_weight_kg: 100.0,
        };
        assert!(capacity.validate().is_err());
        assert!(VehicleCapacity::default().validate().is_ok());
    }

    #[test]
    fn test_synthetic_station_ids() {
        let here = GeoPoint::new(31.0, 121.0);
        assert_eq!(Station::driver_position(here).id, DRIVER_POSITION_ID);
        assert_eq!(Station::trip_destination(here).id, TRIP_DESTINATION_ID);
    }
}
