//! # Courier-route Library
//!
//! A route optimization engine for delivery logistics: capacity-aware
//! package grouping, exact small-route ordering, shortest-path queries and
//! schedule projection, backed by a resilient client for an external
//! driving-distance provider.
//!
//! ## Features
//!
//! - **Degrade, don't fail**: when the mapping provider is unreachable the
//!   engine falls back to great-circle estimates and marks the result
//!   `approximate` instead of erroring
//! - **Exact where it counts**: stop orders are solved optimally with
//!   Held-Karp up to a configured size, 2-opt beyond it
//! - **Stateless per call**: optimizers are plain values; concurrent plans
//!   share nothing but the HTTP connection pool
//! - **Deadline/cancellation aware**: every operation accepts an optional
//!   time budget and cancellation token
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use courier_route::{GeoPoint, Station};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let depot = Station {
//!         id: 1,
//!         name: "North Depot".to_string(),
//!         location: GeoPoint::new(39.9042, 116.4074),
//!     };
//!     let mall = Station {
//!         id: 2,
//!         name: "Riverside Mall".to_string(),
//!         location: GeoPoint::new(39.9289, 116.3883),
//!     };
//!
//!     let plan = courier_route::plan_direct_trip(&depot, &mall).await?;
//!     println!(
//!         "{:.1} km in {:.0} min, earns {:.2}",
//!         plan.total_distance_km, plan.total_duration_minutes, plan.estimated_earnings
//!     );
//!     Ok(())
//! }
//! ```

// Re-export core types that users might need
pub use crate::core::config::{
    EndpointConfig, EngineConfig, LimitConfig, RetryConfig, ScheduleConfig, TariffConfig,
};
pub use crate::core::error::{Error, Result};
pub use crate::core::geo::{haversine_km, to_radians, EARTH_RADIUS_KM};
pub use crate::core::graph::{
    build_distance_matrix, reconstruct_path, shortest_paths, DistanceMatrix, ShortestPaths,
};
pub use crate::core::grouping::group_by_capacity;
pub use crate::core::model::{
    CapacityGroup, EnRoutePlan, GeoPoint, GroupingOutcome, MultiStopPlan, PackageCandidate,
    PathSummary, RouteLeg, RoutePlan, Station, TimeWindow, VehicleCapacity, DRIVER_POSITION_ID,
    TRIP_DESTINATION_ID,
};
pub use crate::core::provider::{
    DistanceClient, DrivingRoute, GeocodedAddress, PairEstimate, PlanBudget, PlanOptions,
};
pub use crate::core::schedule::schedule_stops;
pub use crate::core::tariff::estimate_earnings;
pub use crate::core::tsp::{solve_order, RouteOrder, EXACT_SOLVER_CEILING};

// Internal modules
mod core;

/// Plan a direct trip between two stations with default configuration
///
/// # Examples
/// ```rust,no_run
/// use courier_route::{GeoPoint, Station};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let depot = Station {
///     id: 1,
///     name: "North Depot".to_string(),
///     location: GeoPoint::new(39.9042, 116.4074),
/// };
/// let mall = Station {
///     id: 2,
///     name: "Riverside Mall".to_string(),
///     location: GeoPoint::new(39.9289, 116.3883),
/// };
///
/// let plan = courier_route::plan_direct_trip(&depot, &mall).await?;
/// println!("distance: {:.1} km", plan.total_distance_km);
/// # Ok(())
/// # }
/// ```
pub async fn plan_direct_trip(origin: &Station, destination: &Station) -> Result<RoutePlan> {
    let optimizer = core::RouteOptimizer::new(EngineConfig::default())?;
    optimizer
        .plan_direct_trip(&PlanOptions::default(), origin, destination, &[])
        .await
}

/// Plan capacity-grouped multi-stop trips with default configuration
///
/// # Examples
/// ```rust,no_run
/// use courier_route::{GeoPoint, PackageCandidate, Station, VehicleCapacity};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stations = vec![
///     Station {
///         id: 1,
///         name: "North Depot".to_string(),
///         location: GeoPoint::new(39.9042, 116.4074),
///     },
///     Station {
///         id: 2,
///         name: "Riverside Mall".to_string(),
///         location: GeoPoint::new(39.9289, 116.3883),
///     },
/// ];
/// let packages = vec![PackageCandidate::with_dimensions(10, 1, 2, 40.0, 30.0, 20.0, 4.5)];
///
/// let outcome = courier_route::plan_multi_stop(
///     GeoPoint::new(39.9100, 116.4000),
///     None,
///     &packages,
///     &stations,
///     &VehicleCapacity::default(),
/// )
/// .await?;
/// println!("{} candidate trips", outcome.plans.len());
/// # Ok(())
/// # }
/// ```
pub async fn plan_multi_stop(
    driver_position: GeoPoint,
    trip_destination: Option<GeoPoint>,
    packages: &[PackageCandidate],
    stations: &[Station],
    capacity: &VehicleCapacity,
) -> Result<MultiStopPlan> {
    let optimizer = core::RouteOptimizer::new(EngineConfig::default())?;
    optimizer
        .plan_multi_stop(
            &PlanOptions::default(),
            driver_position,
            trip_destination,
            packages,
            stations,
            capacity,
        )
        .await
}

/// Advanced API: create an optimizer with custom configuration
///
/// For callers who need their own endpoints, API key, retry policy,
/// tariff, or deadlines per call.
///
/// # Examples
/// ```rust,no_run
/// use courier_route::{EngineConfig, RouteOptimizer};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = EngineConfig::default();
/// config.endpoints.api_key = "my-key".to_string();
/// config.retry.max_attempts = 5;
///
/// let optimizer = RouteOptimizer::new(config)?;
/// // Use optimizer methods...
/// # Ok(())
/// # }
/// ```
pub use crate::core::RouteOptimizer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_builds_from_defaults() {
        assert!(RouteOptimizer::new(EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_public_tariff_surface() {
        assert_eq!(estimate_earnings(50.0, &TariffConfig::default()), 6.0);
    }

    #[test]
    fn test_haversine_is_reexported() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.0);
        assert_eq!(haversine_km(&a, &b), 0.0);
    }
}
