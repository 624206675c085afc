//! Route planning façade
//!
//! `RouteOptimizer` wires the provider, graph, grouping, ordering,
//! scheduling and tariff stages into the public planning operations. Each
//! call is self-contained: it builds its own matrices and groups, shares
//! nothing with concurrent calls, and carries its own deadline/cancellation
//! budget.

use std::collections::HashMap;

use chrono::Utc;
use futures::future::try_join_all;
use log::{debug, warn};

use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::core::graph::{build_distance_matrix, reconstruct_path, shortest_paths};
use crate::core::grouping::group_by_capacity;
use crate::core::model::{
    CapacityGroup, EnRoutePlan, GeoPoint, MultiStopPlan, PackageCandidate, PathSummary, RouteLeg,
    RoutePlan, Station, VehicleCapacity, DRIVER_POSITION_ID, TRIP_DESTINATION_ID,
};
use crate::core::provider::{
    DistanceClient, DrivingRoute, GeocodedAddress, PlanBudget, PlanOptions,
};
use crate::core::schedule::schedule_stops;
use crate::core::tariff::estimate_earnings;
use crate::core::tsp::solve_order;

/// Stateless planning service over an injected configuration.
///
/// Freely instantiable; concurrent calls share only the underlying HTTP
/// connection pool.
pub struct RouteOptimizer {
    client: DistanceClient,
    config: EngineConfig,
}

impl RouteOptimizer {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = DistanceClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// Plan a single-leg trip between two stations.
    ///
    /// Earnings are estimated from the leg distance; the plan carries
    /// whatever packages the caller supplies (possibly none).
    pub async fn plan_direct_trip(
        &self,
        options: &PlanOptions,
        origin: &Station,
        destination: &Station,
        packages: &[PackageCandidate],
    ) -> Result<RoutePlan> {
        origin.location.validate()?;
        destination.location.validate()?;

        let budget = PlanBudget::start(options);
        self.single_leg_plan(&budget, origin, destination, packages, true)
            .await
    }

    /// Plan one trip per capacity group over the candidate pool.
    ///
    /// Groups are ordered exactly (or near-exactly past the solver cap)
    /// from the driver's position; when `trip_destination` is given it is
    /// appended as the final stop of every trip. An empty or fully skipped
    /// pool is not an error: with a destination it degenerates to the bare
    /// driver→destination trip carrying no packages and no earnings,
    /// without one it yields no plans at all.
    pub async fn plan_multi_stop(
        &self,
        options: &PlanOptions,
        driver_position: GeoPoint,
        trip_destination: Option<GeoPoint>,
        packages: &[PackageCandidate],
        stations: &[Station],
        capacity: &VehicleCapacity,
    ) -> Result<MultiStopPlan> {
        driver_position.validate()?;
        if let Some(point) = trip_destination {
            point.validate()?;
        }
        for station in stations {
            station.location.validate()?;
        }

        let budget = PlanBudget::start(options);
        let driver_station = Station::driver_position(driver_position);
        let outcome = group_by_capacity(packages, stations, &driver_station, capacity)?;

        if outcome.groups.is_empty() {
            let mut plans = Vec::new();
            if let Some(point) = trip_destination {
                let destination = Station::trip_destination(point);
                plans.push(
                    self.single_leg_plan(&budget, &driver_station, &destination, &[], false)
                        .await?,
                );
            }
            return Ok(MultiStopPlan {
                plans,
                skipped: outcome.skipped,
            });
        }

        let mut plans = Vec::with_capacity(outcome.groups.len());
        for group in &outcome.groups {
            plans.push(self.plan_group_trip(&budget, group, trip_destination).await?);
        }
        debug!(
            "planned {} trips over {} packages ({} skipped)",
            plans.len(),
            packages.len() - outcome.skipped.len(),
            outcome.skipped.len()
        );

        Ok(MultiStopPlan {
            plans,
            skipped: outcome.skipped,
        })
    }

    /// Cheapest station-to-station path over the full station graph.
    ///
    /// The graph is built through the provider, so the summary degrades to
    /// geometric estimates rather than failing when the upstream is down.
    pub async fn cheapest_path(
        &self,
        options: &PlanOptions,
        stations: &[Station],
        source_id: i64,
        destination_id: i64,
    ) -> Result<PathSummary> {
        for station in stations {
            station.location.validate()?;
        }
        for id in [source_id, destination_id] {
            if !stations.iter().any(|s| s.id == id) {
                return Err(Error::InvalidInput(format!(
                    "station {id} is not in the supplied station set"
                )));
            }
        }

        let budget = PlanBudget::start(options);
        let matrix = build_distance_matrix(
            &self.client,
            &budget,
            stations,
            self.config.limits.matrix_concurrency,
        )
        .await?;

        let paths = shortest_paths(&matrix, source_id)?;
        let ids = reconstruct_path(&paths, destination_id)?;

        let mut indices = Vec::with_capacity(ids.len());
        for id in &ids {
            let idx = matrix.index_of(*id).ok_or_else(|| {
                Error::InvalidInput(format!("station {id} missing from the built matrix"))
            })?;
            indices.push(idx);
        }

        let mut total_distance_km = 0.0;
        let mut total_duration_minutes = 0.0;
        for hop in indices.windows(2) {
            total_distance_km += matrix.distances()[hop[0]][hop[1]];
            total_duration_minutes += matrix.durations()[hop[0]][hop[1]];
        }

        Ok(PathSummary {
            stations: indices
                .iter()
                .map(|&idx| matrix.stations()[idx].clone())
                .collect(),
            total_distance_km,
            total_duration_minutes,
            estimated_earnings: estimate_earnings(total_distance_km, &self.config.tariff),
            approximate: matrix.is_approximate(),
        })
    }

    /// Take feasible pending packages along an already committed trip.
    ///
    /// The package stations are threaded as waypoints into one spanning
    /// route call, in pool order; no per-stop schedule is produced.
    /// Packages that cannot fit the vehicle are reported as skipped.
    pub async fn plan_en_route(
        &self,
        options: &PlanOptions,
        origin: GeoPoint,
        destination: GeoPoint,
        packages: &[PackageCandidate],
        stations: &[Station],
        capacity: &VehicleCapacity,
    ) -> Result<EnRoutePlan> {
        origin.validate()?;
        destination.validate()?;
        capacity.validate()?;
        for station in stations {
            station.location.validate()?;
        }

        let mut feasible = Vec::new();
        let mut skipped = Vec::new();
        for package in packages {
            match capacity.admit(package) {
                Ok(()) => feasible.push(package.clone()),
                Err(Error::CapacityInfeasible { package_id }) => {
                    warn!("package {package_id} exceeds vehicle capacity on its own, skipping");
                    skipped.push(package.clone());
                }
                Err(e) => return Err(e),
            }
        }

        let lookup: HashMap<i64, &Station> = stations.iter().map(|s| (s.id, s)).collect();
        let mut ordered = vec![Station::driver_position(origin)];
        let mut waypoints = Vec::new();
        for package in &feasible {
            for station_id in [package.origin_station_id, package.destination_station_id] {
                let station = lookup.get(&station_id).copied().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "package {} references unknown station {station_id}",
                        package.id
                    ))
                })?;
                if !ordered.iter().any(|s| s.id == station.id) {
                    ordered.push(station.clone());
                    waypoints.push(station.location);
                }
            }
        }
        ordered.push(Station::trip_destination(destination));

        let budget = PlanBudget::start(options);
        let route = self
            .client
            .route(&budget, &origin, &destination, &waypoints)
            .await?;

        let total_distance_km = route.distance_km;
        let total_duration_minutes = route.duration_minutes;
        let approximate = route.approximate;
        let leg = leg_from_route(DRIVER_POSITION_ID, TRIP_DESTINATION_ID, route);

        Ok(EnRoutePlan {
            plan: RoutePlan {
                ordered_stations: ordered,
                legs: vec![leg],
                total_distance_km,
                total_duration_minutes,
                packages: feasible,
                estimated_earnings: estimate_earnings(total_distance_km, &self.config.tariff),
                time_windows: Vec::new(),
                approximate,
            },
            skipped,
        })
    }

    /// Resolve a free-form address through the provider
    pub async fn geocode(&self, options: &PlanOptions, address: &str) -> Result<GeocodedAddress> {
        let budget = PlanBudget::start(options);
        self.client.geocode(&budget, address).await
    }

    async fn plan_group_trip(
        &self,
        budget: &PlanBudget,
        group: &CapacityGroup,
        trip_destination: Option<GeoPoint>,
    ) -> Result<RoutePlan> {
        let matrix = build_distance_matrix(
            &self.client,
            budget,
            &group.stations,
            self.config.limits.matrix_concurrency,
        )
        .await?;

        let order = solve_order(matrix.distances(), self.config.limits.max_exact_stops)?;
        let mut ordered: Vec<Station> = order
            .visit_order
            .iter()
            .map(|&idx| matrix.stations()[idx].clone())
            .collect();
        if let Some(point) = trip_destination {
            ordered.push(Station::trip_destination(point));
        }

        let legs = self.build_legs(budget, &ordered).await?;
        self.assemble_plan(
            ordered,
            legs,
            group.packages.clone(),
            matrix.is_approximate(),
            true,
        )
    }

    async fn single_leg_plan(
        &self,
        budget: &PlanBudget,
        origin: &Station,
        destination: &Station,
        packages: &[PackageCandidate],
        with_earnings: bool,
    ) -> Result<RoutePlan> {
        let route = self
            .client
            .route(budget, &origin.location, &destination.location, &[])
            .await?;
        let leg = leg_from_route(origin.id, destination.id, route);
        self.assemble_plan(
            vec![origin.clone(), destination.clone()],
            vec![leg],
            packages.to_vec(),
            false,
            with_earnings,
        )
    }

    /// One provider call per consecutive stop pair, issued concurrently
    async fn build_legs(&self, budget: &PlanBudget, ordered: &[Station]) -> Result<Vec<RouteLeg>> {
        let calls = ordered.windows(2).map(|pair| async move {
            let route = self
                .client
                .route(budget, &pair[0].location, &pair[1].location, &[])
                .await?;
            Ok::<_, Error>(leg_from_route(pair[0].id, pair[1].id, route))
        });
        try_join_all(calls).await
    }

    fn assemble_plan(
        &self,
        ordered_stations: Vec<Station>,
        legs: Vec<RouteLeg>,
        packages: Vec<PackageCandidate>,
        matrix_approximate: bool,
        with_earnings: bool,
    ) -> Result<RoutePlan> {
        let total_distance_km = legs.iter().map(|l| l.distance_km).sum();
        let total_duration_minutes = legs.iter().map(|l| l.duration_minutes).sum();
        let approximate = matrix_approximate || legs.iter().any(|l| l.approximate);
        let time_windows =
            schedule_stops(&ordered_stations, &legs, &packages, Utc::now(), &self.config.schedule)?;
        let estimated_earnings = if with_earnings {
            estimate_earnings(total_distance_km, &self.config.tariff)
        } else {
            0.0
        };

        Ok(RoutePlan {
            ordered_stations,
            legs,
            total_distance_km,
            total_duration_minutes,
            packages,
            estimated_earnings,
            time_windows,
            approximate,
        })
    }
}

fn leg_from_route(from_station_id: i64, to_station_id: i64, route: DrivingRoute) -> RouteLeg {
    RouteLeg {
        from_station_id,
        to_station_id,
        distance_km: route.distance_km,
        duration_minutes: route.duration_minutes,
        toll_cost: route.toll_cost,
        polyline: route.polyline,
        instructions: route.instructions,
        approximate: route.approximate,
    }
}
