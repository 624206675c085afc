//! Capacity-aware package grouping
//!
//! Buckets compatible packages by their origin→destination lane, then folds
//! the buckets into vehicle trips first-fit, largest lane first. Packages
//! that cannot fit an empty vehicle on their own are reported as skipped
//! rather than failing the whole batch.

use std::collections::HashMap;

use log::{debug, warn};

use crate::core::error::{Error, Result};
use crate::core::model::{
    CapacityGroup, GroupingOutcome, PackageCandidate, Station, VehicleCapacity,
};

/// Partition `packages` into capacity-respecting trip groups.
///
/// Every group's station list starts with `driver_station`; each placed
/// package contributes its origin and destination stations. Each input
/// package lands in exactly one group or in the skipped list.
pub fn group_by_capacity(
    packages: &[PackageCandidate],
    stations: &[Station],
    driver_station: &Station,
    capacity: &VehicleCapacity,
) -> Result<GroupingOutcome> {
    capacity.validate()?;

    let lookup: HashMap<i64, &Station> = stations.iter().map(|s| (s.id, s)).collect();
    for package in packages {
        resolve(&lookup, package.id, package.origin_station_id)?;
        resolve(&lookup, package.id, package.destination_station_id)?;
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

    // Bucket by lane, preserving first-seen order for equal-sized lanes
    let mut lanes: Vec<((i64, i64), Vec<PackageCandidate>)> = Vec::new();
    for package in feasible {
        let key = (package.origin_station_id, package.destination_station_id);
        match lanes.iter_mut().find(|(lane, _)| *lane == key) {
            Some((_, bucket)) => bucket.push(package),
            None => lanes.push((key, vec![package])),
        }
    }
    lanes.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut groups: Vec<CapacityGroup> = Vec::new();
    for ((origin, destination), bucket) in lanes {
        let volume: f64 = bucket.iter().map(|p| p.volume_cm3).sum();
        let weight: f64 = bucket.iter().map(|p| p.weight_kg).sum();

        if volume <= capacity.max_volume_cm3 && weight <= capacity.max_weight_kg {
            let slot = open_slot(&mut groups, volume, weight, capacity, driver_station);
            for package in bucket {
                place(&mut groups[slot], package, &lookup)?;
            }
        } else {
            // A lane bigger than one vehicle is split at package granularity
            debug!(
                "lane {origin}->{destination} exceeds one vehicle load, splitting {} packages",
                bucket.len()
            );
            for package in bucket {
                let slot = open_slot(
                    &mut groups,
                    package.volume_cm3,
                    package.weight_kg,
                    capacity,
                    driver_station,
                );
                place(&mut groups[slot], package, &lookup)?;
            }
        }
    }

    groups.retain(|g| !g.packages.is_empty());
    debug!(
        "grouped {} packages into {} trips, {} skipped",
        packages.len() - skipped.len(),
        groups.len(),
        skipped.len()
    );

    Ok(GroupingOutcome { groups, skipped })
}

fn resolve<'a>(
    lookup: &HashMap<i64, &'a Station>,
    package_id: i64,
    station_id: i64,
) -> Result<&'a Station> {
    lookup.get(&station_id).copied().ok_or_else(|| {
        Error::InvalidInput(format!(
            "package {package_id} references unknown station {station_id}"
        ))
    })
}

fn fits(group: &CapacityGroup, volume: f64, weight: f64, capacity: &VehicleCapacity) -> bool {
    group.total_volume_cm3 + volume <= capacity.max_volume_cm3
        && group.total_weight_kg + weight <= capacity.max_weight_kg
}

/// Index of the first group with room for the load, opening a new one if none has
fn open_slot(
    groups: &mut Vec<CapacityGroup>,
    volume: f64,
    weight: f64,
    capacity: &VehicleCapacity,
    driver_station: &Station,
) -> usize {
    match groups.iter().position(|g| fits(g, volume, weight, capacity)) {
        Some(idx) => idx,
        None => {
            groups.push(seed_group(driver_station));
            groups.len() - 1
        }
    }
}

fn seed_group(driver_station: &Station) -> CapacityGroup {
    CapacityGroup {
        stations: vec![driver_station.clone()],
        packages: Vec::new(),
        total_volume_cm3: 0.0,
        total_weight_kg: 0.0,
    }
}

fn place(
    group: &mut CapacityGroup,
    package: PackageCandidate,
    lookup: &HashMap<i64, &Station>,
) -> Result<()> {
    let origin = resolve(lookup, package.id, package.origin_station_id)?;
    let destination = resolve(lookup, package.id, package.destination_station_id)?;
    add_station(&mut group.stations, origin);
    add_station(&mut group.stations, destination);
    group.total_volume_cm3 += package.volume_cm3;
    group.total_weight_kg += package.weight_kg;
    group.packages.push(package);
    Ok(())
}

fn add_station(stations: &mut Vec<Station>, station: &Station) {
    if !stations.iter().any(|s| s.id == station.id) {
        stations.push(station.clone());
    }
}
