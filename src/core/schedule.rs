//! Arrival and departure scheduling
//!
//! Walks an ordered route leg by leg and projects an arrival window plus
//! an estimated departure for every stop after the first. Loading time at
//! a stop scales with the number of packages handled there.

use chrono::{DateTime, Duration, Utc};

use crate::core::config::ScheduleConfig;
use crate::core::error::{Error, Result};
use crate::core::model::{PackageCandidate, RouteLeg, Station, TimeWindow};

fn minutes(amount: f64) -> Duration {
    Duration::milliseconds((amount * 60_000.0).round() as i64)
}

/// Project time windows for every stop after the route start.
///
/// A leg's handled packages are those picked up at its origin or dropped
/// off at its destination; each adds a fixed loading allowance before
/// departure. The window for a stop opens at the projected arrival and
/// stays open for the configured slack.
pub fn schedule_stops(
    ordered_stations: &[Station],
    legs: &[RouteLeg],
    packages: &[PackageCandidate],
    start: DateTime<Utc>,
    config: &ScheduleConfig,
) -> Result<Vec<TimeWindow>> {
    if ordered_stations.is_empty() && legs.is_empty() {
        return Ok(Vec::new());
    }
    if legs.len() + 1 != ordered_stations.len() {
        return Err(Error::InvalidInput(format!(
            "{} legs cannot connect {} stations",
            legs.len(),
            ordered_stations.len()
        )));
    }

    let mut current = start;
    let mut windows = Vec::with_capacity(legs.len());
    for (pair, leg) in ordered_stations.windows(2).zip(legs) {
        let handled = packages
            .iter()
            .filter(|p| {
                p.origin_station_id == pair[0].id || p.destination_station_id == pair[1].id
            })
            .count();

        let arrival = current + minutes(leg.duration_minutes);
        let departure = arrival + minutes(config.loading_minutes_per_package * handled as f64);
        windows.push(TimeWindow {
            station_id: pair[1].id,
            earliest_arrival: arrival,
            latest_arrival: arrival + minutes(config.arrival_slack_minutes),
            estimated_departure: departure,
        });
        current = departure;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::core::model::GeoPoint;

    fn station(id: i64) -> Station {
        Station {
            id,
            name: format!("station-{id}"),
            location: GeoPoint::new(0.0, 0.0),
        }
    }

    fn leg(from: i64, to: i64, duration_minutes: f64) -> RouteLeg {
        RouteLeg {
            from_station_id: from,
            to_station_id: to,
            distance_km: 0.0,
            duration_minutes,
            toll_cost: 0.0,
            polyline: String::new(),
            instructions: Vec::new(),
            approximate: false,
        }
    }

    fn package(id: i64, origin: i64, destination: i64) -> PackageCandidate {
        PackageCandidate {
            id,
            origin_station_id: origin,
            destination_station_id: destination,
            volume_cm3: 1.0,
            weight_kg: 1.0,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_route_has_no_windows() {
        let windows =
            schedule_stops(&[], &[], &[], start(), &ScheduleConfig::default()).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_leg_count_must_match_station_count() {
        let stations = vec![station(1), station(2), station(3)];
        let legs = vec![leg(1, 2, 10.0)];
        let result = schedule_stops(&stations, &legs, &[], start(), &ScheduleConfig::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_departure_delays_accumulate_down_the_route() {
        let stations = vec![station(1), station(2), station(3)];
        let legs = vec![leg(1, 2, 10.0), leg(2, 3, 20.0)];
        // One pickup at station 1, one pickup at 2; both drop at 3
        let packages = vec![package(1, 1, 3), package(2, 2, 3)];

        let windows = schedule_stops(
            &stations,
            &legs,
            &packages,
            start(),
            &ScheduleConfig::default(),
        )
        .unwrap();

        assert_eq!(windows.len(), 2);

        // Leg 1->2 handles package 1 only: arrive 8:10, load 5, leave 8:15
        assert_eq!(windows[0].station_id, 2);
        assert_eq!(windows[0].earliest_arrival, start() + minutes(10.0));
        assert_eq!(windows[0].latest_arrival, start() + minutes(40.0));
        assert_eq!(windows[0].estimated_departure, start() + minutes(15.0));

        // Leg 2->3 handles both packages: arrive 8:35, load 10, leave 8:45
        assert_eq!(windows[1].station_id, 3);
        assert_eq!(windows[1].earliest_arrival, start() + minutes(35.0));
        assert_eq!(windows[1].latest_arrival, start() + minutes(65.0));
        assert_eq!(windows[1].estimated_departure, start() + minutes(45.0));
    }

    #[test]
    fn test_no_packages_means_no_loading_time() {
        let stations = vec![station(1), station(2)];
        let legs = vec![leg(1, 2, 12.5)];

        let windows =
            schedule_stops(&stations, &legs, &[], start(), &ScheduleConfig::default()).unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].earliest_arrival, windows[0].estimated_departure);
    }

    #[test]
    fn test_window_width_follows_configured_slack() {
        let stations = vec![station(1), station(2)];
        let legs = vec![leg(1, 2, 5.0)];
        let config = ScheduleConfig {
            loading_minutes_per_package: 5.0,
            arrival_slack_minutes: 45.0,
        };

        let windows = schedule_stops(&stations, &legs, &[], start(), &config).unwrap();
        assert_eq!(
            windows[0].latest_arrival - windows[0].earliest_arrival,
            minutes(45.0)
        );
    }
}
