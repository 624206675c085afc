//! Driver earnings estimation
//!
//! Earnings scale linearly with route distance against a base fee for a
//! base distance, rounded to cents.

use crate::core::config::TariffConfig;

/// Estimated earnings for driving `distance_km`, in currency units.
///
/// Non-positive distances earn nothing.
pub fn estimate_earnings(distance_km: f64, tariff: &TariffConfig) -> f64 {
    if distance_km <= 0.0 || tariff.base_distance_km <= 0.0 {
        return 0.0;
    }
    round2(distance_km * tariff.base_fee / tariff.base_distance_km)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
