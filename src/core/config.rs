//! Configuration for the courier-route engine
//!
//! Every knob is constructor-injected; nothing reads process-wide state.
//! Defaults mirror the production deployment this engine was built for.

use std::time::Duration;

/// Endpoints and credentials for the external mapping provider
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Driving-directions endpoint (origin/destination/waypoints query)
    pub directions_url: String,

    /// Batched pairwise distance endpoint
    pub distance_url: String,

    /// Forward-geocoding endpoint
    pub geocode_url: String,

    /// Provider API key, sent with every request
    pub api_key: String,

    /// Overall per-request timeout
    pub request_timeout: Duration,

    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            directions_url: "https://restapi.amap.com/v3/direction/driving".to_string(),
            distance_url: "https://restapi.amap.com/v3/distance".to_string(),
            geocode_url: "https://restapi.amap.com/v3/geocode/geo".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Bounded-retry policy for provider calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per call before giving up
    pub max_attempts: u32,

    /// Backoff grows linearly: the n-th failed attempt sleeps n × base_delay
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Linear payout tariff: base_fee per base_distance_km driven
#[derive(Debug, Clone)]
pub struct TariffConfig {
    pub base_fee: f64,
    pub base_distance_km: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            base_fee: 6.0,
            base_distance_km: 50.0,
        }
    }
}

/// Constants for sequential time-window propagation
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Loading/unloading overhead charged per package handled at a stop
    pub loading_minutes_per_package: f64,

    /// Width of the arrival window granted past the earliest arrival
    pub arrival_slack_minutes: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            loading_minutes_per_package: 5.0,
            arrival_slack_minutes: 30.0,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub endpoints: EndpointConfig,
    pub retry: RetryConfig,
    pub tariff: TariffConfig,
    pub schedule: ScheduleConfig,
    pub limits: LimitConfig,
}

/// Computation bounds and degraded-mode pacing
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Assumed pace for synthesized fallback legs, in minutes per km
    pub fallback_minutes_per_km: f64,

    /// Largest station count handed to the exact bitmask-DP solver;
    /// larger groups are ordered heuristically instead
    pub max_exact_stops: usize,

    /// Concurrent pairwise-distance calls while building a matrix
    pub matrix_concurrency: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            fallback_minutes_per_km: 2.0,
            max_exact_stops: 16,
            matrix_concurrency: 4,
        }
    }
}
