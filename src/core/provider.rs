//! Resilient client for the external mapping provider
//!
//! Wraps the driving-directions, pairwise-distance, and geocoding endpoints
//! with a bounded-retry policy and a geometric fallback. Route and distance
//! calls never fail on upstream trouble: after the retries are exhausted
//! they synthesize approximate results from haversine distances. Geocoding
//! has no geometric fallback and surfaces the upstream error instead.

use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::core::config::{EndpointConfig, EngineConfig, RetryConfig};
use crate::core::error::{Error, Result};
use crate::core::geo;
use crate::core::model::GeoPoint;

/// Caller-side limits for one optimization call
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Overall budget for the call; once spent, remaining provider calls
    /// short-circuit straight to the geometric fallback
    pub deadline: Option<Duration>,

    /// Aborts in-flight provider calls; the operation returns `Cancelled`
    pub cancel: Option<CancellationToken>,
}

/// Deadline and cancellation state threaded through one operation's calls
#[derive(Debug, Clone)]
pub struct PlanBudget {
    expires_at: Option<Instant>,
    cancel: CancellationToken,
}

impl PlanBudget {
    /// Start the clock for one operation
    pub fn start(options: &PlanOptions) -> Self {
        Self {
            expires_at: options.deadline.map(|d| Instant::now() + d),
            cancel: options.cancel.clone().unwrap_or_default(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

impl Default for PlanBudget {
    fn default() -> Self {
        Self::start(&PlanOptions::default())
    }
}

/// One driving route between two points, possibly via waypoints
#[derive(Debug, Clone)]
pub struct DrivingRoute {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub toll_cost: f64,
    pub polyline: String,
    pub instructions: Vec<String>,
    /// True when synthesized from geometry instead of routing data
    pub approximate: bool,
}

/// Distance/duration estimate for one origin→destination pair
#[derive(Debug, Clone, Copy)]
pub struct PairEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub approximate: bool,
}

/// A forward-geocoded address
#[derive(Debug, Clone)]
pub struct GeocodedAddress {
    pub location: GeoPoint,
    pub formatted_address: String,
}

/// HTTP client for the mapping provider, freely instantiable per use site
pub struct DistanceClient {
    http: Client,
    endpoints: EndpointConfig,
    retry: RetryConfig,
    fallback_minutes_per_km: f64,
}

impl DistanceClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.endpoints.request_timeout)
            .connect_timeout(config.endpoints.connect_timeout)
            .user_agent(format!("courier-route/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
            retry: config.retry.clone(),
            fallback_minutes_per_km: config.limits.fallback_minutes_per_km,
        })
    }

    /// Driving route from `origin` to `destination` through `waypoints`.
    ///
    /// Degrades instead of failing: when the provider stays unreachable the
    /// returned route is a haversine estimate marked `approximate`.
    pub async fn route(
        &self,
        budget: &PlanBudget,
        origin: &GeoPoint,
        destination: &GeoPoint,
        waypoints: &[GeoPoint],
    ) -> Result<DrivingRoute> {
        origin.validate()?;
        destination.validate()?;
        for point in waypoints {
            point.validate()?;
        }

        let outcome = self
            .call_with_retry(budget, "driving route", || {
                self.fetch_route(origin, destination, waypoints)
            })
            .await;

        match outcome {
            Ok(route) => Ok(route),
            Err(Error::UpstreamUnavailable(msg)) => {
                warn!("driving route degraded to haversine estimate: {msg}");
                Ok(self.fallback_route(origin, destination))
            }
            Err(e) => Err(e),
        }
    }

    /// Distance/duration for each origins[i]→destinations[i] pair.
    ///
    /// Same degrade-not-fail policy as [`route`](Self::route): exhausted
    /// retries yield per-pair haversine estimates.
    pub async fn pairwise_distances(
        &self,
        budget: &PlanBudget,
        origins: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<PairEstimate>> {
        if origins.len() != destinations.len() {
            return Err(Error::InvalidInput(format!(
                "mismatched batch: {} origins vs {} destinations",
                origins.len(),
                destinations.len()
            )));
        }
        if origins.is_empty() {
            return Ok(Vec::new());
        }
        for point in origins.iter().chain(destinations.iter()) {
            point.validate()?;
        }

        let outcome = self
            .call_with_retry(budget, "pairwise distances", || {
                self.fetch_pairwise(origins, destinations)
            })
            .await;

        match outcome {
            Ok(pairs) => Ok(pairs),
            Err(Error::UpstreamUnavailable(msg)) => {
                warn!("pairwise distances degraded to haversine estimates: {msg}");
                Ok(origins
                    .iter()
                    .zip(destinations.iter())
                    .map(|(origin, destination)| self.fallback_pair(origin, destination))
                    .collect())
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a free-form address to coordinates.
    ///
    /// There is no geometric fallback for an address, so exhausted retries
    /// surface `UpstreamUnavailable` to the caller.
    pub async fn geocode(&self, budget: &PlanBudget, address: &str) -> Result<GeocodedAddress> {
        if address.trim().is_empty() {
            return Err(Error::InvalidInput("empty geocode address".to_string()));
        }

        self.call_with_retry(budget, "geocode", || self.fetch_geocode(address))
            .await
    }

    /// Execute one provider call with bounded retry and linear backoff
    async fn call_with_retry<T, F, Fut>(
        &self,
        budget: &PlanBudget,
        what: &str,
        operation: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if budget.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if budget.is_expired() {
                return Err(Error::UpstreamUnavailable(format!(
                    "{what}: call budget expired"
                )));
            }

            debug!("{what}: attempt {attempt}");
            let outcome = tokio::select! {
                _ = budget.cancelled() => return Err(Error::Cancelled),
                outcome = operation() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(Error::UpstreamUnavailable(msg)) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.base_delay * attempt;
                    warn!("{what} failed (attempt {attempt}): {msg}. Retrying in {delay:?}...");
                    tokio::select! {
                        _ = budget.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        waypoints: &[GeoPoint],
    ) -> Result<DrivingRoute> {
        let origin_param = format_point(origin);
        let destination_param = format_point(destination);
        let waypoint_param = waypoints
            .iter()
            .map(format_point)
            .collect::<Vec<_>>()
            .join(";");

        let response = self
            .http
            .get(&self.endpoints.directions_url)
            .query(&[
                ("key", self.endpoints.api_key.as_str()),
                ("origin", origin_param.as_str()),
                ("destination", destination_param.as_str()),
                ("waypoints", waypoint_param.as_str()),
                ("strategy", "2"),
                ("extensions", "all"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "directions request failed: {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response.json().await?;
        if body.status != "1" {
            return Err(Error::UpstreamUnavailable(
                body.info
                    .unwrap_or_else(|| "route planning rejected by provider".to_string()),
            ));
        }

        let path = body
            .route
            .and_then(|route| route.paths.into_iter().next())
            .ok_or_else(|| {
                Error::UpstreamUnavailable("directions response carried no path".to_string())
            })?;

        Ok(DrivingRoute {
            distance_km: path.distance / 1000.0,
            duration_minutes: (path.duration / 60.0).ceil(),
            toll_cost: path.tolls,
            polyline: path
                .steps
                .iter()
                .map(|step| step.polyline.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            instructions: path.steps.into_iter().map(|step| step.instruction).collect(),
            approximate: false,
        })
    }

    async fn fetch_pairwise(
        &self,
        origins: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<PairEstimate>> {
        let origins_param = origins.iter().map(format_point).collect::<Vec<_>>().join("|");
        let destinations_param = destinations
            .iter()
            .map(format_point)
            .collect::<Vec<_>>()
            .join("|");

        let response = self
            .http
            .get(&self.endpoints.distance_url)
            .query(&[
                ("key", self.endpoints.api_key.as_str()),
                ("origins", origins_param.as_str()),
                ("destinations", destinations_param.as_str()),
                ("type", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "distance request failed: {}",
                response.status()
            )));
        }

        let body: DistanceResponse = response.json().await?;
        if body.status != "1" {
            return Err(Error::UpstreamUnavailable(
                body.info
                    .unwrap_or_else(|| "distance lookup rejected by provider".to_string()),
            ));
        }

        let results = body.results;
        if results.len() < origins.len() {
            return Err(Error::UpstreamUnavailable(format!(
                "distance response carried {} results for {} pairs",
                results.len(),
                origins.len()
            )));
        }

        Ok(results
            .into_iter()
            .take(origins.len())
            .map(|pair| PairEstimate {
                distance_km: pair.distance / 1000.0,
                duration_minutes: (pair.duration / 60.0).ceil(),
                approximate: false,
            })
            .collect())
    }

    async fn fetch_geocode(&self, address: &str) -> Result<GeocodedAddress> {
        let response = self
            .http
            .get(&self.endpoints.geocode_url)
            .query(&[
                ("key", self.endpoints.api_key.as_str()),
                ("address", address),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "geocode request failed: {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response.json().await?;
        if body.status != "1" {
            return Err(Error::UpstreamUnavailable(
                body.info
                    .unwrap_or_else(|| "geocoding rejected by provider".to_string()),
            ));
        }

        let entry = body.geocodes.into_iter().next().ok_or_else(|| {
            Error::UpstreamUnavailable(format!("no geocode result for '{address}'"))
        })?;

        // Provider encodes coordinates as "longitude,latitude"
        let mut parts = entry.location.split(',');
        let longitude = parse_coordinate(parts.next())?;
        let latitude = parse_coordinate(parts.next())?;

        Ok(GeocodedAddress {
            location: GeoPoint::new(latitude, longitude),
            formatted_address: entry.formatted_address,
        })
    }

    /// Synthesize a route from the great-circle distance at an assumed pace
    fn fallback_route(&self, origin: &GeoPoint, destination: &GeoPoint) -> DrivingRoute {
        let distance_km = geo::haversine_km(origin, destination);
        DrivingRoute {
            distance_km,
            duration_minutes: (distance_km * self.fallback_minutes_per_km).ceil(),
            toll_cost: 0.0,
            polyline: String::new(),
            instructions: Vec::new(),
            approximate: true,
        }
    }

    fn fallback_pair(&self, origin: &GeoPoint, destination: &GeoPoint) -> PairEstimate {
        let distance_km = geo::haversine_km(origin, destination);
        PairEstimate {
            distance_km,
            duration_minutes: (distance_km * self.fallback_minutes_per_km).ceil(),
            approximate: true,
        }
    }
}

/// Provider wire format: "longitude,latitude"
fn format_point(point: &GeoPoint) -> String {
    format!("{},{}", point.longitude, point.latitude)
}

fn parse_coordinate(raw: Option<&str>) -> Result<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::UpstreamUnavailable("malformed geocode location".to_string()))
}

/// Accept numeric fields the provider encodes either as numbers or strings
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) if text.trim().is_empty() => Ok(0.0),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    info: Option<String>,
    route: Option<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    paths: Vec<DrivingPath>,
}

#[derive(Debug, Deserialize)]
struct DrivingPath {
    /// Meters
    #[serde(default, deserialize_with = "lenient_f64")]
    distance: f64,
    /// Seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    duration: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    tolls: f64,
    #[serde(default)]
    steps: Vec<DrivingStep>,
}

#[derive(Debug, Deserialize)]
struct DrivingStep {
    #[serde(default)]
    instruction: String,
    #[serde(default)]
    polyline: String,
}

#[derive(Debug, Deserialize)]
struct DistanceResponse {
    status: String,
    info: Option<String>,
    #[serde(default)]
    results: Vec<DistancePair>,
}

#[derive(Debug, Deserialize)]
struct DistancePair {
    /// Meters
    #[serde(default, deserialize_with = "lenient_f64")]
    distance: f64,
    /// Seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    info: Option<String>,
    #[serde(default)]
    geocodes: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    #[serde(default)]
    location: String,
    #[serde(default)]
    formatted_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.endpoints.directions_url = format!("{server_uri}/v3/direction/driving");
        config.endpoints.distance_url = format!("{server_uri}/v3/distance");
        config.endpoints.geocode_url = format!("{server_uri}/v3/geocode/geo");
        config.endpoints.api_key = "test-key".to_string();
        config.retry.base_delay = Duration::from_millis(10);
        config
    }

    fn shanghai() -> GeoPoint {
        GeoPoint::new(31.2304, 121.4737)
    }

    fn beijing() -> GeoPoint {
        GeoPoint::new(39.9042, 116.4074)
    }

    #[tokio::test]
    async fn test_route_parses_provider_response() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_json(json!({
                    "status": "1",
                    "info": "OK",
                    "route": {
                        "paths": [{
                            "distance": "12500",
                            "duration": "1510",
                            "tolls": "10",
                            "steps": [
                                {"instruction": "Head east", "polyline": "116.1,39.1;116.2,39.2"},
                                {"instruction": "Arrive", "polyline": "116.2,39.2;116.3,39.3"}
                            ]
                        }]
                    }
                }))
            })
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let budget = PlanBudget::default();
        let route = client
            .route(&budget, &beijing(), &shanghai(), &[])
            .await
            .unwrap();

        assert_eq!(route.distance_km, 12.5);
        // 1510 seconds round up to 26 minutes
        assert_eq!(route.duration_minutes, 26.0);
        assert_eq!(route.toll_cost, 10.0);
        assert_eq!(
            route.polyline,
            "116.1,39.1;116.2,39.2;116.2,39.2;116.3,39.3"
        );
        assert_eq!(route.instructions, vec!["Head east", "Arrive"]);
        assert!(!route.approximate);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_route_falls_back_after_exhausted_retries() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(500)
            })
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let budget = PlanBudget::default();
        let origin = beijing();
        let destination = shanghai();
        let route = client
            .route(&budget, &origin, &destination, &[])
            .await
            .unwrap();

        let expected_km = geo::haversine_km(&origin, &destination);
        assert_eq!(call_count.load(Ordering::SeqCst), 3, "three attempts then fallback");
        assert!((route.distance_km - expected_km).abs() < 1e-9);
        assert_eq!(route.duration_minutes, (expected_km * 2.0).ceil());
        assert_eq!(route.toll_cost, 0.0);
        assert!(route.polyline.is_empty());
        assert!(route.instructions.is_empty());
        assert!(route.approximate);
    }

    #[tokio::test]
    async fn test_route_retries_on_provider_status_error() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_json(json!({
                    "status": "0",
                    "info": "DAILY_QUERY_OVER_LIMIT"
                }))
            })
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let route = client
            .route(&PlanBudget::default(), &beijing(), &shanghai(), &[])
            .await
            .unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(route.approximate);
    }

    #[tokio::test]
    async fn test_pairwise_distances_parses_batch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/distance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "info": "OK",
                "results": [
                    {"distance": "5000", "duration": "600"},
                    {"distance": "1250", "duration": "90"}
                ]
            })))
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let origins = [beijing(), shanghai()];
        let destinations = [shanghai(), beijing()];
        let pairs = client
            .pairwise_distances(&PlanBudget::default(), &origins, &destinations)
            .await
            .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].distance_km, 5.0);
        assert_eq!(pairs[0].duration_minutes, 10.0);
        assert_eq!(pairs[1].distance_km, 1.25);
        // 90 seconds round up to 2 minutes
        assert_eq!(pairs[1].duration_minutes, 2.0);
        assert!(!pairs[0].approximate);
    }

    #[test]
    fn test_pairwise_length_mismatch_rejected() {
        let config = test_config("http://localhost:9");
        let client = DistanceClient::new(&config).unwrap();
        let origins = [beijing(), shanghai()];
        let destinations = [beijing()];

        let result = tokio_test::block_on(client.pairwise_distances(
            &PlanBudget::default(),
            &origins,
            &destinations,
        ));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_pairwise_empty_batch_is_empty() {
        let config = test_config("http://localhost:9");
        let client = DistanceClient::new(&config).unwrap();
        let pairs = client
            .pairwise_distances(&PlanBudget::default(), &[], &[])
            .await
            .unwrap();
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn test_geocode_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/geocode/geo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "info": "OK",
                "geocodes": [{
                    "location": "121.473700,31.230400",
                    "formatted_address": "Huangpu, Shanghai"
                }]
            })))
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let geocoded = client
            .geocode(&PlanBudget::default(), "Huangpu, Shanghai")
            .await
            .unwrap();

        assert!((geocoded.location.latitude - 31.2304).abs() < 1e-9);
        assert!((geocoded.location.longitude - 121.4737).abs() < 1e-9);
        assert_eq!(geocoded.formatted_address, "Huangpu, Shanghai");
    }

    #[tokio::test]
    async fn test_geocode_failure_surfaces_upstream_error() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/geocode/geo"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(503)
            })
            .mount(&server)
            .await;

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let result = client
            .geocode(&PlanBudget::default(), "nowhere in particular")
            .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_without_calls() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200)
            })
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        token.cancel();
        let options = PlanOptions {
            deadline: None,
            cancel: Some(token),
        };

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let result = client
            .route(&PlanBudget::start(&options), &beijing(), &shanghai(), &[])
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_deadline_short_circuits_to_fallback() {
        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&call_count);
        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(move |_: &wiremock::Request| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200)
            })
            .mount(&server)
            .await;

        let options = PlanOptions {
            deadline: Some(Duration::ZERO),
            cancel: None,
        };

        let client = DistanceClient::new(&test_config(&server.uri())).unwrap();
        let origin = beijing();
        let destination = shanghai();
        let route = client
            .route(&PlanBudget::start(&options), &origin, &destination, &[])
            .await
            .unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 0, "budget spent, no wire calls");
        assert!(route.approximate);
        let expected_km = geo::haversine_km(&origin, &destination);
        assert!((route.distance_km - expected_km).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_retry_waits_linearly() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/direction/driving"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.retry.base_delay = Duration::from_millis(20);

        let client = DistanceClient::new(&config).unwrap();
        let started = Instant::now();
        let route = client
            .route(&PlanBudget::default(), &beijing(), &shanghai(), &[])
            .await
            .unwrap();
        let elapsed = started.elapsed();

        // Two sleeps between three attempts: 1x + 2x the base delay
        assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
        assert!(route.approximate);
    }

    #[test]
    fn test_invalid_coordinates_rejected_before_any_call() {
        let client = DistanceClient::new(&test_config("http://localhost:9")).unwrap();
        let bad = GeoPoint::new(91.0, 0.0);

        let result =
            tokio_test::block_on(client.route(&PlanBudget::default(), &bad, &shanghai(), &[]));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
