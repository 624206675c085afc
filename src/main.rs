//! # Courier-route CLI
//!
//! Command-line interface for the courier-route library.
//! Plans delivery trips from JSON request files and prints the resulting
//! plans as JSON.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::error;
use serde::Deserialize;

use courier_route::{
    EngineConfig, GeoPoint, PackageCandidate, PlanOptions, RouteOptimizer, Station,
    VehicleCapacity,
};

/// Command-line interface for courier-route
#[derive(Parser)]
#[command(name = "courier-route")]
#[command(about = "Delivery route optimization engine")]
#[command(long_about = "Plans delivery trips against a mapping provider:
  courier-route plan request.json    # Multi-stop trips for a package pool
  courier-route trip request.json    # Direct origin -> destination trip
  courier-route path request.json    # Cheapest station-to-station path

Requests are JSON files; results are printed to stdout as JSON.
When the mapping provider is unreachable the engine degrades to
great-circle estimates and marks the result \"approximate\" instead
of failing.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Mapping provider API key (falls back to COURIER_MAPS_KEY)
    #[arg(long, global = true, default_value = "")]
    api_key: String,

    /// Overall planning deadline in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Plan capacity-grouped multi-stop trips for a package pool
    Plan {
        /// JSON request file
        request: String,
    },
    /// Plan a direct trip between two stations
    Trip {
        /// JSON request file
        request: String,
    },
    /// Find the cheapest path between two stations
    Path {
        /// JSON request file
        request: String,
    },
}

/// Request shape for `plan`
#[derive(Deserialize)]
struct PlanRequest {
    driver_position: GeoPoint,
    #[serde(default)]
    trip_destination: Option<GeoPoint>,
    stations: Vec<Station>,
    packages: Vec<PackageCandidate>,
    #[serde(default)]
    capacity: Option<VehicleCapacity>,
}

/// Request shape for `trip`
#[derive(Deserialize)]
struct TripRequest {
    origin: Station,
    destination: Station,
    #[serde(default)]
    packages: Vec<PackageCandidate>,
}

/// Request shape for `path`
#[derive(Deserialize)]
struct PathRequest {
    stations: Vec<Station>,
    source_id: i64,
    destination_id: i64,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🚚 courier-route v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let mut config = EngineConfig::default();
    config.endpoints.api_key = resolve_api_key(&cli.api_key);

    let options = PlanOptions {
        deadline: cli.timeout_secs.map(Duration::from_secs),
        cancel: None,
    };
    let optimizer = RouteOptimizer::new(config)?;

    match &cli.command {
        Command::Plan { request } => {
            let request: PlanRequest = read_request(request)?;
            if cli.verbose {
                eprintln!(
                    "📦 {} candidate package(s) over {} station(s)",
                    request.packages.len(),
                    request.stations.len()
                );
            }

            let outcome = optimizer
                .plan_multi_stop(
                    &options,
                    request.driver_position,
                    request.trip_destination,
                    &request.packages,
                    &request.stations,
                    &request.capacity.unwrap_or_default(),
                )
                .await?;

            print_json(&outcome)?;
            eprintln!(
                "✅ {} trip(s) planned, {} package(s) skipped",
                outcome.plans.len(),
                outcome.skipped.len()
            );
        }
        Command::Trip { request } => {
            let request: TripRequest = read_request(request)?;

            let plan = optimizer
                .plan_direct_trip(
                    &options,
                    &request.origin,
                    &request.destination,
                    &request.packages,
                )
                .await?;

            print_json(&plan)?;
            eprintln!(
                "✅ {:.1} km in {:.0} min, estimated earnings {:.2}",
                plan.total_distance_km, plan.total_duration_minutes, plan.estimated_earnings
            );
        }
        Command::Path { request } => {
            let request: PathRequest = read_request(request)?;

            let summary = optimizer
                .cheapest_path(
                    &options,
                    &request.stations,
                    request.source_id,
                    request.destination_id,
                )
                .await?;

            print_json(&summary)?;
            eprintln!(
                "✅ {} stop(s), {:.1} km",
                summary.stations.len(),
                summary.total_distance_km
            );
        }
    }

    Ok(())
}

/// Explicit flag wins over the environment
fn resolve_api_key(flag: &str) -> String {
    if flag.is_empty() {
        std::env::var("COURIER_MAPS_KEY").unwrap_or_default()
    } else {
        flag.to_string()
    }
}

fn read_request<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse request file {path}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
