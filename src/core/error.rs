//! Error types for the courier-route library
//!
//! Provides the error taxonomy for route optimization operations.

use thiserror::Error;

/// Main error type for courier-route operations
#[derive(Debug, Error)]
pub enum Error {
    /// Mapping API unreachable or erroring after all retries. Recovered
    /// internally with geometric estimates wherever a fallback exists;
    /// surfaces only from operations that have none (e.g. geocoding).
    #[error("Upstream mapping service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No path exists to the requested station in the constructed graph
    #[error("No route from station {from} to station {to}")]
    UnreachableDestination { from: i64, to: i64 },

    /// A single package exceeds the vehicle capacity outright
    #[error("Package {package_id} exceeds vehicle capacity")]
    CapacityInfeasible { package_id: i64 },

    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The caller aborted the operation via its cancellation token
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::UpstreamUnavailable(format!("network error: {err}"))
        } else {
            Error::UpstreamUnavailable(format!("http error: {err}"))
        }
    }
}

/// Convenience result type for courier-route operations
pub type Result<T> = std::result::Result<T, Error>;
