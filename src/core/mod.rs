//! Core library modules for courier-route
//!
//! This module contains the internal implementation details of the
//! courier-route library.

pub mod config;
pub mod error;
pub mod geo;
pub mod graph;
pub mod grouping;
pub mod model;
pub mod optimizer;
pub mod provider;
pub mod schedule;
pub mod tariff;
pub mod tsp;

// Re-export main types for internal use
pub use error::{Error, Result};
pub use optimizer::RouteOptimizer;
pub use provider::{DistanceClient, PlanOptions};
