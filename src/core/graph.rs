//! Station graph construction and shortest paths
//!
//! Builds a complete directed distance matrix over a station set through
//! the distance provider, then answers single-source shortest-path queries
//! over it with Dijkstra's algorithm.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;

use crate::core::error::{Error, Result};
use crate::core::model::Station;
use crate::core::provider::{DistanceClient, PlanBudget};

/// Complete directed weighted graph over a station set.
///
/// Row/column order follows the station order given at construction;
/// `distances[i][j]` is the driving distance from station i to station j.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    stations: Vec<Station>,
    distances: Vec<Vec<f64>>,
    durations: Vec<Vec<f64>>,
    approximate: bool,
}

impl DistanceMatrix {
    /// Assemble a matrix from precomputed parts, checking shape
    pub fn from_parts(
        stations: Vec<Station>,
        distances: Vec<Vec<f64>>,
        durations: Vec<Vec<f64>>,
        approximate: bool,
    ) -> Result<Self> {
        let n = stations.len();
        let square = |rows: &Vec<Vec<f64>>| rows.len() == n && rows.iter().all(|r| r.len() == n);
        if !square(&distances) || !square(&durations) {
            return Err(Error::InvalidInput(format!(
                "distance matrix shape does not match {n} stations"
            )));
        }
        ensure_unique_ids(&stations)?;
        Ok(Self {
            stations,
            distances,
            durations,
            approximate,
        })
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }

    pub fn durations(&self) -> &[Vec<f64>] {
        &self.durations
    }

    /// True when any entry came from the geometric fallback
    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn index_of(&self, station_id: i64) -> Option<usize> {
        self.stations.iter().position(|s| s.id == station_id)
    }
}

fn ensure_unique_ids(stations: &[Station]) -> Result<()> {
    let mut seen = HashSet::new();
    for station in stations {
        if !seen.insert(station.id) {
            return Err(Error::InvalidInput(format!(
                "duplicate station id {} in graph input",
                station.id
            )));
        }
    }
    Ok(())
}

/// Build the full distance matrix for `stations` through the provider.
///
/// One batched pairwise call per row (origin i against every other
/// station), rows issued concurrently. The diagonal is zero; no symmetry
/// is assumed between A→B and B→A.
pub async fn build_distance_matrix(
    client: &DistanceClient,
    budget: &PlanBudget,
    stations: &[Station],
    concurrency: usize,
) -> Result<DistanceMatrix> {
    if stations.is_empty() {
        return Err(Error::InvalidInput(
            "cannot build a distance matrix over zero stations".to_string(),
        ));
    }
    ensure_unique_ids(stations)?;

    let n = stations.len();
    if n == 1 {
        return DistanceMatrix::from_parts(
            stations.to_vec(),
            vec![vec![0.0]],
            vec![vec![0.0]],
            false,
        );
    }

    debug!("building {n}x{n} distance matrix over {n} stations");

    let rows: Vec<(usize, Vec<_>)> = stream::iter(0..n)
        .map(|i| async move {
            let origins = vec![stations[i].location; n - 1];
            let destinations: Vec<_> = (0..n)
                .filter(|&j| j != i)
                .map(|j| stations[j].location)
                .collect();
            let row = client
                .pairwise_distances(budget, &origins, &destinations)
                .await?;
            Ok::<_, Error>((i, row))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut distances = vec![vec![0.0; n]; n];
    let mut durations = vec![vec![0.0; n]; n];
    let mut approximate = false;

    for (i, row) in rows {
        for (pair, j) in row.iter().zip((0..n).filter(|&j| j != i)) {
            distances[i][j] = pair.distance_km;
            durations[i][j] = pair.duration_minutes;
            approximate |= pair.approximate;
        }
    }

    DistanceMatrix::from_parts(stations.to_vec(), distances, durations, approximate)
}

/// Heap entry for Dijkstra's algorithm
#[derive(Clone, Debug)]
struct DijkstraState {
    node: usize,
    cost: f64,
}

impl PartialEq for DijkstraState {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for DijkstraState {}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// Single-source shortest-path result, keyed by station id.
///
/// Stations the search never reached are absent from both maps.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    pub source: i64,
    pub distances: HashMap<i64, f64>,
    pub predecessors: HashMap<i64, i64>,
}

/// Dijkstra over the matrix from `source_id`.
///
/// Graphs with fewer than 2 nodes degenerate to the fixed point: the
/// source maps to distance 0 and nothing else is reachable.
pub fn shortest_paths(matrix: &DistanceMatrix, source_id: i64) -> Result<ShortestPaths> {
    let source_idx = matrix.index_of(source_id).ok_or_else(|| {
        Error::InvalidInput(format!("source station {source_id} is not in the graph"))
    })?;

    let n = matrix.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[source_idx] = 0.0;
    heap.push(DijkstraState {
        node: source_idx,
        cost: 0.0,
    });

    while let Some(DijkstraState { node, cost }) = heap.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;

        for next in 0..n {
            if next == node {
                continue;
            }
            let weight = matrix.distances[node][next];
            if !weight.is_finite() {
                continue;
            }
            let candidate = cost + weight;
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = Some(node);
                heap.push(DijkstraState {
                    node: next,
                    cost: candidate,
                });
            }
        }
    }

    let mut distances = HashMap::new();
    let mut predecessors = HashMap::new();
    for idx in 0..n {
        if dist[idx].is_finite() {
            distances.insert(matrix.stations[idx].id, dist[idx]);
            if let Some(p) = prev[idx] {
                predecessors.insert(matrix.stations[idx].id, matrix.stations[p].id);
            }
        }
    }

    Ok(ShortestPaths {
        source: source_id,
        distances,
        predecessors,
    })
}

/// Walk predecessors backward from `destination_id` to the source.
///
/// Fails with `UnreachableDestination` when the destination was never
/// reached by the search.
pub fn reconstruct_path(paths: &ShortestPaths, destination_id: i64) -> Result<Vec<i64>> {
    if !paths.distances.contains_key(&destination_id) {
        return Err(Error::UnreachableDestination {
            from: paths.source,
            to: destination_id,
        });
    }

    let mut path = vec![destination_id];
    let mut current = destination_id;
    while current != paths.source {
        match paths.predecessors.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => {
                return Err(Error::UnreachableDestination {
                    from: paths.source,
                    to: destination_id,
                })
            }
        }
    }

    path.reverse();
    Ok(path)
}
