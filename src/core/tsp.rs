//! Visiting-order optimization
//!
//! Finds a low-cost open path over a distance matrix, starting at index 0
//! (the driver's position). Small instances are solved exactly with
//! Held-Karp dynamic programming; larger ones fall back to a
//! nearest-neighbour construction refined by 2-opt.

use log::debug;

use crate::core::error::{Error, Result};

/// Hard ceiling on the exact solver regardless of configuration.
///
/// The Held-Karp tables hold `2^n * n` entries each; 18 stops is about
/// 75 MB, anything past that is not worth the memory.
pub const EXACT_SOLVER_CEILING: usize = 18;

/// Visiting order over matrix indices, index 0 first
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOrder {
    pub visit_order: Vec<usize>,
    pub total_distance: f64,
}

/// Order the stops of `distances` into a short open path from index 0.
///
/// Instances up to `max_exact_stops` (capped at [`EXACT_SOLVER_CEILING`])
/// are solved optimally; beyond that a 2-opt heuristic is used. The
/// matrix is treated as directed and need not be symmetric.
pub fn solve_order(distances: &[Vec<f64>], max_exact_stops: usize) -> Result<RouteOrder> {
    let n = distances.len();
    if n == 0 {
        return Err(Error::InvalidInput(
            "cannot order an empty stop list".to_string(),
        ));
    }
    if distances.iter().any(|row| row.len() != n) {
        return Err(Error::InvalidInput(format!(
            "stop distance matrix is not square ({n} rows)"
        )));
    }
    if n == 1 {
        return Ok(RouteOrder {
            visit_order: vec![0],
            total_distance: 0.0,
        });
    }

    if n <= max_exact_stops.min(EXACT_SOLVER_CEILING) {
        held_karp(distances)
    } else {
        debug!("{n} stops exceed the exact solver cap, using 2-opt heuristic");
        let order = two_opt(distances, nearest_neighbor(distances));
        let total_distance = path_length(distances, &order);
        if !total_distance.is_finite() {
            return Err(Error::InvalidInput(
                "no feasible visiting order over the given distances".to_string(),
            ));
        }
        Ok(RouteOrder {
            visit_order: order,
            total_distance,
        })
    }
}

/// Exact open-path solver over subsets.
///
/// `dp[mask][last]` is the cheapest path visiting exactly the stops in
/// `mask`, starting at 0 and ending at `last`. The answer is the best
/// full-mask cell over every possible final stop.
fn held_karp(distances: &[Vec<f64>]) -> Result<RouteOrder> {
    let n = distances.len();
    let full: usize = (1 << n) - 1;
    let mut dp = vec![vec![f64::INFINITY; n]; 1 << n];
    let mut parent = vec![vec![usize::MAX; n]; 1 << n];
    dp[1][0] = 0.0;

    for mask in 1..=full {
        if mask & 1 == 0 {
            continue;
        }
        for last in 0..n {
            if mask & (1 << last) == 0 {
                continue;
            }
            let cost = dp[mask][last];
            if !cost.is_finite() {
                continue;
            }
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let weight = distances[last][next];
                if !weight.is_finite() {
                    continue;
                }
                let next_mask = mask | (1 << next);
                let candidate = cost + weight;
                if candidate < dp[next_mask][next] {
                    dp[next_mask][next] = candidate;
                    parent[next_mask][next] = last;
                }
            }
        }
    }

    let mut best = f64::INFINITY;
    let mut last = 0;
    for stop in 1..n {
        if dp[full][stop] < best {
            best = dp[full][stop];
            last = stop;
        }
    }
    if !best.is_finite() {
        return Err(Error::InvalidInput(
            "no feasible visiting order over the given distances".to_string(),
        ));
    }

    let mut visit_order = Vec::with_capacity(n);
    let mut mask = full;
    let mut cursor = last;
    while cursor != usize::MAX {
        visit_order.push(cursor);
        let previous = parent[mask][cursor];
        mask &= !(1 << cursor);
        cursor = previous;
    }
    visit_order.reverse();

    Ok(RouteOrder {
        visit_order,
        total_distance: best,
    })
}

/// Greedy construction: always drive to the closest unvisited stop
fn nearest_neighbor(distances: &[Vec<f64>]) -> Vec<usize> {
    let n = distances.len();
    let mut remaining: Vec<usize> = (1..n).collect();
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    order.push(current);

    while !remaining.is_empty() {
        let mut best_idx = 0;
        for (idx, &candidate) in remaining.iter().enumerate() {
            if distances[current][candidate] < distances[current][remaining[best_idx]] {
                best_idx = idx;
            }
        }
        current = remaining.swap_remove(best_idx);
        order.push(current);
    }
    order
}

/// First-improvement 2-opt, repeated until no segment reversal helps.
/// Index 0 stays fixed at the front.
fn two_opt(distances: &[Vec<f64>], mut order: Vec<usize>) -> Vec<usize> {
    let mut improved = true;
    while improved {
        improved = false;
        let current_length = path_length(distances, &order);
        'scan: for i in 1..order.len().saturating_sub(1) {
            for j in i + 1..order.len() {
                let mut candidate = order.clone();
                candidate[i..=j].reverse();
                if path_length(distances, &candidate) + 1e-9 < current_length {
                    order = candidate;
                    improved = true;
                    break 'scan;
                }
            }
        }
    }
    order
}

fn path_length(distances: &[Vec<f64>], order: &[usize]) -> f64 {
    order.windows(2).map(|leg| distances[leg[0]][leg[1]]).sum()
}
