//! Utility Solver
//!
//! Runs value iteration over a [`DecisionGraph`]'s transition matrix and
//! reward vector, then folds the per-state utilities into one path utility
//! per record and writes both back onto the graph.

pub mod path;
pub mod value_iteration;

pub use path::{cumulative_offsets, path_utilities};
pub use value_iteration::{bellman_sweep, max_abs_diff, value_iteration, Convergence};

use crate::graph::{DecisionGraph, GraphError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Solver errors
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Value iteration did not converge after {iterations} iterations (last delta {delta})")]
    NonConvergence { iterations: usize, delta: f64 },

    #[error("Invalid solver parameter: {0}")]
    InvalidParameter(String),

    #[error("Matrix of shape {matrix:?} does not match {rewards} rewards")]
    DimensionMismatch { matrix: (usize, usize), rewards: usize },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type SolverResult<T> = Result<T, SolverError>;

/// Solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Discount factor, in (0, 1]
    pub gamma: f64,
    /// Convergence threshold on the largest utility change
    pub theta: f64,
    /// Sweeps allowed before giving up
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 0.005,
            max_iterations: 10_000,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(SolverError::InvalidParameter(format!(
                "gamma must be in (0, 1], got {}",
                self.gamma
            )));
        }
        if !(self.theta > 0.0 && self.theta.is_finite()) {
            return Err(SolverError::InvalidParameter(format!(
                "theta must be positive, got {}",
                self.theta
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of [`UtilitySolver::solve`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolveReport {
    pub iterations: usize,
    pub delta: f64,
}

/// Value-iteration solver for decision graphs
pub struct UtilitySolver {
    pub config: SolverConfig,
}

impl UtilitySolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Utilities at the fixed point, one per state
    pub fn utility_values(&self, graph: &DecisionGraph) -> SolverResult<Convergence> {
        value_iteration(graph.transition_matrix(), &graph.reward_vector(), &self.config)
    }

    /// Solve and write utilities and path utilities back onto the graph
    pub fn solve(&self, graph: &mut DecisionGraph) -> SolverResult<SolveReport> {
        let convergence = self.utility_values(graph)?;
        let paths = path_utilities(graph, &convergence.utilities);
        let utilities = convergence.utilities.to_vec();

        graph.set_utility_values(&utilities)?;
        graph.set_path_utilities(&paths)?;

        Ok(SolveReport {
            iterations: convergence.iterations,
            delta: convergence.delta,
        })
    }
}
