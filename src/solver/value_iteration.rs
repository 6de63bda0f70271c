//! Value iteration over a dense transition matrix
//!
//! Synchronous (Jacobi) sweeps: every sweep reads only the previous utility
//! vector and produces a complete new one before replacing it.

use super::{SolverConfig, SolverError, SolverResult};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

/// Fixed point reached by [`value_iteration`]
#[derive(Debug, Clone, PartialEq)]
pub struct Convergence {
    /// Utility per state
    pub utilities: Array1<f64>,
    /// Sweeps performed, including the converging one
    pub iterations: usize,
    /// Largest change in the last sweep
    pub delta: f64,
}

/// One Bellman sweep: `U'[i] = reward[i] + gamma * Σ_j matrix[i][j] * U[j]`
pub fn bellman_sweep(matrix: &Array2<f64>, rewards: &Array1<f64>, utilities: &Array1<f64>, gamma: f64) -> Array1<f64> {
    rewards + &(matrix.dot(utilities) * gamma)
}

/// Largest absolute componentwise difference
pub fn max_abs_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Iterate from `U = 0` until no utility moves by `theta` or more.
///
/// Fails with [`SolverError::NonConvergence`] once `max_iterations` sweeps are
/// spent or the utilities stop being finite.
pub fn value_iteration(
    matrix: &Array2<f64>,
    rewards: &Array1<f64>,
    config: &SolverConfig,
) -> SolverResult<Convergence> {
    config.validate()?;
    let n = rewards.len();
    if matrix.dim() != (n, n) {
        return Err(SolverError::DimensionMismatch {
            matrix: matrix.dim(),
            rewards: n,
        });
    }

    let rewards = rewards.mapv(|r| if r.is_nan() { 0.0 } else { r });
    let mut utilities = Array1::<f64>::zeros(n);
    let mut delta = 0.0;

    for iteration in 1..=config.max_iterations {
        let next = bellman_sweep(matrix, &rewards, &utilities, config.gamma);
        delta = max_abs_diff(&next, &utilities);
        utilities = next;

        debug!("Value iteration sweep {}: delta {}", iteration, delta);

        if !delta.is_finite() {
            return Err(SolverError::NonConvergence {
                iterations: iteration,
                delta,
            });
        }
        if delta < config.theta {
            info!("Value iteration converged in {} iterations (delta {})", iteration, delta);
            return Ok(Convergence {
                utilities,
                iterations: iteration,
                delta,
            });
        }
    }

    Err(SolverError::NonConvergence {
        iterations: config.max_iterations,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn config(gamma: f64, theta: f64) -> SolverConfig {
        SolverConfig {
            gamma,
            theta,
            max_iterations: 10_000,
        }
    }

    #[test]
    fn test_zero_rewards_converge_immediately() {
        let matrix = array![[0.0, 1.0], [0.0, 0.0]];
        let rewards = array![0.0, 0.0];
        let result = value_iteration(&matrix, &rewards, &config(0.9, 1e-6)).unwrap();
        assert_eq!(result.iterations, 1);
        assert_eq!(result.utilities, array![0.0, 0.0]);
    }

    #[test]
    fn test_chain_matches_closed_form() {
        // 0 -> 1 with certainty, 1 is a sink with reward 1
        let matrix = array![[0.0, 1.0], [0.0, 0.0]];
        let rewards = array![0.0, 1.0];
        let result = value_iteration(&matrix, &rewards, &config(0.5, 1e-9)).unwrap();
        assert!((result.utilities[1] - 1.0).abs() < 1e-9);
        assert!((result.utilities[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_self_loop_geometric_series() {
        // U = 1 + 0.9 * 0.5 * U  =>  U = 1 / 0.55
        let matrix = array![[0.5]];
        let rewards = array![1.0];
        let result = value_iteration(&matrix, &rewards, &config(0.9, 1e-10)).unwrap();
        assert!((result.utilities[0] - 1.0 / 0.55).abs() < 1e-8);
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let matrix = array![[0.2, 0.8, 0.0], [0.0, 0.5, 0.5], [0.0, 0.0, 0.3]];
        let rewards = array![0.0, 1.0, 2.0];
        let cfg = config(0.9, 1e-6);
        let result = value_iteration(&matrix, &rewards, &cfg).unwrap();
        let again = bellman_sweep(&matrix, &rewards, &result.utilities, cfg.gamma);
        assert!(max_abs_diff(&again, &result.utilities) < cfg.theta);
    }

    #[test]
    fn test_divergence_hits_the_bound() {
        // row sum 2 with gamma 1: utilities double every sweep
        let matrix = array![[2.0]];
        let rewards = array![1.0];
        let cfg = SolverConfig {
            gamma: 1.0,
            theta: 1e-3,
            max_iterations: 50,
        };
        let err = value_iteration(&matrix, &rewards, &cfg).unwrap_err();
        assert!(matches!(err, SolverError::NonConvergence { iterations: 50, .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let matrix = array![[0.0, 1.0], [0.0, 0.0]];
        let rewards = array![0.0];
        assert!(matches!(
            value_iteration(&matrix, &rewards, &config(0.9, 1e-3)),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_problem() {
        let matrix = Array2::<f64>::zeros((0, 0));
        let rewards = Array1::<f64>::zeros(0);
        let result = value_iteration(&matrix, &rewards, &config(0.9, 1e-3)).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.utilities.is_empty());
    }
}
