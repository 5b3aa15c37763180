/*!
 * Worker count selection for concurrent uploads
 */

use std::thread;
use tracing::warn;

/// Upper bound of the auto-detected worker count
pub const MAX_AUTO_CONCURRENCY: usize = 16;

/// Turn a configured concurrency into the worker count used by the dispatcher
///
/// `0` means auto-detect; any other value is used as is.
pub fn resolve_concurrency(configured: usize) -> usize {
    if configured == 0 {
        detect_optimal_concurrency()
    } else {
        configured
    }
}

/// Detect the optimal concurrency level based on the system
pub fn detect_optimal_concurrency() -> usize {
    optimal_for_cpus(cpu_count())
}

// Uploads are I/O-bound, so use 2x CPU count, capped
fn optimal_for_cpus(cpus: usize) -> usize {
    (cpus * 2).clamp(1, MAX_AUTO_CONCURRENCY)
}

/// Number of CPUs available to this process
///
/// If detection fails (restricted containers, cgroup environments) this falls back
/// to 1 and logs a warning.
fn cpu_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|e| {
            warn!(
                error = %e,
                "failed to detect available parallelism, defaulting to 1"
            );
            1
        })
}
