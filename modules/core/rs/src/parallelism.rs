use std::cmp::Ordering;
use std::thread::available_parallelism;

use eyre::Result;

/// Normalize a requested worker count against the machine running the predictor.
///
/// Binding predictors fork that many subprocesses. Positive requests are clamped to the
/// available cores, zero means a single worker, and negative values leave that many cores
/// free (never dropping below one).
pub fn processes(requested: isize) -> Result<usize> {
    let cores = available_parallelism()?.get() as isize;
    Ok(clamp(requested, cores))
}

fn clamp(requested: isize, cores: isize) -> usize {
    match requested.cmp(&0) {
        Ordering::Greater => requested.min(cores) as usize,
        Ordering::Equal => 1,
        Ordering::Less => (cores + requested + 1).max(1) as usize,
    }
}
