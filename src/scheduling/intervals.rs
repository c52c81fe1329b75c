//! Elapsed-time intervals between successive clock readings.
//!
//! Rate computations pair a local stopwatch with the intervals of some cumulative counter
//! (CPU time consumed by a process, bytes transferred, ...) to turn totals into rates.
use std::{
    iter::FusedIterator,
    ops::Sub,
    time::{Duration, Instant},
};

/// Infinite sequence of differences between consecutive readings of `clock`.
#[derive(Debug, Clone)]
pub struct Intervals<F, T> {
    clock: F,
    last: T,
}

impl<F, T> Intervals<F, T>
where
    F: FnMut() -> T,
    T: Copy + Sub,
{
    /// Reading taken at the previous pull, or at construction before any pull.
    pub fn baseline(&self) -> T {
        self.last
    }
}

impl<F, T> Iterator for Intervals<F, T>
where
    F: FnMut() -> T,
    T: Copy + Sub,
{
    type Item = T::Output;

    fn next(&mut self) -> Option<T::Output> {
        let now = (self.clock)();
        let delta = now - self.last;
        self.last = now;
        Some(delta)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl<F, T> FusedIterator for Intervals<F, T>
where
    F: FnMut() -> T,
    T: Copy + Sub,
{
}

/// Generate the time elapsed between pulls, as measured by `clock`.
///
/// The clock is read once immediately to seed the baseline, so the first pull measures
/// from construction.
pub fn generate_intervals<F, T>(mut clock: F) -> Intervals<F, T>
where
    F: FnMut() -> T,
    T: Copy + Sub,
{
    let last = clock();
    Intervals { clock, last }
}

/// Wall-clock stopwatch yielding the time elapsed between pulls.
pub fn local_stopwatch() -> Intervals<fn() -> Instant, Instant> {
    generate_intervals(Instant::now as fn() -> Instant)
}

/// Ratio of a counter's growth to wall time between pulls, divided across `shares`.
///
/// With `counter` reporting cumulative processor seconds of a process and `shares` the
/// number of cores, this yields the fraction of total computing power used since the
/// previous pull. Intervals with no measurable wall time yield `0.0`.
pub fn rate<F>(counter: F, shares: u32) -> impl Iterator<Item = f64>
where
    F: FnMut() -> f64,
{
    let shares = f64::from(shares.max(1));
    local_stopwatch()
        .zip(generate_intervals(counter))
        .map(move |(local, remote): (Duration, f64)| {
            let local = local.as_secs_f64();
            if local > 0.0 {
                remote / shares / local
            } else {
                0.0
            }
        })
}
