//! Periodic deadline generation.
use std::iter::FusedIterator;

use super::Timestamp;

/// Arithmetic progression of deadlines: `start, start + period, start + 2 * period, ...`
///
/// Unbounded in practice; the sequence only ends once the next deadline would fall outside
/// the range `T` can represent. Not restartable; construct a fresh generator to begin again.
#[derive(Debug, Clone)]
pub struct Deadlines<T: Timestamp> {
    next: Option<T>,
    period: T::Delta,
}

impl<T: Timestamp> Deadlines<T> {
    /// Deadline the next pull will yield, without advancing.
    pub fn peek(&self) -> Option<T> {
        self.next
    }

    pub fn period(&self) -> T::Delta {
        self.period
    }

    /// Yield the current deadline and move the cursor one period forward.
    pub fn next_deadline(&mut self) -> Option<T> {
        let deadline = self.next?;
        self.next = deadline.checked_advance(self.period);
        Some(deadline)
    }
}

impl<T: Timestamp> Iterator for Deadlines<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.next_deadline()
    }
}

impl<T: Timestamp> FusedIterator for Deadlines<T> {}

/// Generate deadlines every `period` from `start`, silently discarding the first `skip`.
///
/// The first visible deadline is `start + skip * period`. Skipping only affects seeding;
/// afterwards the sequence advances one period per pull.
pub fn generate_deadlines<T: Timestamp>(start: T, period: T::Delta, skip: usize) -> Deadlines<T> {
    let mut next = Some(start);
    for _ in 0..skip {
        next = next.and_then(|deadline| deadline.checked_advance(period));
    }
    Deadlines { next, period }
}
