//! A set of clock-agnostic scheduling primitives for deferring work until a deadline.
//!
//! Currently, this module contains a deadline-ordered priority queue, plus lazy generators
//! for periodic deadlines and for elapsed-time intervals between clock readings.
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

pub mod deadlines;
pub mod intervals;
pub mod queue;

/// Trait for any totally ordered point in time that deadlines can be expressed in.
///
/// The distance between two timestamps is a `Delta`, and adding a `Delta` moves a timestamp
/// forward, or fails when the result is out of range. `Delta::default()` must be the zero
/// duration.
pub trait Timestamp: Copy + Ord + Debug {
    type Delta: Copy + PartialOrd + Default + Debug;

    /// Move forward by `delta`, or `None` if the result is not representable.
    fn checked_advance(self, delta: Self::Delta) -> Option<Self>;
    /// Distance from an `earlier` timestamp to `self`.
    fn since(self, earlier: Self) -> Self::Delta;

    /// Time remaining from `self` until `later`, saturating at zero when `later` has passed.
    fn until(self, later: Self) -> Self::Delta {
        if later > self {
            later.since(self)
        } else {
            Self::Delta::default()
        }
    }
}

macro_rules! timestamp {
    (in $delta:ty => $($t:ty),*) => {
        $(
            impl Timestamp for $t {
                type Delta = $delta;

                fn checked_advance(self, delta: $delta) -> Option<Self> {
                    self.checked_add(delta)
                }

                fn since(self, earlier: Self) -> $delta {
                    self - earlier
                }
            }
        )*
    };
    ($($t:ty),*) => {
        $(timestamp!(in $t => $t);)*
    };
}

timestamp!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
timestamp!(in Duration => Instant);
