//! Registry of periodic monitors sharing one deadline queue and one clock.
//!
//! Each watch samples its monitor once per period and hands the sample to a notify
//! callback, which decides whether the watch keeps going. Nothing runs on its own: the host
//! asks `time_to_wait()` how long it may block, then calls `blink()` to fire every watch
//! that has come due.
//!
//! Watches sharing a period and registered at the same instant fire in registration order,
//! every round, since each round's deadline is the same base plus the same period and the
//! queue breaks ties by insertion order.
use std::{borrow::Borrow, cmp::Ordering, collections::HashMap, fmt::Debug, hash::Hash, thread};

use tracing::{debug, error, trace};

use crate::{
    clock::{Clock, SystemClock},
    scheduling::{deadlines::generate_deadlines, queue::DeadlineQueue, Timestamp},
    TaskError, WatchError,
};

mod watch;

use watch::{Watch, WatchStatus};

/// Period type of a clock's timestamps.
pub type Period<C> = <<C as Clock>::Instant as Timestamp>::Delta;

/// Monitor registry: owns the clock, the deadline queue and the set of live labels.
///
/// Single-threaded: every operation takes `&self`/`&mut self`, so sharing a registry across
/// threads means wrapping it in a mutex.
pub struct Registry<L = String, C = SystemClock>
where
    C: Clock,
{
    clock: C,
    queue: DeadlineQueue<C::Instant, Watch<L, C::Instant>>,
    // label -> id of the watch chain currently allowed to fire under it
    watches: HashMap<L, u64>,
    next_id: u64,
}

impl<L> Registry<L, SystemClock>
where
    L: Clone + Eq + Hash + Debug,
{
    /// New registry driven by the monotonic wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Host loop: sleep until the next deadline, fire everything due, repeat.
    ///
    /// Stops once `keep_going` returns false or nothing is left to watch, and returns the
    /// total number of watches fired.
    pub fn run_while<P>(&mut self, mut keep_going: P) -> usize
    where
        P: FnMut(&Self) -> bool,
    {
        let mut fired = 0;
        while !self.is_empty() && keep_going(self) {
            let Some(wait) = self.time_to_wait() else {
                break;
            };
            if !wait.is_zero() {
                thread::sleep(wait);
            }
            fired += self.blink();
        }
        fired
    }
}

impl<L> Default for Registry<L, SystemClock>
where
    L: Clone + Eq + Hash + Debug,
{
    fn default() -> Self {
        Registry::new()
    }
}

impl<L, C> Registry<L, C>
where
    L: Clone + Eq + Hash + Debug,
    C: Clock,
{
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            queue: DeadlineQueue::new(),
            watches: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether `label` currently has a live watch.
    pub fn watching<Q>(&self, label: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.watches.contains_key(label)
    }

    /// Number of live watches.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.watches.keys()
    }

    /// Time left until the earliest pending deadline, zero if it has already passed, or
    /// `None` when nothing is scheduled.
    pub fn time_to_wait(&self) -> Option<Period<C>> {
        let deadline = self.queue.next_deadline()?;
        Some(self.clock.now().until(deadline))
    }

    /// Poll `monitor` every `period` under `label`, passing each sample to `notify`.
    ///
    /// The first poll happens one full period after registration. `notify` returning
    /// `Ok(false)` cancels the watch; an error or panic from either callable is logged and
    /// ends the watch as well, as does a next deadline past the clock's range.
    ///
    /// Fails with `InvalidPeriod` if `period` is not positive or the first deadline does not
    /// fit the clock's range.
    pub fn watch<S, M, N>(
        &mut self,
        label: L,
        monitor: M,
        period: Period<C>,
        notify: N,
    ) -> Result<(), WatchError>
    where
        S: 'static,
        M: FnMut() -> Result<S, TaskError> + 'static,
        N: FnMut(S) -> Result<bool, TaskError> + 'static,
    {
        if self.watching(&label) {
            return Err(WatchError::DuplicateWatch {
                label: format!("{label:?}"),
            });
        }
        if period.partial_cmp(&<Period<C>>::default()) != Some(Ordering::Greater) {
            return Err(WatchError::InvalidPeriod);
        }

        let id = self.next_id + 1;
        let deadlines = generate_deadlines(self.clock.now(), period, 1);
        let mut watch = Watch::new(label.clone(), id, monitor, notify, deadlines);
        let Some(first) = watch.next_deadline() else {
            return Err(WatchError::InvalidPeriod);
        };

        self.next_id = id;
        self.queue.schedule(first, watch);
        self.watches.insert(label.clone(), self.next_id);
        debug!(label = ?label, ?period, ?first, "watch registered");
        Ok(())
    }

    /// Stop watching `label`. Returns whether it was being watched.
    ///
    /// Cancellation is lazy: the pending queue entry stays in place and is discarded
    /// without polling when it comes due. Until then `time_to_wait()` may still report
    /// that entry's deadline.
    pub fn unwatch<Q>(&mut self, label: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some((label, _)) = self.watches.remove_entry(label) else {
            return false;
        };
        debug!(label = ?label, "watch removed");
        true
    }

    /// Fire every watch whose deadline has been reached, earliest first and in registration
    /// order among equal deadlines. Returns how many fired.
    ///
    /// A watch rescheduled at a deadline that has also passed fires again within the same
    /// call, so missed periods are caught up back-to-back.
    pub fn blink(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(watch) = self.queue.pop_elapsed(now) {
            if self.watches.get(watch.label()) != Some(&watch.id()) {
                trace!(label = ?watch.label(), "dropping unwatched entry");
                continue;
            }
            fired += 1;
            self.fire(watch);
        }
        trace!(fired, "blink");
        fired
    }

    fn fire(&mut self, mut watch: Watch<L, C::Instant>) {
        match watch.fire() {
            WatchStatus::Scheduled => match watch.next_deadline() {
                Some(deadline) => self.queue.schedule(deadline, watch),
                None => {
                    error!(label = ?watch.label(), "next deadline out of clock range");
                    self.watches.remove(watch.label());
                }
            },
            WatchStatus::Cancelled => {
                debug!(label = ?watch.label(), "watch cancelled");
                self.watches.remove(watch.label());
            }
            WatchStatus::Failed(failure) => {
                error!(
                    label = ?watch.label(),
                    stage = %failure.stage(),
                    error = %failure,
                    "polling failed"
                );
                self.watches.remove(watch.label());
            }
        }
    }
}

impl<L: Debug, C: Clock> Debug for Registry<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("watches", &self.watches)
            .field("pending", &self.queue.len())
            .field("next_deadline", &self.queue.next_deadline())
            .finish()
    }
}
