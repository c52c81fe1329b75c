//! Self-rescheduling polling task bound to one label.
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    scheduling::{deadlines::Deadlines, Timestamp},
    Stage, TaskError, TaskFailure,
};

/// One polling cycle: sample the monitor, hand the sample to notify, report whether to keep going.
type Cycle = Box<dyn FnMut() -> Result<bool, TaskFailure>>;

/// Outcome of firing a watch once.
#[derive(Debug)]
pub(crate) enum WatchStatus {
    /// Notify asked to keep watching.
    Scheduled,
    /// Notify asked to stop.
    Cancelled,
    Failed(TaskFailure),
}

/// Queue entry for a registered monitor, carrying its own deadline cursor.
pub(crate) struct Watch<L, T: Timestamp> {
    label: L,
    id: u64,
    cycle: Cycle,
    deadlines: Deadlines<T>,
}

impl<L, T: Timestamp> Watch<L, T> {
    pub(crate) fn new<S, M, N>(
        label: L,
        id: u64,
        mut monitor: M,
        mut notify: N,
        deadlines: Deadlines<T>,
    ) -> Self
    where
        S: 'static,
        M: FnMut() -> Result<S, TaskError> + 'static,
        N: FnMut(S) -> Result<bool, TaskError> + 'static,
    {
        let cycle: Cycle = Box::new(move || {
            let sample = guarded(Stage::Monitor, &mut monitor)?.map_err(TaskFailure::Monitor)?;
            guarded(Stage::Notify, || notify(sample))?.map_err(TaskFailure::Notify)
        });
        Self {
            label,
            id,
            cycle,
            deadlines,
        }
    }

    pub(crate) fn label(&self) -> &L {
        &self.label
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Pull the next deadline from this watch's private generator, `None` once deadlines
    /// run past the clock's range.
    pub(crate) fn next_deadline(&mut self) -> Option<T> {
        self.deadlines.next_deadline()
    }

    /// Run one polling cycle. Every error and panic raised by the monitor or notify
    /// callables is turned into `WatchStatus::Failed`.
    pub(crate) fn fire(&mut self) -> WatchStatus {
        match (self.cycle)() {
            Ok(true) => WatchStatus::Scheduled,
            Ok(false) => WatchStatus::Cancelled,
            Err(failure) => WatchStatus::Failed(failure),
        }
    }
}

impl<L: fmt::Debug, T: Timestamp> fmt::Debug for Watch<L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("next", &self.deadlines.peek())
            .field("period", &self.deadlines.period())
            .finish_non_exhaustive()
    }
}

fn guarded<R>(stage: Stage, f: impl FnOnce() -> R) -> Result<R, TaskFailure> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| TaskFailure::Panicked {
        stage,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::deadlines::generate_deadlines;
    use std::{cell::Cell, rc::Rc};

    fn watch<S, M, N>(monitor: M, notify: N) -> Watch<&'static str, u64>
    where
        S: 'static,
        M: FnMut() -> Result<S, TaskError> + 'static,
        N: FnMut(S) -> Result<bool, TaskError> + 'static,
    {
        Watch::new("sensor", 1, monitor, notify, generate_deadlines(0, 2, 1))
    }

    #[test]
    fn test_notify_decides_status() {
        let keep = Rc::new(Cell::new(true));
        let flag = Rc::clone(&keep);
        let mut task = watch(|| Ok(3u32), move |sample| Ok(sample == 3 && flag.get()));

        assert!(matches!(task.fire(), WatchStatus::Scheduled));
        keep.set(false);
        assert!(matches!(task.fire(), WatchStatus::Cancelled));
    }

    #[test]
    fn test_monitor_error_skips_notify() {
        let notified = Rc::new(Cell::new(0));
        let calls = Rc::clone(&notified);
        let mut task = watch(
            || -> Result<u8, TaskError> { Err("sensor offline".into()) },
            move |_| {
                calls.set(calls.get() + 1);
                Ok(true)
            },
        );

        match task.fire() {
            WatchStatus::Failed(failure) => {
                assert_eq!(failure.stage(), Stage::Monitor);
                assert_eq!(failure.to_string(), "monitor failed: sensor offline");
            }
            status => panic!("unexpected status {status:?}"),
        }
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_notify_error_is_failure() {
        let mut task = watch(|| Ok(()), |_| Err("listener gone".into()));
        match task.fire() {
            WatchStatus::Failed(TaskFailure::Notify(err)) => {
                assert_eq!(err.to_string(), "listener gone")
            }
            status => panic!("unexpected status {status:?}"),
        }
    }

    #[test]
    fn test_panics_are_contained() {
        let mut task = watch(|| -> Result<u8, TaskError> { panic!("boom") }, |_| Ok(true));
        match task.fire() {
            WatchStatus::Failed(TaskFailure::Panicked { stage, message }) => {
                assert_eq!(stage, Stage::Monitor);
                assert_eq!(message, "boom");
            }
            status => panic!("unexpected status {status:?}"),
        }

        let mut task = watch(|| Ok(5), |sample: i32| -> Result<bool, TaskError> {
            panic!("bad sample {sample}")
        });
        match task.fire() {
            WatchStatus::Failed(failure) => {
                assert_eq!(failure.stage(), Stage::Notify);
                assert_eq!(failure.to_string(), "notify panicked: bad sample 5");
            }
            status => panic!("unexpected status {status:?}"),
        }
    }

    #[test]
    fn test_deadlines_skip_registration_instant() {
        let mut task = watch(|| Ok(()), |_| Ok(true));
        assert_eq!(task.next_deadline(), Some(2));
        assert_eq!(task.next_deadline(), Some(4));
        assert_eq!(task.id(), 1);
        assert_eq!(*task.label(), "sensor");
    }
}
