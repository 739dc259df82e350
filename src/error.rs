//! Error and outcome types surfaced by the scheduler.
//!
//! Three distinct situations need distinct types, matching the taxonomy the teacher crate keeps
//! between ordinary results, caller misuse, and propagated panics:
//! - waiting for a task can simply time out ([`WaitOutcome`], not an error at all);
//! - a coroutine's body can panic, and that panic has to survive crossing into whoever is
//!   `.await`ing the task ([`TaskPanic`]);
//! - misusing the API (polling a handle that was already consumed, building a runtime on the
//!   wrong thread) is a programmer error, not a recoverable one, so it panics rather than
//!   returning a `Result` a caller would be tempted to swallow ([`contract_violation!`]).

use std::any::Any;
use std::fmt;

/// Payload carried out of a task that panicked, or was destroyed before it completed.
///
/// Obtained from [`Task::wait`](crate::task::Task::wait) or from awaiting a
/// [`Task`](crate::task::Task) whose coroutine panicked. Matches `std::thread::Result`'s own
/// `Box<dyn Any + Send>` payload convention, since that's what [`std::panic::catch_unwind`]
/// hands back.
pub struct TaskPanic {
    payload: Payload,
}

enum Payload {
    Panicked(Box<dyn Any + Send + 'static>),
    Cancelled,
}

impl TaskPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self { payload: Payload::Panicked(payload) }
    }

    /// Build the panic payload used when a task is dropped before running to completion, rather
    /// than actually panicking.
    pub(crate) fn cancelled() -> Self {
        Self { payload: Payload::Cancelled }
    }

    /// True if this came from the task's handle being dropped rather than the coroutine itself
    /// panicking.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.payload, Payload::Cancelled)
    }

    /// Resume unwinding with the original panic payload.
    ///
    /// If this `TaskPanic` came from a cancellation rather than a real panic, panics with a
    /// message describing the cancellation instead, since there is no original payload to
    /// resume with.
    pub fn resume(self) -> ! {
        match self.payload {
            Payload::Panicked(payload) => std::panic::resume_unwind(payload),
            Payload::Cancelled => panic!("awaited task was dropped before it completed"),
        }
    }

    /// Downcast the panic payload the way [`std::thread::Result`]'s `Err` variant is typically
    /// inspected. Returns `None` for a cancellation, since there is no payload to downcast.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Panicked(payload) => payload.downcast_ref(),
            Payload::Cancelled => None,
        }
    }
}

impl fmt::Debug for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Panicked(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
                match msg {
                    Some(msg) => write!(f, "TaskPanic({:?})", msg),
                    None => write!(f, "TaskPanic(..)"),
                }
            }
            Payload::Cancelled => write!(f, "TaskPanic(Cancelled)"),
        }
    }
}

impl fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Panicked(_) => write!(f, "task panicked"),
            Payload::Cancelled => write!(f, "task was dropped before it completed"),
        }
    }
}

impl std::error::Error for TaskPanic {}

/// Result of a bounded wait such as [`run_for`](crate::runtime::run_for) or
/// [`Task::wait_for`](crate::task::Task::wait_for).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WaitOutcome {
    /// The awaited condition became true before the deadline.
    Ready,
    /// The deadline passed first; the awaited task, if any, is still pending.
    Timeout,
}

impl WaitOutcome {
    pub fn is_ready(self) -> bool {
        matches!(self, WaitOutcome::Ready)
    }

    pub fn is_timeout(self) -> bool {
        matches!(self, WaitOutcome::Timeout)
    }
}

/// Panics with a message identifying the violated API contract.
///
/// Used for misuse that a caller cannot recover from and should not be tempted to match on —
/// awaiting a [`Task`](crate::task::Task) handle twice, building a second [`Runtime`](crate::runtime::Runtime)
/// on a thread that already owns one, spawning outside of a running driver. Kept as a macro
/// rather than a function so the panic location reported to the caller is the call site.
macro_rules! contract_violation {
    ($($arg:tt)*) => {
        panic!("skein: contract violation: {}", format_args!($($arg)*))
    };
}

pub(crate) use contract_violation;
