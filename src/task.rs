//! Task handles: the external, typed interface to a spawned coroutine.
//!
//! `TaskId` itself lives in [`crate::arena`]; what's here is everything built on top of it — the
//! optional name a task is spawned with (carried from the teacher crate's `SpawnParams`/`TaskName`
//! pair in `round/handle.rs` and `round/dyn_future.rs`) and the owning [`Task<T>`] handle, whose
//! `Future` impl lets one coroutine `.await` another the same way it awaits a timer.

use crate::arena::TaskId;
use crate::cell::{Outcome, ResultCell};
use crate::error::{contract_violation, TaskPanic, WaitOutcome};
use crate::runtime::Runtime;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Optional human-readable label attached to a spawned task, shown in `tracing` spans and in
/// [`fmt::Debug`] output for diagnostics.
#[derive(Clone, Eq, PartialEq, Hash)]
pub enum TaskName {
    Static(&'static str),
    Dynamic(Box<str>),
    None,
}

impl TaskName {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TaskName::Static(s) => Some(s),
            TaskName::Dynamic(s) => Some(s),
            TaskName::None => None,
        }
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{:?}", s),
            None => write!(f, "<unnamed>"),
        }
    }
}

impl Default for TaskName {
    fn default() -> Self {
        TaskName::None
    }
}

impl From<&'static str> for TaskName {
    fn from(s: &'static str) -> Self {
        TaskName::Static(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        TaskName::Dynamic(s.into_boxed_str())
    }
}

/// Owning handle to a spawned task.
///
/// `Task<T>` is move-only and produces `T` exactly once, either by being `.await`ed or by a
/// blocking wait such as [`Task::get`]. Dropping a `Task<T>` whose coroutine has not finished
/// cancels it: the frame is torn down and any other task already waiting on it (through
/// [`when_any_ref`](crate::combinators::when_any_ref)) is woken with a [`TaskPanic::cancelled`]
/// outcome rather than being left to block forever.
pub struct Task<T: 'static> {
    id: TaskId,
    result: Rc<ResultCell<T>>,
    // Rc above already makes this !Send/!Sync; spelled out explicitly so the guarantee survives
    // a future refactor that replaces the result cell's sharing strategy.
    _not_send_sync: PhantomData<*const ()>,
}

impl<T: 'static> Task<T> {
    pub(crate) fn new(id: TaskId, result: Rc<ResultCell<T>>) -> Self {
        Self { id, result, _not_send_sync: PhantomData }
    }

    /// Identity of this task within its runtime. Remains valid (and printable) after the task
    /// completes, but stops resolving to anything once the handle is consumed or dropped.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once the coroutine has produced a result (or panicked), independent of whether that
    /// result has been collected yet.
    ///
    /// Backed by the result cell itself rather than arena presence, since the driver can briefly
    /// take a frame out of the arena to poll it re-entrantly (see `runtime::step`) without it
    /// having actually finished — the cell is the one thing written exactly once, at the moment of
    /// genuine completion.
    pub fn is_ready(&self) -> bool {
        self.result.is_ready()
    }

    /// Drive the owning runtime, with this task as the sole focus, until it completes. Returns
    /// its outcome without resuming the panic.
    ///
    /// Other tasks still make progress while this call is driving, exactly as if it were
    /// `run_until` with this task's completion as the stop condition — "focused" describes the
    /// stop condition, not which tasks get polled. Safe to call re-entrantly, from inside another
    /// task's own body: driving never holds the thread-local runtime borrowed across a poll.
    pub fn wait(self) -> Outcome<T> {
        let id = self.id;
        let result = self.result.clone();
        let stop_check = result.clone();
        crate::runtime::drive(move || stop_check.is_ready(), None);
        std::mem::forget(self); // id already reaped by the arena; skip the Drop-time cancel path
        result.take().unwrap_or_else(|| {
            contract_violation!("task {} vanished from the arena without writing a result", id)
        })
    }

    /// Like [`Task::wait`], panicking (resuming the coroutine's own panic) instead of returning
    /// it wrapped.
    pub fn get(self) -> T {
        self.wait().unwrap()
    }

    /// Drive the runtime for up to `duration`, or until this task completes, whichever comes
    /// first. Unlike [`Task::wait`], this does not consume the handle: on
    /// [`WaitOutcome::Timeout`] the task is still pending and can be waited on again.
    pub fn wait_for(&self, duration: Duration) -> WaitOutcome {
        let deadline = Runtime::with_current(|rt| rt.now()) + duration;
        self.wait_until(deadline)
    }

    /// Like [`Task::wait_for`], with an absolute deadline instead of a duration.
    pub fn wait_until(&self, deadline: Instant) -> WaitOutcome {
        let result = self.result.clone();
        crate::runtime::drive(move || result.is_ready(), Some(deadline))
    }

    /// Explicitly cancel this task, equivalent to dropping it but without relying on scope exit.
    pub fn destroy(self) {
        drop(self)
    }
}

impl<T: 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).field("ready", &self.is_ready()).finish()
    }
}

impl<T: 'static> Drop for Task<T> {
    fn drop(&mut self) {
        Runtime::try_with_current(|rt| rt.cancel(self.id));
    }
}

/// Awaiting a `Task<T>` suspends the caller until the task completes, registering the caller as a
/// waiter the first time it is polled so the driver knows to resume it once `id` leaves the
/// arena. Resolves to the task's [`Outcome`] rather than panicking, since code that explicitly
/// wants the panic resumed can call [`Outcome::unwrap`] itself.
impl<T: 'static> Future for Task<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _ = cx; // suspension is driven by Runtime state, not by waking this waker
        if let Some(outcome) = self.result.take() {
            return Poll::Ready(outcome);
        }
        Runtime::with_current(|rt| rt.register_waiter(self.id));
        Poll::Pending
    }
}
