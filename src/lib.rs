//! Single-threaded cooperative task scheduler built on `async`/`await`.
//!
//! Spawn coroutines with [`spawn`]/[`spawn_named`], suspend with [`sleep_for`], [`sleep_until`],
//! or [`yield_now`], and either drive the scheduler from the outside with [`run_for`]/[`run_until`]
//! or block on a specific [`Task`] with its [`wait`](Task::wait)/[`get`](Task::get)/
//! [`wait_for`](Task::wait_for)/[`wait_until`](Task::wait_until) methods. [`when_all2`] and
//! friends (or the [`when_all!`]/[`when_any!`] macros) combine several tasks into one.
//!
//! Everything here runs on whichever single OS thread first touches it: there is no work-stealing,
//! no cross-thread wake-up, and no `Send`/`Sync` on [`Task`] or the runtime itself. Nothing is
//! started implicitly — a freshly spawned task only runs once something drives the scheduler, be
//! that `run_for`, `run_until`, or a blocking wait on one of its descendants.
//!
//! ```
//! use skein::{spawn, run_until_complete};
//!
//! let task = spawn(async {
//!     skein::yield_now().await;
//!     1 + 1
//! });
//! assert_eq!(run_until_complete(task), 2);
//! ```

mod arena;
mod cell;
mod clock;
mod combinators;
mod config;
mod error;
mod runtime;
mod task;
mod waker;
mod yielding;

pub use arena::TaskId;
pub use cell::Outcome;
pub use clock::{Clock, SystemClock};
pub use combinators::{
    when_all2, when_all3, when_all4, when_all_vec, when_any2, when_any3, when_any_ref, AnyReady,
    WhenAny2, WhenAny3,
};
pub use config::SchedulerConfig;
pub use error::{TaskPanic, WaitOutcome};
pub use runtime::{init_runtime, run_for, run_until, spawn, spawn_named};
pub use task::{Task, TaskName};
pub use yielding::{sleep_for, sleep_until, yield_now};

/// Convenience wrapper around [`Task::get`] for the common "spawn one task, run it to completion"
/// shape used throughout this crate's own doc examples and tests.
pub fn run_until_complete<T: 'static>(task: Task<T>) -> T {
    task.get()
}
