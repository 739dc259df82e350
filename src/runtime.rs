//! The driver: owns the task arena and decides, each iteration, which task runs next.
//!
//! Plays the role of the teacher crate's `SchedulerAlgorithm` (`round/algorithm.rs`) — a registry
//! of tasks plus a runnable queue driven by a `rotate_once`-style loop — but single-threaded all
//! the way down (no `Arc`/atomics anywhere) and with two more queues the teacher's round-robin
//! design didn't need: a sleep list for timers and a waiters map for task-to-task dependencies,
//! both lifted from the original `TaskQueue`'s `sleepingTasks`/`taskWaitingTasks` multimaps
//! (`original_source/CoroAsync/detail/TaskQueue.hpp`).

use crate::arena::{Arena, TaskId};
use crate::cell::{Outcome, ResultCell};
use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::{contract_violation, TaskPanic, WaitOutcome};
use crate::task::{Task, TaskName};
use crate::waker::noop_waker;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::cmp::{Ordering, Reverse};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::{debug, trace};
use std::time::{Duration, Instant};

/// Type-erased handle the runtime drives without knowing the task's output type.
///
/// The output type itself, and the shared [`ResultCell`] it is written to, stay with the
/// `TypedFrame` that implements this trait — the arena only ever sees `Box<dyn Frame>`.
pub(crate) trait Frame {
    /// Drive the coroutine once. `Poll::Ready(())` means the frame is finished and should be
    /// removed from the arena; the result (value or panic) has already been written to its cell.
    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<()>;

    /// Mark this frame as cancelled if it hasn't already produced a result. Called right before a
    /// frame is forcibly removed from the arena (task handle dropped, `destroy()`).
    fn cancel(&mut self);

    fn name(&self) -> &TaskName;
}

pub(crate) struct TypedFrame<F: Future> {
    future: Pin<Box<F>>,
    result: Rc<ResultCell<F::Output>>,
    name: TaskName,
}

impl<F: Future> TypedFrame<F> {
    pub fn new(future: F, result: Rc<ResultCell<F::Output>>, name: TaskName) -> Self {
        Self { future: Box::pin(future), result, name }
    }
}

impl<F: Future> Frame for TypedFrame<F> {
    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let future = self.future.as_mut();
        match catch_unwind(AssertUnwindSafe(|| future.poll(cx))) {
            Ok(Poll::Ready(value)) => {
                self.result.set(Outcome::Value(value));
                Poll::Ready(())
            }
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => {
                self.result.set(Outcome::Panicked(TaskPanic::from_payload(payload)));
                Poll::Ready(())
            }
        }
    }

    fn cancel(&mut self) {
        if !self.result.is_ready() {
            self.result.set(Outcome::Panicked(TaskPanic::cancelled()));
        }
    }

    fn name(&self) -> &TaskName {
        &self.name
    }
}

/// `seq` breaks ties between sleepers sharing a `wake_at`, in insertion order — without it a
/// `BinaryHeap` would pop equal-keyed entries in whatever order its internal structure happens to
/// produce, violating the "sleepers waking at the same instant are dispatched in insertion order"
/// guarantee (§8's FIFO law applied to the sleep queue).
struct SleepEntry {
    wake_at: Instant,
    seq: u64,
    id: TaskId,
}

impl Eq for SleepEntry {}
impl PartialEq for SleepEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.wake_at, self.seq) == (other.wake_at, other.seq)
    }
}
impl Ord for SleepEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.wake_at, self.seq).cmp(&(other.wake_at, other.seq))
    }
}
impl PartialOrd for SleepEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Thread-confined scheduler state: the task arena plus the three queues (ready, sleeping,
/// waiters) the driver consults on every iteration.
///
/// Lives in a `thread_local!`, matching the original `TaskQueue`'s process-wide static members —
/// spec §9 calls thread-local the closest single-threaded Rust analogue to that global state, one
/// instance per OS thread instead of one per process.
pub struct Runtime {
    arena: Arena<Box<dyn Frame>>,
    ready: VecDeque<TaskId>,
    sleeping: BinaryHeap<Reverse<SleepEntry>>,
    waiters: HashMap<TaskId, SmallVec<[TaskId; 2]>>,
    current: std::cell::Cell<Option<TaskId>>,
    next_sleep_seq: u64,
    clock: Box<dyn Clock>,
    park_granularity: Duration,
    // No field here is actually Send/Sync (Box<dyn Frame> holds an Rc<ResultCell<_>> per task),
    // but the marker makes that guarantee explicit rather than incidental to today's fields.
    _not_send_sync: std::marker::PhantomData<*const ()>,
}

impl Runtime {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            arena: Arena::with_capacity(config.initial_ready_capacity),
            ready: VecDeque::with_capacity(config.initial_ready_capacity),
            sleeping: BinaryHeap::new(),
            waiters: HashMap::new(),
            current: std::cell::Cell::new(None),
            next_sleep_seq: 0,
            clock: config.clock.unwrap_or_else(|| Box::new(SystemClock)),
            park_granularity: config.driver_park_granularity,
            _not_send_sync: std::marker::PhantomData,
        }
    }

    pub(crate) fn spawn<F>(&mut self, name: TaskName, future: F) -> Task<F::Output>
    where
        F: Future + 'static,
    {
        let result = ResultCell::new();
        let frame: Box<dyn Frame> = Box::new(TypedFrame::new(future, result.clone(), name));
        let id = self.arena.insert(frame);
        trace!(task = %id, name = ?self.arena.get(id).unwrap().name().as_str(), "spawned");
        self.ready.push_back(id);
        Task::new(id, result)
    }

    pub(crate) fn arena_contains(&self, id: TaskId) -> bool {
        self.arena.contains(id)
    }

    pub(crate) fn current(&self) -> Option<TaskId> {
        self.current.get()
    }

    /// Register the task currently being polled as a waiter on `awaited`.
    ///
    /// Called from [`Task::poll`](crate::task::Task) only after confirming `awaited` has not
    /// already produced a result, so `awaited` is guaranteed to still be live in the arena (or be
    /// in the process of completing in this very call stack, in which case it will pick this
    /// waiter up as part of that same completion).
    pub(crate) fn register_waiter(&mut self, awaited: TaskId) {
        let waiting = self
            .current
            .get()
            .unwrap_or_else(|| contract_violation!("a Task<T> was polled outside of the driver loop"));
        self.waiters.entry(awaited).or_default().push(waiting);
    }

    /// Sleep the currently polling task until `wake_at`.
    pub(crate) fn sleep_current_until(&mut self, wake_at: Instant) {
        let id = self
            .current
            .get()
            .unwrap_or_else(|| contract_violation!("sleep polled outside of the driver loop"));
        trace!(task = %id, wake_at = ?wake_at, "sleep");
        let seq = self.next_sleep_seq;
        self.next_sleep_seq += 1;
        self.sleeping.push(Reverse(SleepEntry { wake_at, seq, id }));
    }

    /// Put the currently polling task back on the ready queue without waiting on anything,
    /// implementing `yield_now`.
    pub(crate) fn reschedule_current(&mut self) {
        let id = self
            .current
            .get()
            .unwrap_or_else(|| contract_violation!("yield_now polled outside of the driver loop"));
        self.ready.push_back(id);
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Cancel a task: mark its cell (if unset) and run it through the same completion path a
    /// normally-finished task takes, so any waiter is woken rather than left blocked forever.
    ///
    /// A no-op if the id is no longer (or not yet) sitting in the arena as a plain, driveable
    /// frame — it may have already completed normally, already been cancelled, or (the one case
    /// that can only arise from inside an re-entrant poll) be taken out for its own poll right
    /// now, in which case that poll's own completion handling is what resolves it.
    pub(crate) fn cancel(&mut self, id: TaskId) {
        if let Some(frame) = self.arena.get_mut(id) {
            frame.cancel();
        } else {
            return;
        }
        debug!(task = %id, "cancelled");
        self.complete(id);
    }

    fn wake_waiters_of(&mut self, id: TaskId) {
        if let Some(waiters) = self.waiters.remove(&id) {
            trace!(task = %id, waiters = waiters.len(), "woke waiters");
            self.ready.extend(waiters);
        }
    }

    /// Cancel path only: the frame is still normally `Occupied` (the task was queued, sleeping,
    /// or waited-on, never taken out for a poll), so `remove` knows how to reclaim its slot.
    fn complete(&mut self, id: TaskId) {
        self.arena.remove(id);
        self.wake_waiters_of(id);
    }

    /// Move every sleeper whose deadline has passed onto the ready queue.
    fn wake_expired_sleepers(&mut self) {
        let now = self.clock.now();
        while let Some(Reverse(entry)) = self.sleeping.peek() {
            if entry.wake_at > now {
                break;
            }
            let Reverse(entry) = self.sleeping.pop().unwrap();
            if self.arena.contains(entry.id) {
                self.ready.push_back(entry.id);
            }
        }
    }

    /// Wake expired sleepers, then pop the next runnable task and take its frame out of the arena
    /// for the duration of its poll — leaving its slot allocated (see `Arena::take_for_poll`) but
    /// out of any borrow a caller might be holding on `self`.
    ///
    /// Returns `None` if there is nothing runnable right now (stale `ready` entries left behind by
    /// a task cancelled while still queued are skipped and dropped here, not returned).
    fn take_next_ready(&mut self) -> Option<(TaskId, Box<dyn Frame>)> {
        self.wake_expired_sleepers();
        loop {
            let id = self.ready.pop_front()?;
            if let Some(frame) = self.arena.take_for_poll(id) {
                self.current.set(Some(id));
                trace!(task = %id, "resume");
                return Some((id, frame));
            }
        }
    }

    /// Put a still-pending frame back after a poll returned `Pending`.
    fn park_frame(&mut self, id: TaskId, frame: Box<dyn Frame>) {
        self.current.set(None);
        self.arena.put_back(id, frame);
    }

    /// Record that the frame taken out by `take_next_ready` finished — its cell was already
    /// written by `poll_frame` — free its slot and wake anything waiting on it.
    fn complete_after_poll(&mut self, id: TaskId) {
        self.current.set(None);
        debug!(task = %id, "completed");
        self.arena.finish_polled(id);
        self.wake_waiters_of(id);
    }

    /// Wait until `target`, busy-spinning instead of parking the thread when the remaining gap is
    /// under `park_granularity` — avoids overshooting `target` by however coarse the OS scheduler
    /// happens to be when a caller is about to immediately re-enter the driver anyway.
    fn park_until(&self, target: Instant) {
        let now = self.clock.now();
        if target <= now {
            return;
        }
        if target - now < self.park_granularity {
            while self.clock.now() < target {
                std::hint::spin_loop();
            }
        } else {
            self.clock.sleep_until(target);
        }
    }
}

/// Run one scheduling step against the current thread's runtime. Returns `true` if a task was
/// actually polled (forward progress was made).
///
/// Deliberately split into three short, independent [`Runtime::with_current`] calls instead of
/// one call wrapping the whole thing: the middle one — the actual `poll_frame` — runs with no
/// borrow on the thread-local held at all, so a coroutine that suspends (`yield_now`, `sleep_for`,
/// awaiting or blockingly waiting on another `Task`) can reach back into `Runtime::with_current`
/// itself without tripping the `RefCell`'s single-writer check. Holding that borrow across the
/// poll — the obvious, simpler way to write this — is what used to turn every suspending task into
/// a `BorrowMutError` panic.
fn step() -> bool {
    let popped = Runtime::with_current(|rt| rt.take_next_ready());
    let (id, mut frame) = match popped {
        Some(pair) => pair,
        None => return false,
    };

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let finished = frame.poll_frame(&mut cx).is_ready();

    Runtime::with_current(|rt| {
        if finished {
            rt.complete_after_poll(id);
        } else {
            rt.park_frame(id, frame);
        }
    });
    true
}

/// Drive the current thread's runtime until `should_stop` returns true, `deadline` passes, or no
/// further progress can be made.
///
/// The `deadline` check sits at the top of the loop, ahead of `step`, specifically so a task (or a
/// busy-polling combinator, see `combinators.rs`) that keeps the ready queue non-empty forever
/// cannot starve it — `step` returning `true` used to `continue` straight past any deadline check.
pub(crate) fn drive(mut should_stop: impl FnMut() -> bool, deadline: Option<Instant>) -> WaitOutcome {
    loop {
        if should_stop() {
            return WaitOutcome::Ready;
        }
        if let Some(deadline) = deadline {
            if Runtime::with_current(|rt| rt.now()) >= deadline {
                return WaitOutcome::Timeout;
            }
        }
        if step() {
            continue;
        }
        // Nothing runnable right now; either wait for a sleeper or give up.
        let outcome = Runtime::with_current(|rt| match rt.sleeping.peek() {
            Some(Reverse(entry)) => {
                let target = match deadline {
                    Some(deadline) if deadline < entry.wake_at => {
                        rt.park_until(deadline);
                        return Some(WaitOutcome::Timeout);
                    }
                    _ => entry.wake_at,
                };
                rt.park_until(target);
                None
            }
            None if rt.arena.is_empty() => Some(WaitOutcome::Ready),
            None => contract_violation!(
                "runtime deadlocked: {} task(s) pending but none are runnable or sleeping",
                rt.arena.len()
            ),
        });
        if let Some(outcome) = outcome {
            return outcome;
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Runtime>> = RefCell::new(None);
}

impl Runtime {
    /// Access the current thread's runtime, lazily creating it with default configuration on
    /// first use.
    pub(crate) fn with_current<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
        CURRENT.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = Some(Runtime::new(SchedulerConfig::default()));
            }
            f(slot.as_mut().unwrap())
        })
    }

    /// Like [`with_current`](Runtime::with_current), but returns `None` instead of panicking if
    /// the thread-local has already been torn down (can happen in a `Drop` impl racing process
    /// shutdown) instead of lazily creating a fresh runtime nobody will ever drive.
    pub(crate) fn try_with_current<R>(f: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
        CURRENT.try_with(|cell| cell.borrow_mut().as_mut().map(f)).ok().flatten()
    }

    pub(crate) fn init(config: SchedulerConfig) {
        CURRENT.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_some() {
                contract_violation!("init_runtime called after the runtime was already in use on this thread");
            }
            *slot = Some(Runtime::new(config));
        });
    }
}

/// Explicitly configure the current thread's runtime before its first use.
///
/// Optional: spawning or running without calling this first uses [`SchedulerConfig::default`].
/// Panics if the runtime on this thread has already been initialized, implicitly or otherwise.
pub fn init_runtime(config: SchedulerConfig) {
    Runtime::init(config);
}

/// Spawn a coroutine on the current thread's runtime.
pub fn spawn<F>(future: F) -> Task<F::Output>
where
    F: Future + 'static,
{
    Runtime::with_current(|rt| rt.spawn(TaskName::None, future))
}

/// Spawn a coroutine with a name visible in `tracing` output and [`Task`]'s `Debug` impl.
pub fn spawn_named<F>(name: impl Into<TaskName>, future: F) -> Task<F::Output>
where
    F: Future + 'static,
{
    Runtime::with_current(|rt| rt.spawn(name.into(), future))
}

/// Drive the current thread's runtime with no particular task in focus, for up to `duration` or
/// until it runs out of work, whichever comes first.
///
/// Panics if the scheduler deadlocks: tasks remain but none are runnable or sleeping.
pub fn run_for(duration: Duration) -> WaitOutcome {
    let deadline = Runtime::with_current(|rt| rt.now()) + duration;
    drive(|| false, Some(deadline))
}

/// Drive the current thread's runtime with no particular task in focus, until `deadline` or until
/// it runs out of work, whichever comes first.
pub fn run_until(deadline: Instant) -> WaitOutcome {
    drive(|| false, Some(deadline))
}
