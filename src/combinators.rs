//! `when_all`/`when_any` combinators over task handles.
//!
//! Authored as ordinary [`spawn`]ed coroutines rather than a `Future` composition: each combinator
//! polls `is_ready()` on its arguments in a loop, yielding between checks, which is exactly the
//! "spawn a watcher task" technique the teacher's own `WheelHandle` users reach for when one task
//! needs to react to several others (see the doc examples on `round/handle.rs`) — it keeps the
//! combinator itself subject to every ordinary scheduling rule instead of requiring bespoke
//! `Future` plumbing to poll several differently-typed children out of one `poll` call.

use crate::cell::Outcome;
use crate::runtime::spawn;
use crate::task::Task;
use crate::yielding::yield_now;

/// Wait for two tasks to both complete, returning their outcomes in argument order.
pub fn when_all2<A: 'static, B: 'static>(a: Task<A>, b: Task<B>) -> Task<(Outcome<A>, Outcome<B>)> {
    spawn(async move {
        while !(a.is_ready() && b.is_ready()) {
            yield_now().await;
        }
        (a.await, b.await)
    })
}

/// Wait for three tasks to all complete, returning their outcomes in argument order.
pub fn when_all3<A: 'static, B: 'static, C: 'static>(
    a: Task<A>,
    b: Task<B>,
    c: Task<C>,
) -> Task<(Outcome<A>, Outcome<B>, Outcome<C>)> {
    spawn(async move {
        while !(a.is_ready() && b.is_ready() && c.is_ready()) {
            yield_now().await;
        }
        (a.await, b.await, c.await)
    })
}

/// Wait for four tasks to all complete, returning their outcomes in argument order.
pub fn when_all4<A: 'static, B: 'static, C: 'static, D: 'static>(
    a: Task<A>,
    b: Task<B>,
    c: Task<C>,
    d: Task<D>,
) -> Task<(Outcome<A>, Outcome<B>, Outcome<C>, Outcome<D>)> {
    spawn(async move {
        while !(a.is_ready() && b.is_ready() && c.is_ready() && d.is_ready()) {
            yield_now().await;
        }
        (a.await, b.await, c.await, d.await)
    })
}

/// Wait for every task in `tasks` to complete, returning their outcomes in the same order.
///
/// The homogeneous counterpart to [`when_all2`]/[`when_all3`]/[`when_all4`] for a dynamic number
/// of same-typed tasks.
pub fn when_all_vec<T: 'static>(tasks: Vec<Task<T>>) -> Task<Vec<Outcome<T>>> {
    spawn(async move {
        if tasks.is_empty() {
            return Vec::new();
        }
        while !tasks.iter().all(Task::is_ready) {
            yield_now().await;
        }
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await);
        }
        results
    })
}

/// Wait for two tasks, variadic macro form of [`when_all2`]/[`when_all3`]/[`when_all4`].
///
/// `when_all!()` with no arguments resolves immediately to `()`.
#[macro_export]
macro_rules! when_all {
    () => {
        $crate::spawn(async {})
    };
    ($a:expr, $b:expr) => {
        $crate::when_all2($a, $b)
    };
    ($a:expr, $b:expr, $c:expr) => {
        $crate::when_all3($a, $b, $c)
    };
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        $crate::when_all4($a, $b, $c, $d)
    };
}

/// Identifies which argument of a [`when_any2`]/[`when_any3`]/[`when_any4`] call completed first,
/// carrying that task's outcome.
///
/// The remaining arguments are dropped (and thus cancelled) once one of them wins, since these
/// combinators take their tasks by value.
#[derive(Debug)]
pub enum WhenAny2<A, B> {
    First(Outcome<A>),
    Second(Outcome<B>),
}

#[derive(Debug)]
pub enum WhenAny3<A, B, C> {
    First(Outcome<A>),
    Second(Outcome<B>),
    Third(Outcome<C>),
}

/// Wait for whichever of two tasks completes first, dropping (cancelling) the other.
pub fn when_any2<A: 'static, B: 'static>(a: Task<A>, b: Task<B>) -> Task<WhenAny2<A, B>> {
    spawn(async move {
        loop {
            if a.is_ready() {
                return WhenAny2::First(a.await);
            }
            if b.is_ready() {
                return WhenAny2::Second(b.await);
            }
            yield_now().await;
        }
    })
}

/// Wait for whichever of three tasks completes first, dropping (cancelling) the others.
pub fn when_any3<A: 'static, B: 'static, C: 'static>(
    a: Task<A>,
    b: Task<B>,
    c: Task<C>,
) -> Task<WhenAny3<A, B, C>> {
    spawn(async move {
        loop {
            if a.is_ready() {
                return WhenAny3::First(a.await);
            }
            if b.is_ready() {
                return WhenAny3::Second(b.await);
            }
            if c.is_ready() {
                return WhenAny3::Third(c.await);
            }
            yield_now().await;
        }
    })
}

/// Variadic macro form of [`when_any2`]/[`when_any3`].
#[macro_export]
macro_rules! when_any {
    ($a:expr, $b:expr) => {
        $crate::when_any2($a, $b)
    };
    ($a:expr, $b:expr, $c:expr) => {
        $crate::when_any3($a, $b, $c)
    };
}

/// Wait for whichever of the given task references completes first, returning only its positional
/// index (0-based) and leaving every `Task` owned by the caller, still driveable afterwards.
///
/// Holds each `&mut Task<_>` borrow for the combinator's own lifetime, so the borrow checker
/// itself rules out the caller destroying a task this is currently watching — see §9 of the design
/// notes on why that hazard needs no runtime policy here.
pub async fn when_any_ref(tasks: &mut [&mut dyn AnyReady]) -> usize {
    loop {
        if let Some(index) = tasks.iter().position(|t| t.is_ready()) {
            return index;
        }
        yield_now().await;
    }
}

/// Object-safe sliver of [`Task`] that [`when_any_ref`] needs: just enough to poll readiness
/// without naming every task's output type in one slice.
pub trait AnyReady {
    fn is_ready(&self) -> bool;
}

impl<T: 'static> AnyReady for Task<T> {
    fn is_ready(&self) -> bool {
        Task::is_ready(self)
    }
}
