//! Suspension primitives: `yield_now`, `sleep_for`, `sleep_until`.
//!
//! Each is a small state-toggling `Future`, the same shape as the teacher crate's `Yield`
//! (`yield_helper.rs`) — poll once to register the suspend, poll again (after the driver resumes
//! it) to resolve. What differs is *how* the suspension is registered: the teacher calls
//! `cx.waker().wake_by_ref()` and relies on the round-robin queue to see the task again next
//! rotation; here the primitives mutate the thread-local [`Runtime`]'s own ready/sleeping queues
//! directly (`reschedule_current`/`sleep_current_until`), since that queue — not a generic waker
//! — is what the driver actually consults.

use crate::runtime::Runtime;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Suspend the current task, letting any other runnable task run first, then resume.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        Runtime::with_current(|rt| rt.reschedule_current());
        Poll::Pending
    }
}

/// Suspend the current task until at least `duration` has elapsed on the runtime's clock.
pub fn sleep_for(duration: Duration) -> SleepUntil {
    SleepUntil { wake_at: Target::Relative(duration), registered: false }
}

/// Suspend the current task until the runtime's clock reaches `wake_at`.
pub fn sleep_until(wake_at: Instant) -> SleepUntil {
    SleepUntil { wake_at: Target::Absolute(wake_at), registered: false }
}

#[doc(hidden)]
#[derive(Debug)]
enum Target {
    Relative(Duration),
    Absolute(Instant),
}

#[doc(hidden)]
#[derive(Debug)]
pub struct SleepUntil {
    wake_at: Target,
    registered: bool,
}

impl Future for SleepUntil {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.registered {
            self.registered = true;
            let wake_at = Runtime::with_current(|rt| {
                let wake_at = match self.wake_at {
                    Target::Relative(duration) => rt.now() + duration,
                    Target::Absolute(wake_at) => wake_at,
                };
                rt.sleep_current_until(wake_at);
                wake_at
            });
            self.wake_at = Target::Absolute(wake_at);
            return Poll::Pending;
        }
        let wake_at = match self.wake_at {
            Target::Absolute(wake_at) => wake_at,
            Target::Relative(_) => unreachable!("resolved to Absolute after first poll"),
        };
        if Runtime::with_current(|rt| rt.now()) >= wake_at {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
