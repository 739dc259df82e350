//! Monotonic time source used by the runtime's sleep queue.
//!
//! Mirrors the `TimerClock`/`StdTimerClock` split the teacher crate uses to keep its timing group
//! logic testable: the runtime is generic over a small [`Clock`] trait instead of calling
//! `Instant::now()` directly, so tests can swap in a clock that never really sleeps.

use std::time::{Duration, Instant};

/// A monotonic time source plus the one operation allowed to block the driver thread.
pub trait Clock {
    /// Current point in time.
    fn now(&self) -> Instant;
    /// Park the calling thread until `deadline`. Only ever called by the driver, and only when
    /// `ready` is empty and `deadline` is earlier than the caller's overall deadline.
    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Default [`Clock`] backed by [`std::time::Instant`] and [`std::thread::sleep`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A clock that only advances when told to — lets scheduling tests run instantly instead of
    /// sleeping in real time, the way the teacher crate avoids real timers in `tests/timing_group.rs`.
    #[derive(Clone)]
    pub struct FakeClock {
        now: Rc<Cell<Instant>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self { now: Rc::new(Cell::new(Instant::now())) }
        }
        pub fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
        fn sleep_until(&self, deadline: Instant) {
            // Parking would hang forever since nothing else advances a FakeClock; jump instead.
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
        }
    }

    #[test]
    fn advance_moves_now_forward_by_exactly_the_given_amount() {
        let clock = FakeClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(30));
        assert_eq!(clock.now(), start + Duration::from_millis(30));
    }

    #[test]
    fn sleep_until_jumps_forward_instead_of_blocking() {
        let clock = FakeClock::new();
        let target = clock.now() + Duration::from_secs(3600);
        clock.sleep_until(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn sleep_until_in_the_past_does_not_move_now_backward() {
        let clock = FakeClock::new();
        clock.advance(Duration::from_millis(100));
        let now = clock.now();
        clock.sleep_until(now - Duration::from_millis(50));
        assert_eq!(clock.now(), now);
    }
}
