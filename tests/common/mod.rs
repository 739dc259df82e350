use skein::{Clock, SchedulerConfig};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A clock that only advances when told to, so timer-driven tests run instantly instead of
/// sleeping in real time.
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
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

/// Install a fresh runtime configured with a [`FakeClock`] on the calling test thread, returning
/// the clock so the test can drive it forward.
pub fn init_fake_clock() -> FakeClock {
    let clock = FakeClock::new();
    skein::init_runtime(SchedulerConfig::new().with_clock(clock.clone()));
    clock
}
