//! Builder for configuring the per-thread runtime before its first use.
//!
//! Grounded on the teacher crate's own construction knobs (`SchedulerAlgorithm::with_capacity`,
//! `st/config.rs`'s static-capacity builder) — a small plain-data builder consumed once, rather
//! than a long list of setter methods on the runtime itself.

use crate::clock::Clock;
use std::time::Duration;

/// Configuration consumed by [`init_runtime`](crate::runtime::init_runtime).
///
/// Construct with [`SchedulerConfig::new`] or [`SchedulerConfig::default`], adjust with the
/// builder methods, then hand it to [`init_runtime`](crate::runtime::init_runtime). Never
/// constructed implicitly except by the first call to [`spawn`](crate::runtime::spawn) or a
/// driver function, which uses [`SchedulerConfig::default`].
pub struct SchedulerConfig {
    pub(crate) initial_ready_capacity: usize,
    pub(crate) clock: Option<Box<dyn Clock>>,
    pub(crate) driver_park_granularity: Duration,
}

impl SchedulerConfig {
    /// A config with no pre-allocated capacity and the system clock.
    pub fn new() -> Self {
        Self { initial_ready_capacity: 0, clock: None, driver_park_granularity: Duration::ZERO }
    }

    /// Pre-allocate room for this many concurrently live tasks, avoiding reallocation of the
    /// arena and ready queue while the task count stays under it.
    pub fn initial_ready_capacity(mut self, capacity: usize) -> Self {
        self.initial_ready_capacity = capacity;
        self
    }

    /// Use a custom [`Clock`] instead of the system clock, e.g. a fake clock in tests.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// When the driver has nothing runnable and the next sleeper is due sooner than this, spin
    /// instead of parking the thread. Useful when a host frame loop calls [`run_for`](crate::runtime::run_for)
    /// again moments later anyway and parking would just add wake-up latency. Default: `Duration::ZERO`
    /// (always park).
    pub fn driver_park_granularity(mut self, granularity: Duration) -> Self {
        self.driver_park_granularity = granularity;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
