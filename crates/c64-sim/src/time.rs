//! Shared simulated time.

use std::cell::Cell;
use std::rc::Rc;

use rad_core::{CycleClock, Ticks};

use crate::CLOCK_HZ;

/// Tick counter shared between the simulated port and its clock.
#[derive(Debug, Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    /// Spend one tick and return the new time.
    #[must_use]
    pub fn advance(&self) -> u64 {
        let t = self.0.get() + 1;
        self.0.set(t);
        t
    }

    /// Jump forward without any port activity.
    pub fn skip(&self, ticks: u64) {
        self.0.set(self.0.get() + ticks);
    }
}

/// Controller cycle counter running on simulated time.
#[derive(Debug, Clone)]
pub struct SimClock {
    time: SimTime,
}

impl SimClock {
    #[must_use]
    pub fn new(time: SimTime) -> Self {
        Self { time }
    }
}

impl CycleClock for SimClock {
    fn now(&mut self) -> Ticks {
        Ticks::new(self.time.advance())
    }

    fn frequency_hz(&self) -> u64 {
        CLOCK_HZ
    }
}
