//! Free-running tick source and rate conversions.

use std::time::Instant;

use crate::Ticks;

/// A monotonic, free-running hardware counter.
///
/// On the controller this is the CPU cycle counter; in tests it is a
/// simulated clock that advances as the bus is polled. Reads are cheap and
/// never block.
pub trait CycleClock {
    /// Current counter value. Never decreases.
    fn now(&mut self) -> Ticks;

    /// Counter frequency in Hz.
    fn frequency_hz(&self) -> u64;

    /// Current counter value converted to microseconds.
    fn micros(&mut self) -> u64 {
        let rate = ClockRate::new(self.frequency_hz());
        rate.ticks_to_micros(self.now())
    }
}

/// Counter frequency plus the conversions derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRate {
    /// Counter frequency in Hz.
    pub frequency_hz: u64,
}

impl ClockRate {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per period of an event running at `rate_hz` (integer division).
    #[must_use]
    pub const fn ticks_per_period(&self, rate_hz: u64) -> Ticks {
        Ticks::new(self.frequency_hz / rate_hz)
    }

    #[must_use]
    pub const fn ticks_to_micros(&self, ticks: Ticks) -> u64 {
        (ticks.get() as u128 * 1_000_000 / self.frequency_hz as u128) as u64
    }

    #[must_use]
    pub const fn micros_to_ticks(&self, micros: u64) -> Ticks {
        Ticks::new((micros as u128 * self.frequency_hz as u128 / 1_000_000) as u64)
    }
}

/// Host clock backed by `Instant`, one tick per nanosecond.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleClock for SystemClock {
    fn now(&mut self) -> Ticks {
        Ticks::new(self.origin.elapsed().as_nanos() as u64)
    }

    fn frequency_hz(&self) -> u64 {
        1_000_000_000
    }
}
