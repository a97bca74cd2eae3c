//! Half-cycle synchronization against the target's PHI2.

use crate::{
    AddressByte, BusLines, BusSignalSnapshot, BusTiming, ClockRate, CycleClock, Ticks,
};

/// Aligns controller actions to the target's clock phases.
///
/// Owns the port lines and the cycle clock, so any bus transaction needs
/// `&mut` access to the synchronizer. That is what keeps two transactions
/// from interleaving.
pub struct BusSynchronizer<L, C> {
    lines: L,
    clock: C,
    timing: BusTiming,
    /// Counter value at the last restart.
    origin: Ticks,
}

impl<L: BusLines, C: CycleClock> BusSynchronizer<L, C> {
    pub fn new(lines: L, mut clock: C, timing: BusTiming) -> Self {
        let origin = clock.now();
        Self {
            lines,
            clock,
            timing,
            origin,
        }
    }

    #[must_use]
    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    pub fn lines(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn clock(&mut self) -> &mut C {
        &mut self.clock
    }

    #[must_use]
    pub fn clock_rate(&self) -> ClockRate {
        ClockRate::new(self.clock.frequency_hz())
    }

    /// Consume the synchronizer and give back the lines and clock.
    #[must_use]
    pub fn into_parts(self) -> (L, C) {
        (self.lines, self.clock)
    }

    /// Reset the cycle counter to zero.
    pub fn restart_counter(&mut self) {
        self.origin = self.clock.now();
    }

    /// Ticks since the last restart.
    pub fn cycle(&mut self) -> Ticks {
        self.clock.now().since(self.origin)
    }

    /// Busy-wait until the counter reaches `point`. Returns immediately if
    /// it already has; a late caller is never held back further.
    pub fn wait_until_cycle(&mut self, point: Ticks) {
        while self.cycle() < point {}
    }

    /// Busy-wait until PHI2 is high (the processor half).
    pub fn wait_for_processor_half_cycle(&mut self) {
        while !self.lines.levels().phi2() {}
    }

    /// Busy-wait until PHI2 is low (the video half).
    pub fn wait_for_video_half_cycle(&mut self) {
        while self.lines.levels().phi2() {}
    }

    /// Anchor on the next rising PHI2 edge and restart the counter there.
    pub fn next_processor_cycle(&mut self) {
        self.wait_for_video_half_cycle();
        self.wait_for_processor_half_cycle();
        self.restart_counter();
    }

    /// Wait `count` full target cycles.
    pub fn wait_cycles(&mut self, count: u32) {
        for _ in 0..count {
            self.wait_for_video_half_cycle();
            self.wait_for_processor_half_cycle();
        }
    }

    /// Busy-wait `ticks` without touching the cycle counter.
    pub fn delay(&mut self, ticks: Ticks) {
        let start = self.clock.now();
        while self.clock.now().since(start) < ticks {}
    }

    /// Sample the access in progress: control lines and A8-A15 at
    /// `timing.signals`, then A0-A7 once the multiplexer has settled.
    ///
    /// The counter must have been restarted at the processor half-cycle.
    pub fn capture_snapshot(&mut self) -> BusSignalSnapshot {
        self.wait_until_cycle(self.timing.signals);
        let early = self.lines.levels();

        self.lines.select_address_byte(AddressByte::Low);
        self.wait_until_cycle(self.timing.multiplexer);
        let late = self.lines.levels();
        self.lines.select_address_byte(AddressByte::High);

        BusSignalSnapshot::capture(early, late)
    }

    /// Check that PHI2 toggles at all within `timeout` ticks.
    pub fn target_running(&mut self, timeout: Ticks) -> bool {
        let start = self.clock.now();
        let first = self.lines.levels().phi2();
        let mut edges = 0;
        let mut last = first;
        while self.clock.now().since(start) < timeout {
            let level = self.lines.levels().phi2();
            if level != last {
                edges += 1;
                last = level;
                if edges >= 2 {
                    return true;
                }
            }
        }
        log::warn!("no PHI2 activity within {} ticks", timeout.get());
        false
    }

    /// Current time in microseconds from the cycle clock.
    pub fn micros(&mut self) -> u64 {
        self.clock.micros()
    }
}
