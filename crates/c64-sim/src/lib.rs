//! A simulated C64 seen from the expansion port.
//!
//! Time is a shared tick counter. Every port access and every clock read
//! costs one tick, so busy-wait loops terminate and timing points land at
//! reproducible ticks. The controller clock runs at 32 MHz against a 1 MHz
//! target: one target cycle is 32 ticks, PHI2 is low for the first 16 and
//! high for the last 16.
//!
//! The processor is a script of bus accesses, one per cycle, supplied by a
//! [`TargetModel`]. Nothing is emulated beyond what the port exposes.

mod machine;
mod target;
mod time;

pub use machine::{DrivenByte, GameEvent, ResetPulse, SidWrite, SimulatedC64, Violation};
pub use target::{Access, BootingTarget, ScriptedTarget, TargetModel};
pub use time::{SimClock, SimTime};

use rad_core::{BusTiming, Ticks};

/// Controller clock frequency.
pub const CLOCK_HZ: u64 = 32_000_000;
/// Ticks per target cycle.
pub const CYCLE_TICKS: u64 = 32;
/// Ticks per PHI2 half.
pub const HALF_CYCLE_TICKS: u64 = CYCLE_TICKS / 2;

/// Target cycle containing tick `t`.
#[must_use]
pub const fn cycle_of(t: u64) -> u64 {
    t / CYCLE_TICKS
}

/// PHI2 level at tick `t`.
#[must_use]
pub const fn phi2_high(t: u64) -> bool {
    (t / HALF_CYCLE_TICKS) % 2 == 1
}

/// Timing points scaled to the simulated clock.
#[must_use]
pub const fn timing() -> BusTiming {
    BusTiming {
        phase_settle: Ticks::new(2),
        signals: Ticks::new(2),
        multiplexer: Ticks::new(4),
        read_data: Ticks::new(9),
        write_data: Ticks::new(9),
        reset_hold: Ticks::new(64),
        power_on_hold: Ticks::new(128),
    }
}
