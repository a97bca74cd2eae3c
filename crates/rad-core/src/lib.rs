//! Core types for a controller that rides a C64/C128 expansion port.
//!
//! The target's clock is not ours. Every timed action is relative to the
//! last observed PHI2 phase boundary, and the cycle counter is restarted at
//! each boundary so drift never accumulates past one target cycle.

mod clock;
mod lines;
mod observable;
mod sync;
mod ticks;
mod timing;

pub use clock::{ClockRate, CycleClock, SystemClock};
pub use lines::{AddressByte, BusLines, BusSignalSnapshot, ControlLine, Direction, LineLevels, pins};
pub use observable::{Observable, Value};
pub use sync::BusSynchronizer;
pub use ticks::Ticks;
pub use timing::BusTiming;
