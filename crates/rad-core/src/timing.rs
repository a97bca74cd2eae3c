//! Cycle-relative timing points.
//!
//! These are tuned against real hardware margins and differ per controller
//! board and target model. Nothing here is a portable constant.

use crate::Ticks;

/// Offsets (in counter ticks after a restart) at which the controller acts
/// within one target half-cycle, plus reset hold times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusTiming {
    /// Wait after the PHI2 edge before the second counter restart.
    pub phase_settle: Ticks,
    /// Sample point for control lines and A8-A15.
    pub signals: Ticks,
    /// Sample point for A0-A7 after switching the multiplexer.
    pub multiplexer: Ticks,
    /// Point until which a byte driven for a target read must stay on the
    /// bus, and at which a bus-master read captures the data lines.
    pub read_data: Ticks,
    /// Point until which a bus-master write keeps data on the bus.
    pub write_data: Ticks,
    /// How long the watchdog holds /RESET low.
    pub reset_hold: Ticks,
    /// How long /RESET is held when arming the cartridge at power-on.
    pub power_on_hold: Ticks,
}

impl BusTiming {
    /// Raspberry Pi 3A+/3B+ at 1.4 GHz against a PAL or NTSC C64/C128.
    pub const RPI3_PLUS: Self = Self {
        phase_settle: Ticks::new(50),
        signals: Ticks::new(45),
        multiplexer: Ticks::new(215),
        read_data: Ticks::new(470),
        write_data: Ticks::new(480),
        reset_hold: Ticks::new(1 << 18),
        power_on_hold: Ticks::new(1 << 20),
    };

    /// Raspberry Pi Zero 2 at 1.0 GHz.
    pub const RPI_ZERO2: Self = Self {
        phase_settle: Ticks::new(36),
        signals: Ticks::new(32),
        multiplexer: Ticks::new(155),
        read_data: Ticks::new(335),
        write_data: Ticks::new(345),
        reset_hold: Ticks::new(1 << 18),
        power_on_hold: Ticks::new(1 << 20),
    };
}

impl Default for BusTiming {
    fn default() -> Self {
        Self::RPI3_PLUS
    }
}
