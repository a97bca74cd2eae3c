//! Expansion-port line interface.
//!
//! The controller sees the port through one 32-bit level word (one bit per
//! GPIO) plus a handful of outputs. Address lines A0-A15 share eight pins
//! behind a multiplexer: with the select low the pins carry A8-A15, with it
//! high they carry A0-A7 after a settle delay.
//!
//! All port control signals are active low, as on the C64.

/// Fixed pin topology of the controller board (GPIO bank 0 bit numbers).
pub mod pins {
    /// D0; D1-D7 follow on the next seven pins.
    pub const D0: u32 = 0;
    /// First multiplexed address pin (A0 or A8).
    pub const A_MUX0: u32 = 8;
    pub const PHI2: u32 = 16;
    pub const RW: u32 = 17;
    pub const ROML: u32 = 18;
    pub const ROMH: u32 = 19;
    pub const IO1: u32 = 20;
    pub const IO2: u32 = 21;
    pub const BA: u32 = 22;
    pub const RESET: u32 = 23;
    pub const GAME: u32 = 24;
    pub const DMA: u32 = 25;
    pub const MUX_SEL: u32 = 26;
    /// Latch enables for driving A0-A7 / A8-A15 as bus master.
    pub const LATCH_A_LO: u32 = 27;
    pub const LATCH_A_HI: u32 = 28;
    /// Output enable of both address latches (active low).
    pub const LATCH_A_OE: u32 = 29;
    /// Data transceiver direction (high = controller drives the bus).
    pub const DIR_D: u32 = 30;

    pub const DATA_MASK: u32 = 0xFF << D0;
    pub const ADDRESS_MASK: u32 = 0xFF << A_MUX0;
}

/// Data bus direction as seen from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Tri-stated; the controller listens.
    Input,
    /// The controller drives D0-D7.
    Output,
}

/// Which address byte the multiplexer presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressByte {
    /// A8-A15 (multiplexer select low).
    High,
    /// A0-A7 (multiplexer select high).
    Low,
}

/// Port lines the controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLine {
    /// /RESET: pulling it low holds the target in reset.
    Reset,
    /// /GAME: low with /EXROM high selects the ultimax memory map.
    Game,
    /// /DMA: low halts the target CPU and hands the bus to the controller.
    Dma,
    /// R/W as bus master: high = read, low = write.
    ReadWrite,
}

impl ControlLine {
    #[must_use]
    pub const fn pin(self) -> u32 {
        match self {
            ControlLine::Reset => pins::RESET,
            ControlLine::Game => pins::GAME,
            ControlLine::Dma => pins::DMA,
            ControlLine::ReadWrite => pins::RW,
        }
    }
}

/// Raw level word sampled from the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineLevels(pub u32);

impl LineLevels {
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_high(self, pin: u32) -> bool {
        self.0 & (1 << pin) != 0
    }

    #[must_use]
    pub const fn with(self, pin: u32, high: bool) -> Self {
        if high {
            Self(self.0 | (1 << pin))
        } else {
            Self(self.0 & !(1 << pin))
        }
    }

    #[must_use]
    pub const fn with_data(self, value: u8) -> Self {
        Self((self.0 & !pins::DATA_MASK) | ((value as u32) << pins::D0))
    }

    #[must_use]
    pub const fn with_address_byte(self, value: u8) -> Self {
        Self((self.0 & !pins::ADDRESS_MASK) | ((value as u32) << pins::A_MUX0))
    }

    /// PHI2 high: the processor half of the cycle.
    #[must_use]
    pub const fn phi2(self) -> bool {
        self.is_high(pins::PHI2)
    }

    /// R/W high: the current bus owner is reading.
    #[must_use]
    pub const fn reading(self) -> bool {
        self.is_high(pins::RW)
    }

    #[must_use]
    pub const fn romh(self) -> bool {
        !self.is_high(pins::ROMH)
    }

    #[must_use]
    pub const fn roml(self) -> bool {
        !self.is_high(pins::ROML)
    }

    #[must_use]
    pub const fn io1(self) -> bool {
        !self.is_high(pins::IO1)
    }

    #[must_use]
    pub const fn io2(self) -> bool {
        !self.is_high(pins::IO2)
    }

    /// BA high: the VIC-II leaves the bus to the processor.
    #[must_use]
    pub const fn bus_available(self) -> bool {
        self.is_high(pins::BA)
    }

    #[must_use]
    pub const fn data(self) -> u8 {
        ((self.0 & pins::DATA_MASK) >> pins::D0) as u8
    }

    /// Whichever address byte the multiplexer currently presents.
    #[must_use]
    pub const fn address_byte(self) -> u8 {
        ((self.0 & pins::ADDRESS_MASK) >> pins::A_MUX0) as u8
    }
}

/// Point-in-time capture of one bus access, built from the two samples
/// taken around the multiplexer switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSignalSnapshot {
    pub address: u16,
    pub reading: bool,
    pub romh: bool,
    pub roml: bool,
    pub io1: bool,
    pub io2: bool,
    pub data: u8,
}

impl BusSignalSnapshot {
    /// Combine the early sample (control lines and A8-A15) with the
    /// late sample (A0-A7 once the multiplexer has settled, and data).
    #[must_use]
    pub const fn capture(early: LineLevels, late: LineLevels) -> Self {
        Self {
            address: (early.address_byte() as u16) << 8 | late.address_byte() as u16,
            reading: early.reading(),
            romh: early.romh(),
            roml: early.roml(),
            io1: early.io1(),
            io2: early.io2(),
            data: late.data(),
        }
    }

    #[must_use]
    pub const fn address_low(&self) -> u8 {
        self.address as u8
    }

    /// The target reads from the cartridge's high ROM window.
    #[must_use]
    pub const fn romh_read(&self) -> bool {
        self.romh && self.reading
    }
}

/// Hardware access to the expansion port.
///
/// Every call is expected to finish within a few controller ticks. The
/// production binding writes GPIO registers; tests bind a simulated target.
pub trait BusLines {
    /// Sample all input levels at once.
    fn levels(&mut self) -> LineLevels;

    /// Switch the address multiplexer.
    fn select_address_byte(&mut self, byte: AddressByte);

    fn set_data_direction(&mut self, direction: Direction);

    /// Place a value on D0-D7. Only visible to the target while the
    /// direction is `Output`.
    fn drive_data(&mut self, value: u8);

    /// Latch and enable a full address as bus master.
    fn drive_address(&mut self, address: u16);

    /// Tri-state the address latches.
    fn release_address(&mut self);

    /// Configure `line` as an output and drive it to `high`.
    fn set_output(&mut self, line: ControlLine, high: bool);

    /// Return `line` to input so the target's pull-up decides its level.
    fn release(&mut self, line: ControlLine);
}

impl<L: BusLines + ?Sized> BusLines for &mut L {
    fn levels(&mut self) -> LineLevels {
        (**self).levels()
    }

    fn select_address_byte(&mut self, byte: AddressByte) {
        (**self).select_address_byte(byte);
    }

    fn set_data_direction(&mut self, direction: Direction) {
        (**self).set_data_direction(direction);
    }

    fn drive_data(&mut self, value: u8) {
        (**self).drive_data(value);
    }

    fn drive_address(&mut self, address: u16) {
        (**self).drive_address(address);
    }

    fn release_address(&mut self) {
        (**self).release_address();
    }

    fn set_output(&mut self, line: ControlLine, high: bool) {
        (**self).set_output(line, high);
    }

    fn release(&mut self, line: ControlLine) {
        (**self).release(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> LineLevels {
        LineLevels::default()
            .with(pins::ROMH, true)
            .with(pins::ROML, true)
            .with(pins::IO1, true)
            .with(pins::IO2, true)
            .with(pins::RW, true)
    }

    #[test]
    fn control_lines_are_active_low() {
        let levels = idle();
        assert!(!levels.romh());
        assert!(!levels.roml());
        assert!(levels.reading());

        let levels = levels.with(pins::ROMH, false).with(pins::RW, false);
        assert!(levels.romh());
        assert!(!levels.reading());
    }

    #[test]
    fn snapshot_combines_both_address_bytes() {
        let early = idle().with(pins::ROMH, false).with_address_byte(0xFF);
        let late = idle().with_address_byte(0xFC).with_data(0x5A);
        let snap = BusSignalSnapshot::capture(early, late);

        assert_eq!(snap.address, 0xFFFC);
        assert_eq!(snap.address_low(), 0xFC);
        assert_eq!(snap.data, 0x5A);
        assert!(snap.romh_read());
    }

    #[test]
    fn data_and_address_fields_do_not_overlap() {
        let levels = LineLevels::default().with_data(0xFF).with_address_byte(0x00);
        assert_eq!(levels.data(), 0xFF);
        assert_eq!(levels.address_byte(), 0x00);
        assert!(!levels.phi2());
    }
}
