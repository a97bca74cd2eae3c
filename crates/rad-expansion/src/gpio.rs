//! Port lines on BCM283x GPIO registers.
//!
//! All signals sit in GPIO bank 0 (see [`rad_core::pins`]). The address
//! latches load from the data pins: a byte is put on D0-D7 and strobed into
//! the low or high latch, then the latch outputs are enabled.

use core::ptr::NonNull;

use rad_core::{AddressByte, BusLines, ControlLine, Direction, LineLevels, pins};

/// Function select, ten pins per register.
const GPFSEL0: usize = 0x00;
const GPSET0: usize = 0x1C;
const GPCLR0: usize = 0x28;
const GPLEV0: usize = 0x34;

const FSEL_INPUT: u32 = 0b000;
const FSEL_OUTPUT: u32 = 0b001;

/// Memory-mapped GPIO block.
pub struct MmioLines {
    base: NonNull<u32>,
}

#[allow(unsafe_code)]
impl MmioLines {
    /// Bind to a mapped GPIO register block and put the board in its idle
    /// state: all port lines released, multiplexer on A8-A15.
    ///
    /// # Safety
    ///
    /// `base` must point to the GPIO registers (at least up to GPLEV0),
    /// mapped for volatile access, and stay valid and unaliased for the
    /// lifetime of the returned value.
    pub unsafe fn new(base: NonNull<u32>) -> Self {
        let mut lines = Self { base };
        for pin in [pins::MUX_SEL, pins::LATCH_A_LO, pins::LATCH_A_HI, pins::LATCH_A_OE, pins::DIR_D] {
            lines.set_function(pin, FSEL_OUTPUT);
        }
        lines.set(1 << pins::LATCH_A_OE);
        lines.clear(1 << pins::MUX_SEL | 1 << pins::DIR_D | 1 << pins::LATCH_A_LO | 1 << pins::LATCH_A_HI);
        lines.data_pins(FSEL_INPUT);
        lines
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: offset lies inside the block the caller of `new` vouched for.
        unsafe { self.base.add(offset / 4).read_volatile() }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: as in `read`.
        unsafe { self.base.add(offset / 4).write_volatile(value) }
    }
}

impl MmioLines {
    fn set(&mut self, mask: u32) {
        self.write(GPSET0, mask);
    }

    fn clear(&mut self, mask: u32) {
        self.write(GPCLR0, mask);
    }

    fn set_function(&mut self, pin: u32, function: u32) {
        let register = GPFSEL0 + (pin as usize / 10) * 4;
        let shift = (pin % 10) * 3;
        let value = self.read(register) & !(0b111 << shift) | function << shift;
        self.write(register, value);
    }

    fn data_pins(&mut self, function: u32) {
        for pin in pins::D0..pins::D0 + 8 {
            self.set_function(pin, function);
        }
    }

    fn put_byte(&mut self, value: u8) {
        let bits = u32::from(value) << pins::D0;
        self.set(bits);
        self.clear(!bits & pins::DATA_MASK);
    }

    fn strobe(&mut self, pin: u32) {
        self.set(1 << pin);
        self.clear(1 << pin);
    }
}

impl BusLines for MmioLines {
    fn levels(&mut self) -> LineLevels {
        LineLevels(self.read(GPLEV0))
    }

    fn select_address_byte(&mut self, byte: AddressByte) {
        match byte {
            AddressByte::High => self.clear(1 << pins::MUX_SEL),
            AddressByte::Low => self.set(1 << pins::MUX_SEL),
        }
    }

    fn set_data_direction(&mut self, direction: Direction) {
        match direction {
            Direction::Output => {
                self.data_pins(FSEL_OUTPUT);
                self.set(1 << pins::DIR_D);
            }
            Direction::Input => {
                self.clear(1 << pins::DIR_D);
                self.data_pins(FSEL_INPUT);
            }
        }
    }

    fn drive_data(&mut self, value: u8) {
        self.put_byte(value);
    }

    fn drive_address(&mut self, address: u16) {
        self.data_pins(FSEL_OUTPUT);
        self.put_byte(address as u8);
        self.strobe(pins::LATCH_A_LO);
        self.put_byte((address >> 8) as u8);
        self.strobe(pins::LATCH_A_HI);
        self.clear(1 << pins::LATCH_A_OE);
    }

    fn release_address(&mut self) {
        self.set(1 << pins::LATCH_A_OE);
    }

    fn set_output(&mut self, line: ControlLine, high: bool) {
        let pin = line.pin();
        if high {
            self.set(1 << pin);
        } else {
            self.clear(1 << pin);
        }
        self.set_function(pin, FSEL_OUTPUT);
    }

    fn release(&mut self, line: ControlLine) {
        self.set_function(line.pin(), FSEL_INPUT);
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    fn bind(regs: &mut [u32; 64]) -> MmioLines {
        let base = NonNull::new(regs.as_mut_ptr()).expect("non-null");
        // SAFETY: the array outlives the test body and is only reached through `lines`.
        unsafe { MmioLines::new(base) }
    }

    #[test]
    fn levels_come_from_gplev0() {
        let mut regs = [0u32; 64];
        regs[GPLEV0 / 4] = 1 << pins::PHI2 | 0x5A;
        let mut lines = bind(&mut regs);
        let levels = lines.levels();
        assert!(levels.phi2());
        assert_eq!(levels.data(), 0x5A);
    }

    #[test]
    fn driving_reset_low_selects_output_and_clears() {
        let mut regs = [0u32; 64];
        let mut lines = bind(&mut regs);
        lines.set_output(ControlLine::Reset, false);

        // Pin 23: GPFSEL2, bits 9-11.
        assert_eq!(regs[(GPFSEL0 + 8) / 4] >> 9 & 0b111, FSEL_OUTPUT);
        assert_eq!(regs[GPCLR0 / 4], 1 << pins::RESET);
    }

    #[test]
    fn release_returns_pin_to_input() {
        let mut regs = [0u32; 64];
        let mut lines = bind(&mut regs);
        lines.set_output(ControlLine::Dma, false);
        lines.release(ControlLine::Dma);

        assert_eq!(regs[(GPFSEL0 + 8) / 4] >> 15 & 0b111, FSEL_INPUT);
    }

    #[test]
    fn drive_data_sets_and_clears_data_pins() {
        let mut regs = [0u32; 64];
        let mut lines = bind(&mut regs);
        lines.drive_data(0xA5);

        assert_eq!(regs[GPSET0 / 4], 0xA5);
        assert_eq!(regs[GPCLR0 / 4], 0x5A);
    }
}
