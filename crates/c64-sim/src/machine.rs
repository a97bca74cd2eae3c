//! The simulated port: line levels derived from the processor script and
//! the controller's outputs, plus logs of everything the controller did.

use rad_core::{AddressByte, BusLines, ControlLine, Direction, LineLevels, pins};

use crate::{Access, SimClock, SimTime, TargetModel, cycle_of, phi2_high};

const SID_RANGE: std::ops::RangeInclusive<u16> = 0xD400..=0xD41F;
const DAC_REGISTER: u16 = 0xD418;

/// A byte the controller placed on the data lines while the processor
/// owned the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivenByte {
    pub cycle: u64,
    /// The whole drive window fell inside the processor half.
    pub phi2_high: bool,
    /// What the processor was doing in that cycle.
    pub access: Access,
    pub value: u8,
}

/// One /RESET low period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPulse {
    pub start: u64,
    pub end: u64,
}

impl ResetPulse {
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.end - self.start
    }
}

/// A change of the /GAME level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEvent {
    pub tick: u64,
    pub phi2_high: bool,
    pub high: bool,
}

/// A bus-master write into the SID register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidWrite {
    pub tick: u64,
    pub address: u16,
    pub value: u8,
}

/// Protocol errors the port noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The controller wrote as bus master without holding /DMA.
    WriteWithoutDma { address: u16 },
    /// The controller read as bus master without holding /DMA.
    ReadWithoutDma { address: u16 },
    /// The controller drove data while the processor was writing.
    Contention { cycle: u64 },
}

/// A C64 expansion port driven by a scripted processor.
pub struct SimulatedC64 {
    time: SimTime,
    target: Box<dyn TargetModel>,
    memory: Vec<u8>,

    reset_low: bool,
    reset_since: u64,
    game_low: bool,
    dma_low: bool,
    rw_out: Option<bool>,
    mux: AddressByte,
    direction: Direction,
    data_out: u8,
    address_out: Option<u16>,
    master_read_checked: bool,
    drive_since: Option<u64>,

    /// First cycle the processor runs after the last reset release.
    running_from: Option<u64>,
    /// Cycles the processor has executed since that release.
    cpu_cycles: u64,
    /// Cycles below this are finished and latched.
    finished: u64,
    /// Access of the cycle most recently looked at.
    current: Option<(u64, Access)>,
    vector_low: Option<u8>,

    driven: Vec<DrivenByte>,
    resets: Vec<ResetPulse>,
    game_events: Vec<GameEvent>,
    sid_writes: Vec<SidWrite>,
    violations: Vec<Violation>,
    vectors: Vec<u16>,
}

impl SimulatedC64 {
    /// A machine whose processor stays idle until the first reset.
    pub fn new(target: impl TargetModel + 'static) -> Self {
        Self {
            time: SimTime::new(),
            target: Box::new(target),
            memory: vec![0; 0x10000],
            reset_low: false,
            reset_since: 0,
            game_low: false,
            dma_low: false,
            rw_out: None,
            mux: AddressByte::High,
            direction: Direction::Input,
            data_out: 0,
            address_out: None,
            master_read_checked: false,
            drive_since: None,
            running_from: None,
            cpu_cycles: 0,
            finished: 0,
            current: None,
            vector_low: None,
            driven: Vec::new(),
            resets: Vec::new(),
            game_events: Vec::new(),
            sid_writes: Vec::new(),
            violations: Vec::new(),
            vectors: Vec::new(),
        }
    }

    #[must_use]
    pub fn time(&self) -> &SimTime {
        &self.time
    }

    /// A cycle counter sharing this machine's time.
    #[must_use]
    pub fn clock(&self) -> SimClock {
        SimClock::new(self.time.clone())
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }

    #[must_use]
    pub fn driven_bytes(&self) -> &[DrivenByte] {
        &self.driven
    }

    #[must_use]
    pub fn reset_pulses(&self) -> &[ResetPulse] {
        &self.resets
    }

    #[must_use]
    pub fn game_events(&self) -> &[GameEvent] {
        &self.game_events
    }

    #[must_use]
    pub fn sid_writes(&self) -> &[SidWrite] {
        &self.sid_writes
    }

    /// Values written to the SID volume register, in order.
    pub fn dac_samples(&self) -> impl Iterator<Item = u8> + '_ {
        self.sid_writes
            .iter()
            .filter(|w| w.address == DAC_REGISTER)
            .map(|w| w.value)
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Reset vectors the processor fetched, one per completed fetch.
    #[must_use]
    pub fn fetched_vectors(&self) -> &[u16] {
        &self.vectors
    }

    #[must_use]
    pub fn game_low(&self) -> bool {
        self.game_low
    }

    #[must_use]
    pub fn dma_low(&self) -> bool {
        self.dma_low
    }

    /// Spend a tick and finish every cycle that ended before it.
    fn tick(&mut self) -> u64 {
        let t = self.time.advance();
        let cycle = cycle_of(t);
        while self.finished < cycle {
            self.finish_cycle(self.finished);
            self.finished += 1;
        }
        t
    }

    /// The processor's access in `cycle`, decided once per cycle with the
    /// line state at that moment.
    fn access(&mut self, cycle: u64) -> Access {
        if let Some((_, access)) = self.current.filter(|&(seen, _)| seen == cycle) {
            return access;
        }
        let running = self.running_from.is_some_and(|from| cycle >= from);
        let access = if running && !self.reset_low && !self.dma_low {
            let access = self.target.access(self.cpu_cycles);
            self.cpu_cycles += 1;
            access
        } else {
            Access::Idle
        };
        self.current = Some((cycle, access));
        access
    }

    fn finish_cycle(&mut self, cycle: u64) {
        match self.access(cycle) {
            Access::Idle => {}
            Access::Read(address) => {
                let value = self.latched_value(cycle, address);
                self.target.latched(address, value);
                match address {
                    0xFFFC => self.vector_low = Some(value),
                    0xFFFD => {
                        if let Some(low) = self.vector_low.take() {
                            self.vectors.push(u16::from(value) << 8 | u16::from(low));
                        }
                    }
                    _ => {}
                }
            }
            Access::Write(address, value) => self.memory[usize::from(address)] = value,
        }
    }

    /// What the processor saw at the end of a read: a controller drive in
    /// that processor half wins, an unanswered cartridge read floats high.
    fn latched_value(&self, cycle: u64, address: u16) -> u8 {
        if let Some(byte) = self
            .driven
            .iter()
            .rev()
            .take_while(|d| d.cycle >= cycle)
            .find(|d| d.cycle == cycle && d.phi2_high)
        {
            return byte.value;
        }
        if self.cartridge_window(address).is_some() {
            0xFF
        } else {
            self.memory[usize::from(address)]
        }
    }

    /// In the ultimax map the cartridge answers $8000-$9FFF (ROML) and
    /// $E000-$FFFF (ROMH).
    fn cartridge_window(&self, address: u16) -> Option<u32> {
        if !self.game_low {
            return None;
        }
        match address {
            0x8000..=0x9FFF => Some(pins::ROML),
            0xE000..=0xFFFF => Some(pins::ROMH),
            _ => None,
        }
    }

    fn commit_master_write(&mut self) {
        let Some(address) = self.address_out else {
            return;
        };
        if !self.dma_low {
            self.violations.push(Violation::WriteWithoutDma { address });
            return;
        }
        if self.direction != Direction::Output {
            return;
        }
        self.memory[usize::from(address)] = self.data_out;
        if SID_RANGE.contains(&address) {
            self.sid_writes.push(SidWrite {
                tick: self.time.now(),
                address,
                value: self.data_out,
            });
        }
    }

    fn end_drive(&mut self, t: u64) {
        let Some(start) = self.drive_since.take() else {
            return;
        };
        if self.address_out.is_some() {
            return;
        }
        let cycle = cycle_of(start);
        let access = match self.current {
            Some((seen, access)) if seen == cycle => access,
            _ => Access::Idle,
        };
        if matches!(access, Access::Write(..)) {
            self.violations.push(Violation::Contention { cycle });
        }
        self.driven.push(DrivenByte {
            cycle,
            phi2_high: phi2_high(start) && phi2_high(t) && cycle_of(t) == cycle,
            access,
            value: self.data_out,
        });
    }

    fn set_game(&mut self, t: u64, low: bool) {
        if self.game_low != low {
            self.game_low = low;
            self.game_events.push(GameEvent {
                tick: t,
                phi2_high: phi2_high(t),
                high: !low,
            });
        }
    }

    fn set_reset(&mut self, t: u64, low: bool) {
        if low && !self.reset_low {
            self.reset_since = t;
        }
        if !low && self.reset_low {
            self.resets.push(ResetPulse {
                start: self.reset_since,
                end: t,
            });
            self.running_from = Some(cycle_of(t) + 1);
            self.cpu_cycles = 0;
            self.vector_low = None;
            self.target.reset();
            log::trace!("target reset released at tick {t}");
        }
        self.reset_low = low;
    }

    fn set_rw(&mut self, level: Option<bool>) {
        if self.rw_out == Some(false) && level != Some(false) {
            self.commit_master_write();
        }
        self.rw_out = level;
    }
}

impl BusLines for SimulatedC64 {
    fn levels(&mut self) -> LineLevels {
        let t = self.tick();
        let phi2 = phi2_high(t);
        let access = if phi2 {
            self.access(cycle_of(t))
        } else {
            Access::Idle
        };

        let address = self.address_out.or(access.address()).unwrap_or(0xFFFF);
        let reading = self.rw_out.unwrap_or(!matches!(access, Access::Write(..)));
        let selected = if self.address_out.is_none() {
            access.address().and_then(|a| self.cartridge_window(a))
        } else {
            None
        };

        let data = if self.direction == Direction::Output {
            self.data_out
        } else if let (Some(master), Some(true)) = (self.address_out, self.rw_out) {
            if !self.dma_low && !self.master_read_checked {
                self.violations
                    .push(Violation::ReadWithoutDma { address: master });
            }
            self.master_read_checked = true;
            self.memory[usize::from(master)]
        } else {
            match access {
                Access::Idle => 0xFF,
                Access::Write(_, value) => value,
                Access::Read(_) if selected.is_some() => 0xFF,
                Access::Read(a) => self.memory[usize::from(a)],
            }
        };

        let presented = match self.mux {
            AddressByte::High => (address >> 8) as u8,
            AddressByte::Low => address as u8,
        };
        let io = |range: std::ops::RangeInclusive<u16>| {
            phi2 && access.address().is_some_and(|a| range.contains(&a))
        };

        LineLevels::default()
            .with_data(data)
            .with_address_byte(presented)
            .with(pins::PHI2, phi2)
            .with(pins::RW, reading)
            .with(pins::ROML, selected != Some(pins::ROML))
            .with(pins::ROMH, selected != Some(pins::ROMH))
            .with(pins::IO1, !io(0xDE00..=0xDEFF))
            .with(pins::IO2, !io(0xDF00..=0xDFFF))
            .with(pins::BA, true)
            .with(pins::RESET, !self.reset_low)
            .with(pins::GAME, !self.game_low)
            .with(pins::DMA, !self.dma_low)
            .with(pins::MUX_SEL, self.mux == AddressByte::Low)
            .with(pins::DIR_D, self.direction == Direction::Output)
    }

    fn select_address_byte(&mut self, byte: AddressByte) {
        self.tick();
        self.mux = byte;
    }

    fn set_data_direction(&mut self, direction: Direction) {
        let t = self.tick();
        match (self.direction, direction) {
            (Direction::Input, Direction::Output) => self.drive_since = Some(t),
            (Direction::Output, Direction::Input) => self.end_drive(t),
            _ => {}
        }
        self.direction = direction;
    }

    fn drive_data(&mut self, value: u8) {
        self.tick();
        self.data_out = value;
    }

    fn drive_address(&mut self, address: u16) {
        self.tick();
        self.address_out = Some(address);
        self.master_read_checked = false;
    }

    fn release_address(&mut self) {
        self.tick();
        self.address_out = None;
    }

    fn set_output(&mut self, line: ControlLine, high: bool) {
        let t = self.tick();
        match line {
            ControlLine::Reset => self.set_reset(t, !high),
            ControlLine::Game => self.set_game(t, !high),
            ControlLine::Dma => self.dma_low = !high,
            ControlLine::ReadWrite => self.set_rw(Some(high)),
        }
    }

    fn release(&mut self, line: ControlLine) {
        let t = self.tick();
        match line {
            ControlLine::Reset => self.set_reset(t, false),
            ControlLine::Game => self.set_game(t, false),
            ControlLine::Dma => self.dma_low = false,
            ControlLine::ReadWrite => self.set_rw(None),
        }
    }
}
