//! Boot-time cartridge emulation: reset vector injection.
//!
//! With /GAME low and /EXROM high the C64 runs in the ultimax map, where
//! $E000-$FFFF belongs to the cartridge (ROMH). After reset the 6510 reads
//! its vector from $FFFC/$FFFD, so answering exactly those two reads puts
//! the processor wherever we like. Every other ROMH read goes unanswered.
//!
//! | State    | Leaves when                                   |
//! |----------|-----------------------------------------------|
//! | Waiting  | ROMH read of $xxFC/$xxFD, or watchdog expires |
//! | Respond  | byte held until `read_data`                   |
//! | Handoff  | terminal: /GAME released, bus is the C64's    |
//! | Watchdog | reset pulse done, back to Waiting             |

use rad_core::{
    AddressByte, BusLines, BusSynchronizer, ControlLine, CycleClock, Direction, Observable, Value,
};

/// KERNAL cold start entry point.
pub const DEFAULT_RESET_VECTOR: u16 = 0xFCE2;
/// Injector iterations without a completed vector fetch before resetting.
pub const DEFAULT_WATCHDOG_THRESHOLD: u32 = 100_000;

const VECTOR_LOW: u8 = 0xFC;
const VECTOR_HIGH: u8 = 0xFD;

/// Progress of the current injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionState {
    pub vector: u16,
    /// Qualifying reads answered since the last reset.
    pub matched_reads: u32,
    /// Loop iterations since the last reset.
    pub elapsed: u32,
    pub threshold: u32,
}

/// Outcome of one injector iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorEvent {
    /// No ROMH read this cycle.
    Idle,
    /// ROMH read of an address we do not answer.
    Ignored { address: u16 },
    /// A vector byte was placed on the bus.
    Served { address: u16, value: u8 },
    /// The watchdog pulsed /RESET.
    WatchdogReset,
    /// Both vector bytes went out and /GAME was released.
    Handoff,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub iterations: u64,
    pub served: u32,
    pub watchdog_resets: u32,
}

pub struct CartridgeInjector {
    state: InjectionState,
    report: InjectionReport,
    handed_off: bool,
}

impl CartridgeInjector {
    #[must_use]
    pub fn new(vector: u16, threshold: u32) -> Self {
        Self {
            state: InjectionState {
                vector,
                matched_reads: 0,
                elapsed: 0,
                threshold,
            },
            report: InjectionReport::default(),
            handed_off: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &InjectionState {
        &self.state
    }

    #[must_use]
    pub fn report(&self) -> InjectionReport {
        self.report
    }

    #[must_use]
    pub fn is_handed_off(&self) -> bool {
        self.handed_off
    }

    /// Power-on sequence: present the ultimax cartridge and reset the
    /// target so it boots into us.
    pub fn arm<L: BusLines, C: CycleClock>(&mut self, sync: &mut BusSynchronizer<L, C>) {
        let timing = *sync.timing();
        sync.next_processor_cycle();

        let lines = sync.lines();
        lines.select_address_byte(AddressByte::High);
        lines.set_data_direction(Direction::Input);
        lines.release(ControlLine::Dma);
        lines.set_output(ControlLine::Game, false);
        lines.set_output(ControlLine::Reset, false);
        sync.delay(timing.power_on_hold);
        sync.lines().release(ControlLine::Reset);
        sync.wait_for_video_half_cycle();

        self.state.matched_reads = 0;
        self.state.elapsed = 0;
        self.handed_off = false;
        log::info!(
            "cartridge armed, injecting reset vector {:#06X}",
            self.state.vector
        );
    }

    /// One loop iteration, aligned to one target cycle.
    pub fn step<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
    ) -> InjectorEvent {
        if self.handed_off {
            return InjectorEvent::Handoff;
        }
        let timing = *sync.timing();
        self.report.iterations += 1;

        sync.wait_for_processor_half_cycle();
        sync.restart_counter();
        sync.wait_until_cycle(timing.phase_settle);
        sync.restart_counter();

        let snapshot = sync.capture_snapshot();

        self.state.elapsed += 1;
        if self.state.elapsed >= self.state.threshold {
            self.watchdog_reset(sync);
            return InjectorEvent::WatchdogReset;
        }

        let event = if snapshot.romh_read() {
            let address = snapshot.address;
            let value = match snapshot.address_low() {
                VECTOR_LOW => Some(self.state.vector as u8),
                VECTOR_HIGH => Some((self.state.vector >> 8) as u8),
                _ => None,
            };
            match value {
                Some(value) => {
                    sync.lines().drive_data(value);
                    sync.lines().set_data_direction(Direction::Output);
                    sync.wait_until_cycle(timing.read_data);
                    sync.lines().set_data_direction(Direction::Input);

                    self.state.matched_reads += 1;
                    self.report.served += 1;
                    log::debug!("served {value:#04X} for {address:#06X}");
                    InjectorEvent::Served { address, value }
                }
                None => InjectorEvent::Ignored { address },
            }
        } else {
            InjectorEvent::Idle
        };

        if matches!(event, InjectorEvent::Served { .. }) && self.state.matched_reads >= 2 {
            sync.wait_for_video_half_cycle();
            sync.lines().set_output(ControlLine::Game, true);
            self.handed_off = true;
            log::info!(
                "reset vector delivered after {} iterations, cartridge off the bus",
                self.report.iterations
            );
            return InjectorEvent::Handoff;
        }

        sync.wait_for_video_half_cycle();
        event
    }

    /// Loop until the processor has its vector.
    pub fn run<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
    ) -> InjectionReport {
        while self.step(sync) != InjectorEvent::Handoff {}
        self.report
    }

    fn watchdog_reset<L: BusLines, C: CycleClock>(&mut self, sync: &mut BusSynchronizer<L, C>) {
        let hold = sync.timing().reset_hold;
        sync.lines().set_output(ControlLine::Reset, false);
        sync.delay(hold);
        sync.lines().release(ControlLine::Reset);
        sync.wait_for_video_half_cycle();

        log::warn!(
            "no vector fetch within {} cycles ({} of 2 bytes served), resetting target",
            self.state.threshold,
            self.state.matched_reads
        );
        self.state.matched_reads = 0;
        self.state.elapsed = 0;
        self.report.watchdog_resets += 1;
    }
}

impl Observable for CartridgeInjector {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "vector" => Some(self.state.vector.into()),
            "matched_reads" => Some(self.state.matched_reads.into()),
            "elapsed" => Some(self.state.elapsed.into()),
            "iterations" => Some(self.report.iterations.into()),
            "watchdog_resets" => Some(self.report.watchdog_resets.into()),
            "handed_off" => Some(self.handed_off.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "vector",
            "matched_reads",
            "elapsed",
            "iterations",
            "watchdog_resets",
            "handed_off",
        ]
    }
}
