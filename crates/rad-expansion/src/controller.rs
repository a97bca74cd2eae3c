//! Boot orchestration and the single execution context.
//!
//! The controller owns the synchronizer, so only one bus transaction can
//! be in flight. The periodic player is a scheduler task that `service`
//! runs between the main flow's own transactions; masking it is the
//! equivalent of disabling the timer interrupt around a critical section.

use rad_core::{BusLines, BusSynchronizer, CycleClock, Observable, Ticks};

use crate::assets::{AssetCatalog, GameEngine};
use crate::cartridge::{CartridgeInjector, InjectionReport};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ExpansionError};
use crate::player::SamplePlayer;
use crate::reu::{ExpansionChannel, ExpansionRegion, TransferCommand, TransferStatus};
use crate::scheduler::{Scheduler, TaskId};
use crate::sid::DacTable;
use crate::sound::{SampleProducer, SoundRingBuffer};

/// How long to watch PHI2 before deciding the target is off.
const RUNNING_CHECK_US: u64 = 100;

pub struct Controller<L, C> {
    sync: BusSynchronizer<L, C>,
    config: ControllerConfig,
    injector: CartridgeInjector,
    channel: ExpansionChannel,
    ring: SoundRingBuffer,
    producer: Option<SampleProducer>,
    player: SamplePlayer,
    scheduler: Scheduler,
    playback: TaskId,
}

impl<L: BusLines, C: CycleClock> Controller<L, C> {
    pub fn new(lines: L, clock: C, config: ControllerConfig) -> Result<Self, ControllerError> {
        config.validate()?;
        let sync = BusSynchronizer::new(lines, clock, config.bus_timing());
        let mut scheduler = Scheduler::new();
        let playback = scheduler.register("sample player");

        Ok(Self {
            sync,
            injector: CartridgeInjector::new(config.reset_vector, config.watchdog_threshold),
            channel: ExpansionChannel::new(ExpansionRegion::new(config.reu_size_kb)?),
            ring: SoundRingBuffer::new(config.audio.ring_capacity)?,
            producer: None,
            player: SamplePlayer::new(config.audio.sample_rate, config.audio.dac_address)?,
            scheduler,
            playback,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn lines(&mut self) -> &mut L {
        self.sync.lines()
    }

    pub fn synchronizer(&mut self) -> &mut BusSynchronizer<L, C> {
        &mut self.sync
    }

    #[must_use]
    pub fn injector(&self) -> &CartridgeInjector {
        &self.injector
    }

    #[must_use]
    pub fn channel(&self) -> &ExpansionChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut ExpansionChannel {
        &mut self.channel
    }

    #[must_use]
    pub fn player(&self) -> &SamplePlayer {
        &self.player
    }

    #[must_use]
    pub fn ring(&self) -> &SoundRingBuffer {
        &self.ring
    }

    pub fn micros(&mut self) -> u64 {
        self.sync.micros()
    }

    /// Power-on to bus ownership: check the target runs, inject the reset
    /// vector, then take the bus for the expansion channel. Booting again
    /// stops playback and gives the bus back before the target is reset.
    pub fn boot(&mut self) -> Result<InjectionReport, ControllerError> {
        let timeout = self.sync.clock_rate().micros_to_ticks(RUNNING_CHECK_US);
        if !self.sync.target_running(timeout.max(Ticks::new(1))) {
            return Err(ControllerError::TargetNotRunning);
        }

        self.stop_playback();
        self.channel.detach(&mut self.sync);
        self.injector.arm(&mut self.sync);
        let report = self.injector.run(&mut self.sync);
        log::info!("injection: {}", self.injector.describe());

        self.channel.attach(&mut self.sync);
        Ok(report)
    }

    /// Start streaming `source` (unsigned 8-bit mono at the configured
    /// rate) through the DAC. The channel must be attached.
    pub fn start_playback(&mut self, source: Vec<u8>, dac: DacTable) -> Result<(), ControllerError> {
        if !self.channel.is_attached() {
            return Err(ExpansionError::NotAttached.into());
        }
        let audio = self.config.audio;
        let mut producer = SampleProducer::new(
            source,
            dac,
            audio.sample_rate,
            audio.lead_ms,
            self.ring.capacity(),
        )?;
        self.ring.clear();

        let now = self.sync.micros();
        let first = self.player.start(now);
        producer.fill(&mut self.ring, 0);
        self.producer = Some(producer);
        self.scheduler.schedule(self.playback, first);
        Ok(())
    }

    pub fn stop_playback(&mut self) {
        self.scheduler.cancel(self.playback);
        self.player.stop();
        self.producer = None;
    }

    /// Begin fading the producer's output to silence.
    pub fn fade_out(&mut self, step: u32) {
        if let Some(producer) = &mut self.producer {
            producer.fade_out(step);
        }
    }

    /// Whether playback has faded all the way down.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.producer.as_ref().is_none_or(|p| p.fade().is_silent())
    }

    /// Main-flow work: top up the ring to the producer's lead.
    pub fn produce(&mut self) -> u64 {
        let now = self.sync.micros();
        match (&mut self.producer, self.player.elapsed_us(now)) {
            (Some(producer), Some(elapsed)) => producer.fill(&mut self.ring, elapsed),
            _ => 0,
        }
    }

    /// Run the player if it is due and not masked. Returns whether it fired.
    pub fn service(&mut self) -> Result<bool, ControllerError> {
        if self.scheduler.is_masked() {
            return Ok(false);
        }
        let now = self.sync.micros();
        let Some((task, scheduled)) = self.scheduler.take_due(now) else {
            return Ok(false);
        };
        debug_assert_eq!(task, self.playback);

        let next = self
            .player
            .fire(&mut self.sync, &mut self.channel, &self.ring, scheduled)?;
        if let Some(next) = next {
            self.scheduler.schedule(self.playback, next);
        }
        Ok(true)
    }

    /// Run `f` with the player held off, for bus work that must not be
    /// split by a DAC write.
    pub fn with_playback_masked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scheduler.mask();
        let result = f(self);
        self.scheduler.unmask();
        result
    }

    /// Produce and service until `duration_us` has passed.
    pub fn run_for(&mut self, duration_us: u64) -> Result<(), ControllerError> {
        let end = self.sync.micros() + duration_us;
        while self.sync.micros() < end {
            self.produce();
            self.service()?;
        }
        Ok(())
    }

    /// Read C64 memory as bus master.
    pub fn peek(&mut self, address: u16) -> Result<u8, ControllerError> {
        if !self.channel.is_attached() {
            return Err(ExpansionError::NotAttached.into());
        }
        ExpansionChannel::synchronize(&mut self.sync);
        Ok(self.channel.read(&mut self.sync, address))
    }

    /// Write C64 memory as bus master.
    pub fn poke(&mut self, address: u16, value: u8) -> Result<(), ControllerError> {
        if !self.channel.is_attached() {
            return Err(ExpansionError::NotAttached.into());
        }
        ExpansionChannel::synchronize(&mut self.sync);
        self.channel.write(&mut self.sync, address, value);
        Ok(())
    }

    pub fn execute(&mut self, command: TransferCommand) -> Result<TransferStatus, ControllerError> {
        Ok(self.channel.execute(&mut self.sync, command)?)
    }

    /// Stop the intro sound, pick the data file and start the engine.
    pub fn hand_off(
        &mut self,
        catalog: &AssetCatalog,
        choice: Option<&str>,
        engine: &mut dyn GameEngine,
    ) -> Result<&'static str, ControllerError> {
        let asset = catalog.resolve(choice)?;
        self.stop_playback();
        log::info!("starting engine with {asset}");
        engine.begin(asset);
        Ok(asset)
    }

    #[must_use]
    pub fn into_parts(self) -> (L, C) {
        self.sync.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c64_sim::{SimClock, SimTime};
    use rad_core::{AddressByte, ControlLine, Direction, LineLevels};

    /// A port with nothing plugged into it.
    struct DeadPort;

    impl BusLines for DeadPort {
        fn levels(&mut self) -> LineLevels {
            LineLevels::default()
        }
        fn select_address_byte(&mut self, _byte: AddressByte) {}
        fn set_data_direction(&mut self, _direction: Direction) {}
        fn drive_data(&mut self, _value: u8) {}
        fn drive_address(&mut self, _address: u16) {}
        fn release_address(&mut self) {}
        fn set_output(&mut self, _line: ControlLine, _high: bool) {}
        fn release(&mut self, _line: ControlLine) {}
    }

    fn dead() -> Controller<DeadPort, SimClock> {
        Controller::new(DeadPort, SimClock::new(SimTime::new()), ControllerConfig::default())
            .expect("default config")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ControllerConfig {
            reu_size_kb: 0,
            ..ControllerConfig::default()
        };
        let result = Controller::new(DeadPort, SimClock::new(SimTime::new()), config);
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[test]
    fn silent_port_fails_boot() {
        let mut controller = dead();
        assert!(matches!(controller.boot(), Err(ControllerError::TargetNotRunning)));
        assert!(!controller.injector().is_handed_off());
    }

    #[test]
    fn memory_access_needs_the_bus() {
        let mut controller = dead();
        assert!(matches!(
            controller.peek(0x0400),
            Err(ControllerError::Expansion(ExpansionError::NotAttached))
        ));
        assert!(controller.poke(0x0400, 1).is_err());
        assert_eq!(controller.produce(), 0);
        assert!(!controller.service().expect("nothing scheduled"));
        assert!(controller.is_silent());
    }
}
