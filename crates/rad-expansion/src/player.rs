//! Periodic DAC writer.
//!
//! Every firing computes the sample index from absolute elapsed time, so a
//! late firing plays the sample that is due now instead of the one it
//! missed. Timer jitter never accumulates into drift.

use rad_core::{BusLines, BusSynchronizer, CycleClock, Observable, Value};

use crate::error::{ExpansionError, SoundError};
use crate::reu::ExpansionChannel;
use crate::sound::{SoundRingBuffer, sample_index};

/// Delay from `start` to the first firing.
pub const INITIAL_DELAY_US: u64 = 100;

pub struct SamplePlayer {
    rate: u32,
    dac_address: u16,
    period_us: u64,
    started_us: Option<u64>,
    fired: u64,
    missed: u64,
}

impl SamplePlayer {
    pub fn new(rate: u32, dac_address: u16) -> Result<Self, SoundError> {
        if rate == 0 {
            return Err(SoundError::ZeroRate);
        }
        Ok(Self {
            rate,
            dac_address,
            period_us: 1_000_000 / u64::from(rate),
            started_us: None,
            fired: 0,
            missed: 0,
        })
    }

    #[must_use]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Firing interval (45 us at 22050 Hz).
    #[must_use]
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_us.is_some()
    }

    #[must_use]
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Firings that came more than one period late.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Microseconds of playback at `now_us`.
    #[must_use]
    pub fn elapsed_us(&self, now_us: u64) -> Option<u64> {
        self.started_us.map(|start| now_us.saturating_sub(start))
    }

    /// Begin playback at index 0 and return the first fire time.
    pub fn start(&mut self, now_us: u64) -> u64 {
        self.started_us = Some(now_us);
        self.fired = 0;
        self.missed = 0;
        log::info!("sample playback at {} Hz", self.rate);
        now_us + INITIAL_DELAY_US
    }

    pub fn stop(&mut self) {
        if self.started_us.take().is_some() {
            log::info!(
                "sample playback stopped after {} samples, {} late",
                self.fired,
                self.missed
            );
        }
    }

    /// Play the sample due now and return when to fire next. `scheduled_us`
    /// is when this firing was due. Returns `None` when stopped. Losing the
    /// bus stops playback.
    pub fn fire<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
        channel: &mut ExpansionChannel,
        ring: &SoundRingBuffer,
        scheduled_us: u64,
    ) -> Result<Option<u64>, ExpansionError> {
        let Some(start) = self.started_us else {
            return Ok(None);
        };
        if !channel.is_attached() {
            self.stop();
            return Err(ExpansionError::NotAttached);
        }

        let now = sync.micros();
        if now > scheduled_us + self.period_us {
            self.missed += 1;
            log::trace!(
                "sample deadline missed by {} us",
                now - scheduled_us - self.period_us
            );
        }
        let value = ring.get(sample_index(now.saturating_sub(start), self.rate));

        ExpansionChannel::synchronize(sync);
        channel.write(sync, self.dac_address, value);
        self.fired += 1;

        Ok(Some(sync.micros() + self.period_us))
    }
}

impl Observable for SamplePlayer {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "rate" => Some(self.rate.into()),
            "period_us" => Some(self.period_us.into()),
            "running" => Some(self.is_running().into()),
            "fired" => Some(self.fired.into()),
            "missed" => Some(self.missed.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["rate", "period_us", "running", "fired", "missed"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reu::ExpansionRegion;
    use c64_sim::{ScriptedTarget, SimulatedC64};

    #[test]
    fn period_at_common_rates() {
        assert_eq!(SamplePlayer::new(22_050, 0xD418).map(|p| p.period_us()).ok(), Some(45));
        assert_eq!(SamplePlayer::new(8_000, 0xD418).map(|p| p.period_us()).ok(), Some(125));
        assert!(SamplePlayer::new(0, 0xD418).is_err());
    }

    #[test]
    fn fire_needs_the_bus() {
        let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
        let clock = c64.clock();
        let mut sync = BusSynchronizer::new(&mut c64, clock, c64_sim::timing());
        let mut channel = ExpansionChannel::new(ExpansionRegion::new(1).expect("1 KB"));
        let ring = SoundRingBuffer::new(16).expect("capacity");
        let mut player = SamplePlayer::new(22_050, 0xD418).expect("player");

        assert_eq!(player.fire(&mut sync, &mut channel, &ring, 0), Ok(None));
        let first = player.start(sync.micros());
        assert_eq!(
            player.fire(&mut sync, &mut channel, &ring, first),
            Err(ExpansionError::NotAttached)
        );
        assert!(!player.is_running());
        assert_eq!(player.fire(&mut sync, &mut channel, &ring, first), Ok(None));

        channel.attach(&mut sync);
        let first = player.start(sync.micros());
        let before = sync.micros();
        let next = player
            .fire(&mut sync, &mut channel, &ring, first)
            .expect("attached")
            .expect("running");
        assert!(next >= before + player.period_us());
        assert_eq!(player.fired(), 1);
        assert_eq!(c64.dac_samples().count(), 1);
    }
}
