//! Sample ring buffer and its producer.
//!
//! Both sides address the ring by absolute sample index, derived from the
//! time since playback started rather than from counting firings. The
//! producer stays a fixed lead ahead of the index; the player reads
//! whatever sits at the current index. No handshake, no locks.

use crate::error::SoundError;
use crate::sid::DacTable;

/// Absolute sample index after `elapsed_us` at `rate` Hz.
#[must_use]
pub fn sample_index(elapsed_us: u64, rate: u32) -> u64 {
    (u128::from(elapsed_us) * u128::from(rate) / 1_000_000) as u64
}

/// Fixed-capacity ring of DAC values.
pub struct SoundRingBuffer {
    samples: Vec<u8>,
}

impl SoundRingBuffer {
    pub fn new(capacity: usize) -> Result<Self, SoundError> {
        if capacity == 0 {
            return Err(SoundError::ZeroCapacity);
        }
        Ok(Self {
            samples: vec![0; capacity],
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    fn slot(&self, index: u64) -> usize {
        (index % self.samples.len() as u64) as usize
    }

    #[must_use]
    pub fn get(&self, index: u64) -> u8 {
        self.samples[self.slot(index)]
    }

    pub fn put(&mut self, index: u64, value: u8) {
        let slot = self.slot(index);
        self.samples[slot] = value;
    }

    /// Silence everything.
    pub fn clear(&mut self) {
        self.samples.fill(0);
    }
}

/// Master volume in 1/256 steps, ramping down once a fade-out starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    level: u32,
    step: u32,
}

impl Fade {
    pub const FULL: u32 = 256;

    #[must_use]
    pub fn new() -> Self {
        Self {
            level: Self::FULL,
            step: 0,
        }
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Start ramping down by `step` per producer pass.
    pub fn fade_out(&mut self, step: u32) {
        self.step = step.max(1);
    }

    pub fn advance(&mut self) {
        self.level = self.level.saturating_sub(self.step);
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.level == 0
    }

    #[must_use]
    pub fn apply(&self, sample: u8) -> u8 {
        ((u32::from(sample) * self.level) >> 8) as u8
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the ring filled ahead of playback from a looping source.
pub struct SampleProducer {
    source: Vec<u8>,
    dac: DacTable,
    rate: u32,
    lead: u64,
    produced: u64,
    fade: Fade,
}

/// Samples covered by `lead_ms` at `rate`.
#[must_use]
pub fn lead_samples(rate: u32, lead_ms: u32) -> u64 {
    u64::from(rate) * u64::from(lead_ms) / 1000
}

impl SampleProducer {
    /// `source` is unsigned 8-bit mono at `rate`; it loops. The lead must
    /// stay below `capacity`, or the producer would overwrite slots the
    /// player has not read yet.
    pub fn new(
        source: Vec<u8>,
        dac: DacTable,
        rate: u32,
        lead_ms: u32,
        capacity: usize,
    ) -> Result<Self, SoundError> {
        if source.is_empty() {
            return Err(SoundError::EmptySource);
        }
        if rate == 0 {
            return Err(SoundError::ZeroRate);
        }
        let lead = lead_samples(rate, lead_ms);
        if lead >= capacity as u64 {
            return Err(SoundError::LeadExceedsRing { lead, capacity });
        }
        Ok(Self {
            source,
            dac,
            rate,
            lead,
            produced: 0,
            fade: Fade::new(),
        })
    }

    /// Samples written so far (absolute index of the next one).
    #[must_use]
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Lead in samples.
    #[must_use]
    pub fn lead(&self) -> u64 {
        self.lead
    }

    #[must_use]
    pub fn fade(&self) -> &Fade {
        &self.fade
    }

    pub fn fade_out(&mut self, step: u32) {
        self.fade.fade_out(step);
    }

    /// Write every sample now due and return how many that was.
    pub fn fill(&mut self, ring: &mut SoundRingBuffer, elapsed_us: u64) -> u64 {
        let target = sample_index(elapsed_us, self.rate) + self.lead;
        let due = target.saturating_sub(self.produced);
        let len = self.source.len() as u64;

        for position in self.produced..target {
            let source = self.source[(position % len) as usize];
            ring.put(position, self.dac.map(self.fade.apply(source)));
        }
        self.produced += due;
        self.fade.advance();
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DacTable {
        let bytes: Vec<u8> = (0..=255).collect();
        DacTable::from_bytes(&bytes).expect("256 entries")
    }

    #[test]
    fn index_does_not_drift() {
        assert_eq!(sample_index(0, 22_050), 0);
        assert_eq!(sample_index(45, 22_050), 0);
        assert_eq!(sample_index(46, 22_050), 1);
        assert_eq!(sample_index(1_000_000, 22_050), 22_050);
        // An hour in, the index is exact; summing 45 us periods would be
        // off by almost a minute.
        assert_eq!(sample_index(3_600_000_000, 22_050), 3_600 * 22_050);
    }

    #[test]
    fn ring_wraps_by_absolute_index() {
        let mut ring = SoundRingBuffer::new(4).expect("capacity");
        ring.put(2, 7);
        ring.put(5, 9);
        assert_eq!(ring.get(6), 7);
        assert_eq!(ring.get(1), 9);
        assert_eq!(ring.get(1 + 4 * 1_000_000), 9);
        assert!(SoundRingBuffer::new(0).is_err());
    }

    #[test]
    fn producer_keeps_lead() {
        let mut ring = SoundRingBuffer::new(16_384).expect("capacity");
        let mut producer =
            SampleProducer::new(vec![10, 20, 30], identity(), 22_050, 200, ring.capacity())
                .expect("producer");

        assert_eq!(producer.fill(&mut ring, 0), 4_410);
        assert_eq!(producer.fill(&mut ring, 0), 0);
        assert_eq!(producer.fill(&mut ring, 1_000), 22);
        assert_eq!(producer.produced(), 4_432);
        assert_eq!(ring.get(0), 10);
        assert_eq!(ring.get(4_430), 30);
    }

    #[test]
    fn fade_scales_then_silences() {
        let mut ring = SoundRingBuffer::new(64).expect("capacity");
        let mut producer =
            SampleProducer::new(vec![200], identity(), 1_000, 1, ring.capacity()).expect("producer");
        producer.fade_out(128);

        producer.fill(&mut ring, 0);
        assert_eq!(ring.get(0), 200);
        producer.fill(&mut ring, 1_000);
        assert_eq!(ring.get(1), 100);
        producer.fill(&mut ring, 2_000);
        assert_eq!(ring.get(2), 0);
        assert!(producer.fade().is_silent());
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(matches!(
            SampleProducer::new(Vec::new(), DacTable::linear(), 22_050, 200, 16_384),
            Err(SoundError::EmptySource)
        ));
    }

    #[test]
    fn lead_must_fit_the_ring() {
        let source: Vec<u8> = (0..=255).cycle().take(1_000).collect();
        assert!(matches!(
            SampleProducer::new(source.clone(), identity(), 22_050, 200, 1_024),
            Err(SoundError::LeadExceedsRing { lead: 4_410, capacity: 1_024 })
        ));
        assert!(matches!(
            SampleProducer::new(source.clone(), identity(), 1_000, 64, 64),
            Err(SoundError::LeadExceedsRing { lead: 64, capacity: 64 })
        ));

        // The largest lead that fits leaves slot 0 intact for the player.
        let mut ring = SoundRingBuffer::new(64).expect("capacity");
        let mut producer =
            SampleProducer::new(source, identity(), 1_000, 63, ring.capacity()).expect("fits");
        assert_eq!(producer.fill(&mut ring, 0), 63);
        assert_eq!(ring.get(0), 0);
        assert_eq!(ring.get(5), 5);
    }
}
