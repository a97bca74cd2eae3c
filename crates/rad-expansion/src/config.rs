//! Controller configuration, read from TOML.

use std::fs;
use std::path::Path;

use rad_core::{BusTiming, Ticks};
use serde::{Deserialize, Serialize};

use crate::cartridge::{DEFAULT_RESET_VECTOR, DEFAULT_WATCHDOG_THRESHOLD};
use crate::error::ConfigError;
use crate::reu::REGION_MAX_KB;
use crate::sid::DAC_ADDRESS;
use crate::sound::lead_samples;

/// Controller board the timing points were measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TimingPreset {
    #[default]
    #[serde(rename = "rpi3plus")]
    Rpi3Plus,
    #[serde(rename = "rpi-zero2")]
    RpiZero2,
}

impl TimingPreset {
    #[must_use]
    pub const fn timing(self) -> BusTiming {
        match self {
            TimingPreset::Rpi3Plus => BusTiming::RPI3_PLUS,
            TimingPreset::RpiZero2 => BusTiming::RPI_ZERO2,
        }
    }
}

/// Per-field replacements for the preset's timing points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingOverride {
    pub phase_settle: Option<Ticks>,
    pub signals: Option<Ticks>,
    pub multiplexer: Option<Ticks>,
    pub read_data: Option<Ticks>,
    pub write_data: Option<Ticks>,
    pub reset_hold: Option<Ticks>,
    pub power_on_hold: Option<Ticks>,
}

impl TimingOverride {
    #[must_use]
    pub fn apply(&self, base: BusTiming) -> BusTiming {
        BusTiming {
            phase_settle: self.phase_settle.unwrap_or(base.phase_settle),
            signals: self.signals.unwrap_or(base.signals),
            multiplexer: self.multiplexer.unwrap_or(base.multiplexer),
            read_data: self.read_data.unwrap_or(base.read_data),
            write_data: self.write_data.unwrap_or(base.write_data),
            reset_hold: self.reset_hold.unwrap_or(base.reset_hold),
            power_on_hold: self.power_on_hold.unwrap_or(base.power_on_hold),
        }
    }
}

/// Pin every timing point, whatever the preset.
impl From<BusTiming> for TimingOverride {
    fn from(timing: BusTiming) -> Self {
        Self {
            phase_settle: Some(timing.phase_settle),
            signals: Some(timing.signals),
            multiplexer: Some(timing.multiplexer),
            read_data: Some(timing.read_data),
            write_data: Some(timing.write_data),
            reset_hold: Some(timing.reset_hold),
            power_on_hold: Some(timing.power_on_hold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    /// Playback rate in Hz.
    pub sample_rate: u32,
    /// Ring buffer size in samples.
    pub ring_capacity: usize,
    /// Register the player writes samples to.
    pub dac_address: u16,
    /// How far the producer stays ahead of playback.
    pub lead_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            ring_capacity: 16_384,
            dac_address: DAC_ADDRESS,
            lead_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Expansion RAM size in KB.
    pub reu_size_kb: u32,
    pub timing: TimingPreset,
    /// Address handed to the processor as its reset vector.
    pub reset_vector: u16,
    /// Injector iterations without a handoff before the target is reset.
    pub watchdog_threshold: u32,
    pub audio: AudioConfig,
    pub timing_override: TimingOverride,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reu_size_kb: 128,
            timing: TimingPreset::default(),
            reset_vector: DEFAULT_RESET_VECTOR,
            watchdog_threshold: DEFAULT_WATCHDOG_THRESHOLD,
            audio: AudioConfig::default(),
            timing_override: TimingOverride::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reu_size_kb == 0 || self.reu_size_kb > REGION_MAX_KB {
            return Err(ConfigError::RegionSize {
                size_kb: self.reu_size_kb,
                max_kb: REGION_MAX_KB,
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.audio.ring_capacity == 0 {
            return Err(ConfigError::ZeroRingCapacity);
        }
        let lead = lead_samples(self.audio.sample_rate, self.audio.lead_ms);
        if lead >= self.audio.ring_capacity as u64 {
            return Err(ConfigError::LeadExceedsRing {
                lead,
                capacity: self.audio.ring_capacity,
            });
        }
        if self.watchdog_threshold == 0 {
            return Err(ConfigError::ZeroWatchdog);
        }
        Ok(())
    }

    /// The preset's timing with any overrides applied.
    #[must_use]
    pub fn bus_timing(&self) -> BusTiming {
        self.timing_override.apply(self.timing.timing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ControllerConfig::from_toml("").expect("defaults");
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.reset_vector, 0xFCE2);
        assert_eq!(config.audio.dac_address, 0xD418);
        assert_eq!(config.bus_timing(), BusTiming::RPI3_PLUS);
    }

    #[test]
    fn preset_and_overrides() {
        let config = ControllerConfig::from_toml(
            r#"
            reu_size_kb = 512
            timing = "rpi-zero2"

            [audio]
            sample_rate = 11025

            [timing_override]
            read_data = 400
            "#,
        )
        .expect("valid config");

        assert_eq!(config.reu_size_kb, 512);
        assert_eq!(config.audio.sample_rate, 11_025);
        assert_eq!(config.audio.lead_ms, 200);
        let timing = config.bus_timing();
        assert_eq!(timing.read_data, Ticks(400));
        assert_eq!(timing.signals, BusTiming::RPI_ZERO2.signals);
    }

    #[test]
    fn oversized_region_is_rejected() {
        assert!(matches!(
            ControllerConfig::from_toml("reu_size_kb = 32768"),
            Err(ConfigError::RegionSize { size_kb: 32768, .. })
        ));
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(
            ControllerConfig::from_toml("[audio]\nsample_rate = 0"),
            Err(ConfigError::ZeroSampleRate)
        ));
    }

    #[test]
    fn lead_longer_than_the_ring_is_rejected() {
        assert!(matches!(
            ControllerConfig::from_toml("[audio]\nring_capacity = 1024\nlead_ms = 200"),
            Err(ConfigError::LeadExceedsRing { lead: 4_410, capacity: 1_024 })
        ));
        assert!(matches!(
            ControllerConfig::from_toml("[audio]\nring_capacity = 4410"),
            Err(ConfigError::LeadExceedsRing { .. })
        ));
        assert!(ControllerConfig::from_toml("[audio]\nring_capacity = 4411").is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ControllerConfig::from_toml("reu_sise_kb = 512"),
            Err(ConfigError::Parse(_))
        ));
    }
}
