//! Error types.
//!
//! Protocol stalls are not errors: the injector's watchdog resets the
//! target and carries on. What lands here is misconfiguration, unreadable
//! input files, or a target that is not there at all.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("expansion size {size_kb} KB is outside 1..={max_kb} KB")]
    RegionSize { size_kb: u32, max_kb: u32 },
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("sound ring buffer capacity must be non-zero")]
    ZeroRingCapacity,
    #[error("watchdog threshold must be non-zero")]
    ZeroWatchdog,
    #[error("producer lead of {lead} samples does not fit a {capacity}-sample ring")]
    LeadExceedsRing { lead: u64, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    #[error("expansion size {size_kb} KB is outside 1..={max_kb} KB")]
    InvalidSize { size_kb: u32, max_kb: u32 },
    #[error("range {offset:#X}+{len} exceeds expansion size {size:#X}")]
    OutOfRange { offset: u32, len: u32, size: u32 },
    #[error("bus not taken over; attach the channel first")]
    NotAttached,
}

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("sample source is empty")]
    EmptySource,
    #[error("sample rate must be non-zero")]
    ZeroRate,
    #[error("ring buffer capacity must be non-zero")]
    ZeroCapacity,
    #[error("producer lead of {lead} samples does not fit a {capacity}-sample ring")]
    LeadExceedsRing { lead: u64, capacity: usize },
    #[error("DAC table needs 256 entries, got {0}")]
    TableSize(usize),
    #[error("unsupported WAV format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Wav(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no PHI2 activity on the expansion port; is the target powered?")]
    TargetNotRunning,
    #[error("several game data files found, pick one of: {}", .0.join(", "))]
    AssetChoiceRequired(Vec<String>),
    #[error("game data file {0} not found")]
    UnknownAsset(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Sound(#[from] SoundError),
}
