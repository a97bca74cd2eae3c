//! RAD expansion personality for a C64/C128.
//!
//! At power-on the controller poses as an ultimax cartridge just long
//! enough to hand the processor its own reset vector, then takes the bus
//! with /DMA and acts as a RAM expansion unit. The SID volume register
//! doubles as an 8-bit DAC, fed from a ring buffer by a periodic player.
//!
//! Everything talks to the port through [`rad_core::BusSynchronizer`], so
//! the same code runs against GPIO registers or the `c64-sim` model.

pub mod assets;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod gpio;
pub mod player;
pub mod reu;
pub mod scheduler;
pub mod sid;
pub mod sound;
pub mod wave;

pub use assets::{AssetCatalog, GameEngine};
pub use cartridge::{CartridgeInjector, InjectionReport, InjectionState, InjectorEvent};
pub use config::{AudioConfig, ControllerConfig, TimingOverride, TimingPreset};
pub use controller::Controller;
pub use error::{ConfigError, ControllerError, ExpansionError, SoundError};
pub use player::SamplePlayer;
pub use reu::{ExpansionChannel, ExpansionRegion, TransferCommand, TransferStatus, TransferType};
pub use scheduler::{Scheduler, TaskId};
pub use sid::DacTable;
pub use sound::{Fade, SampleProducer, SoundRingBuffer, lead_samples, sample_index};
