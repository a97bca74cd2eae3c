//! The SID volume register as an 8-bit DAC.
//!
//! Writing $D418 steps the SID's output offset, so a stream of volume
//! writes plays back as a sample. Only the low nibble is volume; the high
//! nibble selects filter modes, which some measured tables use to squeeze
//! out more than 16 distinct levels.

use std::fs;
use std::path::Path;

use crate::error::SoundError;

/// SID mode/volume register.
pub const DAC_ADDRESS: u16 = 0xD418;

/// Lookup from a linear unsigned 8-bit sample to a $D418 value.
#[derive(Clone, PartialEq, Eq)]
pub struct DacTable {
    entries: [u8; 256],
}

impl DacTable {
    /// Sample scaled onto volume 0-15, filters off.
    #[must_use]
    pub fn linear() -> Self {
        let mut entries = [0; 256];
        for (sample, entry) in entries.iter_mut().enumerate() {
            *entry = ((sample * 15 + 127) / 255) as u8;
        }
        Self { entries }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SoundError> {
        let entries = bytes
            .try_into()
            .map_err(|_| SoundError::TableSize(bytes.len()))?;
        Ok(Self { entries })
    }

    /// Load a measured table (256 raw bytes).
    pub fn load(path: &Path) -> Result<Self, SoundError> {
        let table = Self::from_bytes(&fs::read(path)?)?;
        log::info!("DAC table loaded from {}", path.display());
        Ok(table)
    }

    #[must_use]
    pub fn map(&self, sample: u8) -> u8 {
        self.entries[usize::from(sample)]
    }
}

impl Default for DacTable {
    fn default() -> Self {
        Self::linear()
    }
}

impl std::fmt::Debug for DacTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DacTable")
            .field("min", &self.entries[0])
            .field("max", &self.entries[255])
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_table_spans_volume_range() {
        let table = DacTable::linear();
        assert_eq!(table.map(0), 0);
        assert_eq!(table.map(128), 8);
        assert_eq!(table.map(255), 15);
        assert!((0..255).all(|s| table.map(s) <= table.map(s + 1)));
    }

    #[test]
    fn measured_table_must_be_complete() {
        let bytes: Vec<u8> = (0..=255).rev().collect();
        let table = DacTable::from_bytes(&bytes).expect("256 entries");
        assert_eq!(table.map(0), 255);
        assert!(matches!(
            DacTable::from_bytes(&bytes[..100]),
            Err(SoundError::TableSize(100))
        ));
    }
}
