//! RAM expansion over the port.
//!
//! Once the injector has handed the machine back, the controller pulls
//! /DMA low, which stalls the 6510 and lets us drive the address bus. Each
//! byte moved is one bus transaction inside one target cycle:
//!
//! | Step  | Read                      | Write                          |
//! |-------|---------------------------|--------------------------------|
//! | 1     | latch address, R/W high   | latch address, R/W low, data   |
//! | 2     | wait until `read_data`    | drive data until `write_data`  |
//! | 3     | sample D0-D7              | R/W high (memory commits here) |
//!
//! The expansion RAM itself lives on the controller; transfers copy between
//! it and the C64 address space the way an REU 17xx does.

use std::ops::Range;

use rad_core::{
    BusLines, BusSynchronizer, ControlLine, CycleClock, Direction, Observable, Value,
};

use crate::error::ExpansionError;

/// Largest expansion the controller will allocate (16 MB).
pub const REGION_MAX_KB: u32 = 16_384;

/// Cycles to wait after asserting /DMA. The 6510 finishes a pending write
/// cycle before it releases the bus.
pub const DMA_SETTLE_CYCLES: u32 = 3;

/// Controller-side expansion RAM.
pub struct ExpansionRegion {
    data: Vec<u8>,
}

impl ExpansionRegion {
    pub fn new(size_kb: u32) -> Result<Self, ExpansionError> {
        if size_kb == 0 || size_kb > REGION_MAX_KB {
            return Err(ExpansionError::InvalidSize {
                size_kb,
                max_kb: REGION_MAX_KB,
            });
        }
        Ok(Self {
            data: vec![0; size_kb as usize * 1024],
        })
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn size_kb(&self) -> u32 {
        self.len() / 1024
    }

    fn range(&self, offset: u32, len: u32) -> Result<Range<usize>, ExpansionError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(offset as usize..end as usize),
            _ => Err(ExpansionError::OutOfRange {
                offset,
                len,
                size: self.len(),
            }),
        }
    }

    pub fn read(&self, offset: u32) -> Result<u8, ExpansionError> {
        let range = self.range(offset, 1)?;
        Ok(self.data[range.start])
    }

    pub fn write(&mut self, offset: u32, value: u8) -> Result<(), ExpansionError> {
        let range = self.range(offset, 1)?;
        self.data[range.start] = value;
        Ok(())
    }

    pub fn slice(&self, offset: u32, len: u32) -> Result<&[u8], ExpansionError> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Copy `bytes` in at `offset`.
    pub fn load(&mut self, offset: u32, bytes: &[u8]) -> Result<(), ExpansionError> {
        let len = u32::try_from(bytes.len()).map_err(|_| ExpansionError::OutOfRange {
            offset,
            len: u32::MAX,
            size: self.len(),
        })?;
        let range = self.range(offset, len)?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }
}

/// Transfer direction, numbered as in the REU command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    /// C64 memory to expansion.
    Stash,
    /// Expansion to C64 memory.
    Fetch,
    /// Exchange.
    Swap,
    /// Compare; stops at the first difference.
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub kind: TransferType,
    pub c64_address: u16,
    pub region_offset: u32,
    /// Bytes to move; 0 means 64K like the REU length register.
    pub length: u16,
    /// Keep the C64 address fixed (e.g. streaming to an I/O register).
    pub fix_c64: bool,
    pub fix_region: bool,
}

impl TransferCommand {
    #[must_use]
    pub fn new(kind: TransferType, c64_address: u16, region_offset: u32, length: u16) -> Self {
        Self {
            kind,
            c64_address,
            region_offset,
            length,
            fix_c64: false,
            fix_region: false,
        }
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        if self.length == 0 {
            0x1_0000
        } else {
            u32::from(self.length)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStatus {
    pub end_of_block: bool,
    pub verify_error: bool,
    /// Bytes processed, including a mismatching one.
    pub bytes: u32,
    pub next_c64_address: u16,
    pub next_region_offset: u32,
}

/// The expansion RAM plus the bus protocol to reach C64 memory.
pub struct ExpansionChannel {
    region: ExpansionRegion,
    attached: bool,
    reads: u64,
    writes: u64,
}

impl ExpansionChannel {
    #[must_use]
    pub fn new(region: ExpansionRegion) -> Self {
        Self {
            region,
            attached: false,
            reads: 0,
            writes: 0,
        }
    }

    #[must_use]
    pub fn region(&self) -> &ExpansionRegion {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut ExpansionRegion {
        &mut self.region
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Take the bus: /DMA low, then let the processor finish its cycle.
    pub fn attach<L: BusLines, C: CycleClock>(&mut self, sync: &mut BusSynchronizer<L, C>) {
        if self.attached {
            return;
        }
        sync.lines().set_output(ControlLine::Dma, false);
        sync.wait_cycles(DMA_SETTLE_CYCLES);
        self.attached = true;
        log::info!(
            "bus taken over, {} KB expansion available",
            self.region.size_kb()
        );
    }

    pub fn detach<L: BusLines, C: CycleClock>(&mut self, sync: &mut BusSynchronizer<L, C>) {
        if !self.attached {
            return;
        }
        let lines = sync.lines();
        lines.release_address();
        lines.release(ControlLine::ReadWrite);
        lines.release(ControlLine::Dma);
        self.attached = false;
        log::info!("bus released");
    }

    /// Anchor a transaction in the video half of a fresh cycle.
    pub fn synchronize<L: BusLines, C: CycleClock>(sync: &mut BusSynchronizer<L, C>) {
        sync.wait_for_processor_half_cycle();
        sync.wait_for_video_half_cycle();
        sync.restart_counter();
    }

    /// Read one byte of C64 memory. The caller has synchronized the cycle.
    pub fn read<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
        address: u16,
    ) -> u8 {
        let point = sync.timing().read_data;
        let lines = sync.lines();
        lines.drive_address(address);
        lines.set_output(ControlLine::ReadWrite, true);
        lines.set_data_direction(Direction::Input);
        sync.wait_until_cycle(point);
        let value = sync.lines().levels().data();

        let lines = sync.lines();
        lines.release(ControlLine::ReadWrite);
        lines.release_address();
        self.reads += 1;
        value
    }

    /// Write one byte of C64 memory. The caller has synchronized the cycle.
    pub fn write<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
        address: u16,
        value: u8,
    ) {
        let point = sync.timing().write_data;
        let lines = sync.lines();
        lines.drive_address(address);
        lines.set_output(ControlLine::ReadWrite, false);
        lines.drive_data(value);
        lines.set_data_direction(Direction::Output);
        sync.wait_until_cycle(point);

        let lines = sync.lines();
        lines.set_output(ControlLine::ReadWrite, true);
        lines.set_data_direction(Direction::Input);
        lines.release(ControlLine::ReadWrite);
        lines.release_address();
        self.writes += 1;
    }

    /// Run an REU-style transfer, one byte per target cycle.
    ///
    /// The region range is checked before the bus is touched.
    pub fn execute<L: BusLines, C: CycleClock>(
        &mut self,
        sync: &mut BusSynchronizer<L, C>,
        command: TransferCommand,
    ) -> Result<TransferStatus, ExpansionError> {
        if !self.attached {
            return Err(ExpansionError::NotAttached);
        }
        let count = command.count();
        let span = if command.fix_region { 1 } else { count };
        self.region.range(command.region_offset, span)?;

        let mut c64 = command.c64_address;
        let mut offset = command.region_offset;
        let mut verify_error = false;
        let mut bytes = 0;

        for _ in 0..count {
            let at = offset as usize;
            match command.kind {
                TransferType::Stash => {
                    Self::synchronize(sync);
                    self.region.data[at] = self.read(sync, c64);
                }
                TransferType::Fetch => {
                    Self::synchronize(sync);
                    self.write(sync, c64, self.region.data[at]);
                }
                TransferType::Swap => {
                    Self::synchronize(sync);
                    let from_c64 = self.read(sync, c64);
                    Self::synchronize(sync);
                    self.write(sync, c64, self.region.data[at]);
                    self.region.data[at] = from_c64;
                }
                TransferType::Verify => {
                    Self::synchronize(sync);
                    if self.read(sync, c64) != self.region.data[at] {
                        verify_error = true;
                    }
                }
            }
            bytes += 1;

            if !command.fix_c64 {
                c64 = c64.wrapping_add(1);
            }
            if !command.fix_region {
                offset += 1;
            }
            if verify_error {
                break;
            }
        }

        log::debug!(
            "{:?} of {bytes} bytes between {:#06X} and expansion {:#X}{}",
            command.kind,
            command.c64_address,
            command.region_offset,
            if verify_error { ", verify failed" } else { "" }
        );
        Ok(TransferStatus {
            end_of_block: true,
            verify_error,
            bytes,
            next_c64_address: c64,
            next_region_offset: offset,
        })
    }
}

impl Observable for ExpansionChannel {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "size_kb" => Some(self.region.size_kb().into()),
            "attached" => Some(self.attached.into()),
            "reads" => Some(self.reads.into()),
            "writes" => Some(self.writes.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["size_kb", "attached", "reads", "writes"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_sizes() {
        assert_eq!(ExpansionRegion::new(128).map(|r| r.len()), Ok(131_072));
        assert_eq!(
            ExpansionRegion::new(REGION_MAX_KB).map(|r| r.size_kb()),
            Ok(REGION_MAX_KB)
        );
        assert!(matches!(
            ExpansionRegion::new(REGION_MAX_KB + 1),
            Err(ExpansionError::InvalidSize { .. })
        ));
        assert!(ExpansionRegion::new(0).is_err());
    }

    #[test]
    fn region_rejects_out_of_range() {
        let mut region = ExpansionRegion::new(1).expect("1 KB");
        assert_eq!(region.write(1023, 7), Ok(()));
        assert_eq!(region.read(1023), Ok(7));
        assert_eq!(
            region.read(1024),
            Err(ExpansionError::OutOfRange {
                offset: 1024,
                len: 1,
                size: 1024
            })
        );
        assert!(region.slice(1000, 25).is_err());
        assert!(region.load(u32::MAX, &[1]).is_err());
    }

    #[test]
    fn zero_length_means_64k() {
        let command = TransferCommand::new(TransferType::Stash, 0, 0, 0);
        assert_eq!(command.count(), 0x1_0000);
    }
}
