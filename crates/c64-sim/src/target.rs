//! Processor behaviour as seen on the bus.

/// One processor bus access per target cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The processor does not use the bus this cycle.
    Idle,
    Read(u16),
    Write(u16, u8),
}

impl Access {
    #[must_use]
    pub const fn address(self) -> Option<u16> {
        match self {
            Access::Idle => None,
            Access::Read(address) | Access::Write(address, _) => Some(address),
        }
    }

    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Access::Read(_))
    }
}

/// Supplies the processor's accesses.
///
/// `cycle` counts the cycles the processor actually ran since reset was
/// released; cycles stolen by DMA do not advance it.
pub trait TargetModel {
    fn access(&mut self, cycle: u64) -> Access;

    /// The processor latched `value` at the end of a read of `address`.
    fn latched(&mut self, _address: u16, _value: u8) {}

    /// /RESET was released.
    fn reset(&mut self) {}
}

/// Plays back a fixed list of accesses after every reset, then idles.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTarget {
    script: Vec<Access>,
}

impl ScriptedTarget {
    #[must_use]
    pub fn new(script: Vec<Access>) -> Self {
        Self { script }
    }

    /// A processor that never touches the bus.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Reads of `addresses`, one per cycle, each preceded by `gap` idle
    /// cycles.
    #[must_use]
    pub fn reads(addresses: &[u16], gap: usize) -> Self {
        let mut script = Vec::with_capacity(addresses.len() * (gap + 1));
        for &address in addresses {
            script.extend(std::iter::repeat_n(Access::Idle, gap));
            script.push(Access::Read(address));
        }
        Self { script }
    }
}

impl TargetModel for ScriptedTarget {
    fn access(&mut self, cycle: u64) -> Access {
        usize::try_from(cycle)
            .ok()
            .and_then(|i| self.script.get(i).copied())
            .unwrap_or(Access::Idle)
    }
}

/// A 6510 coming out of reset: a few internal cycles, the vector fetch
/// from `$FFFC/$FFFD`, then opcode fetches from wherever the vector points.
///
/// The first `stalled_boots` boots hang before the vector fetch, which is
/// what a marginal reset looks like from the port.
#[derive(Debug, Clone)]
pub struct BootingTarget {
    boot_delay: u64,
    stalled_boots: u32,
    boots: u32,
    vector_low: Option<u8>,
    vector: Option<u16>,
}

impl BootingTarget {
    /// Internal cycles between reset release and the vector fetch.
    pub const BOOT_DELAY: u64 = 7;

    #[must_use]
    pub fn new() -> Self {
        Self::stalling(0)
    }

    #[must_use]
    pub fn stalling(stalled_boots: u32) -> Self {
        Self {
            boot_delay: Self::BOOT_DELAY,
            stalled_boots,
            boots: 0,
            vector_low: None,
            vector: None,
        }
    }

    /// The vector fetched during the current boot, once both halves are in.
    #[must_use]
    pub fn vector(&self) -> Option<u16> {
        self.vector
    }

    #[must_use]
    pub fn boots(&self) -> u32 {
        self.boots
    }
}

impl Default for BootingTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetModel for BootingTarget {
    fn access(&mut self, cycle: u64) -> Access {
        if self.boots <= self.stalled_boots {
            return Access::Idle;
        }
        match cycle.checked_sub(self.boot_delay) {
            None => Access::Idle,
            Some(0) => Access::Read(0xFFFC),
            Some(1) => Access::Read(0xFFFD),
            Some(n) => match self.vector {
                Some(pc) => Access::Read(pc.wrapping_add((n - 2) as u16)),
                None => Access::Idle,
            },
        }
    }

    fn latched(&mut self, address: u16, value: u8) {
        match address {
            0xFFFC => self.vector_low = Some(value),
            0xFFFD => {
                if let Some(low) = self.vector_low {
                    self.vector = Some(u16::from(value) << 8 | u16::from(low));
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.boots += 1;
        self.vector_low = None;
        self.vector = None;
    }
}
