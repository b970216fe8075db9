//! Cycle accounting shared with whatever the core is synchronised against.

/// CPU clock in T-cycles per second (4.194304 MHz).
pub const CPU_FREQUENCY: u32 = 4_194_304;

/// T-cycles in one ~59.7 Hz video frame, as the run loop budgets them.
pub const CYCLES_PER_FRAME: u32 = CPU_FREQUENCY / 60;

/// Running total of T-cycles spent by executed instructions.
///
/// The total wraps modulo 2^64. Consumers that need deltas should compare with
/// `wrapping_sub`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    total: u64,
    instructions: u64,
}

impl CycleCounter {
    pub const fn new() -> Self {
        Self {
            total: 0,
            instructions: 0,
        }
    }

    /// Accounts one executed instruction (or interrupt dispatch / halt idle) costing `cycles`.
    pub fn add(&mut self, cycles: u32) {
        self.total = self.total.wrapping_add(u64::from(cycles));
        self.instructions = self.instructions.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    pub const fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Cycles elapsed since an earlier reading of [`Self::total`].
    pub const fn since(&self, earlier: u64) -> u64 {
        self.total.wrapping_sub(earlier)
    }
}
