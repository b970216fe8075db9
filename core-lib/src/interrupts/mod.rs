//! Interrupt request lines as seen through the memory bus.
//!
//! IE (`0xFFFF`) and IF (`0xFF0F`) live in memory, so the core reads them with
//! the same [`MemoryBus`] it executes against. Whatever sits behind the bus
//! (timer, PPU, joypad) raises requests by setting IF bits.
use crate::mmu::{BusError, MemoryBus};
use bitflags::bitflags;

/// Interrupt Enable register address
pub const IE_ADDR: u16 = 0xFFFF;
/// Interrupt Flag register address
pub const IF_ADDR: u16 = 0xFF0F;

bitflags! {
    /// Bit layout shared by IE and IF
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptFlags: u8 {
        const VBLANK   = 0b0000_0001;
        const LCD_STAT = 0b0000_0010;
        const TIMER    = 0b0000_0100;
        const SERIAL   = 0b0000_1000;
        const JOYPAD   = 0b0001_0000;
    }
}

impl InterruptFlags {
    /// Highest-priority line in the set (lowest bit wins).
    #[must_use]
    pub fn highest_priority(self) -> Option<Self> {
        let bits = self.bits();
        if bits == 0 {
            None
        } else {
            Some(Self::from_bits_truncate(bits & bits.wrapping_neg()))
        }
    }

    /// Vector address for a single-line set. Multi-line sets use their highest-priority line.
    #[must_use]
    pub fn vector(self) -> Option<u16> {
        self.highest_priority()
            .map(|line| 0x0040 + 8 * line.bits().trailing_zeros() as u16)
    }
}

/// Enabled and requested interrupts, regardless of IME.
pub fn pending(bus: &dyn MemoryBus) -> InterruptFlags {
    InterruptFlags::from_bits_truncate(bus.read(IE_ADDR))
        & InterruptFlags::from_bits_truncate(bus.read(IF_ADDR))
}

/// Set a request bit in IF.
pub fn request(bus: &mut dyn MemoryBus, line: InterruptFlags) -> Result<(), BusError> {
    let current = bus.read(IF_ADDR);
    bus.write(IF_ADDR, current | line.bits())
}

/// Clear an acknowledged request bit in IF.
pub fn acknowledge(bus: &mut dyn MemoryBus, line: InterruptFlags) -> Result<(), BusError> {
    let current = bus.read(IF_ADDR);
    bus.write(IF_ADDR, current & !line.bits())
}
