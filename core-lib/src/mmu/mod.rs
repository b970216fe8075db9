//! Memory interface consumed by the CPU core.
//!
//! The core only ever talks to a [`MemoryBus`]; address routing (ROM, RAM,
//! memory-mapped I/O) is the implementor's business. [`FlatMemory`] is a plain
//! 64 KiB address space with an optional read-only ROM window, enough to run
//! programs and boot ROMs without any peripherals attached.
use thiserror::Error;
use tracing::debug;

/// Size of the SM83 address space.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Errors a memory collaborator may report for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Write to read-only memory at address: {0:#06X}")]
    ReadOnly(u16),
}

/// Memory Bus trait for memory access operations
pub trait MemoryBus {
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory
    ///
    /// # Errors
    /// Returns an error if the implementor refuses the write.
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;

    /// Read a 16-bit value from memory in little-endian format
    fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    /// Write a 16-bit value to memory in little-endian format
    fn write_word(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo)?;
        self.write(addr.wrapping_add(1), hi)
    }
}

/// Flat 64 KiB memory with an optional write-protected region at `0x0000`.
pub struct FlatMemory {
    bytes: Box<[u8; ADDRESS_SPACE]>,
    rom_len: usize,
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; ADDRESS_SPACE]),
            rom_len: 0,
        }
    }

    /// Creates memory whose first `rom.len()` bytes hold `rom` and reject writes.
    ///
    /// ROM images longer than the address space are truncated.
    pub fn with_rom(rom: &[u8]) -> Self {
        let mut mem = Self::new();
        let len = rom.len().min(ADDRESS_SPACE);
        mem.bytes[..len].copy_from_slice(&rom[..len]);
        mem.rom_len = len;
        debug!(rom_len = len, "Mapped read-only ROM");
        mem
    }

    /// Copies a boot ROM image to address `0x0000`, returning the byte count loaded.
    ///
    /// The boot image overlays any existing contents and stays writable.
    pub fn load_boot_rom(&mut self, image: &[u8]) -> usize {
        let len = image.len().min(ADDRESS_SPACE);
        self.bytes[..len].copy_from_slice(&image[..len]);
        debug!(len, "Loaded boot ROM");
        len
    }

    /// Places `program` at `origin`, bypassing ROM protection. Wraps at the top of memory.
    pub fn load(&mut self, origin: u16, program: &[u8]) {
        let mut addr = origin;
        for &byte in program {
            self.bytes[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    pub const fn rom_len(&self) -> usize {
        self.rom_len
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u16) -> u8 {
        self.bytes[usize::from(addr)]
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        if usize::from(addr) < self.rom_len {
            return Err(BusError::ReadOnly(addr));
        }
        self.bytes[usize::from(addr)] = value;
        Ok(())
    }
}
