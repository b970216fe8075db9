//! Table-driven SM83 (Game Boy CPU) decode and execute core.
//!
//! The instruction set lives in a JSON opcode table embedded at build time and
//! resolved once into typed descriptors ([`cpu::opcodes`]). [`CPU::step`]
//! decodes from a [`MemoryBus`], executes, and accounts cycles.
pub mod clock;
pub mod cpu;
pub mod interrupts;
pub mod mmu;

// Re-export common types
pub use clock::{CycleCounter, CPU_FREQUENCY, CYCLES_PER_FRAME};
pub use cpu::{CpuError, Registers, CPU};
pub use interrupts::InterruptFlags;
pub use mmu::{BusError, FlatMemory, MemoryBus};
