//! Instruction fetch and decode.
//!
//! Decoding only reads memory; advancing PC is left to the caller.
use super::opcodes::{InstructionDescriptor, OpcodeTable, PREFIX_BYTE};
use crate::mmu::MemoryBus;

/// Result of decoding the instruction at some address.
#[derive(Debug, Clone, Copy)]
pub struct Decoded<'t> {
    pub descriptor: &'t InstructionDescriptor,
    /// Opcode bytes read: 1, or 2 for the prefixed encoding. Immediates are not included.
    pub bytes_consumed: u8,
    /// Address of the first byte after the opcode (where immediates start).
    pub next_pc: u16,
}

/// Reads the opcode at `pc`, following the `0xCB` prefix to the extended table.
pub fn fetch_and_decode<'t>(table: &'t OpcodeTable, bus: &dyn MemoryBus, pc: u16) -> Decoded<'t> {
    let opcode = bus.read(pc);
    let (descriptor, bytes_consumed) = if opcode == PREFIX_BYTE {
        (table.lookup(bus.read(pc.wrapping_add(1)), true), 2)
    } else {
        (table.lookup(opcode, false), 1)
    };
    Decoded {
        descriptor,
        bytes_consumed,
        next_pc: pc.wrapping_add(u16::from(bytes_consumed)),
    }
}
