//! SM83 core: opcode table, decoder, executor and the [`CPU`] driver tying
//! them to a [`MemoryBus`].
use crate::clock::{CycleCounter, CYCLES_PER_FRAME};
use crate::interrupts;
use crate::mmu::{BusError, MemoryBus};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

pub mod decode;
pub mod exec;
pub mod opcodes;
pub mod registers;

pub use decode::{fetch_and_decode, Decoded};
pub use exec::{execute, Effect, ExecError, Execution};
pub use opcodes::{table, InstructionDescriptor, OpcodeKey, OpcodeTable, TableError};
pub use registers::{Flags, Registers};

/// T-cycles spent dispatching an interrupt.
const INTERRUPT_DISPATCH_CYCLES: u32 = 20;
/// T-cycles charged per step while halted or stopped.
const IDLE_CYCLES: u32 = 4;

#[derive(Debug, Error)]
pub enum CpuError {
    #[error("Illegal opcode {opcode:#04X} (prefixed: {prefixed}) at PC {pc:#06X}")]
    IllegalOpcode {
        opcode: u8,
        prefixed: bool,
        pc: u16,
    },
    #[error("Opcode {key} has operands the executor cannot apply (PC {pc:#06X})")]
    InvalidOperands { key: OpcodeKey, pc: u16 },
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

#[derive(Debug)]
pub struct CPU {
    pub regs: Registers,
    /// Interrupt master enable.
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    /// Set by EI; IME turns on once the following instruction completes.
    ime_pending: bool,
    clock: CycleCounter,
    table: &'static OpcodeTable,
}

impl CPU {
    /// CPU with zeroed registers over the built-in opcode table.
    #[instrument(level = "debug")]
    pub fn new() -> Result<Self, TableError> {
        let table = opcodes::table()?;
        Ok(Self::with_table(table))
    }

    pub const fn with_table(table: &'static OpcodeTable) -> Self {
        Self {
            regs: Registers {
                a: 0,
                f: Flags::empty(),
                b: 0,
                c: 0,
                d: 0,
                e: 0,
                h: 0,
                l: 0,
                sp: 0,
                pc: 0,
            },
            ime: false,
            halted: false,
            stopped: false,
            ime_pending: false,
            clock: CycleCounter::new(),
            table,
        }
    }

    /// CPU in the state the boot ROM hands over to a cartridge at `0x0100`.
    pub fn post_boot() -> Result<Self, TableError> {
        let mut cpu = Self::new()?;
        cpu.regs = Registers::post_boot();
        Ok(cpu)
    }

    /// Back to post-boot registers with a cleared counter and interrupt state.
    pub fn reset(&mut self) {
        self.regs = Registers::post_boot();
        self.ime = false;
        self.ime_pending = false;
        self.halted = false;
        self.stopped = false;
        self.clock.reset();
        debug!(regs = %self.regs, "CPU reset");
    }

    pub const fn clock(&self) -> &CycleCounter {
        &self.clock
    }

    pub const fn table(&self) -> &'static OpcodeTable {
        self.table
    }

    /// Runs one instruction, interrupt dispatch, or idle slot and returns its T-cycles.
    ///
    /// A failed instruction (illegal opcode or rejected bus write) leaves
    /// registers, PC, pending EI and the cycle counter as they were.
    pub fn step(&mut self, bus: &mut dyn MemoryBus) -> Result<u32, CpuError> {
        if self.stopped {
            self.clock.add(IDLE_CYCLES);
            return Ok(IDLE_CYCLES);
        }

        let pending = interrupts::pending(bus);
        if !pending.is_empty() {
            self.halted = false;
            if self.ime {
                return self.dispatch_interrupt(bus, pending);
            }
        }
        if self.halted {
            self.clock.add(IDLE_CYCLES);
            return Ok(IDLE_CYCLES);
        }

        let pc = self.regs.pc;
        let decoded = fetch_and_decode(self.table, bus, pc);
        let desc = decoded.descriptor;
        if desc.is_illegal() {
            warn!(
                opcode = format_args!("{:#04X}", desc.code),
                prefixed = desc.prefixed,
                pc = format_args!("{pc:#06X}"),
                "Illegal opcode"
            );
            return Err(CpuError::IllegalOpcode {
                opcode: desc.code,
                prefixed: desc.prefixed,
                pc,
            });
        }

        self.regs.pc = decoded.next_pc;
        let execution = match execute(desc, &mut self.regs, bus) {
            Ok(execution) => execution,
            Err(err) => {
                self.regs.pc = pc;
                return Err(match err {
                    ExecError::IllegalOpcode(key) => CpuError::IllegalOpcode {
                        opcode: key.code,
                        prefixed: key.prefixed,
                        pc,
                    },
                    ExecError::InvalidOperands(key) => CpuError::InvalidOperands { key, pc },
                    ExecError::Bus(err) => CpuError::Bus(err),
                });
            }
        };

        if std::mem::take(&mut self.ime_pending) {
            self.ime = true;
        }
        match execution.effect {
            Some(Effect::Halt) => self.halted = true,
            Some(Effect::Stop) => self.stopped = true,
            Some(Effect::DisableInterrupts) => {
                self.ime = false;
                self.ime_pending = false;
            }
            Some(Effect::EnableInterrupts) => self.ime_pending = true,
            Some(Effect::ReturnFromInterrupt) => self.ime = true,
            None => {}
        }

        trace!(
            pc = format_args!("{pc:#06X}"),
            instr = %desc,
            cycles = execution.cycles,
            regs = %self.regs,
            "Executed"
        );
        self.clock.add(execution.cycles);
        Ok(execution.cycles)
    }

    /// Steps until at least one frame's worth of cycles has run.
    pub fn run_frame(&mut self, bus: &mut dyn MemoryBus) -> Result<u32, CpuError> {
        let mut elapsed = 0;
        while elapsed < CYCLES_PER_FRAME {
            elapsed += self.step(bus)?;
        }
        Ok(elapsed)
    }

    fn dispatch_interrupt(
        &mut self,
        bus: &mut dyn MemoryBus,
        pending: interrupts::InterruptFlags,
    ) -> Result<u32, CpuError> {
        let (Some(line), Some(vector)) = (pending.highest_priority(), pending.vector()) else {
            return Ok(0);
        };
        let sp = self.regs.sp.wrapping_sub(2);
        bus.write_word(sp, self.regs.pc)?;
        interrupts::acknowledge(bus, line)?;
        self.regs.sp = sp;
        self.ime = false;
        self.ime_pending = false;
        trace!(?line, vector = format_args!("{vector:#06X}"), "Interrupt dispatch");
        self.regs.pc = vector;

        self.clock.add(INTERRUPT_DISPATCH_CYCLES);
        Ok(INTERRUPT_DISPATCH_CYCLES)
    }
}

#[cfg(test)]
mod tests;
