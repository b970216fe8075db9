//! Instruction execution.
//!
//! [`execute`] applies one decoded instruction to the register file and
//! memory. It owns no state: everything the CPU driver must do beyond
//! registers and memory (halting, IME changes) comes back as an [`Effect`].
use crate::cpu::opcodes::{InstructionDescriptor, Mnemonic, OpcodeKey, Operand};
use crate::cpu::registers::{Reg8, Registers};
use crate::mmu::{BusError, MemoryBus};
use thiserror::Error;

mod alu;
mod cb;
mod jump;
mod load_store;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Illegal opcode {0}")]
    IllegalOpcode(OpcodeKey),
    #[error("Opcode {0} has operands the executor cannot apply")]
    InvalidOperands(OpcodeKey),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// CPU-level side effects the register file cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Halt,
    Stop,
    DisableInterrupts,
    /// IME is set after the instruction following EI.
    EnableInterrupts,
    /// RETI: IME is set immediately.
    ReturnFromInterrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub cycles: u32,
    pub effect: Option<Effect>,
}

/// Where an 8-bit operand lives once its immediates and pointer side effects
/// have been resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Location {
    Reg(Reg8),
    Mem(u16),
    Value(u8),
}

pub(crate) struct Exec<'a> {
    regs: &'a mut Registers,
    bus: &'a mut dyn MemoryBus,
    key: OpcodeKey,
    touched_memory: bool,
    effect: Option<Effect>,
}

/// Executes `desc` with PC already pointing past its opcode bytes.
///
/// Two-valued cycle costs resolve to `taken` when the instruction's condition
/// held; instructions without a condition operand count a data memory access
/// as the condition. Illegal descriptors are rejected before anything is
/// touched. On any error the register file is restored to its state on
/// entry; bytes already written to the bus stay written.
pub fn execute(
    desc: &InstructionDescriptor,
    regs: &mut Registers,
    bus: &mut dyn MemoryBus,
) -> Result<Execution, ExecError> {
    let key = OpcodeKey {
        code: desc.code,
        prefixed: desc.prefixed,
    };
    if desc.is_illegal() {
        return Err(ExecError::IllegalOpcode(key));
    }

    let saved = *regs;
    let mut exec = Exec {
        regs,
        bus,
        key,
        touched_memory: false,
        effect: None,
    };
    match exec.dispatch(desc.mnemonic, &desc.operands) {
        Ok(branch) => {
            let condition = branch.unwrap_or(exec.touched_memory);
            Ok(Execution {
                cycles: desc.cycles.resolve(condition),
                effect: exec.effect,
            })
        }
        Err(err) => {
            *exec.regs = saved;
            Err(err)
        }
    }
}

impl Exec<'_> {
    /// Returns whether a branch was taken, for branch instructions.
    fn dispatch(&mut self, mnemonic: Mnemonic, ops: &[Operand]) -> Result<Option<bool>, ExecError> {
        use Mnemonic as M;

        match mnemonic {
            M::Nop | M::Prefix => {}
            M::Ld | M::Ldh => self.exec_load(ops)?,
            M::Push => self.exec_push(ops)?,
            M::Pop => self.exec_pop(ops)?,
            M::Inc | M::Dec => self.exec_inc_dec(mnemonic, ops)?,
            M::Add | M::Adc | M::Sub | M::Sbc | M::And | M::Xor | M::Or | M::Cp => {
                self.exec_alu(mnemonic, ops)?;
            }
            M::Daa | M::Cpl | M::Scf | M::Ccf => self.exec_accumulator_misc(mnemonic),
            M::Rlca | M::Rrca | M::Rla | M::Rra => self.exec_rotate_accumulator(mnemonic),
            M::Rlc | M::Rrc | M::Rl | M::Rr | M::Sla | M::Sra | M::Swap | M::Srl => {
                self.exec_shift(mnemonic, ops)?;
            }
            M::Bit => self.exec_bit(ops)?,
            M::Res | M::Set => self.exec_res_set(mnemonic == M::Set, ops)?,
            M::Jr => return self.exec_jr(ops).map(Some),
            M::Jp => return self.exec_jp(ops).map(Some),
            M::Call => return self.exec_call(ops).map(Some),
            M::Ret => return self.exec_ret(ops).map(Some),
            M::Reti => {
                self.exec_reti();
                self.effect = Some(Effect::ReturnFromInterrupt);
                return Ok(Some(true));
            }
            M::Rst => self.exec_rst(ops)?,
            M::Halt => self.effect = Some(Effect::Halt),
            M::Stop => {
                // STOP is followed by a padding byte.
                if ops == [Operand::Imm8] {
                    self.fetch8();
                }
                self.effect = Some(Effect::Stop);
            }
            M::Di => self.effect = Some(Effect::DisableInterrupts),
            M::Ei => self.effect = Some(Effect::EnableInterrupts),
            M::Illegal => return Err(ExecError::IllegalOpcode(self.key)),
        }
        Ok(None)
    }

    const fn invalid_operands(&self) -> ExecError {
        ExecError::InvalidOperands(self.key)
    }

    fn fetch8(&mut self) -> u8 {
        let value = self.bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch16(&mut self) -> u16 {
        let lo = self.fetch8();
        let hi = self.fetch8();
        u16::from_le_bytes([lo, hi])
    }

    /// Resolves an 8-bit operand, consuming immediates and applying `[HL±]` steps.
    fn locate(&mut self, op: Operand) -> Result<Location, ExecError> {
        Ok(match op {
            Operand::Reg8(reg) => Location::Reg(reg),
            Operand::Indirect(reg) => Location::Mem(self.regs.get16(reg)),
            Operand::IndirectIncrement => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                Location::Mem(hl)
            }
            Operand::IndirectDecrement => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                Location::Mem(hl)
            }
            Operand::HighC => Location::Mem(0xFF00 | u16::from(self.regs.c)),
            Operand::HighImm8 => {
                let offset = self.fetch8();
                Location::Mem(0xFF00 | u16::from(offset))
            }
            Operand::IndirectImm16 => Location::Mem(self.fetch16()),
            Operand::Imm8 => Location::Value(self.fetch8()),
            _ => return Err(self.invalid_operands()),
        })
    }

    fn load(&mut self, loc: Location) -> u8 {
        match loc {
            Location::Reg(reg) => self.regs.get(reg),
            Location::Mem(addr) => {
                self.touched_memory = true;
                self.bus.read(addr)
            }
            Location::Value(value) => value,
        }
    }

    fn store(&mut self, loc: Location, value: u8) -> Result<(), ExecError> {
        match loc {
            Location::Reg(reg) => self.regs.set(reg, value),
            Location::Mem(addr) => {
                self.touched_memory = true;
                self.bus.write(addr, value)?;
            }
            Location::Value(_) => return Err(self.invalid_operands()),
        }
        Ok(())
    }

    fn push(&mut self, value: u16) -> Result<(), ExecError> {
        let [lo, hi] = value.to_le_bytes();
        self.touched_memory = true;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.bus.write(self.regs.sp, hi)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.bus.write(self.regs.sp, lo)?;
        Ok(())
    }

    fn pop(&mut self) -> u16 {
        self.touched_memory = true;
        let lo = self.bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }
}
