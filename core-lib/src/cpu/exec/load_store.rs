//! Loads, stores and stack transfers.
use super::alu::sp_plus_signed;
use super::{Exec, ExecError};
use crate::cpu::opcodes::Operand;
use crate::cpu::registers::Reg16;

impl Exec<'_> {
    /// LD and LDH in all their forms.
    pub(super) fn exec_load(&mut self, ops: &[Operand]) -> Result<(), ExecError> {
        match *ops {
            [Operand::Reg16(reg), Operand::Imm16] => {
                let value = self.fetch16();
                self.regs.set16(reg, value);
            }
            [Operand::IndirectImm16, Operand::Reg16(Reg16::SP)] => {
                let addr = self.fetch16();
                let [lo, hi] = self.regs.sp.to_le_bytes();
                self.touched_memory = true;
                self.bus.write(addr, lo)?;
                self.bus.write(addr.wrapping_add(1), hi)?;
            }
            [Operand::Reg16(Reg16::SP), Operand::Reg16(Reg16::HL)] => {
                self.regs.sp = self.regs.hl();
            }
            [Operand::Reg16(Reg16::HL), Operand::Reg16(Reg16::SP), Operand::SignedImm8] => {
                let offset = self.fetch8() as i8;
                let value = sp_plus_signed(self.regs, offset);
                self.regs.set_hl(value);
            }
            [dst, src] => {
                // Immediates follow the opcode in operand order.
                let dst = self.locate(dst)?;
                let src = self.locate(src)?;
                let value = self.load(src);
                self.store(dst, value)?;
            }
            _ => return Err(self.invalid_operands()),
        }
        Ok(())
    }

    pub(super) fn exec_push(&mut self, ops: &[Operand]) -> Result<(), ExecError> {
        let [Operand::Reg16(reg)] = *ops else {
            return Err(self.invalid_operands());
        };
        let value = self.regs.get16(reg);
        self.push(value)
    }

    pub(super) fn exec_pop(&mut self, ops: &[Operand]) -> Result<(), ExecError> {
        let [Operand::Reg16(reg)] = *ops else {
            return Err(self.invalid_operands());
        };
        let value = self.pop();
        // AF goes through set16, which masks the low nibble of F.
        self.regs.set16(reg, value);
        Ok(())
    }
}
