//! Jumps, calls, returns and restarts.
//!
//! Each branch reports whether its condition held so the caller can pick the
//! taken or not-taken cycle count. Unconditional forms always count as taken.
use super::{Exec, ExecError};
use crate::cpu::opcodes::Operand;
use crate::cpu::registers::Reg16;

impl Exec<'_> {
    /// Splits an optional leading condition off the operand list.
    fn condition<'o>(&self, ops: &'o [Operand]) -> (bool, &'o [Operand]) {
        match ops {
            [Operand::Condition(cc), rest @ ..] => (cc.holds(self.regs), rest),
            rest => (true, rest),
        }
    }

    pub(super) fn exec_jr(&mut self, ops: &[Operand]) -> Result<bool, ExecError> {
        let (taken, rest) = self.condition(ops);
        if rest != [Operand::SignedImm8] {
            return Err(self.invalid_operands());
        }
        // The offset byte is consumed whether or not the jump happens.
        let offset = self.fetch8() as i8;
        if taken {
            self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(offset));
        }
        Ok(taken)
    }

    pub(super) fn exec_jp(&mut self, ops: &[Operand]) -> Result<bool, ExecError> {
        if ops == [Operand::Reg16(Reg16::HL)] {
            self.regs.pc = self.regs.hl();
            return Ok(true);
        }
        let (taken, rest) = self.condition(ops);
        if rest != [Operand::Imm16] {
            return Err(self.invalid_operands());
        }
        let target = self.fetch16();
        if taken {
            self.regs.pc = target;
        }
        Ok(taken)
    }

    pub(super) fn exec_call(&mut self, ops: &[Operand]) -> Result<bool, ExecError> {
        let (taken, rest) = self.condition(ops);
        if rest != [Operand::Imm16] {
            return Err(self.invalid_operands());
        }
        let target = self.fetch16();
        if taken {
            let ret = self.regs.pc;
            self.push(ret)?;
            self.regs.pc = target;
        }
        Ok(taken)
    }

    pub(super) fn exec_ret(&mut self, ops: &[Operand]) -> Result<bool, ExecError> {
        let (taken, rest) = self.condition(ops);
        if !rest.is_empty() {
            return Err(self.invalid_operands());
        }
        if taken {
            self.regs.pc = self.pop();
        }
        Ok(taken)
    }

    pub(super) fn exec_reti(&mut self) {
        self.regs.pc = self.pop();
    }

    pub(super) fn exec_rst(&mut self, ops: &[Operand]) -> Result<(), ExecError> {
        let [Operand::Vector(vector)] = *ops else {
            return Err(self.invalid_operands());
        };
        let ret = self.regs.pc;
        self.push(ret)?;
        self.regs.pc = vector;
        Ok(())
    }
}
