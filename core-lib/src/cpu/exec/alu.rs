//! Arithmetic and logic.
//!
//! The free functions hold the flag arithmetic; [`Exec`] methods wire them to
//! operands.
use super::{Exec, ExecError};
use crate::cpu::opcodes::{Mnemonic, Operand};
use crate::cpu::registers::{Flags, Reg16, Reg8, Registers};

/// A <- A + value (+ carry). Z, H and C from the result, N cleared.
pub(crate) fn add8(regs: &mut Registers, value: u8, carry_in: bool) {
    let a = regs.a;
    let c = u8::from(carry_in);
    let result = a.wrapping_add(value).wrapping_add(c);
    let half = (a & 0x0F) + (value & 0x0F) + c > 0x0F;
    let carry = u16::from(a) + u16::from(value) + u16::from(c) > 0xFF;
    regs.a = result;
    regs.f = Flags::from_parts(result == 0, false, half, carry);
}

/// A - value (- carry), stored back only when `store` (CP discards it).
pub(crate) fn sub8(regs: &mut Registers, value: u8, carry_in: bool, store: bool) {
    let a = regs.a;
    let c = u8::from(carry_in);
    let result = a.wrapping_sub(value).wrapping_sub(c);
    let half = (a & 0x0F) < (value & 0x0F) + c;
    let carry = u16::from(a) < u16::from(value) + u16::from(c);
    if store {
        regs.a = result;
    }
    regs.f = Flags::from_parts(result == 0, true, half, carry);
}

pub(crate) fn and8(regs: &mut Registers, value: u8) {
    regs.a &= value;
    regs.f = Flags::from_parts(regs.a == 0, false, true, false);
}

pub(crate) fn xor8(regs: &mut Registers, value: u8) {
    regs.a ^= value;
    regs.f = Flags::from_parts(regs.a == 0, false, false, false);
}

pub(crate) fn or8(regs: &mut Registers, value: u8) {
    regs.a |= value;
    regs.f = Flags::from_parts(regs.a == 0, false, false, false);
}

/// Carry is preserved.
pub(crate) fn inc8(regs: &mut Registers, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    regs.set_flag(Flags::ZERO, result == 0);
    regs.set_flag(Flags::SUBTRACT, false);
    regs.set_flag(Flags::HALF_CARRY, value & 0x0F == 0x0F);
    result
}

/// Carry is preserved.
pub(crate) fn dec8(regs: &mut Registers, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    regs.set_flag(Flags::ZERO, result == 0);
    regs.set_flag(Flags::SUBTRACT, true);
    regs.set_flag(Flags::HALF_CARRY, value & 0x0F == 0x00);
    result
}

/// HL <- HL + value. Z preserved, H from bit 11, C from bit 15.
pub(crate) fn add_hl(regs: &mut Registers, value: u16) {
    let hl = regs.hl();
    let (result, carry) = hl.overflowing_add(value);
    regs.set_flag(Flags::SUBTRACT, false);
    regs.set_flag(Flags::HALF_CARRY, (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
    regs.set_flag(Flags::CARRY, carry);
    regs.set_hl(result);
}

/// SP + e8 as used by `ADD SP,e8` and `LD HL,SP+e8`. Z and N cleared; H and C
/// come from the unsigned low-byte addition.
pub(crate) fn sp_plus_signed(regs: &mut Registers, offset: i8) -> u16 {
    let sp = regs.sp;
    let unsigned = u16::from(offset as u8);
    let half = (sp & 0x000F) + (unsigned & 0x000F) > 0x000F;
    let carry = (sp & 0x00FF) + unsigned > 0x00FF;
    regs.f = Flags::from_parts(false, false, half, carry);
    sp.wrapping_add_signed(i16::from(offset))
}

/// Decimal-adjusts A after a BCD addition or subtraction.
pub(crate) fn daa(regs: &mut Registers) {
    let subtract = regs.flag(Flags::SUBTRACT);
    let mut carry = regs.flag(Flags::CARRY);
    let half = regs.flag(Flags::HALF_CARRY);
    let mut a = regs.a;

    if subtract {
        if carry {
            a = a.wrapping_sub(0x60);
        }
        if half {
            a = a.wrapping_sub(0x06);
        }
    } else {
        if carry || a > 0x99 {
            a = a.wrapping_add(0x60);
            carry = true;
        }
        if half || (a & 0x0F) > 0x09 {
            a = a.wrapping_add(0x06);
        }
    }

    regs.a = a;
    regs.set_flag(Flags::ZERO, a == 0);
    regs.set_flag(Flags::HALF_CARRY, false);
    regs.set_flag(Flags::CARRY, carry);
}

impl Exec<'_> {
    /// The source operand of an accumulator instruction (`[A, src]` or `[src]`).
    fn accumulator_source(&mut self, ops: &[Operand]) -> Result<u8, ExecError> {
        match *ops {
            [Operand::Reg8(Reg8::A), src] | [src] => {
                let loc = self.locate(src)?;
                Ok(self.load(loc))
            }
            _ => Err(self.invalid_operands()),
        }
    }

    pub(super) fn exec_alu(
        &mut self,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), ExecError> {
        if mnemonic == Mnemonic::Add {
            match *ops {
                [Operand::Reg16(Reg16::HL), Operand::Reg16(reg)] => {
                    let value = self.regs.get16(reg);
                    add_hl(self.regs, value);
                    return Ok(());
                }
                [Operand::Reg16(Reg16::SP), Operand::SignedImm8] => {
                    let offset = self.fetch8() as i8;
                    self.regs.sp = sp_plus_signed(self.regs, offset);
                    return Ok(());
                }
                _ => {}
            }
        }

        let value = self.accumulator_source(ops)?;
        let carry = self.regs.flag(Flags::CARRY);
        match mnemonic {
            Mnemonic::Add => add8(self.regs, value, false),
            Mnemonic::Adc => add8(self.regs, value, carry),
            Mnemonic::Sub => sub8(self.regs, value, false, true),
            Mnemonic::Sbc => sub8(self.regs, value, carry, true),
            Mnemonic::Cp => sub8(self.regs, value, false, false),
            Mnemonic::And => and8(self.regs, value),
            Mnemonic::Xor => xor8(self.regs, value),
            Mnemonic::Or => or8(self.regs, value),
            _ => return Err(self.invalid_operands()),
        }
        Ok(())
    }

    pub(super) fn exec_inc_dec(
        &mut self,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), ExecError> {
        let increment = mnemonic == Mnemonic::Inc;
        match *ops {
            // 16-bit forms leave flags alone.
            [Operand::Reg16(reg)] => {
                let value = self.regs.get16(reg);
                let next = if increment {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.regs.set16(reg, next);
            }
            [target] => {
                let loc = self.locate(target)?;
                let value = self.load(loc);
                let result = if increment {
                    inc8(self.regs, value)
                } else {
                    dec8(self.regs, value)
                };
                self.store(loc, result)?;
            }
            _ => return Err(self.invalid_operands()),
        }
        Ok(())
    }

    /// DAA, CPL, SCF, CCF
    pub(super) fn exec_accumulator_misc(&mut self, mnemonic: Mnemonic) {
        let regs = &mut *self.regs;
        match mnemonic {
            Mnemonic::Daa => daa(regs),
            Mnemonic::Cpl => {
                regs.a = !regs.a;
                regs.set_flag(Flags::SUBTRACT, true);
                regs.set_flag(Flags::HALF_CARRY, true);
            }
            Mnemonic::Scf => {
                regs.set_flag(Flags::SUBTRACT, false);
                regs.set_flag(Flags::HALF_CARRY, false);
                regs.set_flag(Flags::CARRY, true);
            }
            Mnemonic::Ccf => {
                let carry = regs.flag(Flags::CARRY);
                regs.set_flag(Flags::SUBTRACT, false);
                regs.set_flag(Flags::HALF_CARRY, false);
                regs.set_flag(Flags::CARRY, !carry);
            }
            _ => {}
        }
    }
}
