//! Rotates, shifts and single-bit operations.
//!
//! The accumulator rotates (RLCA, RRCA, RLA, RRA) share the shifter with their
//! prefixed counterparts but always clear Z.
use super::{Exec, ExecError};
use crate::cpu::opcodes::{Mnemonic, Operand};
use crate::cpu::registers::{Flags, Registers};

/// Applies a rotate/shift/swap to `value`, returning the result and carry out.
fn shift(mnemonic: Mnemonic, value: u8, carry_in: bool) -> Option<(u8, bool)> {
    let carry_bit = u8::from(carry_in);
    Some(match mnemonic {
        Mnemonic::Rlc | Mnemonic::Rlca => (value.rotate_left(1), value & 0x80 != 0),
        Mnemonic::Rrc | Mnemonic::Rrca => (value.rotate_right(1), value & 0x01 != 0),
        Mnemonic::Rl | Mnemonic::Rla => ((value << 1) | carry_bit, value & 0x80 != 0),
        Mnemonic::Rr | Mnemonic::Rra => ((value >> 1) | (carry_bit << 7), value & 0x01 != 0),
        Mnemonic::Sla => (value << 1, value & 0x80 != 0),
        Mnemonic::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        Mnemonic::Srl => (value >> 1, value & 0x01 != 0),
        Mnemonic::Swap => (value.rotate_left(4), false),
        _ => return None,
    })
}

fn set_shift_flags(regs: &mut Registers, zero: bool, carry: bool) {
    regs.f = Flags::from_parts(zero, false, false, carry);
}

impl Exec<'_> {
    pub(super) fn exec_rotate_accumulator(&mut self, mnemonic: Mnemonic) {
        let carry_in = self.regs.flag(Flags::CARRY);
        if let Some((result, carry)) = shift(mnemonic, self.regs.a, carry_in) {
            self.regs.a = result;
            set_shift_flags(self.regs, false, carry);
        }
    }

    pub(super) fn exec_shift(
        &mut self,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), ExecError> {
        let [target] = *ops else {
            return Err(self.invalid_operands());
        };
        let loc = self.locate(target)?;
        let value = self.load(loc);
        let carry_in = self.regs.flag(Flags::CARRY);
        let Some((result, carry)) = shift(mnemonic, value, carry_in) else {
            return Err(self.invalid_operands());
        };
        set_shift_flags(self.regs, result == 0, carry);
        self.store(loc, result)
    }

    /// BIT b, r: Z is set when the bit is clear. No other flag changes.
    pub(super) fn exec_bit(&mut self, ops: &[Operand]) -> Result<(), ExecError> {
        let [Operand::Bit(bit), target] = *ops else {
            return Err(self.invalid_operands());
        };
        let loc = self.locate(target)?;
        let value = self.load(loc);
        self.regs.set_flag(Flags::ZERO, value & (1 << (bit & 7)) == 0);
        Ok(())
    }

    pub(super) fn exec_res_set(&mut self, set: bool, ops: &[Operand]) -> Result<(), ExecError> {
        let [Operand::Bit(bit), target] = *ops else {
            return Err(self.invalid_operands());
        };
        let loc = self.locate(target)?;
        let value = self.load(loc);
        let mask = 1u8 << (bit & 7);
        let result = if set { value | mask } else { value & !mask };
        self.store(loc, result)
    }
}

#[cfg(test)]
mod tests {
    use super::shift;
    use crate::cpu::exec::execute;
    use crate::cpu::opcodes::{table, Mnemonic};
    use crate::cpu::registers::{Flags, Registers};
    use crate::mmu::{FlatMemory, MemoryBus};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn run_cb(code: u8, regs: &mut Registers, mem: &mut FlatMemory) -> u32 {
        let desc = table().unwrap().lookup(code, true);
        regs.pc = regs.pc.wrapping_add(2);
        execute(desc, regs, mem).unwrap().cycles
    }

    #[test_case(Mnemonic::Rlc, 0x85, false, 0x0B, true)]
    #[test_case(Mnemonic::Rrc, 0x01, false, 0x80, true)]
    #[test_case(Mnemonic::Rl, 0x80, false, 0x00, true)]
    #[test_case(Mnemonic::Rl, 0x11, true, 0x23, false)]
    #[test_case(Mnemonic::Rr, 0x01, false, 0x00, true)]
    #[test_case(Mnemonic::Rr, 0x8A, true, 0xC5, false)]
    #[test_case(Mnemonic::Sla, 0xFF, false, 0xFE, true)]
    #[test_case(Mnemonic::Sra, 0x8A, false, 0xC5, false)]
    #[test_case(Mnemonic::Srl, 0x01, false, 0x00, true)]
    #[test_case(Mnemonic::Swap, 0xF0, true, 0x0F, false)]
    fn test_shift(mnemonic: Mnemonic, value: u8, carry_in: bool, expected: u8, carry_out: bool) {
        assert_eq!(shift(mnemonic, value, carry_in), Some((expected, carry_out)));
    }

    #[test]
    fn test_rlca_clears_zero() {
        let mut regs = Registers {
            a: 0x00,
            f: Flags::ZERO,
            pc: 0xC000,
            ..Registers::default()
        };
        let mut mem = FlatMemory::new();
        regs.pc = 0xC001;
        let desc = table().unwrap().lookup(0x07, false);
        execute(desc, &mut regs, &mut mem).unwrap();
        assert_eq!(regs.a, 0x00);
        assert_eq!(regs.f, Flags::empty());
    }

    #[test]
    fn test_rl_register_sets_zero() {
        // RL B
        let mut regs = Registers {
            b: 0x80,
            pc: 0xC000,
            ..Registers::default()
        };
        let mut mem = FlatMemory::new();
        assert_eq!(run_cb(0x10, &mut regs, &mut mem), 8);
        assert_eq!(regs.b, 0x00);
        assert_eq!(regs.f, Flags::ZERO | Flags::CARRY);
    }

    #[test]
    fn test_swap_through_hl() {
        let mut regs = Registers {
            pc: 0xC000,
            ..Registers::default()
        };
        regs.set_hl(0xD000);
        let mut mem = FlatMemory::new();
        mem.write(0xD000, 0xAB).unwrap();
        assert_eq!(run_cb(0x36, &mut regs, &mut mem), 16);
        assert_eq!(mem.read(0xD000), 0xBA);
    }

    #[test_case(0x7C, 0x80, false ; "bit 7 set")]
    #[test_case(0x7C, 0x7F, true ; "bit 7 clear")]
    fn test_bit_h(code: u8, h: u8, zero: bool) {
        let mut regs = Registers {
            h,
            f: Flags::CARRY,
            pc: 0xC000,
            ..Registers::default()
        };
        let mut mem = FlatMemory::new();
        assert_eq!(run_cb(code, &mut regs, &mut mem), 8);
        assert_eq!(regs.flag(Flags::ZERO), zero);
        assert!(regs.flag(Flags::CARRY));
    }

    #[test]
    fn test_res_set_hl() {
        let mut regs = Registers {
            pc: 0xC000,
            ..Registers::default()
        };
        regs.set_hl(0xD000);
        let mut mem = FlatMemory::new();
        mem.write(0xD000, 0x0F).unwrap();

        // SET 7, [HL]
        assert_eq!(run_cb(0xFE, &mut regs, &mut mem), 16);
        assert_eq!(mem.read(0xD000), 0x8F);
        // RES 0, [HL]
        assert_eq!(run_cb(0x86, &mut regs, &mut mem), 16);
        assert_eq!(mem.read(0xD000), 0x8E);
        assert_eq!(regs.f, Flags::empty());
    }
}
