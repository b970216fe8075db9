//! SM83 register file.
use bitflags::bitflags;
use pastey::paste;
use std::fmt;

bitflags! {
    /// Flags register (F). The low nibble does not exist on hardware and is
    /// never representable here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const ZERO       = 0b1000_0000;
        const SUBTRACT   = 0b0100_0000;
        const HALF_CARRY = 0b0010_0000;
        const CARRY      = 0b0001_0000;
    }
}

impl Flags {
    /// Builds a flag set from the four individual conditions.
    pub const fn from_parts(zero: bool, subtract: bool, half_carry: bool, carry: bool) -> Self {
        let mut bits = 0;
        if zero {
            bits |= Self::ZERO.bits();
        }
        if subtract {
            bits |= Self::SUBTRACT.bits();
        }
        if half_carry {
            bits |= Self::HALF_CARRY.bits();
        }
        if carry {
            bits |= Self::CARRY.bits();
        }
        Self::from_bits_retain(bits)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |flag: Self, c: char| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            letter(Self::ZERO, 'Z'),
            letter(Self::SUBTRACT, 'N'),
            letter(Self::HALF_CARRY, 'H'),
            letter(Self::CARRY, 'C'),
        )
    }
}

/// Individually addressable 8-bit registers (F is only reachable through AF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

impl Reg8 {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            "E" => Self::E,
            "H" => Self::H,
            "L" => Self::L,
            _ => return None,
        })
    }
}

impl fmt::Display for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 16-bit registers: the four high/low pairs plus SP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    SP,
}

impl Reg16 {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "AF" => Self::AF,
            "BC" => Self::BC,
            "DE" => Self::DE,
            "HL" => Self::HL,
            "SP" => Self::SP,
            _ => return None,
        })
    }
}

impl fmt::Display for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

macro_rules! compound_register {
    ($pair:ident, $hi:ident, $lo:ident) => {
        paste! {
            pub const fn $pair(&self) -> u16 {
                u16::from_be_bytes([self.$hi, self.$lo])
            }

            pub fn [<set_ $pair>](&mut self, val: u16) {
                let [hi, lo] = val.to_be_bytes();
                self.$hi = hi;
                self.$lo = lo;
            }
        }
    };
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Register state left behind by the boot ROM.
    pub const fn post_boot() -> Self {
        if cfg!(feature = "cgb") {
            Self {
                a: 0x11,
                f: Flags::ZERO,
                b: 0x00,
                c: 0x00,
                d: 0xFF,
                e: 0x56,
                h: 0x00,
                l: 0x0D,
                sp: 0xFFFE,
                pc: 0x0100,
            }
        } else {
            Self {
                a: 0x01,
                f: Flags::from_parts(true, false, true, true),
                b: 0x00,
                c: 0x13,
                d: 0x00,
                e: 0xD8,
                h: 0x01,
                l: 0x4D,
                sp: 0xFFFE,
                pc: 0x0100,
            }
        }
    }

    compound_register!(bc, b, c);
    compound_register!(de, d, e);
    compound_register!(hl, h, l);

    pub const fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f.bits()])
    }

    /// Low nibble of F is discarded.
    pub fn set_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = a;
        self.f = Flags::from_bits_truncate(f);
    }

    pub const fn get(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.a,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
        }
    }

    pub fn set(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::A => self.a = val,
            Reg8::B => self.b = val,
            Reg8::C => self.c = val,
            Reg8::D => self.d = val,
            Reg8::E => self.e = val,
            Reg8::H => self.h = val,
            Reg8::L => self.l = val,
        }
    }

    pub const fn get16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::AF => self.af(),
            Reg16::BC => self.bc(),
            Reg16::DE => self.de(),
            Reg16::HL => self.hl(),
            Reg16::SP => self.sp,
        }
    }

    pub fn set16(&mut self, reg: Reg16, val: u16) {
        match reg {
            Reg16::AF => self.set_af(val),
            Reg16::BC => self.set_bc(val),
            Reg16::DE => self.set_de(val),
            Reg16::HL => self.set_hl(val),
            Reg16::SP => self.sp = val,
        }
    }

    pub const fn flag(&self, flag: Flags) -> bool {
        self.f.contains(flag)
    }

    pub fn set_flag(&mut self, flag: Flags, value: bool) {
        self.f.set(flag, value);
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={:02X} F={:02X} B={:02X} C={:02X} D={:02X} E={:02X} H={:02X} L={:02X} SP={:04X} PC={:04X} [{}]",
            self.a,
            self.f.bits(),
            self.b,
            self.c,
            self.d,
            self.e,
            self.h,
            self.l,
            self.sp,
            self.pc,
            self.f,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Flags, Reg16, Reg8, Registers};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_compound_registers() {
        let mut regs = Registers::default();
        regs.set_bc(0x5678);
        regs.set_de(0x9ABC);
        regs.set_hl(0xDEF0);
        assert_eq!((regs.b, regs.c), (0x56, 0x78));
        assert_eq!((regs.d, regs.e), (0x9A, 0xBC));
        assert_eq!((regs.h, regs.l), (0xDE, 0xF0));

        regs.l = 0x01;
        assert_eq!(regs.hl(), 0xDE01);
    }

    #[test]
    fn test_af_masks_reserved_bits() {
        let mut regs = Registers::default();
        regs.set_af(0x12FF);
        assert_eq!(regs.a, 0x12);
        assert_eq!(regs.f.bits(), 0xF0);
        assert_eq!(regs.af(), 0x12F0);
    }

    #[test]
    fn test_flag_accessors() {
        let mut regs = Registers::default();
        regs.set_flag(Flags::CARRY, true);
        regs.set_flag(Flags::ZERO, true);
        assert!(regs.flag(Flags::CARRY));
        assert!(!regs.flag(Flags::HALF_CARRY));
        regs.set_flag(Flags::CARRY, false);
        assert_eq!(regs.f, Flags::ZERO);
    }

    #[test]
    fn test_register_names() {
        assert_eq!(Reg8::from_name("H"), Some(Reg8::H));
        assert_eq!(Reg8::from_name("HL"), None);
        assert_eq!(Reg16::from_name("SP"), Some(Reg16::SP));
        assert_eq!(Reg16::from_name("n16"), None);
    }

    #[cfg(not(feature = "cgb"))]
    #[test]
    fn test_post_boot_dump() {
        assert_snapshot!(
            Registers::post_boot().to_string(),
            @"A=01 F=B0 B=00 C=13 D=00 E=D8 H=01 L=4D SP=FFFE PC=0100 [Z-HC]"
        );
    }

    proptest! {
        #[test]
        fn test_compound_write_then_read(value: u16) {
            let mut regs = Registers::default();
            for reg in [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::SP] {
                regs.set16(reg, value);
                prop_assert_eq!(regs.get16(reg), value);
            }
            regs.set16(Reg16::AF, value);
            prop_assert_eq!(regs.get16(Reg16::AF), value & 0xFFF0);
        }

        #[test]
        fn test_compound_tracks_halves(hi: u8, lo: u8) {
            let mut regs = Registers::default();
            regs.set(Reg8::D, hi);
            regs.set(Reg8::E, lo);
            prop_assert_eq!(regs.de(), u16::from_be_bytes([hi, lo]));
        }
    }
}
