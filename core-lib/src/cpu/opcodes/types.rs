//! Descriptor types the opcode table is made of.
//!
//! Everything here is resolved once when the table is loaded: mnemonics become
//! [`Mnemonic`] variants and operand names become tagged [`Operand`] roles, so
//! the executor never looks at strings.
use crate::cpu::registers::{Flags, Reg16, Reg8, Registers};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr,
    Jp,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Halt,
    Stop,
    Di,
    Ei,
    Prefix,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
    /// Unassigned opcode.
    Illegal,
}

impl Mnemonic {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with("ILLEGAL") {
            return Some(Self::Illegal);
        }
        Some(match name {
            "NOP" => Self::Nop,
            "LD" => Self::Ld,
            "LDH" => Self::Ldh,
            "INC" => Self::Inc,
            "DEC" => Self::Dec,
            "ADD" => Self::Add,
            "ADC" => Self::Adc,
            "SUB" => Self::Sub,
            "SBC" => Self::Sbc,
            "AND" => Self::And,
            "XOR" => Self::Xor,
            "OR" => Self::Or,
            "CP" => Self::Cp,
            "RLCA" => Self::Rlca,
            "RRCA" => Self::Rrca,
            "RLA" => Self::Rla,
            "RRA" => Self::Rra,
            "DAA" => Self::Daa,
            "CPL" => Self::Cpl,
            "SCF" => Self::Scf,
            "CCF" => Self::Ccf,
            "JR" => Self::Jr,
            "JP" => Self::Jp,
            "CALL" => Self::Call,
            "RET" => Self::Ret,
            "RETI" => Self::Reti,
            "RST" => Self::Rst,
            "PUSH" => Self::Push,
            "POP" => Self::Pop,
            "HALT" => Self::Halt,
            "STOP" => Self::Stop,
            "DI" => Self::Di,
            "EI" => Self::Ei,
            "PREFIX" => Self::Prefix,
            "RLC" => Self::Rlc,
            "RRC" => Self::Rrc,
            "RL" => Self::Rl,
            "RR" => Self::Rr,
            "SLA" => Self::Sla,
            "SRA" => Self::Sra,
            "SWAP" => Self::Swap,
            "SRL" => Self::Srl,
            "BIT" => Self::Bit,
            "RES" => Self::Res,
            "SET" => Self::Set,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Ld => "LD",
            Self::Ldh => "LDH",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Add => "ADD",
            Self::Adc => "ADC",
            Self::Sub => "SUB",
            Self::Sbc => "SBC",
            Self::And => "AND",
            Self::Xor => "XOR",
            Self::Or => "OR",
            Self::Cp => "CP",
            Self::Rlca => "RLCA",
            Self::Rrca => "RRCA",
            Self::Rla => "RLA",
            Self::Rra => "RRA",
            Self::Daa => "DAA",
            Self::Cpl => "CPL",
            Self::Scf => "SCF",
            Self::Ccf => "CCF",
            Self::Jr => "JR",
            Self::Jp => "JP",
            Self::Call => "CALL",
            Self::Ret => "RET",
            Self::Reti => "RETI",
            Self::Rst => "RST",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Halt => "HALT",
            Self::Stop => "STOP",
            Self::Di => "DI",
            Self::Ei => "EI",
            Self::Prefix => "PREFIX",
            Self::Rlc => "RLC",
            Self::Rrc => "RRC",
            Self::Rl => "RL",
            Self::Rr => "RR",
            Self::Sla => "SLA",
            Self::Sra => "SRA",
            Self::Swap => "SWAP",
            Self::Srl => "SRL",
            Self::Bit => "BIT",
            Self::Res => "RES",
            Self::Set => "SET",
            Self::Illegal => "ILLEGAL",
        }
    }

    /// Branch instructions whose operand names `NZ`/`Z`/`NC`/`C` denote conditions.
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::Jr | Self::Jp | Self::Call | Self::Ret)
    }

    /// Mnemonics whose first operand is a bit index.
    pub const fn takes_bit_index(self) -> bool {
        matches!(self, Self::Bit | Self::Res | Self::Set)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Branch condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    NotZero,
    Zero,
    NotCarry,
    Carry,
}

impl Condition {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "NZ" => Self::NotZero,
            "Z" => Self::Zero,
            "NC" => Self::NotCarry,
            "C" => Self::Carry,
            _ => return None,
        })
    }

    pub const fn holds(self, regs: &Registers) -> bool {
        match self {
            Self::NotZero => !regs.flag(Flags::ZERO),
            Self::Zero => regs.flag(Flags::ZERO),
            Self::NotCarry => !regs.flag(Flags::CARRY),
            Self::Carry => regs.flag(Flags::CARRY),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotZero => "NZ",
            Self::Zero => "Z",
            Self::NotCarry => "NC",
            Self::Carry => "C",
        })
    }
}

/// Resolved operand role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// 8-bit register read or written directly.
    Reg8(Reg8),
    /// 16-bit register read or written directly.
    Reg16(Reg16),
    /// Memory byte addressed by a 16-bit register (`[HL]`, `[BC]`, `[DE]`).
    Indirect(Reg16),
    /// `[HL+]`: HL is incremented after the access.
    IndirectIncrement,
    /// `[HL-]`: HL is decremented after the access.
    IndirectDecrement,
    /// `[C]` in LDH: address `0xFF00 + C`.
    HighC,
    /// `n8`
    Imm8,
    /// `n16`, or `a16` used as a jump/call target.
    Imm16,
    /// `e8`
    SignedImm8,
    /// `[a8]` in LDH: address `0xFF00 + a8`.
    HighImm8,
    /// `[a16]`
    IndirectImm16,
    Condition(Condition),
    Bit(u8),
    /// RST target.
    Vector(u16),
}

impl Operand {
    /// Immediate bytes this operand pulls from the instruction stream.
    pub const fn immediate_len(self) -> u8 {
        match self {
            Self::Imm8 | Self::SignedImm8 | Self::HighImm8 => 1,
            Self::Imm16 | Self::IndirectImm16 => 2,
            _ => 0,
        }
    }

    /// Whether the operand accesses memory through a pointer.
    pub const fn is_memory(self) -> bool {
        matches!(
            self,
            Self::Indirect(_)
                | Self::IndirectIncrement
                | Self::IndirectDecrement
                | Self::HighC
                | Self::HighImm8
                | Self::IndirectImm16
        )
    }

    /// Operands usable as an 8-bit source or destination.
    pub const fn is_byte_location(self) -> bool {
        matches!(
            self,
            Self::Reg8(_)
                | Self::Indirect(_)
                | Self::IndirectIncrement
                | Self::IndirectDecrement
                | Self::HighC
                | Self::HighImm8
                | Self::IndirectImm16
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg8(reg) => write!(f, "{reg}"),
            Self::Reg16(reg) => write!(f, "{reg}"),
            Self::Indirect(reg) => write!(f, "[{reg}]"),
            Self::IndirectIncrement => f.write_str("[HL+]"),
            Self::IndirectDecrement => f.write_str("[HL-]"),
            Self::HighC => f.write_str("[C]"),
            Self::Imm8 => f.write_str("n8"),
            Self::Imm16 => f.write_str("n16"),
            Self::SignedImm8 => f.write_str("e8"),
            Self::HighImm8 => f.write_str("[a8]"),
            Self::IndirectImm16 => f.write_str("[a16]"),
            Self::Condition(cc) => write!(f, "{cc}"),
            Self::Bit(bit) => write!(f, "{bit}"),
            Self::Vector(addr) => write!(f, "${addr:02X}"),
        }
    }
}

/// T-cycle cost of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cycles {
    Fixed(u8),
    /// Cost depends on a runtime condition: `taken` when it holds.
    Conditional { taken: u8, not_taken: u8 },
}

impl Cycles {
    pub const fn resolve(self, condition: bool) -> u32 {
        match self {
            Self::Fixed(n) => n as u32,
            Self::Conditional { taken, not_taken } => {
                if condition {
                    taken as u32
                } else {
                    not_taken as u32
                }
            }
        }
    }
}

/// One entry of the opcode table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub code: u8,
    pub prefixed: bool,
    pub mnemonic: Mnemonic,
    pub operands: Vec<Operand>,
    /// Encoded length including the prefix byte and immediates.
    pub bytes: u8,
    pub cycles: Cycles,
}

impl InstructionDescriptor {
    /// Sentinel for an unassigned code.
    pub const fn illegal(code: u8, prefixed: bool) -> Self {
        Self {
            code,
            prefixed,
            mnemonic: Mnemonic::Illegal,
            operands: Vec::new(),
            bytes: 1,
            cycles: Cycles::Fixed(4),
        }
    }

    pub fn is_illegal(&self) -> bool {
        self.mnemonic == Mnemonic::Illegal
    }

    /// Immediate bytes following the opcode (and prefix).
    pub fn immediate_len(&self) -> u8 {
        self.operands.iter().map(|op| op.immediate_len()).sum()
    }
}

impl fmt::Display for InstructionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_illegal() {
            return write!(f, "ILLEGAL_{:02X}", self.code);
        }
        write!(f, "{}", self.mnemonic)?;
        match self.operands.as_slice() {
            [dst, Operand::Reg16(Reg16::SP), Operand::SignedImm8] => write!(f, " {dst}, SP+e8"),
            operands => {
                for (i, op) in operands.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{op}")?;
                }
                Ok(())
            }
        }
    }
}
