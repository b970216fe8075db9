//! JSON opcode data source and its resolution into descriptors.
//!
//! Shape: `{"unprefixed": {"0x00": {...}}, "cbprefixed": {...}}`, each entry
//! carrying `mnemonic`, `operands` (`[{name, immediate?, increment?,
//! decrement?}]`), `cycles` (one or two values) and an optional `bytes`.
//! Unknown fields are ignored.
use super::types::{Condition, Cycles, InstructionDescriptor, Mnemonic, Operand};
use super::{OpcodeKey, TableError};
use crate::cpu::registers::{Reg16, Reg8};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub(super) struct RawTable {
    pub unprefixed: Option<RawClass>,
    pub cbprefixed: Option<RawClass>,
}

/// Entries of one prefix class in document order, duplicates kept so the
/// loader can reject them.
#[derive(Debug)]
pub(super) struct RawClass(pub Vec<(String, RawEntry)>);

impl<'de> Deserialize<'de> for RawClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClassVisitor;

        impl<'de> Visitor<'de> for ClassVisitor {
            type Value = RawClass;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of opcode keys to instruction entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawClass, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(RawClass(entries))
            }
        }

        deserializer.deserialize_map(ClassVisitor)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawEntry {
    pub mnemonic: String,
    #[serde(default)]
    pub operands: Vec<RawOperand>,
    pub cycles: Vec<u8>,
    #[serde(default)]
    pub bytes: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawOperand {
    pub name: String,
    #[serde(default)]
    pub immediate: Option<bool>,
    #[serde(default)]
    pub increment: bool,
    #[serde(default)]
    pub decrement: bool,
}

/// Parses `"0x4F"`-style keys.
pub(super) fn parse_key(key: &str) -> Option<u8> {
    let hex = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X"))?;
    if hex.len() != 2 {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}

pub(super) fn resolve_entry(
    key: OpcodeKey,
    raw: &RawEntry,
) -> Result<InstructionDescriptor, TableError> {
    let mnemonic = Mnemonic::from_name(&raw.mnemonic).ok_or_else(|| TableError::UnknownMnemonic {
        key,
        mnemonic: raw.mnemonic.clone(),
    })?;

    let cycles = match raw.cycles.as_slice() {
        &[n] => Cycles::Fixed(n),
        &[taken, not_taken] => Cycles::Conditional { taken, not_taken },
        other => {
            return Err(TableError::InvalidCycles {
                key,
                count: other.len(),
            })
        }
    };

    if mnemonic == Mnemonic::Illegal {
        return Ok(InstructionDescriptor {
            cycles,
            ..InstructionDescriptor::illegal(key.code, key.prefixed)
        });
    }

    let operands = raw
        .operands
        .iter()
        .enumerate()
        .map(|(index, op)| {
            resolve_operand(op, mnemonic, index, key.prefixed)
                .ok_or_else(|| TableError::UnknownOperand {
                    key,
                    name: op.name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !shape_fits(mnemonic, &operands) {
        return Err(TableError::OperandShape { key, mnemonic });
    }

    let immediates: u8 = operands.iter().map(|op| op.immediate_len()).sum();
    let derived = u8::from(key.prefixed) + 1 + immediates;
    let bytes = raw.bytes.unwrap_or(derived);
    if bytes != derived {
        return Err(TableError::ByteCountMismatch {
            key,
            declared: bytes,
            derived,
        });
    }

    Ok(InstructionDescriptor {
        code: key.code,
        prefixed: key.prefixed,
        mnemonic,
        operands,
        bytes,
        cycles,
    })
}

/// Maps an operand name to its role. A compound register name with no
/// `immediate` annotation is a pointer in the CB-prefixed class and a plain
/// register elsewhere.
fn resolve_operand(
    raw: &RawOperand,
    mnemonic: Mnemonic,
    index: usize,
    prefixed: bool,
) -> Option<Operand> {
    let name = raw.name.as_str();

    if mnemonic.takes_bit_index() && index == 0 {
        return name.parse::<u8>().ok().filter(|&bit| bit < 8).map(Operand::Bit);
    }
    if mnemonic.is_branch() {
        if let Some(cc) = Condition::from_name(name) {
            return Some(Operand::Condition(cc));
        }
    }
    if mnemonic == Mnemonic::Rst {
        return name
            .strip_prefix('$')
            .and_then(|hex| u16::from_str_radix(hex, 16).ok())
            .filter(|&vector| vector & !0x38 == 0)
            .map(Operand::Vector);
    }

    let immediate = raw
        .immediate
        .unwrap_or_else(|| !(prefixed && Reg16::from_name(name).is_some()));
    let stepped = raw.increment || raw.decrement;
    if stepped && (immediate || name != "HL" || (raw.increment && raw.decrement)) {
        return None;
    }

    if immediate {
        if let Some(reg) = Reg8::from_name(name) {
            return Some(Operand::Reg8(reg));
        }
        if let Some(reg) = Reg16::from_name(name) {
            return Some(Operand::Reg16(reg));
        }
        return match name {
            "n8" => Some(Operand::Imm8),
            "n16" | "a16" => Some(Operand::Imm16),
            "e8" => Some(Operand::SignedImm8),
            _ => None,
        };
    }

    match name {
        "HL" if raw.increment => Some(Operand::IndirectIncrement),
        "HL" if raw.decrement => Some(Operand::IndirectDecrement),
        "BC" => Some(Operand::Indirect(Reg16::BC)),
        "DE" => Some(Operand::Indirect(Reg16::DE)),
        "HL" => Some(Operand::Indirect(Reg16::HL)),
        "C" => Some(Operand::HighC),
        "a8" => Some(Operand::HighImm8),
        "a16" => Some(Operand::IndirectImm16),
        _ => None,
    }
}

fn is_byte_source(op: Operand) -> bool {
    op.is_byte_location() || op == Operand::Imm8
}

/// Checks the operand list against the forms the executor implements.
pub(super) fn shape_fits(mnemonic: Mnemonic, ops: &[Operand]) -> bool {
    use Mnemonic as M;
    use Operand as O;

    match mnemonic {
        M::Nop
        | M::Rlca
        | M::Rrca
        | M::Rla
        | M::Rra
        | M::Daa
        | M::Cpl
        | M::Scf
        | M::Ccf
        | M::Reti
        | M::Halt
        | M::Di
        | M::Ei
        | M::Prefix
        | M::Illegal => ops.is_empty(),
        M::Stop => matches!(ops, [] | [O::Imm8]),
        M::Ld => match *ops {
            [O::Reg16(reg), O::Imm16] => reg != Reg16::AF,
            [O::IndirectImm16, O::Reg16(Reg16::SP)]
            | [O::Reg16(Reg16::SP), O::Reg16(Reg16::HL)]
            | [O::Reg16(Reg16::HL), O::Reg16(Reg16::SP), O::SignedImm8] => true,
            [dst, src] => {
                dst.is_byte_location()
                    && is_byte_source(src)
                    && !(dst.is_memory() && src.is_memory())
            }
            _ => false,
        },
        M::Ldh => matches!(
            ops,
            [O::Reg8(Reg8::A), O::HighC | O::HighImm8] | [O::HighC | O::HighImm8, O::Reg8(Reg8::A)]
        ),
        M::Inc | M::Dec => match *ops {
            [O::Reg16(reg)] => reg != Reg16::AF,
            [loc] => loc.is_byte_location(),
            _ => false,
        },
        M::Add => match *ops {
            [O::Reg16(Reg16::HL), O::Reg16(reg)] => reg != Reg16::AF,
            [O::Reg16(Reg16::SP), O::SignedImm8] => true,
            [O::Reg8(Reg8::A), src] => is_byte_source(src),
            _ => false,
        },
        M::Adc | M::Sub | M::Sbc | M::And | M::Xor | M::Or | M::Cp => match *ops {
            [O::Reg8(Reg8::A), src] | [src] => is_byte_source(src),
            _ => false,
        },
        M::Jr => matches!(ops, [O::SignedImm8] | [O::Condition(_), O::SignedImm8]),
        M::Jp => matches!(
            ops,
            [O::Imm16] | [O::Condition(_), O::Imm16] | [O::Reg16(Reg16::HL)]
        ),
        M::Call => matches!(ops, [O::Imm16] | [O::Condition(_), O::Imm16]),
        M::Ret => matches!(ops, [] | [O::Condition(_)]),
        M::Rst => matches!(ops, [O::Vector(_)]),
        M::Push | M::Pop => matches!(ops, [O::Reg16(reg)] if *reg != Reg16::SP),
        M::Rlc | M::Rrc | M::Rl | M::Rr | M::Sla | M::Sra | M::Swap | M::Srl => {
            matches!(ops, [loc] if loc.is_byte_location())
        }
        M::Bit | M::Res | M::Set => matches!(ops, [O::Bit(_), loc] if loc.is_byte_location()),
    }
}
