//! The opcode table: every (opcode byte, prefix state) pair mapped to an
//! [`InstructionDescriptor`].
//!
//! The built-in table is parsed from `data/opcodes.json` (compiled into the
//! crate) the first time [`table`] is called and is immutable afterwards.
//! Hosts may also parse their own tables with [`OpcodeTable::from_json`].
use once_cell::sync::OnceCell;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

mod source;
pub mod types;

pub use types::{Condition, Cycles, InstructionDescriptor, Mnemonic, Operand};

/// First byte of the two-byte extended encoding.
pub const PREFIX_BYTE: u8 = 0xCB;

const BUILTIN_SOURCE: &str = include_str!("../../../data/opcodes.json");

static BUILTIN: OnceCell<OpcodeTable> = OnceCell::new();

/// Identifies a table slot in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeKey {
    pub code: u8,
    pub prefixed: bool,
}

impl fmt::Display for OpcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefixed {
            write!(f, "CB {:#04X}", self.code)
        } else {
            write!(f, "{:#04X}", self.code)
        }
    }
}

/// Configuration errors raised while building a table. A table that fails to
/// load cannot drive the core.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Malformed opcode table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Opcode table is missing the \"{0}\" class")]
    MissingClass(&'static str),
    #[error("Invalid opcode key \"{key}\" in \"{class}\"")]
    InvalidKey { class: &'static str, key: String },
    #[error("Duplicate entry for opcode {0}")]
    DuplicateCode(OpcodeKey),
    #[error("Unknown mnemonic \"{mnemonic}\" for opcode {key}")]
    UnknownMnemonic { key: OpcodeKey, mnemonic: String },
    #[error("Unknown operand \"{name}\" for opcode {key}")]
    UnknownOperand { key: OpcodeKey, name: String },
    #[error("Opcode {key} lists {count} cycle values, expected 1 or 2")]
    InvalidCycles { key: OpcodeKey, count: usize },
    #[error("Operands of opcode {key} do not form a valid {mnemonic} instruction")]
    OperandShape { key: OpcodeKey, mnemonic: Mnemonic },
    #[error("Opcode {key} declares {declared} bytes but its operands need {derived}")]
    ByteCountMismatch {
        key: OpcodeKey,
        declared: u8,
        derived: u8,
    },
    #[error("No entry for opcode {0}")]
    MissingCode(OpcodeKey),
}

/// How strictly a source must cover the opcode space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Every code of both classes must be listed (illegal ones as `ILLEGAL_xx`).
    Complete,
    /// Codes not listed become illegal sentinels; an absent class is empty.
    Sparse,
}

pub struct OpcodeTable {
    unprefixed: [InstructionDescriptor; 256],
    cbprefixed: [InstructionDescriptor; 256],
}

impl fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcodeTable")
            .field("unprefixed_assigned", &self.assigned(false))
            .field("cbprefixed_assigned", &self.assigned(true))
            .finish()
    }
}

/// The built-in table, loaded on first use.
pub fn table() -> Result<&'static OpcodeTable, TableError> {
    BUILTIN.get_or_try_init(|| OpcodeTable::from_json(BUILTIN_SOURCE, Coverage::Complete))
}

impl OpcodeTable {
    #[instrument(skip(source), level = "debug")]
    pub fn from_json(source: &str, coverage: Coverage) -> Result<Self, TableError> {
        let raw: source::RawTable = serde_json::from_str(source)?;
        let class = |raw: Option<source::RawClass>, name: &'static str| match (raw, coverage) {
            (Some(raw), _) => Ok(raw),
            (None, Coverage::Sparse) => Ok(source::RawClass(Vec::new())),
            (None, Coverage::Complete) => Err(TableError::MissingClass(name)),
        };
        let unprefixed = class(raw.unprefixed, "unprefixed")?;
        let cbprefixed = class(raw.cbprefixed, "cbprefixed")?;

        let table = Self {
            unprefixed: Self::build_class("unprefixed", false, &unprefixed, coverage)?,
            cbprefixed: Self::build_class("cbprefixed", true, &cbprefixed, coverage)?,
        };
        debug!(
            unprefixed = table.assigned(false),
            cbprefixed = table.assigned(true),
            "Loaded opcode table"
        );
        Ok(table)
    }

    fn build_class(
        class: &'static str,
        prefixed: bool,
        raw: &source::RawClass,
        coverage: Coverage,
    ) -> Result<[InstructionDescriptor; 256], TableError> {
        let mut slots: [Option<InstructionDescriptor>; 256] = std::array::from_fn(|_| None);

        for (key_text, entry) in &raw.0 {
            let code = source::parse_key(key_text).ok_or_else(|| TableError::InvalidKey {
                class,
                key: key_text.clone(),
            })?;
            let key = OpcodeKey { code, prefixed };
            let slot = &mut slots[usize::from(code)];
            if slot.is_some() {
                return Err(TableError::DuplicateCode(key));
            }
            *slot = Some(source::resolve_entry(key, entry)?);
        }

        if coverage == Coverage::Complete {
            if let Some(missing) = slots.iter().position(Option::is_none) {
                return Err(TableError::MissingCode(OpcodeKey {
                    code: missing as u8,
                    prefixed,
                }));
            }
        }

        Ok(std::array::from_fn(|i| {
            slots[i]
                .take()
                .unwrap_or_else(|| InstructionDescriptor::illegal(i as u8, prefixed))
        }))
    }

    /// Never fails: unassigned codes resolve to an illegal sentinel.
    pub fn lookup(&self, code: u8, prefixed: bool) -> &InstructionDescriptor {
        let class = if prefixed {
            &self.cbprefixed
        } else {
            &self.unprefixed
        };
        &class[usize::from(code)]
    }

    /// Number of non-illegal entries in one class.
    pub fn assigned(&self, prefixed: bool) -> usize {
        self.iter(prefixed).filter(|desc| !desc.is_illegal()).count()
    }

    pub fn iter(&self, prefixed: bool) -> impl Iterator<Item = &InstructionDescriptor> {
        let class = if prefixed {
            &self.cbprefixed
        } else {
            &self.unprefixed
        };
        class.iter()
    }
}
