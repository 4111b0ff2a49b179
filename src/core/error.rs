// This module defines the error types of the armlir crate using the thiserror crate. DumpError
// covers the recoverable failures: malformed textual listings (with the offending line),
// unknown opcode tags, operand values that do not match an opcode's declared operand shapes,
// unresolved branch-target labels, and I/O while reading listings. MetadataError reports a
// defect in the static encoding table found during its one-time validation, and FormatError
// is the structural error of a single format string shared by the validator and the
// interpreter. DumpResult<T> is the convenience alias used throughout the crate.

//! Error types for the armlir crate.
//!
//! Using thiserror for idiomatic error handling.

use thiserror::Error;

use crate::arm::encoding::OperandKind;

/// Structural error in an operand format string.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("escape sequence runs past the end of the format")]
    UnterminatedEscape,

    #[error("operand slot '{found}' is outside 0..4")]
    SlotOutOfRange { found: char },
}

/// Defect found while validating the encoding table.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{tag} sits at table index {index}")]
    OutOfOrder { tag: &'static str, index: usize },

    #[error("{tag}: {source}")]
    Format {
        tag: &'static str,
        #[source]
        source: FormatError,
    },

    #[error("{tag}: directive '{directive}' reads slot {slot} as {expected:?} but the slot is {declared:?}")]
    ShapeMismatch {
        tag: &'static str,
        slot: usize,
        directive: char,
        declared: OperandKind,
        expected: OperandKind,
    },
}

/// Main error type for building and dumping compilation units.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Unknown opcode: {tag}")]
    UnknownOpcode { tag: String },

    #[error("{opcode} slot {slot} expects {expected:?}, got {found:?}")]
    OperandShape {
        opcode: String,
        slot: usize,
        expected: OperandKind,
        found: OperandKind,
    },

    #[error("{opcode} cannot be placed in the {list} list")]
    MisplacedRecord { opcode: String, list: String },

    #[error("Unresolved label: {name}")]
    UnresolvedLabel { name: String },

    #[error("Record index {index} is out of range")]
    InvalidRecord { index: usize },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for dump operations.
pub type DumpResult<T> = Result<T, DumpError>;
