//! Opcode kinds carried by LIR records.
//!
//! Real instructions index the encoding table; pseudo ops carry no encoding
//! and are printed as banners or labels; pool words live in the literal pools.

use std::fmt;

use super::encoding::{shape, OperandKind};
pub use super::encoding::ArmOpcode;

macro_rules! pseudo_ops {
    ($($variant:ident => [$($kind:ident),*];)*) => {
        /// Bookkeeping markers interleaved with real instructions.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PseudoOp {
            $($variant,)*
        }

        impl PseudoOp {
            pub const ALL: &'static [PseudoOp] = &[$(PseudoOp::$variant,)*];

            /// Listing tag, e.g. `kArmPseudoBarrier`.
            pub fn tag(self) -> &'static str {
                match self {
                    $(PseudoOp::$variant => concat!("kArmPseudo", stringify!($variant)),)*
                }
            }

            /// Declared operand shapes.
            pub fn operands(self) -> [OperandKind; 4] {
                match self {
                    $(PseudoOp::$variant => shape(&[$(OperandKind::$kind),*]),)*
                }
            }
        }
    };
}

pseudo_ops! {
    MethodEntry => [];
    MethodExit => [];
    Barrier => [];
    Extended => [Str];
    SsaRep => [Str];
    EntryBlock => [Int];
    ExitBlock => [Int];
    DalvikByteCodeBoundary => [Str];
    PseudoAlign4 => [];
    EhBlockLabel => [];
    TargetLabel => [];
    NormalBlockLabel => [];
    ThrowTarget => [];
    SuspendTarget => [];
    CaseLabel => [Int];
}

impl PseudoOp {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.tag() == tag)
    }
}

/// Entry kind of a literal pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Class pointer slot, operand 0 holds the callsite payload.
    ClassPointer,
    /// Raw 32-bit word, operand 0 holds the value.
    Word,
}

impl PoolKind {
    pub fn operands(self) -> [OperandKind; 4] {
        match self {
            Self::ClassPointer => shape(&[OperandKind::Callsite]),
            Self::Word => shape(&[OperandKind::Int]),
        }
    }
}

/// Opcode of any record in the LIR arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LirOpcode {
    Pseudo(PseudoOp),
    Insn(ArmOpcode),
    Pool(PoolKind),
}

impl LirOpcode {
    pub fn as_insn(self) -> Option<ArmOpcode> {
        match self {
            Self::Insn(op) => Some(op),
            _ => None,
        }
    }

    /// Operand shapes the record must carry.
    pub fn operand_kinds(self) -> [OperandKind; 4] {
        match self {
            Self::Pseudo(op) => op.operands(),
            Self::Insn(op) => op.encoding().operands,
            Self::Pool(kind) => kind.operands(),
        }
    }
}

impl fmt::Display for LirOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pseudo(op) => f.write_str(op.tag()),
            Self::Insn(op) => f.write_str(op.tag()),
            Self::Pool(PoolKind::ClassPointer) => f.write_str(".class"),
            Self::Pool(PoolKind::Word) => f.write_str(".word"),
        }
    }
}
