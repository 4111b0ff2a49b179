//! Immutable name tables for the Thumb-2 target.
//!
//! Everything here is `const` data shared by every renderer; nothing is
//! computed at runtime and nothing needs locking.

/// Offset added to single-precision register numbers in operand slots.
pub const FP_REG_OFFSET: i32 = 32;

/// Marks a double-precision register id.
pub const FP_DOUBLE: i32 = 64;

/// Extracts the FP register number from an operand.
pub const FP_REG_MASK: i32 = FP_REG_OFFSET - 1;

/// Core register id of the stack pointer.
pub const R13_SP: i32 = 13;

/// Core register id of the link register.
pub const R14_LR: i32 = 14;

/// Core register id of the program counter.
pub const R15_PC: i32 = 15;

/// Core register names indexed by register id. `r9` holds the thread pointer.
pub const CORE_REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7",
    "r8", "rSELF", "r10", "r11", "r12", "sp", "lr", "pc",
];

/// Barrel shifter names, indexed by the low two bits of a shift operand.
pub const SHIFT_NAMES: [&str; 4] = ["lsl", "lsr", "asr", "ror"];

/// Condition-code suffixes indexed by the 4-bit condition field.
pub const CONDITION_NAMES: [&str; 16] = [
    "eq", "ne", "cs", "cc", "mi", "pl", "vs", "vc",
    "hi", "ls", "ge", "lt", "gt", "le", "al", "nv",
];

/// Memory barrier options accepted by `dmb`/`dsb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BarrierOption {
    Sy = 0xf,
    St = 0xe,
    Ish = 0xb,
    IshSt = 0xa,
    Nsh = 0x7,
    NshSt = 0x6,
}

impl BarrierOption {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0xf => Some(Self::Sy),
            0xe => Some(Self::St),
            0xb => Some(Self::Ish),
            0xa => Some(Self::IshSt),
            0x7 => Some(Self::Nsh),
            0x6 => Some(Self::NshSt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sy => "sy",
            Self::St => "st",
            Self::Ish => "ish",
            Self::IshSt => "ishst",
            Self::Nsh => "nsh",
            // existing listings spell this `shst`
            Self::NshSt => "shst",
        }
    }
}

/// Name of core register `id`, if it is one of the sixteen.
pub fn core_reg_name(id: i32) -> Option<&'static str> {
    usize::try_from(id).ok().and_then(|i| CORE_REG_NAMES.get(i).copied())
}

/// Name of condition code `cond`, if it fits the 4-bit field.
pub fn condition_name(cond: i32) -> Option<&'static str> {
    usize::try_from(cond).ok().and_then(|i| CONDITION_NAMES.get(i).copied())
}

/// Looks a core register up by any of the spellings the listing format accepts.
pub fn core_reg_by_name(name: &str) -> Option<i32> {
    match name {
        "sp" | "r13sp" => return Some(R13_SP),
        "lr" | "r14lr" => return Some(R14_LR),
        "pc" | "r15pc" => return Some(R15_PC),
        "rSELF" => return Some(9),
        _ => {}
    }
    let num: i32 = name.strip_prefix('r')?.parse().ok()?;
    (0..16).contains(&num).then_some(num)
}

/// Operand encoding of single-precision register `s<n>`.
pub const fn single_reg(n: i32) -> i32 {
    n + FP_REG_OFFSET
}

/// Operand encoding of double-precision register `d<n>`.
pub const fn double_reg(n: i32) -> i32 {
    (n << 1) + FP_REG_OFFSET + FP_DOUBLE
}
