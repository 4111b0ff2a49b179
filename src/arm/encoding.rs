// This module holds the per-opcode encoding metadata for the Thumb/Thumb-2 target: the
// mnemonic format, the operand format, and the declared shape of each operand slot. The
// table is generated together with the ArmOpcode enum by a single macro invocation so the
// two can never drift, and it is validated once on first use: every format string must be
// structurally well formed and every directive must address a slot whose declared shape
// matches what the directive consumes. A failed validation is a defect in this file, so
// encoding_map() panics rather than returning an error to callers.

//! Encoding metadata table for Thumb/Thumb-2 opcodes.

use std::sync::OnceLock;

use hashbrown::HashMap;

use super::format::{directive_operand_kind, FormatPieces, Piece};
use crate::core::error::MetadataError;

/// Declared contents of an operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// Slot is unused.
    Empty,
    /// Plain integer (immediates, offsets, condition codes, masks).
    Int,
    /// Register id, core or FP.
    Reg,
    /// Encoded 12-bit modified immediate.
    ModImm,
    /// Attached text (pseudo ops only).
    Str,
    /// Callsite/class payload (literal pool only).
    Callsite,
}

/// Pads a short kind list to the four operand slots.
pub(crate) const fn shape(kinds: &[OperandKind]) -> [OperandKind; 4] {
    let mut out = [OperandKind::Empty; 4];
    let mut i = 0;
    while i < kinds.len() {
        out[i] = kinds[i];
        i += 1;
    }
    out
}

/// Encoding metadata for one real opcode.
#[derive(Debug, Clone, Copy)]
pub struct EncodingInfo {
    pub opcode: ArmOpcode,
    /// Mnemonic format, interpreted like `fmt` (e.g. `b!1c`).
    pub name: &'static str,
    /// Operand format.
    pub fmt: &'static str,
    pub operands: [OperandKind; 4],
}

macro_rules! encoding_table {
    ($($variant:ident => $name:literal, $fmt:literal, [$($kind:ident),*];)*) => {
        /// Real (encodable) Thumb/Thumb-2 opcodes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum ArmOpcode {
            $($variant,)*
        }

        impl ArmOpcode {
            /// Every opcode in table order.
            pub const ALL: &'static [ArmOpcode] = &[$(ArmOpcode::$variant,)*];

            /// Listing tag, e.g. `kThumbAddRRR`.
            pub fn tag(self) -> &'static str {
                match self {
                    $(ArmOpcode::$variant => concat!("k", stringify!($variant)),)*
                }
            }
        }

        static ENCODINGS: &[EncodingInfo] = &[
            $(EncodingInfo {
                opcode: ArmOpcode::$variant,
                name: $name,
                fmt: $fmt,
                operands: shape(&[$(OperandKind::$kind),*]),
            },)*
        ];
    };
}

encoding_table! {
    Arm16BitData => "data", "0x!0h(!0d)", [Int];
    ThumbAdcRR => "adcs", "!0C, !1C", [Reg, Reg];
    ThumbAddRRI3 => "adds", "!0C, !1C, #!2d", [Reg, Reg, Int];
    ThumbAddRI8 => "adds", "!0C, !0C, #!1d", [Reg, Int];
    ThumbAddRRR => "adds", "!0C, !1C, !2C", [Reg, Reg, Reg];
    ThumbAddRRLH => "add", "!0C, !1C", [Reg, Reg];
    ThumbAddPcRel => "add", "!0C, pc, #!1E", [Reg, Int];
    ThumbAddSpRel => "add", "!0C, sp, #!1E", [Reg, Int];
    ThumbAddSpI7 => "add", "sp, #!0E", [Int];
    ThumbAndRR => "ands", "!0C, !1C", [Reg, Reg];
    ThumbAsrRRI5 => "asrs", "!0C, !1C, #!2d", [Reg, Reg, Int];
    ThumbBCond => "b!1c", "!0t", [Int, Int];
    ThumbBUncond => "b", "!0t", [Int];
    ThumbBicRR => "bics", "!0C, !1C", [Reg, Reg];
    ThumbBkpt => "bkpt", "!0d", [Int];
    ThumbBl1 => "bl_1", "!0u", [Int];
    ThumbBl2 => "bl_2", "!0v", [Int];
    ThumbBlx1 => "blx_1", "!0u", [Int];
    ThumbBlx2 => "blx_2", "!0v", [Int];
    ThumbBlxR => "blx", "!0C", [Reg];
    ThumbBx => "bx", "!0C", [Reg];
    ThumbCmnRR => "cmn", "!0C, !1C", [Reg, Reg];
    ThumbCmpRI8 => "cmp", "!0C, #!1d", [Reg, Int];
    ThumbCmpRR => "cmp", "!0C, !1C", [Reg, Reg];
    ThumbEorRR => "eors", "!0C, !1C", [Reg, Reg];
    ThumbLdmia => "ldmia", "!0C!!, <!1R>", [Reg, Int];
    ThumbLdrRRI5 => "ldr", "!0C, [!1C, #!2E]", [Reg, Reg, Int];
    ThumbLdrRRR => "ldr", "!0C, [!1C, !2C]", [Reg, Reg, Reg];
    ThumbLdrPcRel => "ldr", "!0C, [pc, #!1E]", [Reg, Int];
    ThumbLdrSpRel => "ldr", "!0C, [sp, #!1E]", [Reg, Int];
    ThumbLdrbRRI5 => "ldrb", "!0C, [!1C, #!2d]", [Reg, Reg, Int];
    ThumbLdrhRRI5 => "ldrh", "!0C, [!1C, #!2F]", [Reg, Reg, Int];
    ThumbLslRRI5 => "lsls", "!0C, !1C, #!2d", [Reg, Reg, Int];
    ThumbLsrRRI5 => "lsrs", "!0C, !1C, #!2d", [Reg, Reg, Int];
    ThumbMovImm => "movs", "!0C, #!1d", [Reg, Int];
    ThumbMovRR => "movs", "!0C, !1C", [Reg, Reg];
    ThumbMul => "muls", "!0C, !1C", [Reg, Reg];
    ThumbMvn => "mvns", "!0C, !1C", [Reg, Reg];
    ThumbNeg => "negs", "!0C, !1C", [Reg, Reg];
    ThumbOrr => "orrs", "!0C, !1C", [Reg, Reg];
    ThumbPop => "pop", "<!0R>", [Int];
    ThumbPush => "push", "<!0R>", [Int];
    ThumbStmia => "stmia", "!0C!!, <!1R>", [Reg, Int];
    ThumbStrRRI5 => "str", "!0C, [!1C, #!2E]", [Reg, Reg, Int];
    ThumbStrbRRI5 => "strb", "!0C, [!1C, #!2d]", [Reg, Reg, Int];
    ThumbStrhRRI5 => "strh", "!0C, [!1C, #!2F]", [Reg, Reg, Int];
    ThumbSubRRI3 => "subs", "!0C, !1C, #!2d", [Reg, Reg, Int];
    ThumbSubRI8 => "subs", "!0C, #!1d", [Reg, Int];
    ThumbSubRRR => "subs", "!0C, !1C, !2C", [Reg, Reg, Reg];
    ThumbSubSpI7 => "sub", "sp, #!0E", [Int];
    ThumbSwi => "swi", "!0d", [Int];
    ThumbTst => "tst", "!0C, !1C", [Reg, Reg];
    Thumb2Vldrs => "vldr", "!0s, [!1C, #!2E]", [Reg, Reg, Int];
    Thumb2Vldrd => "vldr", "!0S, [!1C, #!2E]", [Reg, Reg, Int];
    Thumb2Vstrs => "vstr", "!0s, [!1C, #!2E]", [Reg, Reg, Int];
    Thumb2Vstrd => "vstr", "!0S, [!1C, #!2E]", [Reg, Reg, Int];
    Thumb2Vadds => "vadd.f32", "!0s, !1s, !2s", [Reg, Reg, Reg];
    Thumb2Vaddd => "vadd.f64", "!0S, !1S, !2S", [Reg, Reg, Reg];
    Thumb2Vsubs => "vsub.f32", "!0s, !1s, !2s", [Reg, Reg, Reg];
    Thumb2Vmuls => "vmuls", "!0s, !1s, !2s", [Reg, Reg, Reg];
    Thumb2Vmuld => "vmuld", "!0S, !1S, !2S", [Reg, Reg, Reg];
    Thumb2Vmovs => "vmov.f32 ", "!0s, !1s", [Reg, Reg];
    Thumb2Vmovd => "vmov.f64 ", "!0S, !1S", [Reg, Reg];
    Thumb2VmovsImm8 => "vmov.f32", "!0s, #0x!1h", [Reg, Int];
    Thumb2Vcmps => "vcmp.f32", "!0s, !1s", [Reg, Reg];
    Thumb2Vcmpd => "vcmp.f64", "!0S, !1S", [Reg, Reg];
    Thumb2Vcvtid => "vcvt.f64.s32 ", "!0S, !1s", [Reg, Reg];
    Thumb2Vsqrtd => "vsqrt.f64 ", "!0S, !1S", [Reg, Reg];
    Thumb2Fmstat => "fmstat", "", [];
    Thumb2MovImmShift => "mov", "!0C, #!1m", [Reg, ModImm];
    Thumb2MovImm16 => "mov", "!0C, #!1M", [Reg, Int];
    Thumb2MovImm16H => "movt", "!0C, #!1M", [Reg, Int];
    Thumb2MvnImm12 => "mvn", "!0C, #!1n", [Reg, ModImm];
    Thumb2MovRR => "mov", "!0C, !1C", [Reg, Reg];
    Thumb2AddRRI8 => "adds", "!0C, !1C, #!2m", [Reg, Reg, ModImm];
    Thumb2AddRRI12 => "add", "!0C,!1C,#!2d", [Reg, Reg, Int];
    Thumb2SubRRI8 => "subs", "!0C, !1C, #!2m", [Reg, Reg, ModImm];
    Thumb2AddRRR => "add", "!0C, !1C, !2C!3H", [Reg, Reg, Reg, Int];
    Thumb2SubRRR => "sub", "!0C, !1C, !2C!3H", [Reg, Reg, Reg, Int];
    Thumb2OrrRRR => "orr", "!0C, !1C, !2C!3H", [Reg, Reg, Reg, Int];
    Thumb2AndRRI8 => "and", "!0C, !1C, #!2m", [Reg, Reg, ModImm];
    Thumb2BicRRI8 => "bic", "!0C, !1C, #!2n", [Reg, Reg, ModImm];
    Thumb2CmpRI8 => "cmp", "!0C, #!1m", [Reg, ModImm];
    Thumb2CmnRI8 => "cmn", "!0C, #!1m", [Reg, ModImm];
    Thumb2TstRR => "tst", "!0C, !1C!2H", [Reg, Reg, Int];
    Thumb2LslRRI5 => "lsl", "!0C, !1C, #!2d", [Reg, Reg, Int];
    Thumb2AsrRRI5 => "asr", "!0C, !1C, #!2d", [Reg, Reg, Int];
    Thumb2MulRRR => "mul", "!0C, !1C, !2C", [Reg, Reg, Reg];
    Thumb2SdivRRR => "sdiv", "!0C, !1C, !2C", [Reg, Reg, Reg];
    Thumb2Umull => "umull", "!0C, !1C, !2C, !3C", [Reg, Reg, Reg, Reg];
    Thumb2Bfi => "bfi", "!0C,!1C,#!2d,#!3d", [Reg, Reg, Int, Int];
    Thumb2Ubfx => "ubfx", "!0C, !1C, #!2d, #!3d", [Reg, Reg, Int, Int];
    Thumb2LdrRRI12 => "ldr", "!0C, [!1C, #!2d]", [Reg, Reg, Int];
    Thumb2StrRRI12 => "str", "!0C, [!1C, #!2d]", [Reg, Reg, Int];
    Thumb2LdrRRR => "ldr", "!0C, [!1C, !2C, LSL #!3d]", [Reg, Reg, Reg, Int];
    Thumb2LdrdI8 => "ldrd", "!0C, !1C, [!2C, #!3E]", [Reg, Reg, Reg, Int];
    Thumb2LdrPcRel12 => "ldr", "!0C, [r15pc, #!1d]", [Reg, Int];
    Thumb2Ldrex => "ldrex", "!0C, [!1C, #!2E]", [Reg, Reg, Int];
    Thumb2Strex => "strex", "!0C,!1C, [!2C, #!3E]", [Reg, Reg, Reg, Int];
    Thumb2Clrex => "clrex", "", [];
    Thumb2Push => "push", "<!0R>", [Int];
    Thumb2Pop => "pop", "<!0R>", [Int];
    Thumb2VPushCS => "vpush", "<!0P>", [Int];
    Thumb2VPopCS => "vpop", "<!0P>", [Int];
    Thumb2Vldms => "vldms", "!0C, <!1Q>", [Reg, Int];
    Thumb2Vstms => "vstms", "!0C, <!1Q>", [Reg, Int];
    Thumb2It => "it:!1b", "!0c", [Int, Int];
    Thumb2Dmb => "dmb", "#!0B", [Int];
    Thumb2BCond => "b!1c", "!0t", [Int, Int];
    Thumb2BUncond => "b", "!0t", [Int];
    Thumb2Cbz => "cbz", "!0C, !1t", [Reg, Int];
    Thumb2Cbnz => "cbnz", "!0C, !1t", [Reg, Int];
    Thumb2Adr => "adr", "!0C,#!1d", [Reg, Int];
}

impl ArmOpcode {
    /// Encoding metadata for this opcode.
    pub fn encoding(self) -> &'static EncodingInfo {
        &encoding_map().entries[self as usize]
    }

    /// Second half of a two-instruction `bl`/`blx` pair.
    pub fn is_wide_branch_tail(self) -> bool {
        matches!(self, Self::ThumbBl2 | Self::ThumbBlx2)
    }

    /// 16-bit `push`/`pop`, whose list bit 8 names `lr`/`pc`.
    pub fn is_narrow_push(self) -> bool {
        self == Self::ThumbPush
    }

    pub fn is_narrow_pop(self) -> bool {
        self == Self::ThumbPop
    }
}

/// Validated view over the encoding table.
#[derive(Debug)]
pub struct EncodingMap {
    entries: &'static [EncodingInfo],
    by_tag: HashMap<&'static str, ArmOpcode>,
}

static ENCODING_MAP: OnceLock<EncodingMap> = OnceLock::new();

/// The process-wide encoding map, validated on first access.
pub fn encoding_map() -> &'static EncodingMap {
    ENCODING_MAP.get_or_init(|| match EncodingMap::load(ENCODINGS) {
        Ok(map) => map,
        Err(e) => panic!("encoding table is malformed: {e}"),
    })
}

impl EncodingMap {
    /// Builds a map over `entries` after validating every format string.
    pub fn load(entries: &'static [EncodingInfo]) -> Result<Self, MetadataError> {
        let mut by_tag = HashMap::with_capacity(entries.len());
        for (index, info) in entries.iter().enumerate() {
            if info.opcode as usize != index {
                return Err(MetadataError::OutOfOrder {
                    tag: info.opcode.tag(),
                    index,
                });
            }
            validate_format(info, info.name)?;
            validate_format(info, info.fmt)?;
            by_tag.insert(info.opcode.tag(), info.opcode);
        }
        log::debug!("Validated {} encoding entries", entries.len());
        Ok(Self { entries, by_tag })
    }

    pub fn entries(&self) -> &'static [EncodingInfo] {
        self.entries
    }

    /// Finds an opcode by its listing tag.
    pub fn lookup_tag(&self, tag: &str) -> Option<ArmOpcode> {
        self.by_tag.get(tag).copied()
    }
}

fn validate_format(info: &EncodingInfo, fmt: &'static str) -> Result<(), MetadataError> {
    for piece in FormatPieces::new(fmt) {
        let piece = piece.map_err(|source| MetadataError::Format {
            tag: info.opcode.tag(),
            source,
        })?;
        let Piece::Directive { slot, code } = piece else {
            continue;
        };
        // Unknown letters are tolerated here and degrade at render time.
        let Some(expected) = directive_operand_kind(code) else {
            continue;
        };
        let declared = info.operands[slot];
        if declared != expected {
            return Err(MetadataError::ShapeMismatch {
                tag: info.opcode.tag(),
                slot,
                directive: code,
                declared,
                expected,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_table_validates() {
        let map = encoding_map();
        assert_eq!(map.entries().len(), ArmOpcode::ALL.len());
        for &opcode in ArmOpcode::ALL {
            assert_eq!(opcode.encoding().opcode, opcode);
        }
    }

    #[test]
    fn test_lookup_tag() {
        let map = encoding_map();
        assert_eq!(map.lookup_tag("kThumbAddRRR"), Some(ArmOpcode::ThumbAddRRR));
        assert_eq!(map.lookup_tag("kThumb2Dmb"), Some(ArmOpcode::Thumb2Dmb));
        assert_eq!(map.lookup_tag("kThumbFoo"), None);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        static BAD: &[EncodingInfo] = &[EncodingInfo {
            opcode: ArmOpcode::Arm16BitData,
            name: "data",
            fmt: "!0C",
            operands: shape(&[OperandKind::Int]),
        }];
        let err = EncodingMap::load(BAD).unwrap_err();
        assert!(matches!(err, MetadataError::ShapeMismatch { slot: 0, directive: 'C', .. }));
    }

    #[test]
    fn test_malformed_format_is_rejected() {
        static BAD: &[EncodingInfo] = &[EncodingInfo {
            opcode: ArmOpcode::Arm16BitData,
            name: "data",
            fmt: "!5d",
            operands: shape(&[OperandKind::Int]),
        }];
        assert!(matches!(
            EncodingMap::load(BAD),
            Err(MetadataError::Format { .. })
        ));
    }

    #[test]
    fn test_out_of_order_table_is_rejected() {
        static BAD: &[EncodingInfo] = &[EncodingInfo {
            opcode: ArmOpcode::ThumbAdcRR,
            name: "adcs",
            fmt: "!0C, !1C",
            operands: shape(&[OperandKind::Reg, OperandKind::Reg]),
        }];
        assert!(matches!(
            EncodingMap::load(BAD),
            Err(MetadataError::OutOfOrder { index: 0, .. })
        ));
    }
}
