// This module interprets the per-opcode format strings of the encoding table. A format is
// plain text with `!` escapes: `!!` prints a literal bang, and `!<slot><directive>` renders
// operand `slot` (0-3) of the record through one of the directive handlers below (register
// names, modified immediates, shift suffixes, branch targets, register lists, ...). The same
// scanner drives load-time validation in the encoding module, so a structural error seen
// here means the static table bypassed validation; the interpreter panics on it. Unknown
// directive letters and out-of-range table indices are valid-but-unrecognized input and
// render as inline error tokens instead.

//! Operand format-string interpreter.

use std::fmt::Write as _;

use super::encoding::{ArmOpcode, OperandKind};
use super::immediate::{decode_modified_imm, decode_negated_modified_imm};
use super::registers::{condition_name, core_reg_name, BarrierOption, FP_REG_MASK, SHIFT_NAMES};
use super::reglist::{core_reg_list, fp_reg_list};
use crate::core::error::FormatError;
use crate::lir::Lir;

/// Emitted for an unknown directive letter.
pub const DECODE_ERROR_DIRECTIVE: &str = "DecodeError1";
/// Emitted for an unknown barrier option.
pub const DECODE_ERROR_BARRIER: &str = "DecodeError2";
/// Emitted when a wide-branch head is not followed by its tail.
pub const DECODE_ERROR_UNPAIRED: &str = "DecodeError3";
/// Emitted for a register or condition index outside its table.
pub const DECODE_ERROR_INDEX: &str = "DecodeError4";

/// One lexical piece of a format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'f> {
    Text(&'f str),
    /// `!!`
    Bang,
    Directive { slot: usize, code: char },
}

/// Scanner over a format string.
pub struct FormatPieces<'f> {
    rest: &'f str,
}

impl<'f> FormatPieces<'f> {
    pub fn new(fmt: &'f str) -> Self {
        Self { rest: fmt }
    }

    fn fail(&mut self, err: FormatError) -> Option<Result<Piece<'f>, FormatError>> {
        self.rest = "";
        Some(Err(err))
    }
}

impl<'f> Iterator for FormatPieces<'f> {
    type Item = Result<Piece<'f>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let Some(escape) = self.rest.strip_prefix('!') else {
            let end = self.rest.find('!').unwrap_or(self.rest.len());
            let (text, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Some(Ok(Piece::Text(text)));
        };

        let mut chars = escape.chars();
        let slot_char = match chars.next() {
            Some('!') => {
                self.rest = chars.as_str();
                return Some(Ok(Piece::Bang));
            }
            Some(c) => c,
            None => return self.fail(FormatError::UnterminatedEscape),
        };
        let slot = match slot_char.to_digit(10) {
            Some(d) if d < 4 => d as usize,
            _ => return self.fail(FormatError::SlotOutOfRange { found: slot_char }),
        };
        let Some(code) = chars.next() else {
            return self.fail(FormatError::UnterminatedEscape);
        };
        self.rest = chars.as_str();
        Some(Ok(Piece::Directive { slot, code }))
    }
}

/// Operand shape a directive consumes, or `None` for unknown letters.
pub fn directive_operand_kind(code: char) -> Option<OperandKind> {
    match code {
        'C' | 's' | 'S' => Some(OperandKind::Reg),
        'm' | 'n' => Some(OperandKind::ModImm),
        'H' | 'B' | 'b' | 'h' | 'M' | 'd' | 'E' | 'F' | 'c' | 't' | 'u' | 'v' | 'R' | 'P'
        | 'Q' => Some(OperandKind::Int),
        _ => None,
    }
}

/// Everything a format string may look at while rendering one record.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'u, 'a> {
    pub opcode: ArmOpcode,
    pub lir: &'u Lir<'a>,
    /// Record that follows `lir` in emission order.
    pub next: Option<&'u Lir<'a>>,
    pub base_address: u32,
}

/// Renders `fmt` against the record in `ctx`.
///
/// # Panics
///
/// On a malformed format string (escape at end of string, slot digit
/// outside `0..4`); the encoding table is validated so this only fires for
/// formats that never went through [`super::encoding::EncodingMap::load`].
pub fn build_insn_string(fmt: &str, ctx: &FormatContext<'_, '_>) -> String {
    let mut buf = String::with_capacity(fmt.len() + 16);
    for piece in FormatPieces::new(fmt) {
        match piece {
            Ok(Piece::Text(text)) => buf.push_str(text),
            Ok(Piece::Bang) => buf.push('!'),
            Ok(Piece::Directive { slot, code }) => {
                let value = ctx.lir.operands[slot].value();
                render_directive(&mut buf, code, value, ctx);
            }
            Err(e) => panic!("malformed format string {fmt:?}: {e}"),
        }
    }
    buf
}

fn render_directive(buf: &mut String, code: char, value: i32, ctx: &FormatContext<'_, '_>) {
    // Writing into a String cannot fail.
    let _ = match code {
        'H' => {
            if value != 0 {
                write!(buf, ", {} {}", SHIFT_NAMES[(value & 0x3) as usize], value >> 2)
            } else {
                Ok(())
            }
        }
        'B' => {
            let name = BarrierOption::from_value(value)
                .map(BarrierOption::name)
                .unwrap_or(DECODE_ERROR_BARRIER);
            buf.push_str(name);
            Ok(())
        }
        'b' => write!(buf, "{:04b}", value & 0xf),
        'n' => write_imm(buf, decode_negated_modified_imm(value as u32)),
        'm' => write_imm(buf, decode_modified_imm(value as u32)),
        's' => write!(buf, "s{}", value & FP_REG_MASK),
        'S' => write!(buf, "d{}", (value & FP_REG_MASK) >> 1),
        'h' => write!(buf, "{:04x}", value as u32),
        'M' | 'd' => write!(buf, "{value}"),
        'C' => {
            buf.push_str(core_reg_name(value).unwrap_or(DECODE_ERROR_INDEX));
            Ok(())
        }
        'E' => write!(buf, "{}", value.wrapping_mul(4)),
        'F' => write!(buf, "{}", value.wrapping_mul(2)),
        'c' => {
            buf.push_str(condition_name(value).unwrap_or(DECODE_ERROR_INDEX));
            Ok(())
        }
        't' => {
            let target = branch_target(ctx.base_address, ctx.lir.offset, value);
            match ctx.lir.target {
                Some(label) => write!(buf, "0x{target:08x} (L{label})"),
                None => write!(buf, "0x{target:08x}"),
            }
        }
        'u' => match ctx.next.filter(|next| is_wide_branch_tail(next)) {
            Some(next) => {
                let low = next.operands[0].value();
                let target = wide_branch_target(ctx.base_address, ctx.lir.offset, value, low);
                write!(buf, "{target:#x}")
            }
            None => {
                log::debug!("wide branch at {:#06x} has no tail", ctx.lir.offset);
                buf.push_str(DECODE_ERROR_UNPAIRED);
                Ok(())
            }
        },
        'v' => {
            buf.push_str("see above");
            Ok(())
        }
        'R' => {
            buf.push_str(&core_reg_list(ctx.opcode, value as u32 & 0xffff));
            Ok(())
        }
        'P' => {
            buf.push_str(&fp_reg_list(value, 16));
            Ok(())
        }
        'Q' => {
            buf.push_str(&fp_reg_list(value, 0));
            Ok(())
        }
        _ => {
            buf.push_str(DECODE_ERROR_DIRECTIVE);
            Ok(())
        }
    };
}

fn is_wide_branch_tail(lir: &Lir<'_>) -> bool {
    lir.opcode.as_insn().is_some_and(ArmOpcode::is_wide_branch_tail)
}

/// `<dec> [<hex>]`, with the hex part spelled like C's `%#x`.
fn write_imm(buf: &mut String, value: u32) -> std::fmt::Result {
    write!(buf, "{} [{}]", value as i32, alt_hex(value))
}

/// C `%#x`: zero prints without the prefix.
pub fn alt_hex(value: u32) -> String {
    if value == 0 {
        "0".to_string()
    } else {
        format!("{value:#x}")
    }
}

/// Target of a PC-relative Thumb branch with halfword displacement `disp`.
///
/// All address arithmetic wraps at 32 bits.
pub fn branch_target(base_address: u32, offset: u32, disp: i32) -> u32 {
    let pc = base_address.wrapping_add(offset).wrapping_add(4);
    pc.wrapping_add(disp.wrapping_shl(1) as u32)
}

/// Target of a `bl`/`blx` pair: `high` is the head's 11-bit field, `low` the tail's.
pub fn wide_branch_target(base_address: u32, offset: u32, high: i32, low: i32) -> u32 {
    let pc = base_address.wrapping_add(offset).wrapping_add(4) & !3;
    let high = (high.wrapping_shl(21) >> 9) as u32;
    let low = low.wrapping_shl(1) as u32;
    pc.wrapping_add(high).wrapping_add(low) & 0xffff_fffc
}
