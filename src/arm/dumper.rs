// This module produces the full per-method dump. The header reports the resolved method
// identity, the frame layout counters, code and bytecode sizes and the expansion factor; the
// promotion map follows twice, once compact (register or frame offset per virtual register)
// and once with every raw field. Then the instruction list is walked through the
// InstructionPrinter, the class-pointer and literal pools are listed, and a non-empty
// mapping table is rendered as a C array initializer. Every line goes to the caller's
// LineSink and is counted in the DumpSession.

//! Whole-unit dumper.

use super::printer::InstructionPrinter;
use super::registers::FP_REG_MASK;
use crate::core::config::DumpOptions;
use crate::core::session::DumpSession;
use crate::core::sink::LineSink;
use crate::core::symbols::SymbolResolver;
use crate::lir::{CompilationUnit, LirList, LocationKind};

/// Significant digits of the expansion factor, as a C++ stream prints floats.
const EXPANSION_DIGITS: usize = 6;

/// Dumps compilation units to a [`LineSink`].
pub struct UnitDumper<'d, 'arena> {
    printer: InstructionPrinter<'d>,
    symbols: &'d dyn SymbolResolver,
    session: &'d DumpSession<'arena>,
}

impl<'d, 'arena> UnitDumper<'d, 'arena> {
    pub fn new(
        options: DumpOptions,
        symbols: &'d dyn SymbolResolver,
        session: &'d DumpSession<'arena>,
    ) -> Self {
        Self {
            printer: InstructionPrinter::new(options, symbols),
            symbols,
            session,
        }
    }

    /// Writes the complete dump of `unit` to `sink`.
    pub fn dump(&self, unit: &CompilationUnit<'_>, sink: &mut dyn LineSink) {
        log::debug!("dumping {} ({} records)", unit.method, unit.len());
        let mut out = CountingSink {
            inner: sink,
            session: self.session,
        };

        self.dump_header(unit, &mut out);
        self.dump_promotion_map(unit, &mut out);
        self.dump_full_promotion_map(unit, &mut out);

        for (idx, _) in unit.iter(LirList::Instructions) {
            // The printer counts its own lines.
            self.printer.print(unit, idx, self.session, &mut *out.inner);
        }
        for list in [LirList::ClassPointers, LirList::Literals] {
            for (idx, _) in unit.iter(list) {
                for line in self.printer.render(unit, idx) {
                    out.emit(&line);
                }
            }
        }

        self.dump_mapping_table(unit, &mut out);
        self.session.record_unit_dumped();
    }

    fn dump_header(&self, unit: &CompilationUnit<'_>, out: &mut dyn LineSink) {
        let frame = &unit.frame;
        out.emit("/*");
        out.emit(&format!(
            "Dumping LIR insns for {}",
            self.symbols.pretty_method(unit.method)
        ));
        out.emit(&format!("Regs (excluding ins) : {}", frame.num_regs));
        out.emit(&format!("Ins                  : {}", frame.num_ins));
        out.emit(&format!("Outs                 : {}", frame.num_outs));
        out.emit(&format!("CoreSpills           : {}", frame.num_core_spills));
        out.emit(&format!("FPSpills             : {}", frame.num_fp_spills));
        out.emit(&format!("Padding              : {}", frame.num_padding));
        out.emit(&format!("Frame size           : {}", frame.frame_size));
        out.emit(&format!("Start of ins         : {}", frame.ins_offset));
        out.emit(&format!("Start of regs        : {}", frame.regs_offset));
        out.emit(&format!(
            "code size is {} bytes, Dalvik size is {}",
            unit.total_size,
            u64::from(unit.insns_size) * 2
        ));
        out.emit(&format!(
            "expansion factor: {}",
            format_general(expansion_factor(unit.total_size, unit.insns_size))
        ));
    }

    /// One line per virtual register: where its core half lives, plus the FP register.
    fn dump_promotion_map(&self, unit: &CompilationUnit<'_>, out: &mut dyn LineSink) {
        for (vreg, entry) in unit.promotion_map.iter().enumerate() {
            let fp = if entry.fp_location == LocationKind::PhysReg {
                format!(" : s{}", i32::from(entry.fp_reg) & FP_REG_MASK)
            } else {
                String::new()
            };
            let core = if entry.core_location == LocationKind::PhysReg {
                format!("r{}", entry.core_reg)
            } else {
                format!("SP+{}", unit.vreg_offset(vreg as u32))
            };
            out.emit(&format!("V[{vreg:02}] -> {core}{fp}"));
        }
    }

    fn dump_full_promotion_map(&self, unit: &CompilationUnit<'_>, out: &mut dyn LineSink) {
        for (vreg, entry) in unit.promotion_map.iter().enumerate() {
            out.emit(&format!(
                "{} -> CL:{}, CR:{}, FL:{}, FR:{}, - {}",
                vreg,
                entry.core_location as u8,
                entry.core_reg,
                entry.fp_location as u8,
                entry.fp_reg,
                u8::from(entry.first_in_pair)
            ));
        }
    }

    fn dump_mapping_table(&self, unit: &CompilationUnit<'_>, out: &mut dyn LineSink) {
        if unit.mapping_table.is_empty() {
            return;
        }
        let header = format!(
            "\n    MappingTable {}{}_{}_mappingTable[{}] = {{",
            self.symbols.declaring_class_descriptor(unit.method),
            self.symbols.method_name(unit.method),
            self.symbols.method_signature(unit.method),
            unit.mapping_table.len() * 2
        );
        out.emit(&header.replace(';', "_"));
        for entry in &unit.mapping_table {
            out.emit(&format!(
                "        {{0x{:08x}, 0x{:04x}}},",
                entry.native_offset, entry.dalvik_pc
            ));
        }
        out.emit("    };\n\n");
    }
}

/// Forwards to the caller's sink and counts lines in the session.
struct CountingSink<'s, 'arena> {
    inner: &'s mut dyn LineSink,
    session: &'s DumpSession<'arena>,
}

impl LineSink for CountingSink<'_, '_> {
    fn emit(&mut self, line: &str) {
        self.inner.emit(line);
        self.session.record_line_emitted();
    }
}

/// Generated bytes per bytecode byte, in single precision.
pub fn expansion_factor(total_size: u32, insns_size: u32) -> f32 {
    total_size as f32 / (insns_size as f32 * 2.0)
}

/// Formats `value` like C's `%g` with six significant digits.
pub fn format_general(value: f32) -> String {
    let value = f64::from(value);
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Round to the target precision first; the exponent may move (9.999995 -> 1e+01).
    let sci = format!("{:.*e}", EXPANSION_DIGITS - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= EXPANSION_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (EXPANSION_DIGITS as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
