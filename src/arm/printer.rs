// This module turns one LIR record into its listing lines. Pseudo ops are matched
// individually and print as banners (method entry/exit, barriers, block offsets, bytecode
// boundaries) or labels named after the record's arena index. Real instructions render
// their mnemonic and operand format strings through the format interpreter, with the record
// that follows them as context for wide-branch pairs. Squashed and no-op records are left
// out unless DumpOptions::dump_nops is set; resource masks follow the primary line when
// DumpOptions::dump_resource_masks is set. Pool words render as `.class`/`.word` lines.

//! Per-record instruction printer.

use super::format::{alt_hex, build_insn_string, FormatContext};
use super::opcode::{ArmOpcode, LirOpcode, PoolKind, PseudoOp};
use super::resource::render_resource_mask;
use crate::core::config::DumpOptions;
use crate::core::session::DumpSession;
use crate::core::sink::LineSink;
use crate::core::symbols::SymbolResolver;
use crate::lir::{CompilationUnit, Lir, LirIdx};

/// Renders records of one unit according to a set of [`DumpOptions`].
pub struct InstructionPrinter<'p> {
    options: DumpOptions,
    symbols: &'p dyn SymbolResolver,
}

impl<'p> InstructionPrinter<'p> {
    pub fn new(options: DumpOptions, symbols: &'p dyn SymbolResolver) -> Self {
        Self { options, symbols }
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    /// Whether the record at `lir` is left out of the listing.
    pub fn is_suppressed(&self, lir: &Lir<'_>) -> bool {
        matches!(lir.opcode, LirOpcode::Insn(_))
            && (lir.flags.squashed || lir.flags.is_nop)
            && !self.options.dump_nops
    }

    /// Lines for the record at `idx`, empty when it is suppressed or unknown.
    pub fn render(&self, unit: &CompilationUnit<'_>, idx: LirIdx) -> Vec<String> {
        let Some(lir) = unit.get(idx) else {
            return Vec::new();
        };
        if self.is_suppressed(lir) {
            log::trace!("suppressed {} at {:#06x}", lir.opcode, lir.offset);
            return Vec::new();
        }

        let mut lines = Vec::with_capacity(1);
        match lir.opcode {
            LirOpcode::Pseudo(op) => lines.push(self.render_pseudo(unit, idx, op, lir)),
            LirOpcode::Insn(op) => lines.push(self.render_insn(op, lir, unit.next_of(idx))),
            LirOpcode::Pool(kind) => lines.push(self.render_pool_entry(kind, lir)),
        }

        if self.options.dump_resource_masks {
            lines.extend(render_resource_mask(lir.use_mask, Some(lir)).map(|m| format!("use: {m}")));
            lines.extend(render_resource_mask(lir.def_mask, Some(lir)).map(|m| format!("def: {m}")));
        }
        lines
    }

    /// Renders the record at `idx` into `sink`, updating the session counters.
    pub fn print(
        &self,
        unit: &CompilationUnit<'_>,
        idx: LirIdx,
        session: &DumpSession<'_>,
        sink: &mut dyn LineSink,
    ) {
        let Some(lir) = unit.get(idx) else {
            return;
        };
        if self.is_suppressed(lir) {
            session.record_suppressed();
        } else if matches!(lir.opcode, LirOpcode::Insn(_)) {
            session.record_instruction_printed();
        }
        for line in self.render(unit, idx) {
            sink.emit(&line);
            session.record_line_emitted();
        }
    }

    fn render_pseudo(
        &self,
        unit: &CompilationUnit<'_>,
        idx: LirIdx,
        op: PseudoOp,
        lir: &Lir<'_>,
    ) -> String {
        let dest = lir.operands[0];
        let text = dest.as_str().unwrap_or_default();
        match op {
            PseudoOp::MethodEntry => {
                format!("-------- method entry {}", self.symbols.pretty_method(unit.method))
            }
            PseudoOp::MethodExit => "-------- Method_Exit".to_string(),
            PseudoOp::Barrier => "-------- BARRIER".to_string(),
            PseudoOp::Extended => format!("-------- {text}"),
            PseudoOp::SsaRep => format!("-------- kMirOpPhi: {text}"),
            PseudoOp::EntryBlock => format!("-------- entry offset: 0x{:x}", dest.value()),
            PseudoOp::ExitBlock => format!("-------- exit offset: 0x{:x}", dest.value()),
            PseudoOp::DalvikByteCodeBoundary => {
                format!("-------- dalvik offset: 0x{:x} @ {text}", lir.dalvik_offset)
            }
            PseudoOp::PseudoAlign4 => format!(
                "{} (0x{:x}): .align4",
                self.options.address_of(lir.offset),
                lir.offset
            ),
            PseudoOp::EhBlockLabel => "Exception_Handling:".to_string(),
            PseudoOp::TargetLabel | PseudoOp::NormalBlockLabel => format!("L{idx}:"),
            PseudoOp::ThrowTarget => format!("LT{idx}:"),
            PseudoOp::SuspendTarget => format!("LS{idx}:"),
            PseudoOp::CaseLabel => {
                let value = dest.value();
                format!("LC{idx}: Case target 0x{value:x}|{value}")
            }
        }
    }

    fn render_insn(&self, opcode: ArmOpcode, lir: &Lir<'_>, next: Option<&Lir<'_>>) -> String {
        let info = opcode.encoding();
        let ctx = FormatContext {
            opcode,
            lir,
            next,
            base_address: self.options.base_address,
        };
        let name = build_insn_string(info.name, &ctx);
        let operands = build_insn_string(info.fmt, &ctx);
        format!(
            "{:#x} ({:04x}): {:<9}{}{}{}",
            self.options.address_of(lir.offset),
            lir.offset,
            name,
            operands,
            if lir.flags.is_nop { "(nop)" } else { "" },
            if lir.flags.squashed { "(squashed)" } else { "" },
        )
    }

    /// `.class`/`.word` line of a literal pool entry.
    fn render_pool_entry(&self, kind: PoolKind, lir: &Lir<'_>) -> String {
        let addr = self.options.address_of(lir.offset);
        match kind {
            PoolKind::ClassPointer => {
                let descriptor = lir.operands[0]
                    .as_callsite()
                    .map(|info| info.class_descriptor)
                    .unwrap_or_default();
                format!("{addr:x} ({:04x}): .class ({descriptor})", lir.offset)
            }
            PoolKind::Word => format!(
                "{addr:x} ({:04x}): .word ({})",
                lir.offset,
                alt_hex(lir.operands[0].value() as u32)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::resource::ResourceMask;
    use crate::core::symbols::{MethodId, MethodSymbol, SymbolTable};
    use crate::lir::{CallsiteInfo, LirList, Operand};
    use bumpalo::Bump;

    fn symbols() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.insert(
            MethodId(1),
            MethodSymbol {
                class_descriptor: "LFib;".to_string(),
                name: "fib".to_string(),
                signature: "(I)I".to_string(),
            },
        );
        table
    }

    fn pseudo(op: PseudoOp, operands: &[Operand<'static>]) -> Lir<'static> {
        Lir::new(LirOpcode::Pseudo(op)).with_operands(operands)
    }

    fn insn(op: ArmOpcode, operands: &[Operand<'static>]) -> Lir<'static> {
        Lir::new(LirOpcode::Insn(op)).with_operands(operands)
    }

    fn render_one(options: DumpOptions, lir: Lir<'static>) -> Vec<String> {
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        let idx = unit.push_insn(lir).unwrap();
        InstructionPrinter::new(options, &symbols).render(&unit, idx)
    }

    #[test]
    fn test_banner_pseudo_ops() {
        let options = DumpOptions::default();
        assert_eq!(
            render_one(options, pseudo(PseudoOp::MethodEntry, &[])),
            vec!["-------- method entry int Fib.fib(int)"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::MethodExit, &[])),
            vec!["-------- Method_Exit"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::Barrier, &[])),
            vec!["-------- BARRIER"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::Extended, &[Operand::Str("hello")])),
            vec!["-------- hello"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::SsaRep, &[Operand::Str("v0 <- v1")])),
            vec!["-------- kMirOpPhi: v0 <- v1"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::EntryBlock, &[Operand::Int(0x1a)])),
            vec!["-------- entry offset: 0x1a"]
        );
        assert_eq!(
            render_one(options, pseudo(PseudoOp::ExitBlock, &[Operand::Int(0)])),
            vec!["-------- exit offset: 0x0"]
        );
    }

    #[test]
    fn test_boundary_and_alignment() {
        let mut boundary = pseudo(PseudoOp::DalvikByteCodeBoundary, &[Operand::Str("const/4 v0, #1")]);
        boundary.dalvik_offset = 0x12;
        assert_eq!(
            render_one(DumpOptions::default(), boundary),
            vec!["-------- dalvik offset: 0x12 @ const/4 v0, #1"]
        );

        let align = pseudo(PseudoOp::PseudoAlign4, &[]).at(0x1e);
        assert_eq!(
            render_one(DumpOptions::new().with_base_address(0x100), align),
            vec!["286 (0x1e): .align4"]
        );
    }

    #[test]
    fn test_labels_use_arena_index() {
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        unit.push_insn(pseudo(PseudoOp::MethodEntry, &[])).unwrap();
        let target = unit.push_insn(pseudo(PseudoOp::TargetLabel, &[])).unwrap();
        let block = unit.push_insn(pseudo(PseudoOp::NormalBlockLabel, &[])).unwrap();
        let throw = unit.push_insn(pseudo(PseudoOp::ThrowTarget, &[])).unwrap();
        let suspend = unit.push_insn(pseudo(PseudoOp::SuspendTarget, &[])).unwrap();
        let case = unit.push_insn(pseudo(PseudoOp::CaseLabel, &[Operand::Int(26)])).unwrap();
        let eh = unit.push_insn(pseudo(PseudoOp::EhBlockLabel, &[])).unwrap();

        let printer = InstructionPrinter::new(DumpOptions::default(), &symbols);
        assert_eq!(printer.render(&unit, target), vec!["L1:"]);
        assert_eq!(printer.render(&unit, block), vec!["L2:"]);
        assert_eq!(printer.render(&unit, throw), vec!["LT3:"]);
        assert_eq!(printer.render(&unit, suspend), vec!["LS4:"]);
        assert_eq!(printer.render(&unit, case), vec!["LC5: Case target 0x1a|26"]);
        assert_eq!(printer.render(&unit, eh), vec!["Exception_Handling:"]);
    }

    #[test]
    fn test_real_instruction_line() {
        let lines = render_one(
            DumpOptions::default(),
            insn(ArmOpcode::ThumbAddRRR, &[Operand::Reg(0), Operand::Reg(1), Operand::Reg(13)])
                .at(0x24),
        );
        assert_eq!(lines, vec!["0x24 (0024): adds     r0, r1, sp"]);

        // zero is still hex, never "(nil)"
        let lines = render_one(
            DumpOptions::default(),
            insn(ArmOpcode::ThumbAddRRR, &[Operand::Reg(0), Operand::Reg(1), Operand::Reg(13)]),
        );
        assert_eq!(lines, vec!["0x0 (0000): adds     r0, r1, sp"]);
    }

    #[test]
    fn test_conditional_mnemonic_and_target_label() {
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        let branch = unit
            .push_insn(insn(ArmOpcode::ThumbBCond, &[Operand::Int(3), Operand::Int(1)]).at(0x4))
            .unwrap();
        let label = unit.push_insn(pseudo(PseudoOp::TargetLabel, &[])).unwrap();
        unit.set_target(branch, label).unwrap();

        let printer = InstructionPrinter::new(DumpOptions::default(), &symbols);
        assert_eq!(
            printer.render(&unit, branch),
            vec!["0x4 (0004): bne      0x0000000e (L1)"]
        );
    }

    #[test]
    fn test_wide_branch_pair() {
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        let head = unit.push_insn(insn(ArmOpcode::ThumbBl1, &[Operand::Int(0)]).at(0x2)).unwrap();
        let tail = unit.push_insn(insn(ArmOpcode::ThumbBl2, &[Operand::Int(0x10)]).at(0x4)).unwrap();
        let printer = InstructionPrinter::new(DumpOptions::default(), &symbols);
        assert_eq!(printer.render(&unit, head), vec!["0x2 (0002): bl_1     0x24"]);
        assert_eq!(printer.render(&unit, tail), vec!["0x4 (0004): bl_2     see above"]);
    }

    #[test]
    fn test_nop_and_squashed_suppression() {
        let mut nop = insn(ArmOpcode::ThumbMovRR, &[Operand::Reg(0), Operand::Reg(0)]).at(0x8);
        nop.flags.is_nop = true;
        assert!(render_one(DumpOptions::default(), nop.clone()).is_empty());
        assert_eq!(
            render_one(DumpOptions::new().with_dump_nops(true), nop.clone()),
            vec!["0x8 (0008): movs     r0, r0(nop)"]
        );

        nop.flags.is_nop = false;
        nop.flags.squashed = true;
        assert!(render_one(DumpOptions::default(), nop.clone()).is_empty());
        assert_eq!(
            render_one(DumpOptions::new().with_dump_nops(true), nop),
            vec!["0x8 (0008): movs     r0, r0(squashed)"]
        );
    }

    #[test]
    fn test_resource_mask_lines() {
        let mut lir = insn(ArmOpcode::ThumbCmpRI8, &[Operand::Reg(2), Operand::Int(0)]);
        lir.use_mask = ResourceMask::reg(2);
        lir.def_mask = ResourceMask::CCODE;

        assert_eq!(render_one(DumpOptions::default(), lir.clone()).len(), 1);
        assert_eq!(
            render_one(DumpOptions::new().with_resource_masks(true), lir.clone()),
            vec!["0x0 (0000): cmp      r2, #0", "use: 2", "def: cc"]
        );

        lir.flags.is_nop = true;
        assert!(render_one(DumpOptions::new().with_resource_masks(true), lir).is_empty());
    }

    #[test]
    fn test_pool_entries() {
        static INFO: CallsiteInfo<'static> = CallsiteInfo {
            class_descriptor: "Ljava/lang/Object;",
        };
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        unit.push_class_pointer(0x30, &INFO).unwrap();
        unit.push_literal(0x34, 0).unwrap();
        unit.push_literal(0x38, -1).unwrap();

        let printer = InstructionPrinter::new(DumpOptions::default(), &symbols);
        let classes: Vec<_> = unit
            .iter(LirList::ClassPointers)
            .flat_map(|(idx, _)| printer.render(&unit, idx))
            .collect();
        assert_eq!(classes, vec!["30 (0030): .class (Ljava/lang/Object;)"]);
        let words: Vec<_> = unit
            .iter(LirList::Literals)
            .flat_map(|(idx, _)| printer.render(&unit, idx))
            .collect();
        assert_eq!(words, vec!["34 (0034): .word (0)", "38 (0038): .word (0xffffffff)"]);
    }

    #[test]
    fn test_print_updates_session() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let symbols = symbols();
        let mut unit = CompilationUnit::new(MethodId(1));
        let a = unit.push_insn(pseudo(PseudoOp::MethodExit, &[])).unwrap();
        let mut nop = insn(ArmOpcode::ThumbMovRR, &[Operand::Reg(1), Operand::Reg(1)]);
        nop.flags.is_nop = true;
        let b = unit.push_insn(nop).unwrap();
        let c = unit
            .push_insn(insn(ArmOpcode::ThumbMovRR, &[Operand::Reg(1), Operand::Reg(2)]))
            .unwrap();

        let printer = InstructionPrinter::new(DumpOptions::default(), &symbols);
        let mut lines: Vec<String> = Vec::new();
        for idx in [a, b, c] {
            printer.print(&unit, idx, &session, &mut lines);
        }
        assert_eq!(lines.len(), 2);
        let stats = session.stats();
        assert_eq!(stats.lines_emitted, 2);
        assert_eq!(stats.instructions_printed, 1);
        assert_eq!(stats.records_suppressed, 1);
    }

    #[test]
    fn test_addresses_wrap_at_32_bits() {
        let bx = insn(ArmOpcode::ThumbBx, &[Operand::Reg(14)]).at(0x4);
        assert_eq!(
            render_one(DumpOptions::new().with_base_address(u32::MAX), bx),
            vec!["0x3 (0004): bx       lr"]
        );

        // the line address and the branch target agree on the wrapped base
        let branch = insn(ArmOpcode::ThumbBUncond, &[Operand::Int(0)]).at(0x10);
        assert_eq!(
            render_one(DumpOptions::new().with_base_address(0xffff_fff0), branch),
            vec!["0x0 (0010): b        0x00000004"]
        );

        let align = pseudo(PseudoOp::PseudoAlign4, &[]).at(0x2);
        assert_eq!(
            render_one(DumpOptions::new().with_base_address(u32::MAX), align),
            vec!["1 (0x2): .align4"]
        );
    }
}
