// This module holds the read-only data model the disassembler walks: LIR records, their
// tagged operand slots, and the per-method CompilationUnit snapshot. Records live in a single
// arena (a Vec addressed by LirIdx) and are threaded into three forward-linked lists through
// explicit `next` indices: the instruction stream, the class-pointer literal pool, and the
// numeric literal pool. Appending checks every operand against the shapes its opcode
// declares, so the format interpreter can read numeric slots without reinterpreting payloads.
// Strings and callsite payloads are borrowed from the session arena with lifetime 'a.

//! LIR records and compilation-unit snapshots.
//!
//! # Listing Format
//!
//! ```text
//! ; comments start with semicolon
//! method 1
//! frame regs=2 ins=1 outs=0 core_spills=2 fp_spills=0 padding=0 size=16 ins_offset=20 regs_offset=12
//! insn kArmPseudoMethodEntry
//! insn kThumbPush 0x110 at=0x0
//! insn kThumbBUncond 2 at=0x2 target=done
//! insn kArmPseudoTargetLabel label=done
//! ```

use std::fmt;

use crate::arm::encoding::OperandKind;
use crate::arm::opcode::{LirOpcode, PoolKind};
use crate::arm::resource::ResourceMask;
use crate::core::error::{DumpError, DumpResult};
use crate::core::symbols::MethodId;

pub mod check;
pub mod parser;

pub use check::{CheckDirective, TestRunner, TestSpec};
pub use parser::{parse_listing, Listing};

/// Stable index of a record in a unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LirIdx(u32);

impl LirIdx {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LirIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Class-literal payload referenced from the class-pointer pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallsiteInfo<'a> {
    pub class_descriptor: &'a str,
}

/// One operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operand<'a> {
    #[default]
    Empty,
    Int(i32),
    Reg(i32),
    /// Encoded 12-bit modified immediate field.
    ModImm(i32),
    Str(&'a str),
    Callsite(&'a CallsiteInfo<'a>),
}

impl<'a> Operand<'a> {
    pub fn kind(&self) -> OperandKind {
        match self {
            Self::Empty => OperandKind::Empty,
            Self::Int(_) => OperandKind::Int,
            Self::Reg(_) => OperandKind::Reg,
            Self::ModImm(_) => OperandKind::ModImm,
            Self::Str(_) => OperandKind::Str,
            Self::Callsite(_) => OperandKind::Callsite,
        }
    }

    /// Numeric payload. Non-numeric slots read as zero; shape checks on
    /// append keep them out of the slots format directives read.
    pub fn value(&self) -> i32 {
        match *self {
            Self::Int(v) | Self::Reg(v) | Self::ModImm(v) => v,
            Self::Empty | Self::Str(_) | Self::Callsite(_) => 0,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callsite(&self) -> Option<&'a CallsiteInfo<'a>> {
        match *self {
            Self::Callsite(info) => Some(info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LirFlags {
    /// Removed by an optimization pass.
    pub squashed: bool,
    /// Kept for bookkeeping, never emitted.
    pub is_nop: bool,
}

/// One low-level instruction or bookkeeping record.
#[derive(Debug, Clone)]
pub struct Lir<'a> {
    pub opcode: LirOpcode,
    pub operands: [Operand<'a>; 4],
    pub flags: LirFlags,
    /// Byte offset in the code buffer.
    pub offset: u32,
    /// Bytecode offset this record was generated for.
    pub dalvik_offset: u32,
    pub use_mask: ResourceMask,
    pub def_mask: ResourceMask,
    /// Dalvik alias payload: low 16 bits vreg, bit 31 wide.
    pub alias_info: u32,
    pub next: Option<LirIdx>,
    pub target: Option<LirIdx>,
}

impl<'a> Lir<'a> {
    pub fn new(opcode: LirOpcode) -> Self {
        Self {
            opcode,
            operands: [Operand::Empty; 4],
            flags: LirFlags::default(),
            offset: 0,
            dalvik_offset: 0,
            use_mask: ResourceMask::NONE,
            def_mask: ResourceMask::NONE,
            alias_info: 0,
            next: None,
            target: None,
        }
    }

    pub fn with_operands(mut self, operands: &[Operand<'a>]) -> Self {
        for (slot, operand) in self.operands.iter_mut().zip(operands) {
            *slot = *operand;
        }
        self
    }

    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Checks every slot against the shapes the opcode declares.
    pub fn check_shape(&self) -> DumpResult<()> {
        let declared = self.opcode.operand_kinds();
        for (slot, (operand, &expected)) in self.operands.iter().zip(&declared).enumerate() {
            let found = operand.kind();
            if found != expected {
                return Err(DumpError::OperandShape {
                    opcode: self.opcode.to_string(),
                    slot,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Which forward-linked list a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LirList {
    Instructions,
    ClassPointers,
    Literals,
}

impl LirList {
    fn slot(self) -> usize {
        match self {
            Self::Instructions => 0,
            Self::ClassPointers => 1,
            Self::Literals => 2,
        }
    }
}

/// Frame statistics reported in the dump header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    /// Virtual registers, excluding ins.
    pub num_regs: u32,
    pub num_ins: u32,
    pub num_outs: u32,
    pub num_core_spills: u32,
    pub num_fp_spills: u32,
    pub num_padding: u32,
    pub frame_size: u32,
    pub ins_offset: i32,
    pub regs_offset: i32,
}

/// Where the allocator placed one half of a virtual register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LocationKind {
    #[default]
    DalvikFrame = 0,
    PhysReg = 1,
    Spill = 2,
}

/// Promotion decision for one virtual register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionEntry {
    pub core_location: LocationKind,
    pub core_reg: u8,
    pub fp_location: LocationKind,
    pub fp_reg: u8,
    pub first_in_pair: bool,
}

/// Native offset to bytecode position pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    pub native_offset: u32,
    pub dalvik_pc: u32,
}

/// Everything the dumper reports about one compiled method.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit<'a> {
    pub method: MethodId,
    pub frame: FrameLayout,
    /// Generated code size in bytes.
    pub total_size: u32,
    /// Bytecode size in 16-bit code units.
    pub insns_size: u32,
    pub promotion_map: Vec<PromotionEntry>,
    pub mapping_table: Vec<MappingEntry>,
    records: Vec<Lir<'a>>,
    heads: [Option<LirIdx>; 3],
    tails: [Option<LirIdx>; 3],
}

impl<'a> CompilationUnit<'a> {
    pub fn new(method: MethodId) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Appends `lir` to the end of `list`, returning its arena index.
    pub fn append(&mut self, list: LirList, mut lir: Lir<'a>) -> DumpResult<LirIdx> {
        let pool_ok = match (list, lir.opcode) {
            (LirList::Instructions, LirOpcode::Pool(_)) => false,
            (LirList::Instructions, _) => true,
            (LirList::ClassPointers, op) => op == LirOpcode::Pool(PoolKind::ClassPointer),
            (LirList::Literals, op) => op == LirOpcode::Pool(PoolKind::Word),
        };
        if !pool_ok {
            return Err(DumpError::MisplacedRecord {
                opcode: lir.opcode.to_string(),
                list: format!("{list:?}"),
            });
        }
        lir.check_shape()?;

        let idx = LirIdx::new(self.records.len());
        lir.next = None;
        self.records.push(lir);

        let slot = list.slot();
        match self.tails[slot] {
            Some(tail) => self.records[tail.index()].next = Some(idx),
            None => self.heads[slot] = Some(idx),
        }
        self.tails[slot] = Some(idx);
        Ok(idx)
    }

    /// Appends an instruction or pseudo op.
    pub fn push_insn(&mut self, lir: Lir<'a>) -> DumpResult<LirIdx> {
        self.append(LirList::Instructions, lir)
    }

    /// Adds a class-pointer literal at `offset`.
    pub fn push_class_pointer(
        &mut self,
        offset: u32,
        info: &'a CallsiteInfo<'a>,
    ) -> DumpResult<LirIdx> {
        let lir = Lir::new(LirOpcode::Pool(PoolKind::ClassPointer))
            .with_operands(&[Operand::Callsite(info)])
            .at(offset);
        self.append(LirList::ClassPointers, lir)
    }

    /// Adds a numeric literal word at `offset`.
    pub fn push_literal(&mut self, offset: u32, value: i32) -> DumpResult<LirIdx> {
        let lir = Lir::new(LirOpcode::Pool(PoolKind::Word))
            .with_operands(&[Operand::Int(value)])
            .at(offset);
        self.append(LirList::Literals, lir)
    }

    /// Points the branch at `from` to the record at `to`.
    pub fn set_target(&mut self, from: LirIdx, to: LirIdx) -> DumpResult<()> {
        if to.index() >= self.records.len() {
            return Err(DumpError::InvalidRecord { index: to.index() });
        }
        let lir = self
            .records
            .get_mut(from.index())
            .ok_or(DumpError::InvalidRecord { index: from.index() })?;
        lir.target = Some(to);
        Ok(())
    }

    pub fn get(&self, idx: LirIdx) -> Option<&Lir<'a>> {
        self.records.get(idx.index())
    }

    /// Record following `idx` in its list.
    pub fn next_of(&self, idx: LirIdx) -> Option<&Lir<'a>> {
        self.get(idx)?.next.and_then(|next| self.get(next))
    }

    /// Walks `list` from its head.
    pub fn iter(&self, list: LirList) -> LirIter<'_, 'a> {
        LirIter {
            unit: self,
            cursor: self.heads[list.slot()],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Frame offset of virtual register `vreg` when it lives in the frame.
    pub fn vreg_offset(&self, vreg: u32) -> i32 {
        let frame = &self.frame;
        if vreg < frame.num_regs {
            frame.regs_offset + ((vreg as i32) << 2)
        } else {
            frame.ins_offset + (((vreg - frame.num_regs) as i32) << 2)
        }
    }
}

/// Forward iterator over one list of a unit.
pub struct LirIter<'u, 'a> {
    unit: &'u CompilationUnit<'a>,
    cursor: Option<LirIdx>,
}

impl<'u, 'a> Iterator for LirIter<'u, 'a> {
    type Item = (LirIdx, &'u Lir<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let lir = self.unit.get(idx)?;
        self.cursor = lir.next;
        Some((idx, lir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::opcode::{ArmOpcode, PseudoOp};

    fn insn(opcode: ArmOpcode, operands: &[Operand<'static>]) -> Lir<'static> {
        Lir::new(LirOpcode::Insn(opcode)).with_operands(operands)
    }

    #[test]
    fn test_lists_are_independent() {
        static INFO: CallsiteInfo<'static> = CallsiteInfo {
            class_descriptor: "Ljava/lang/String;",
        };
        let mut unit = CompilationUnit::new(MethodId(3));
        let a = unit.push_insn(Lir::new(LirOpcode::Pseudo(PseudoOp::MethodEntry))).unwrap();
        let lit = unit.push_literal(0x40, 7).unwrap();
        let b = unit
            .push_insn(insn(ArmOpcode::ThumbMovImm, &[Operand::Reg(0), Operand::Int(1)]))
            .unwrap();
        let class = unit.push_class_pointer(0x44, &INFO).unwrap();

        let insns: Vec<_> = unit.iter(LirList::Instructions).map(|(idx, _)| idx).collect();
        assert_eq!(insns, vec![a, b]);
        let literals: Vec<_> = unit.iter(LirList::Literals).map(|(idx, _)| idx).collect();
        assert_eq!(literals, vec![lit]);
        let classes: Vec<_> = unit.iter(LirList::ClassPointers).map(|(idx, _)| idx).collect();
        assert_eq!(classes, vec![class]);
        assert_eq!(
            unit.next_of(a).map(|l| l.opcode),
            Some(LirOpcode::Insn(ArmOpcode::ThumbMovImm))
        );
        assert!(unit.next_of(b).is_none());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut unit = CompilationUnit::new(MethodId(0));
        let err = unit
            .push_insn(insn(ArmOpcode::ThumbMovImm, &[Operand::Int(0), Operand::Int(1)]))
            .unwrap_err();
        assert!(matches!(
            err,
            DumpError::OperandShape { slot: 0, expected: OperandKind::Reg, .. }
        ));
        assert!(unit.is_empty());
    }

    #[test]
    fn test_pool_entries_stay_in_pools() {
        let mut unit = CompilationUnit::new(MethodId(0));
        let word = Lir::new(LirOpcode::Pool(PoolKind::Word)).with_operands(&[Operand::Int(1)]);
        assert!(unit.append(LirList::Instructions, word.clone()).is_err());
        assert!(unit.append(LirList::ClassPointers, word.clone()).is_err());
        assert!(unit.append(LirList::Literals, word).is_ok());
    }

    #[test]
    fn test_vreg_offset() {
        let mut unit = CompilationUnit::new(MethodId(0));
        unit.frame.num_regs = 2;
        unit.frame.regs_offset = 12;
        unit.frame.ins_offset = 40;
        assert_eq!(unit.vreg_offset(0), 12);
        assert_eq!(unit.vreg_offset(1), 16);
        assert_eq!(unit.vreg_offset(2), 40);
        assert_eq!(unit.vreg_offset(3), 44);
    }

    #[test]
    fn test_set_target_bounds() {
        let mut unit = CompilationUnit::new(MethodId(0));
        let a = unit.push_insn(insn(ArmOpcode::ThumbBUncond, &[Operand::Int(0)])).unwrap();
        assert!(unit.set_target(a, LirIdx::new(5)).is_err());
        unit.set_target(a, a).unwrap();
        assert_eq!(unit.get(a).and_then(|l| l.target), Some(a));
    }
}
