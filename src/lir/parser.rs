//! Textual LIR listing parser.
//!
//! A listing describes one compilation unit, one directive per line:
//!
//! ```text
//! method 1
//! symbol 1 Lcom/example/Fib; fib (I)I
//! frame regs=2 ins=1 outs=0 core_spills=2 size=32 ins_offset=36 regs_offset=12
//! code_size 24
//! dalvik_size 6
//! promote 0 core=reg:5 fp=frame
//! promote 1 core=frame fp=reg:48 pair
//! insn kArmPseudoTargetLabel label=loop
//! insn kThumbBCond 0 1 at=0x6 target=loop use=0x1000000000000 nop
//! class 0x30 "Ljava/lang/String;"
//! word 0x34 0x1234
//! map 0x4 0x0
//! ```
//!
//! A token starting with `;` comments out the rest of its line. Operand
//! tokens are converted by the slot shapes the opcode declares: register
//! slots take `r0`..`r15`, `sp`/`lr`/`pc`, `rSELF`, `s<n>`, `d<n>` or a raw
//! id; modified-immediate slots take the raw 12-bit field or `#<value>`;
//! string slots take a double-quoted string. A record without `at=` keeps
//! the offset of the record before it.

use std::path::Path;

use hashbrown::HashMap;

use super::{CompilationUnit, Lir, LirIdx, LocationKind, MappingEntry, Operand, PromotionEntry};
use crate::arm::encoding::{encoding_map, OperandKind};
use crate::arm::immediate::encode_modified_imm;
use crate::arm::opcode::{LirOpcode, PseudoOp};
use crate::arm::registers::{core_reg_by_name, double_reg, single_reg};
use crate::arm::resource::ResourceMask;
use crate::core::error::{DumpError, DumpResult};
use crate::core::session::DumpSession;
use crate::core::symbols::{MethodId, MethodSymbol, SymbolTable};

/// A parsed listing: the unit plus the symbols it declared.
#[derive(Debug)]
pub struct Listing<'a> {
    pub unit: CompilationUnit<'a>,
    pub symbols: SymbolTable,
}

/// Parses `text` into a [`Listing`], interning strings in `session`.
pub fn parse_listing<'a>(session: &DumpSession<'a>, text: &str) -> DumpResult<Listing<'a>> {
    let parser = Parser::new(session, text);
    parser.parse()
}

/// Reads and parses the listing file at `path`.
pub fn load_listing<'a>(session: &DumpSession<'a>, path: &Path) -> DumpResult<Listing<'a>> {
    let text = std::fs::read_to_string(path)?;
    parse_listing(session, &text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'t> {
    Word(&'t str),
    Quoted(&'t str),
}

struct Parser<'s, 'a, 't> {
    session: &'s DumpSession<'a>,
    text: &'t str,
    line_no: usize,
    unit: CompilationUnit<'a>,
    symbols: SymbolTable,

    labels: HashMap<&'t str, LirIdx>,
    target_resolves: Vec<Resolve<'t>>,
    last_offset: u32,
}

/// Branch whose target label is looked up after the whole listing is read.
#[derive(Debug)]
struct Resolve<'t> {
    name: &'t str,
    index: LirIdx,
    line: usize,
}

type LineResult<T> = Result<T, String>;

impl<'s, 'a, 't> Parser<'s, 'a, 't> {
    fn new(session: &'s DumpSession<'a>, text: &'t str) -> Self {
        Self {
            session,
            text,
            line_no: 0,
            unit: CompilationUnit::default(),
            symbols: SymbolTable::new(),
            labels: HashMap::new(),
            target_resolves: Vec::new(),
            last_offset: 0,
        }
    }

    fn parse(mut self) -> DumpResult<Listing<'a>> {
        let text = self.text;
        for (i, line) in text.lines().enumerate() {
            self.line_no = i + 1;
            let tokens = tokenize(line).map_err(|reason| self.error(reason))?;
            let Some((&keyword, args)) = tokens.split_first() else {
                continue;
            };
            let Token::Word(keyword) = keyword else {
                return Err(self.error("line starts with a string".to_string()));
            };
            self.parse_directive(keyword, args)?;
        }

        self.resolve_all_references()?;
        log::debug!(
            "parsed listing for {}: {} records, {} symbols",
            self.unit.method,
            self.unit.len(),
            self.symbols.len()
        );
        Ok(Listing {
            unit: self.unit,
            symbols: self.symbols,
        })
    }

    fn error(&self, reason: String) -> DumpError {
        DumpError::Parse {
            line: self.line_no,
            reason,
        }
    }

    fn parse_directive(&mut self, keyword: &'t str, args: &[Token<'t>]) -> DumpResult<()> {
        log::trace!("line {}: {}", self.line_no, keyword);
        let result = match keyword {
            "method" => self.parse_method(args),
            "symbol" => self.parse_symbol(args),
            "frame" => self.parse_frame(args),
            "code_size" => single_number(args).map(|n| self.unit.total_size = n),
            "dalvik_size" => single_number(args).map(|n| self.unit.insns_size = n),
            "promote" => self.parse_promote(args),
            "map" => self.parse_map(args),
            "insn" => return self.parse_insn(args),
            "class" => return self.parse_class(args),
            "word" => return self.parse_word(args),
            other => Err(format!("unknown directive '{other}'")),
        };
        result.map_err(|reason| self.error(reason))
    }

    fn parse_method(&mut self, args: &[Token<'t>]) -> LineResult<()> {
        self.unit.method = MethodId(single_number(args)?);
        Ok(())
    }

    fn parse_symbol(&mut self, args: &[Token<'t>]) -> LineResult<()> {
        let [id, class, name, signature] = args else {
            return Err("expected: symbol <id> <class> <name> <signature>".to_string());
        };
        let id = parse_number::<u32>(word(id)?)?;
        self.symbols.insert(
            MethodId(id),
            MethodSymbol {
                class_descriptor: text(class).to_string(),
                name: text(name).to_string(),
                signature: text(signature).to_string(),
            },
        );
        Ok(())
    }

    fn parse_frame(&mut self, args: &[Token<'t>]) -> LineResult<()> {
        let frame = &mut self.unit.frame;
        for arg in args {
            let (key, value) = key_value(word(arg)?)?;
            match key {
                "regs" => frame.num_regs = parse_number(value)?,
                "ins" => frame.num_ins = parse_number(value)?,
                "outs" => frame.num_outs = parse_number(value)?,
                "core_spills" => frame.num_core_spills = parse_number(value)?,
                "fp_spills" => frame.num_fp_spills = parse_number(value)?,
                "padding" => frame.num_padding = parse_number(value)?,
                "size" => frame.frame_size = parse_number(value)?,
                "ins_offset" => frame.ins_offset = parse_int(value)?,
                "regs_offset" => frame.regs_offset = parse_int(value)?,
                other => return Err(format!("unknown frame field '{other}'")),
            }
        }
        Ok(())
    }

    fn parse_promote(&mut self, args: &[Token<'t>]) -> LineResult<()> {
        let Some((vreg, rest)) = args.split_first() else {
            return Err("expected: promote <vreg> core=... fp=... [pair]".to_string());
        };
        let vreg: usize = parse_number(word(vreg)?)?;

        let mut entry = PromotionEntry::default();
        for arg in rest {
            match word(arg)? {
                "pair" => entry.first_in_pair = true,
                kv => {
                    let (key, value) = key_value(kv)?;
                    let (location, reg) = parse_location(value)?;
                    match key {
                        "core" => (entry.core_location, entry.core_reg) = (location, reg),
                        "fp" => (entry.fp_location, entry.fp_reg) = (location, reg),
                        other => return Err(format!("unknown promotion field '{other}'")),
                    }
                }
            }
        }

        let map = &mut self.unit.promotion_map;
        if map.len() <= vreg {
            map.resize(vreg + 1, PromotionEntry::default());
        }
        map[vreg] = entry;
        Ok(())
    }

    fn parse_map(&mut self, args: &[Token<'t>]) -> LineResult<()> {
        let [native, pc] = args else {
            return Err("expected: map <native offset> <dalvik pc>".to_string());
        };
        self.unit.mapping_table.push(MappingEntry {
            native_offset: parse_number(word(native)?)?,
            dalvik_pc: parse_number(word(pc)?)?,
        });
        Ok(())
    }

    fn parse_class(&mut self, args: &[Token<'t>]) -> DumpResult<()> {
        let [offset, Token::Quoted(descriptor)] = args else {
            return Err(self.error("expected: class <offset> \"<descriptor>\"".to_string()));
        };
        let offset = word(offset)
            .and_then(parse_number::<u32>)
            .map_err(|reason| self.error(reason))?;
        let info = self.session.alloc_callsite(descriptor);
        self.unit.push_class_pointer(offset, info)?;
        Ok(())
    }

    fn parse_word(&mut self, args: &[Token<'t>]) -> DumpResult<()> {
        let parsed = match args {
            [offset, value] => word(offset)
                .and_then(parse_number::<u32>)
                .and_then(|offset| Ok((offset, parse_int(word(value)?)?))),
            _ => Err("expected: word <offset> <value>".to_string()),
        };
        let (offset, value) = parsed.map_err(|reason| self.error(reason))?;
        self.unit.push_literal(offset, value)?;
        Ok(())
    }

    fn parse_insn(&mut self, args: &[Token<'t>]) -> DumpResult<()> {
        let Some((tag, rest)) = args.split_first() else {
            return Err(self.error("expected: insn <opcode> ...".to_string()));
        };
        let tag = word(tag).map_err(|reason| self.error(reason))?;
        let opcode = lookup_opcode(tag).ok_or_else(|| DumpError::UnknownOpcode {
            tag: tag.to_string(),
        })?;

        let mut lir = Lir::new(opcode);
        lir.offset = self.last_offset;
        let mut label = None;
        let mut target = None;
        self.fill_record(&mut lir, rest, &mut label, &mut target)
            .map_err(|reason| self.error(reason))?;

        self.last_offset = lir.offset;
        let idx = self.unit.push_insn(lir).inspect_err(|e| {
            log::debug!("line {}: rejected record: {}", self.line_no, e);
        })?;

        if let Some(name) = label {
            if self.labels.insert(name, idx).is_some() {
                return Err(self.error(format!("label '{name}' defined twice")));
            }
        }
        if let Some(name) = target {
            self.target_resolves.push(Resolve {
                name,
                index: idx,
                line: self.line_no,
            });
        }
        Ok(())
    }

    /// Applies operands, attributes and flags of one `insn` line to `lir`.
    fn fill_record(
        &self,
        lir: &mut Lir<'a>,
        args: &[Token<'t>],
        label: &mut Option<&'t str>,
        target: &mut Option<&'t str>,
    ) -> LineResult<()> {
        let kinds = lir.opcode.operand_kinds();
        let mut slot = 0;
        for &arg in args {
            if let Token::Word(w) = arg {
                if let Some((key, value)) = w.split_once('=') {
                    match key {
                        "at" => lir.offset = parse_number(value)?,
                        "dalvik" => lir.dalvik_offset = parse_number(value)?,
                        "use" => lir.use_mask = parse_mask(value)?,
                        "def" => lir.def_mask = parse_mask(value)?,
                        "alias" => lir.alias_info = parse_number(value)?,
                        "label" => *label = Some(value),
                        "target" => *target = Some(value),
                        other => return Err(format!("unknown attribute '{other}'")),
                    }
                    continue;
                }
                match w {
                    "nop" => {
                        lir.flags.is_nop = true;
                        continue;
                    }
                    "squashed" => {
                        lir.flags.squashed = true;
                        continue;
                    }
                    _ => {}
                }
            }

            let Some(&kind) = kinds.get(slot) else {
                return Err(format!("too many operands for {}", lir.opcode));
            };
            lir.operands[slot] = self.parse_operand(kind, arg)?;
            slot += 1;
        }
        Ok(())
    }

    fn parse_operand(&self, kind: OperandKind, token: Token<'t>) -> LineResult<Operand<'a>> {
        match (kind, token) {
            (OperandKind::Str, Token::Quoted(s)) => Ok(Operand::Str(self.session.intern_str(s))),
            (OperandKind::Str, Token::Word(w)) => Err(format!("expected a quoted string, got '{w}'")),
            (_, Token::Quoted(s)) => Err(format!("unexpected string \"{s}\"")),
            (OperandKind::Int, Token::Word(w)) => Ok(Operand::Int(parse_int(w)?)),
            (OperandKind::Reg, Token::Word(w)) => Ok(Operand::Reg(parse_register(w)?)),
            (OperandKind::ModImm, Token::Word(w)) => Ok(Operand::ModImm(parse_mod_imm(w)?)),
            (OperandKind::Empty, Token::Word(w)) => Err(format!("unexpected operand '{w}'")),
            (OperandKind::Callsite, Token::Word(w)) => {
                Err(format!("callsite operand '{w}' only valid in a class line"))
            }
        }
    }

    fn resolve_all_references(&mut self) -> DumpResult<()> {
        for resolve in std::mem::take(&mut self.target_resolves) {
            let Some(&to) = self.labels.get(resolve.name) else {
                log::debug!("line {}: no label '{}'", resolve.line, resolve.name);
                return Err(DumpError::UnresolvedLabel {
                    name: resolve.name.to_string(),
                });
            };
            self.unit.set_target(resolve.index, to)?;
        }
        Ok(())
    }
}

fn lookup_opcode(tag: &str) -> Option<LirOpcode> {
    PseudoOp::from_tag(tag)
        .map(LirOpcode::Pseudo)
        .or_else(|| encoding_map().lookup_tag(tag).map(LirOpcode::Insn))
}

/// Splits a line into words and double-quoted strings, dropping comments.
fn tokenize(line: &str) -> LineResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        if rest.starts_with(';') {
            break;
        }
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| "unterminated string".to_string())?;
            tokens.push(Token::Quoted(&quoted[..end]));
            rest = &quoted[end + 1..];
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Word(&rest[..end]));
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }
    Ok(tokens)
}

fn word<'t>(token: &Token<'t>) -> LineResult<&'t str> {
    match *token {
        Token::Word(w) => Ok(w),
        Token::Quoted(s) => Err(format!("unexpected string \"{s}\"")),
    }
}

fn text<'t>(token: &Token<'t>) -> &'t str {
    match *token {
        Token::Word(s) | Token::Quoted(s) => s,
    }
}

fn key_value(w: &str) -> LineResult<(&str, &str)> {
    w.split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{w}'"))
}

fn single_number(args: &[Token<'_>]) -> LineResult<u32> {
    match args {
        [value] => parse_number(word(value)?),
        _ => Err("expected a single number".to_string()),
    }
}

/// Unsigned decimal or `0x` hex.
fn parse_number<T>(text: &str) -> LineResult<T>
where
    T: TryFrom<u64>,
{
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    }
    .map_err(|_| format!("invalid number '{text}'"))?;
    T::try_from(value).map_err(|_| format!("number '{text}' out of range"))
}

/// Signed 32-bit value; hex up to `0xffffffff` wraps to the same bit pattern.
fn parse_int(text: &str) -> LineResult<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let magnitude: u64 = parse_number(digits)?;
    if magnitude > u64::from(u32::MAX) {
        return Err(format!("value '{text}' does not fit in 32 bits"));
    }
    let value = if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(format!("value '{text}' does not fit in 32 bits"));
    }
    Ok(value as i32)
}

fn parse_register(text: &str) -> LineResult<i32> {
    if let Some(reg) = core_reg_by_name(text) {
        return Ok(reg);
    }
    let fp = |prefix: char, make: fn(i32) -> i32, limit: i32| {
        text.strip_prefix(prefix)
            .and_then(|n| n.parse::<i32>().ok())
            .filter(|&n| (0..limit).contains(&n))
            .map(make)
    };
    fp('s', single_reg, 32)
        .or_else(|| fp('d', double_reg, 16))
        .map(Ok)
        .unwrap_or_else(|| parse_int(text).map_err(|_| format!("invalid register '{text}'")))
}

fn parse_mod_imm(text: &str) -> LineResult<i32> {
    match text.strip_prefix('#') {
        Some(value) => {
            let value = parse_int(value)? as u32;
            encode_modified_imm(value)
                .map(|raw| raw as i32)
                .ok_or_else(|| format!("{value:#x} has no modified-immediate encoding"))
        }
        None => parse_int(text),
    }
}

fn parse_mask(text: &str) -> LineResult<ResourceMask> {
    if text == "all" {
        return Ok(ResourceMask::ALL);
    }
    parse_number(text).map(ResourceMask)
}

fn parse_location(text: &str) -> LineResult<(LocationKind, u8)> {
    match text {
        "frame" => Ok((LocationKind::DalvikFrame, 0)),
        "spill" => Ok((LocationKind::Spill, 0)),
        _ => {
            let reg = text
                .strip_prefix("reg:")
                .ok_or_else(|| format!("invalid location '{text}'"))?;
            Ok((LocationKind::PhysReg, parse_number(reg)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::opcode::ArmOpcode;
    use crate::core::symbols::SymbolResolver;
    use crate::lir::LirList;
    use bumpalo::Bump;

    const LISTING: &str = r#"
; a small method
method 1
symbol 1 Lcom/example/Fib; fib (I)I
frame regs=2 ins=1 outs=0 core_spills=2 size=32 ins_offset=36 regs_offset=12
code_size 12
dalvik_size 3
promote 0 core=reg:5
promote 2 core=frame fp=reg:48 pair
insn kArmPseudoMethodEntry
insn kThumb2MovImmShift r0 #0xab00ab at=0x2 use=0 def=0x1
insn kArmPseudoExtended "hello world" ; trailing comment
insn kThumbBUncond 2 at=0x6 target=done
insn kThumbMovRR r1 r1 at=0x8 nop
insn kArmPseudoTargetLabel label=done
insn kThumb2Vmovs s1 s2
class 0x30 "Ljava/lang/String;"
word 0x34 -1
map 0x4 0x0
"#;

    #[test]
    fn test_parse_full_listing() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let listing = parse_listing(&session, LISTING).unwrap();
        let unit = &listing.unit;

        assert_eq!(unit.method, MethodId(1));
        assert_eq!(listing.symbols.method_name(MethodId(1)), "fib");
        assert_eq!(unit.frame.num_regs, 2);
        assert_eq!(unit.frame.ins_offset, 36);
        assert_eq!(unit.total_size, 12);
        assert_eq!(unit.insns_size, 3);
        assert_eq!(unit.promotion_map.len(), 3);
        assert_eq!(unit.promotion_map[0].core_location, LocationKind::PhysReg);
        assert_eq!(unit.promotion_map[0].core_reg, 5);
        assert_eq!(unit.promotion_map[1], PromotionEntry::default());
        assert!(unit.promotion_map[2].first_in_pair);
        assert_eq!(unit.promotion_map[2].fp_reg, 48);
        assert_eq!(unit.mapping_table.len(), 1);

        let records: Vec<_> = unit.iter(LirList::Instructions).collect();
        assert_eq!(records.len(), 7);

        let (_, mov) = records[1];
        assert_eq!(mov.opcode, LirOpcode::Insn(ArmOpcode::Thumb2MovImmShift));
        assert_eq!(mov.operands[0], Operand::Reg(0));
        assert_eq!(mov.operands[1], Operand::ModImm(0x1ab));
        assert_eq!(mov.def_mask, ResourceMask(1));

        let (_, ext) = records[2];
        assert_eq!(ext.operands[0].as_str(), Some("hello world"));
        // inherits the previous record's offset
        assert_eq!(ext.offset, 0x2);

        let (_, branch) = records[3];
        let (label_idx, _) = records[5];
        assert_eq!(branch.target, Some(label_idx));

        let (_, nop) = records[4];
        assert!(nop.flags.is_nop);

        let (_, vmov) = records[6];
        assert_eq!(vmov.operands[0], Operand::Reg(single_reg(1)));

        let class: Vec<_> = unit.iter(LirList::ClassPointers).collect();
        assert_eq!(
            class[0].1.operands[0].as_callsite().map(|c| c.class_descriptor),
            Some("Ljava/lang/String;")
        );
        let words: Vec<_> = unit.iter(LirList::Literals).collect();
        assert_eq!(words[0].1.operands[0], Operand::Int(-1));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);

        let err = parse_listing(&session, "method 1\nbogus 3\n").unwrap_err();
        assert!(matches!(err, DumpError::Parse { line: 2, .. }), "{err}");

        let err = parse_listing(&session, "insn kThumbMovRR r0 r1 r2\n").unwrap_err();
        assert!(matches!(err, DumpError::Parse { line: 1, .. }), "{err}");

        let err = parse_listing(&session, "insn kThumb2MovImmShift r0 #0x101\n").unwrap_err();
        assert!(err.to_string().contains("no modified-immediate encoding"));

        let err = parse_listing(&session, "insn kArmPseudoExtended \"open\n").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_unknown_opcode() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let err = parse_listing(&session, "insn kThumbFrobnicate\n").unwrap_err();
        assert!(matches!(err, DumpError::UnknownOpcode { ref tag } if tag == "kThumbFrobnicate"));
    }

    #[test]
    fn test_missing_string_operand_is_shape_error() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let err = parse_listing(&session, "insn kArmPseudoExtended\n").unwrap_err();
        assert!(matches!(err, DumpError::OperandShape { slot: 0, .. }));
    }

    #[test]
    fn test_labels() {
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let err = parse_listing(&session, "insn kThumbBUncond 0 target=nowhere\n").unwrap_err();
        assert!(matches!(err, DumpError::UnresolvedLabel { ref name } if name == "nowhere"));

        let twice = "insn kArmPseudoTargetLabel label=a\ninsn kArmPseudoTargetLabel label=a\n";
        let err = parse_listing(&session, twice).unwrap_err();
        assert!(matches!(err, DumpError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(parse_int("-3"), Ok(-3));
        assert_eq!(parse_int("0xffffffff"), Ok(-1));
        assert!(parse_int("0x100000000").is_err());
        assert_eq!(parse_register("sp"), Ok(13));
        assert_eq!(parse_register("rSELF"), Ok(9));
        assert_eq!(parse_register("d3"), Ok(double_reg(3)));
        assert_eq!(parse_register("77"), Ok(77));
        assert!(parse_register("x1").is_err());
        assert_eq!(parse_mod_imm("#255"), Ok(0xff));
        assert_eq!(parse_mod_imm("0x1ab"), Ok(0x1ab));
        assert_eq!(parse_mask("all"), Ok(ResourceMask::ALL));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize(r#"  insn kX "a b" c=1 ; rest"#).unwrap(),
            vec![
                Token::Word("insn"),
                Token::Word("kX"),
                Token::Quoted("a b"),
                Token::Word("c=1"),
            ]
        );
        assert!(tokenize("; CHECK: foo").unwrap().is_empty());
        assert_eq!(tokenize("symbol 1 LFoo; f ()V").unwrap().len(), 5);
    }
}
