// This module provides the arena-backed dump session. A DumpSession borrows a bumpalo arena
// for its whole lifetime 'arena; operand strings (Extended/SsaRep/boundary payloads, method
// names) and class-literal callsite payloads parsed from listings are interned or allocated
// there, so every Lir<'arena> in a CompilationUnit can borrow them without owning copies.
// The session also counts what the printer and dumper did: units dumped, lines emitted,
// real instructions printed and records suppressed as squashed or no-op. Counters live in a
// RefCell so rendering code can update them through a shared reference.

//! Arena-based dump session.

use std::cell::RefCell;
use std::fmt;

use bumpalo::Bump;
use hashbrown::HashMap;

use crate::lir::CallsiteInfo;

/// Owns the arena borrow and dump statistics for one batch of units.
pub struct DumpSession<'arena> {
    arena: &'arena Bump,
    interned_strings: RefCell<HashMap<String, &'arena str>>,
    stats: RefCell<DumpStats>,
}

impl<'arena> DumpSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            interned_strings: RefCell::new(HashMap::new()),
            stats: RefCell::new(DumpStats::default()),
        }
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut strings = self.interned_strings.borrow_mut();
        if let Some(&interned) = strings.get(s) {
            return interned;
        }

        let interned = self.arena.alloc_str(s);
        strings.insert(s.to_string(), interned);
        interned
    }

    /// Allocate a class-literal payload with an interned descriptor.
    pub fn alloc_callsite(&self, class_descriptor: &str) -> &'arena CallsiteInfo<'arena> {
        let class_descriptor = self.intern_str(class_descriptor);
        self.arena.alloc(CallsiteInfo { class_descriptor })
    }

    pub fn record_unit_dumped(&self) {
        self.stats.borrow_mut().units_dumped += 1;
    }

    pub fn record_line_emitted(&self) {
        self.stats.borrow_mut().lines_emitted += 1;
    }

    pub fn record_instruction_printed(&self) {
        self.stats.borrow_mut().instructions_printed += 1;
    }

    pub fn record_suppressed(&self) {
        self.stats.borrow_mut().records_suppressed += 1;
    }

    pub fn stats(&self) -> DumpStats {
        self.stats.borrow().clone()
    }
}

/// Dump session counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpStats {
    pub units_dumped: usize,
    pub lines_emitted: usize,
    /// Real instructions that produced a primary line.
    pub instructions_printed: usize,
    /// Squashed or no-op records left out of the listing.
    pub records_suppressed: usize,
}

impl fmt::Display for DumpStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dump Session Statistics:")?;
        writeln!(f, "  Units dumped: {}", self.units_dumped)?;
        writeln!(f, "  Lines emitted: {}", self.lines_emitted)?;
        writeln!(f, "  Instructions printed: {}", self.instructions_printed)?;
        writeln!(f, "  Records suppressed: {}", self.records_suppressed)?;
        Ok(())
    }
}
