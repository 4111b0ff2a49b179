//! armlir - ARM LIR disassembly and resource-mask decoding.
//!
//! armlir renders the low-level instruction records (LIR) of a Thumb/Thumb-2
//! compiler backend back to assembly text and decodes their packed hazard
//! masks into named resource tokens. It never encodes machine code; it only
//! reads records that earlier compilation phases produced.
//!
//! # Primary Usage
//!
//! ```ignore
//! use armlir::arm::UnitDumper;
//! use armlir::core::{DumpOptions, DumpSession, LogSink};
//! use armlir::lir::parse_listing;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let session = DumpSession::new(&arena);
//! let listing = parse_listing(&session, &text)?;
//!
//! let dumper = UnitDumper::new(DumpOptions::from_env(), &listing.symbols, &session);
//! dumper.dump(&listing.unit, &mut LogSink);
//! ```
//!
//! # Architecture
//!
//! - [`arm`] - Thumb-2 tables, format interpreter, printer and dumper
//! - [`lir`] - Record arena, compilation units, listing parser and golden checks
//! - [`core`] - Errors, options, line sinks, symbols and the dump session

pub mod arm;
pub mod core;
pub mod lir;

pub use arm::{ArmOpcode, InstructionPrinter, LirOpcode, PseudoOp, ResourceMask, UnitDumper};
pub use crate::core::{
    DumpError, DumpOptions, DumpResult, DumpSession, DumpStats, LineSink, LogSink, MethodId,
    SymbolResolver, SymbolTable,
};
pub use lir::{CompilationUnit, Lir, LirIdx, LirList, Operand};
