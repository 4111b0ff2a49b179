// This module gathers the infrastructure the ARM dumper is built on but that is not ARM
// specific: error enums, dump options, the line sink the output goes through, the symbol
// resolver used to pretty-print method identities, and the arena-backed session that owns
// interned strings and dump statistics.

//! Shared dump infrastructure.
//!
//! # Key Components
//!
//! - `error`: [`DumpError`], [`MetadataError`] and [`FormatError`]
//! - `config`: [`DumpOptions`], the base address and dump switches
//! - `sink`: [`LineSink`] and its log, writer and `Vec` implementations
//! - `symbols`: [`SymbolResolver`] and the map-backed [`SymbolTable`]
//! - `session`: [`DumpSession`], arena allocation and [`DumpStats`]

pub mod config;
pub mod error;
pub mod session;
pub mod sink;
pub mod symbols;

pub use config::DumpOptions;
pub use error::{DumpError, DumpResult, FormatError, MetadataError};
pub use session::{DumpSession, DumpStats};
pub use sink::{LineSink, LogSink, WriterSink};
pub use symbols::{MethodId, MethodSymbol, SymbolResolver, SymbolTable};
