// This module holds everything specific to the Thumb/Thumb-2 target: the immutable register,
// condition and barrier name tables, the modified-immediate codec, the opcode enums and their
// validated encoding table, the format-string interpreter, the register-list and
// resource-mask renderers, and the two drivers built on them (InstructionPrinter for single
// records, UnitDumper for whole methods).

//! Thumb-2 disassembly.
//!
//! ```ignore
//! use armlir::arm::UnitDumper;
//! use armlir::core::{DumpOptions, DumpSession, LogSink};
//!
//! let dumper = UnitDumper::new(DumpOptions::from_env(), &symbols, &session);
//! dumper.dump(&unit, &mut LogSink);
//! ```

pub mod dumper;
pub mod encoding;
pub mod format;
pub mod immediate;
pub mod opcode;
pub mod printer;
pub mod registers;
pub mod reglist;
pub mod resource;

pub use dumper::UnitDumper;
pub use encoding::{encoding_map, EncodingInfo, EncodingMap, OperandKind};
pub use format::{build_insn_string, FormatContext};
pub use immediate::{decode_modified_imm, decode_negated_modified_imm, encode_modified_imm};
pub use opcode::{ArmOpcode, LirOpcode, PoolKind, PseudoOp};
pub use printer::InstructionPrinter;
pub use reglist::{core_reg_list, fp_reg_list};
pub use resource::{render_resource_mask, ResourceMask};
