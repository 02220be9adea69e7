//! # AVM1 Assembler
//!
//! Converts AVM1 action bytecode to editable action sequences and back.
//!
//! ## Pipeline
//!
//! 1. Disassemble bytes into actions with labels and block markers
//! 2. Examine the simulated stack to recover argument counts
//! 3. Edit the sequence freely
//! 4. Assemble, recomputing every offset and length

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod config;
pub mod disassembler;
pub mod error;
pub mod examiner;
pub mod listing;
pub mod traverse;

pub use assembler::Assembler;
pub use config::{AssemblerConfig, DisassemblerConfig};
pub use disassembler::Disassembler;
pub use error::{AssembleError, AssembleResult, DisassembleError, DisassembleResult};
pub use examiner::{Slot, StackExaminer};
pub use listing::listing;
pub use traverse::{Examiner, traverse};

pub use avm1_bytecode::{Action, LabelId, Marker, Opcode, PushValue};

/// Disassemble `bytes` with the default configuration
pub fn disassemble(bytes: &[u8]) -> DisassembleResult<Vec<Action>> {
    Disassembler::default().disassemble(bytes)
}

/// Assemble `actions` with the default configuration
pub fn assemble(actions: Vec<Action>) -> AssembleResult<Vec<u8>> {
    Assembler::default().assemble(actions)
}
