//! # AVM1 Bytecode
//!
//! This crate defines the structured action model for the AVM1 bytecode
//! embedded in SWF `DoAction`, `DoInitAction` and clip-event records.
//!
//! ## Design Principles
//!
//! - **Passive**: Actions know their size and encoding, nothing about control flow
//! - **Lossless**: Unknown opcodes are preserved byte for byte
//! - **Record-aware**: Sizes are measured the way the sequence is written
//! - **Serializable**: Every model type derives `serde` traits

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod action;
pub mod error;
pub mod opcode;
pub mod operand;
pub mod reader;
pub mod record;
pub mod value;
pub mod writer;

pub use action::{
    Action, BRANCH_SIZE, BranchTarget, CatchTarget, DefineFunction, DefineFunction2,
    FunctionFlags, HEADER_SIZE, If, Jump, Marker, RegisterParam, TryBlock, TryFlags,
};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use opcode::{BODY_THRESHOLD, Opcode};
pub use operand::{LabelId, Register};
pub use reader::ActionReader;
pub use record::{Record, encoded_len, records, write_sequence};
pub use value::PushValue;
pub use writer::ActionWriter;
