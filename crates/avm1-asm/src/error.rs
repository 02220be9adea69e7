//! Assembly and disassembly errors

use avm1_bytecode::{DecodeError, EncodeError, LabelId, Marker};
use thiserror::Error;

/// Errors raised while turning bytes into actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassembleError {
    /// Malformed action bytes
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Branch target lies outside its sequence
    #[error("Branch at offset {offset} targets {target}, outside its sequence")]
    BranchOutOfRange {
        /// Absolute offset of the branch
        offset: usize,
        /// Target position relative to the sequence start
        target: i64,
    },

    /// Branch target falls inside an action
    #[error("Branch at offset {offset} targets byte {target}, inside an action")]
    MisalignedBranch {
        /// Absolute offset of the branch
        offset: usize,
        /// Target position relative to the sequence start
        target: usize,
    },

    /// Block span runs past the end of its sequence
    #[error("Block at offset {offset} spans {size} past the end of its sequence")]
    BlockOverrun {
        /// Absolute offset of the block action
        offset: usize,
        /// Declared span
        size: usize,
    },

    /// Block span ends inside an action
    #[error("Block at offset {offset} spans {size}, ending inside an action")]
    MisalignedBlock {
        /// Absolute offset of the block action
        offset: usize,
        /// Declared span
        size: usize,
    },

    /// Function definitions nested deeper than allowed
    #[error("Function at offset {offset} nested deeper than {max_depth}")]
    TooDeep {
        /// Absolute offset of the function definition
        offset: usize,
        /// Configured limit
        max_depth: usize,
    },
}

impl DisassembleError {
    /// Absolute byte offset the error refers to
    pub fn offset(&self) -> usize {
        match self {
            Self::Decode(err) => err.offset(),
            Self::BranchOutOfRange { offset, .. }
            | Self::MisalignedBranch { offset, .. }
            | Self::BlockOverrun { offset, .. }
            | Self::MisalignedBlock { offset, .. }
            | Self::TooDeep { offset, .. } => *offset,
        }
    }
}

/// Errors raised while turning actions into bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A field does not fit its encoding
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Branch refers to a label absent from its sequence
    #[error("Missing label {0}")]
    MissingLabel(LabelId),

    /// Label defined twice in one sequence
    #[error("Duplicate label {0}")]
    DuplicateLabel(LabelId),

    /// Branch distance does not fit in 16 bits
    #[error("Branch to {label} needs offset {offset}, outside i16")]
    BranchOutOfRange {
        /// Target label
        label: LabelId,
        /// Required offset
        offset: i64,
    },

    /// Block opened without its closing marker
    #[error("{block} at index {index} has no end marker")]
    MissingEndMarker {
        /// Block mnemonic
        block: &'static str,
        /// Index of the block action
        index: usize,
    },

    /// Marker with no open block
    #[error("{marker} at index {index} has no open block")]
    UnmatchedMarker {
        /// Offending marker
        marker: Marker,
        /// Index of the marker
        index: usize,
    },

    /// Marker closes a block other than the innermost one
    #[error("{marker} at index {index} does not match the open {open}")]
    MismatchedNesting {
        /// Offending marker
        marker: Marker,
        /// Innermost open block
        open: &'static str,
        /// Index of the marker
        index: usize,
    },

    /// Function definitions nested deeper than allowed
    #[error("Function bodies nested deeper than {max_depth}")]
    TooDeep {
        /// Configured limit
        max_depth: usize,
    },
}

impl AssembleError {
    /// Create a missing end marker error
    pub fn missing_end(block: &'static str, index: usize) -> Self {
        Self::MissingEndMarker { block, index }
    }

    /// Create an unmatched or mismatched marker error
    pub fn unmatched(marker: Marker, open: Option<&'static str>, index: usize) -> Self {
        match open {
            Some(open) => Self::MismatchedNesting {
                marker,
                open,
                index,
            },
            None => Self::UnmatchedMarker { marker, index },
        }
    }
}

/// Result type for disassembly
pub type DisassembleResult<T> = Result<T, DisassembleError>;

/// Result type for assembly
pub type AssembleResult<T> = Result<T, AssembleError>;
