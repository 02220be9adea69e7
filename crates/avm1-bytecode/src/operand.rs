//! Action operands

use std::fmt;

use serde::{Deserialize, Serialize};

/// VM register (0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for Register {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Branch target identifier, unique within one disassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LabelId(pub u32);

impl LabelId {
    /// Create a new label id
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get id value
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register() {
        let r = Register::new(5);
        assert_eq!(r.index(), 5);
        assert_eq!(r.to_string(), "r5");
    }

    #[test]
    fn test_label_id() {
        let l = LabelId::new(12);
        assert_eq!(l.id(), 12);
        assert_eq!(l.to_string(), "label_12");
    }
}
