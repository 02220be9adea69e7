//! Literal values carried by `Push`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::operand::Register;
use crate::reader::ActionReader;
use crate::writer::ActionWriter;

const TYPE_STRING: u8 = 0;
const TYPE_FLOAT: u8 = 1;
const TYPE_NULL: u8 = 2;
const TYPE_UNDEFINED: u8 = 3;
const TYPE_REGISTER: u8 = 4;
const TYPE_BOOLEAN: u8 = 5;
const TYPE_DOUBLE: u8 = 6;
const TYPE_INTEGER: u8 = 7;
const TYPE_CONSTANT8: u8 = 8;
const TYPE_CONSTANT16: u8 = 9;

/// A typed literal pushed onto the operand stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushValue {
    /// String literal
    Str(String),
    /// 32-bit float
    Float(f32),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Contents of a register
    Register(Register),
    /// Boolean
    Bool(bool),
    /// 64-bit float
    Double(f64),
    /// 32-bit signed integer
    Int(i32),
    /// Constant pool entry with an 8-bit index
    Constant8(u8),
    /// Constant pool entry with a 16-bit index
    Constant16(u16),
}

impl PushValue {
    /// Type tag byte in the push body
    pub const fn type_tag(&self) -> u8 {
        match self {
            Self::Str(_) => TYPE_STRING,
            Self::Float(_) => TYPE_FLOAT,
            Self::Null => TYPE_NULL,
            Self::Undefined => TYPE_UNDEFINED,
            Self::Register(_) => TYPE_REGISTER,
            Self::Bool(_) => TYPE_BOOLEAN,
            Self::Double(_) => TYPE_DOUBLE,
            Self::Int(_) => TYPE_INTEGER,
            Self::Constant8(_) => TYPE_CONSTANT8,
            Self::Constant16(_) => TYPE_CONSTANT16,
        }
    }

    /// Encoded size including the type tag
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Str(s) => s.len() + 1,
            Self::Float(_) | Self::Int(_) => 4,
            Self::Null | Self::Undefined => 0,
            Self::Register(_) | Self::Bool(_) | Self::Constant8(_) => 1,
            Self::Double(_) => 8,
            Self::Constant16(_) => 2,
        }
    }

    /// Literal value as a non-negative count, if it is one.
    ///
    /// Integral floats are accepted since compilers emit argument counts as
    /// either integers or doubles.
    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Int(n) => u32::try_from(*n).ok(),
            Self::Double(d) => float_count(*d),
            Self::Float(f) => float_count(f64::from(*f)),
            _ => None,
        }
    }

    /// Read one tagged value
    pub fn read(r: &mut ActionReader<'_>) -> DecodeResult<Self> {
        let offset = r.offset();
        let tag = r.read_u8()?;
        let value = match tag {
            TYPE_STRING => Self::Str(r.read_str()?),
            TYPE_FLOAT => Self::Float(r.read_f32()?),
            TYPE_NULL => Self::Null,
            TYPE_UNDEFINED => Self::Undefined,
            TYPE_REGISTER => Self::Register(Register(r.read_u8()?)),
            TYPE_BOOLEAN => Self::Bool(r.read_u8()? != 0),
            TYPE_DOUBLE => Self::Double(r.read_f64()?),
            TYPE_INTEGER => Self::Int(r.read_i32()?),
            TYPE_CONSTANT8 => Self::Constant8(r.read_u8()?),
            TYPE_CONSTANT16 => Self::Constant16(r.read_u16()?),
            _ => return Err(DecodeError::UnknownPushType { tag, offset }),
        };
        Ok(value)
    }

    /// Write one tagged value
    pub fn write(&self, w: &mut ActionWriter) -> EncodeResult<()> {
        w.write_u8(self.type_tag());
        match self {
            Self::Str(s) => w.write_str(s)?,
            Self::Float(f) => w.write_f32(*f),
            Self::Null | Self::Undefined => {}
            Self::Register(r) => w.write_u8(r.index()),
            Self::Bool(b) => w.write_u8(u8::from(*b)),
            Self::Double(d) => w.write_f64(*d),
            Self::Int(n) => w.write_i32(*n),
            Self::Constant8(c) => w.write_u8(*c),
            Self::Constant16(c) => w.write_u16(*c),
        }
        Ok(())
    }
}

fn float_count(value: f64) -> Option<u32> {
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}

impl From<i32> for PushValue {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for PushValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<bool> for PushValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for PushValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for PushValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl fmt::Display for PushValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Register(r) => write!(f, "{r}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Constant8(c) => write!(f, "c{c}"),
            Self::Constant16(c) => write!(f, "c{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &PushValue) -> Vec<u8> {
        let mut w = ActionWriter::new();
        value.write(&mut w).unwrap();
        w.into_vec()
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let values = [
            PushValue::from("abc"),
            PushValue::Float(1.0),
            PushValue::Null,
            PushValue::Undefined,
            PushValue::Register(Register(3)),
            PushValue::Bool(true),
            PushValue::Double(2.5),
            PushValue::Int(-7),
            PushValue::Constant8(4),
            PushValue::Constant16(300),
        ];
        for value in &values {
            assert_eq!(encode(value).len(), value.encoded_len(), "{value}");
        }
    }

    #[test]
    fn test_int_layout() {
        assert_eq!(encode(&PushValue::Int(5)), vec![7, 5, 0, 0, 0]);
        assert_eq!(encode(&PushValue::from("x")), vec![0, b'x', 0]);
    }

    #[test]
    fn test_read_value() {
        let data = [9, 0x2C, 0x01];
        let mut r = ActionReader::new(&data);
        assert_eq!(PushValue::read(&mut r).unwrap(), PushValue::Constant16(300));
    }

    #[test]
    fn test_unknown_type_tag() {
        let mut r = ActionReader::with_base(&[10, 0], 7);
        assert_eq!(
            PushValue::read(&mut r),
            Err(DecodeError::UnknownPushType { tag: 10, offset: 7 })
        );
    }

    #[test]
    fn test_as_count() {
        assert_eq!(PushValue::Int(3).as_count(), Some(3));
        assert_eq!(PushValue::Double(2.0).as_count(), Some(2));
        assert_eq!(PushValue::Float(1.0).as_count(), Some(1));
        assert_eq!(PushValue::Int(-1).as_count(), None);
        assert_eq!(PushValue::Double(1.5).as_count(), None);
        assert_eq!(PushValue::from("2").as_count(), None);
        assert_eq!(PushValue::Register(Register(0)).as_count(), None);
    }
}
