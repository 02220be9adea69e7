//! Action opcodes

use serde::{Deserialize, Serialize};

/// Opcodes with a 16-bit body length prefix start at this value.
pub const BODY_THRESHOLD: u8 = 0x80;

/// Known AVM1 action opcodes
///
/// Opcodes below [`BODY_THRESHOLD`] are a single byte. Opcodes at or above it
/// are followed by a little-endian `u16` body length and that many body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Timeline ====================
    /// End of an action stream
    End = 0x00,
    /// Go to the next frame
    NextFrame = 0x04,
    /// Go to the previous frame
    PrevFrame = 0x05,
    /// Start playing the timeline
    Play = 0x06,
    /// Stop the timeline
    Stop = 0x07,
    /// Toggle display quality
    ToggleQuality = 0x08,
    /// Stop all sounds
    StopSounds = 0x09,

    // ==================== Arithmetic / logic (SWF 4) ====================
    /// Numeric addition
    Add = 0x0A,
    /// Subtraction
    Subtract = 0x0B,
    /// Multiplication
    Multiply = 0x0C,
    /// Division
    Divide = 0x0D,
    /// Numeric equality
    Equals = 0x0E,
    /// Numeric less-than
    Less = 0x0F,
    /// Logical and
    And = 0x10,
    /// Logical or
    Or = 0x11,
    /// Logical not
    Not = 0x12,

    // ==================== Strings (SWF 4) ====================
    /// String equality
    StringEquals = 0x13,
    /// String length
    StringLength = 0x14,
    /// Substring extraction
    StringExtract = 0x15,
    /// Discard the top of the stack
    Pop = 0x17,
    /// Truncate to integer
    ToInteger = 0x18,
    /// Read a variable by name
    GetVariable = 0x1C,
    /// Write a variable by name
    SetVariable = 0x1D,
    /// Set the target clip from the stack
    SetTarget2 = 0x20,
    /// String concatenation
    StringAdd = 0x21,
    /// Read a clip property
    GetProperty = 0x22,
    /// Write a clip property
    SetProperty = 0x23,
    /// Duplicate a sprite
    CloneSprite = 0x24,
    /// Remove a sprite
    RemoveSprite = 0x25,
    /// Debug trace
    Trace = 0x26,
    /// Start dragging a clip
    StartDrag = 0x27,
    /// Stop dragging
    EndDrag = 0x28,
    /// String less-than
    StringLess = 0x29,
    /// Throw the top of the stack
    Throw = 0x2A,
    /// Checked cast
    CastOp = 0x2B,
    /// Declare implemented interfaces
    ImplementsOp = 0x2C,
    /// Random number below the popped limit
    RandomNumber = 0x30,
    /// Multibyte string length
    MbStringLength = 0x31,
    /// Character to code point
    CharToAscii = 0x32,
    /// Code point to character
    AsciiToChar = 0x33,
    /// Milliseconds since start
    GetTime = 0x34,
    /// Multibyte substring
    MbStringExtract = 0x35,
    /// Multibyte character to code point
    MbCharToAscii = 0x36,
    /// Code point to multibyte character
    MbAsciiToChar = 0x37,

    // ==================== Objects (SWF 5+) ====================
    /// Delete a member
    Delete = 0x3A,
    /// Delete a variable
    Delete2 = 0x3B,
    /// Define a local variable with a value
    DefineLocal = 0x3C,
    /// Call a function by name
    CallFunction = 0x3D,
    /// Return from a function
    Return = 0x3E,
    /// Remainder
    Modulo = 0x3F,
    /// Construct an object by constructor name
    NewObject = 0x40,
    /// Declare a local variable
    DefineLocal2 = 0x41,
    /// Build an array from stack values
    InitArray = 0x42,
    /// Build an object from stack key/value pairs
    InitObject = 0x43,
    /// `typeof`
    TypeOf = 0x44,
    /// Target path of a clip
    TargetPath = 0x45,
    /// Enumerate a variable's members
    Enumerate = 0x46,
    /// ECMA-262 addition
    Add2 = 0x47,
    /// ECMA-262 less-than
    Less2 = 0x48,
    /// ECMA-262 equality
    Equals2 = 0x49,
    /// Convert to number
    ToNumber = 0x4A,
    /// Convert to string
    ToString = 0x4B,
    /// Duplicate the top of the stack
    PushDuplicate = 0x4C,
    /// Swap the two topmost values
    StackSwap = 0x4D,
    /// Read an object member
    GetMember = 0x4E,
    /// Write an object member
    SetMember = 0x4F,
    /// Increment
    Increment = 0x50,
    /// Decrement
    Decrement = 0x51,
    /// Call a method on an object
    CallMethod = 0x52,
    /// Construct via a method
    NewMethod = 0x53,
    /// `instanceof`
    InstanceOf = 0x54,
    /// Enumerate an object's members
    Enumerate2 = 0x55,

    // ==================== Bitwise / comparison (SWF 6+) ====================
    /// Bitwise and
    BitAnd = 0x60,
    /// Bitwise or
    BitOr = 0x61,
    /// Bitwise xor
    BitXor = 0x62,
    /// Left shift
    BitLShift = 0x63,
    /// Signed right shift
    BitRShift = 0x64,
    /// Unsigned right shift
    BitURShift = 0x65,
    /// Strict equality
    StrictEquals = 0x66,
    /// Greater-than
    Greater = 0x67,
    /// String greater-than
    StringGreater = 0x68,
    /// Set up prototype inheritance
    Extends = 0x69,

    // ==================== Actions with a body ====================
    /// Go to a frame number
    GotoFrame = 0x81,
    /// Load a URL
    GetUrl = 0x83,
    /// Copy the top of the stack into a register
    StoreRegister = 0x87,
    /// Define the constant pool
    ConstantPool = 0x88,
    /// Skip actions unless a frame is loaded
    WaitForFrame = 0x8A,
    /// Set the target clip by name
    SetTarget = 0x8B,
    /// Go to a frame label
    GoToLabel = 0x8C,
    /// Skip actions unless the popped frame is loaded
    WaitForFrame2 = 0x8D,
    /// Define a function with register allocation
    DefineFunction2 = 0x8E,
    /// Exception block
    Try = 0x8F,
    /// Lexical `with` scope
    With = 0x94,
    /// Push literal values
    Push = 0x96,
    /// Unconditional branch
    Jump = 0x99,
    /// Load a URL from stack values
    GetUrl2 = 0x9A,
    /// Define a function
    DefineFunction = 0x9B,
    /// Conditional branch
    If = 0x9D,
    /// Call a frame script
    Call = 0x9E,
    /// Go to a frame from the stack
    GotoFrame2 = 0x9F,
}

impl Opcode {
    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::End),
            0x04 => Some(Self::NextFrame),
            0x05 => Some(Self::PrevFrame),
            0x06 => Some(Self::Play),
            0x07 => Some(Self::Stop),
            0x08 => Some(Self::ToggleQuality),
            0x09 => Some(Self::StopSounds),

            0x0A => Some(Self::Add),
            0x0B => Some(Self::Subtract),
            0x0C => Some(Self::Multiply),
            0x0D => Some(Self::Divide),
            0x0E => Some(Self::Equals),
            0x0F => Some(Self::Less),
            0x10 => Some(Self::And),
            0x11 => Some(Self::Or),
            0x12 => Some(Self::Not),

            0x13 => Some(Self::StringEquals),
            0x14 => Some(Self::StringLength),
            0x15 => Some(Self::StringExtract),
            0x17 => Some(Self::Pop),
            0x18 => Some(Self::ToInteger),
            0x1C => Some(Self::GetVariable),
            0x1D => Some(Self::SetVariable),
            0x20 => Some(Self::SetTarget2),
            0x21 => Some(Self::StringAdd),
            0x22 => Some(Self::GetProperty),
            0x23 => Some(Self::SetProperty),
            0x24 => Some(Self::CloneSprite),
            0x25 => Some(Self::RemoveSprite),
            0x26 => Some(Self::Trace),
            0x27 => Some(Self::StartDrag),
            0x28 => Some(Self::EndDrag),
            0x29 => Some(Self::StringLess),
            0x2A => Some(Self::Throw),
            0x2B => Some(Self::CastOp),
            0x2C => Some(Self::ImplementsOp),
            0x30 => Some(Self::RandomNumber),
            0x31 => Some(Self::MbStringLength),
            0x32 => Some(Self::CharToAscii),
            0x33 => Some(Self::AsciiToChar),
            0x34 => Some(Self::GetTime),
            0x35 => Some(Self::MbStringExtract),
            0x36 => Some(Self::MbCharToAscii),
            0x37 => Some(Self::MbAsciiToChar),

            0x3A => Some(Self::Delete),
            0x3B => Some(Self::Delete2),
            0x3C => Some(Self::DefineLocal),
            0x3D => Some(Self::CallFunction),
            0x3E => Some(Self::Return),
            0x3F => Some(Self::Modulo),
            0x40 => Some(Self::NewObject),
            0x41 => Some(Self::DefineLocal2),
            0x42 => Some(Self::InitArray),
            0x43 => Some(Self::InitObject),
            0x44 => Some(Self::TypeOf),
            0x45 => Some(Self::TargetPath),
            0x46 => Some(Self::Enumerate),
            0x47 => Some(Self::Add2),
            0x48 => Some(Self::Less2),
            0x49 => Some(Self::Equals2),
            0x4A => Some(Self::ToNumber),
            0x4B => Some(Self::ToString),
            0x4C => Some(Self::PushDuplicate),
            0x4D => Some(Self::StackSwap),
            0x4E => Some(Self::GetMember),
            0x4F => Some(Self::SetMember),
            0x50 => Some(Self::Increment),
            0x51 => Some(Self::Decrement),
            0x52 => Some(Self::CallMethod),
            0x53 => Some(Self::NewMethod),
            0x54 => Some(Self::InstanceOf),
            0x55 => Some(Self::Enumerate2),

            0x60 => Some(Self::BitAnd),
            0x61 => Some(Self::BitOr),
            0x62 => Some(Self::BitXor),
            0x63 => Some(Self::BitLShift),
            0x64 => Some(Self::BitRShift),
            0x65 => Some(Self::BitURShift),
            0x66 => Some(Self::StrictEquals),
            0x67 => Some(Self::Greater),
            0x68 => Some(Self::StringGreater),
            0x69 => Some(Self::Extends),

            0x81 => Some(Self::GotoFrame),
            0x83 => Some(Self::GetUrl),
            0x87 => Some(Self::StoreRegister),
            0x88 => Some(Self::ConstantPool),
            0x8A => Some(Self::WaitForFrame),
            0x8B => Some(Self::SetTarget),
            0x8C => Some(Self::GoToLabel),
            0x8D => Some(Self::WaitForFrame2),
            0x8E => Some(Self::DefineFunction2),
            0x8F => Some(Self::Try),
            0x94 => Some(Self::With),
            0x96 => Some(Self::Push),
            0x99 => Some(Self::Jump),
            0x9A => Some(Self::GetUrl2),
            0x9B => Some(Self::DefineFunction),
            0x9D => Some(Self::If),
            0x9E => Some(Self::Call),
            0x9F => Some(Self::GotoFrame2),

            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether the encoding carries a length-prefixed body
    #[inline]
    pub fn has_body(self) -> bool {
        self.to_byte() >= BODY_THRESHOLD
    }

    /// Whether the operand count is read from the stack at runtime
    pub const fn has_dynamic_arity(self) -> bool {
        matches!(
            self,
            Self::CallFunction
                | Self::CallMethod
                | Self::NewObject
                | Self::NewMethod
                | Self::InitArray
                | Self::InitObject
                | Self::ImplementsOp
        )
    }

    /// Fixed `(pops, pushes)` on the operand stack.
    ///
    /// `None` for opcodes whose effect depends on operands or nested code:
    /// the dynamic-arity family, `Push`, `PushDuplicate`, `StackSwap` and the
    /// function definitions.
    pub const fn stack_effect(self) -> Option<(u8, u8)> {
        let effect = match self {
            Self::End
            | Self::NextFrame
            | Self::PrevFrame
            | Self::Play
            | Self::Stop
            | Self::ToggleQuality
            | Self::StopSounds
            | Self::EndDrag => (0, 0),

            Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Equals
            | Self::Less
            | Self::And
            | Self::Or
            | Self::StringEquals
            | Self::StringAdd
            | Self::GetProperty
            | Self::StringLess
            | Self::CastOp
            | Self::Delete
            | Self::Modulo
            | Self::Add2
            | Self::Less2
            | Self::Equals2
            | Self::GetMember
            | Self::InstanceOf
            | Self::BitAnd
            | Self::BitOr
            | Self::BitXor
            | Self::BitLShift
            | Self::BitRShift
            | Self::BitURShift
            | Self::StrictEquals
            | Self::Greater
            | Self::StringGreater => (2, 1),

            Self::Not
            | Self::StringLength
            | Self::ToInteger
            | Self::GetVariable
            | Self::RandomNumber
            | Self::MbStringLength
            | Self::CharToAscii
            | Self::AsciiToChar
            | Self::MbCharToAscii
            | Self::MbAsciiToChar
            | Self::Delete2
            | Self::TypeOf
            | Self::TargetPath
            | Self::Enumerate
            | Self::ToNumber
            | Self::ToString
            | Self::Increment
            | Self::Decrement
            | Self::Enumerate2 => (1, 1),

            Self::StringExtract | Self::MbStringExtract => (3, 1),
            Self::GetTime => (0, 1),

            Self::Pop
            | Self::SetTarget2
            | Self::RemoveSprite
            | Self::Trace
            | Self::Throw
            | Self::Return
            | Self::DefineLocal2
            | Self::WaitForFrame2
            | Self::With
            | Self::If
            | Self::Call
            | Self::GotoFrame2 => (1, 0),

            Self::SetVariable | Self::DefineLocal | Self::Extends | Self::GetUrl2 => (2, 0),
            Self::SetProperty | Self::CloneSprite | Self::StartDrag | Self::SetMember => (3, 0),

            Self::GotoFrame
            | Self::GetUrl
            | Self::StoreRegister
            | Self::ConstantPool
            | Self::WaitForFrame
            | Self::SetTarget
            | Self::GoToLabel
            | Self::Try
            | Self::Jump => (0, 0),

            Self::CallFunction
            | Self::CallMethod
            | Self::NewObject
            | Self::NewMethod
            | Self::InitArray
            | Self::InitObject
            | Self::ImplementsOp
            | Self::Push
            | Self::PushDuplicate
            | Self::StackSwap
            | Self::DefineFunction
            | Self::DefineFunction2 => return None,
        };
        Some(effect)
    }

    /// Get the name of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::End => "End",
            Self::NextFrame => "NextFrame",
            Self::PrevFrame => "PrevFrame",
            Self::Play => "Play",
            Self::Stop => "Stop",
            Self::ToggleQuality => "ToggleQuality",
            Self::StopSounds => "StopSounds",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Equals => "Equals",
            Self::Less => "Less",
            Self::And => "And",
            Self::Or => "Or",
            Self::Not => "Not",
            Self::StringEquals => "StringEquals",
            Self::StringLength => "StringLength",
            Self::StringExtract => "StringExtract",
            Self::Pop => "Pop",
            Self::ToInteger => "ToInteger",
            Self::GetVariable => "GetVariable",
            Self::SetVariable => "SetVariable",
            Self::SetTarget2 => "SetTarget2",
            Self::StringAdd => "StringAdd",
            Self::GetProperty => "GetProperty",
            Self::SetProperty => "SetProperty",
            Self::CloneSprite => "CloneSprite",
            Self::RemoveSprite => "RemoveSprite",
            Self::Trace => "Trace",
            Self::StartDrag => "StartDrag",
            Self::EndDrag => "EndDrag",
            Self::StringLess => "StringLess",
            Self::Throw => "Throw",
            Self::CastOp => "CastOp",
            Self::ImplementsOp => "ImplementsOp",
            Self::RandomNumber => "RandomNumber",
            Self::MbStringLength => "MbStringLength",
            Self::CharToAscii => "CharToAscii",
            Self::AsciiToChar => "AsciiToChar",
            Self::GetTime => "GetTime",
            Self::MbStringExtract => "MbStringExtract",
            Self::MbCharToAscii => "MbCharToAscii",
            Self::MbAsciiToChar => "MbAsciiToChar",
            Self::Delete => "Delete",
            Self::Delete2 => "Delete2",
            Self::DefineLocal => "DefineLocal",
            Self::CallFunction => "CallFunction",
            Self::Return => "Return",
            Self::Modulo => "Modulo",
            Self::NewObject => "NewObject",
            Self::DefineLocal2 => "DefineLocal2",
            Self::InitArray => "InitArray",
            Self::InitObject => "InitObject",
            Self::TypeOf => "TypeOf",
            Self::TargetPath => "TargetPath",
            Self::Enumerate => "Enumerate",
            Self::Add2 => "Add2",
            Self::Less2 => "Less2",
            Self::Equals2 => "Equals2",
            Self::ToNumber => "ToNumber",
            Self::ToString => "ToString",
            Self::PushDuplicate => "PushDuplicate",
            Self::StackSwap => "StackSwap",
            Self::GetMember => "GetMember",
            Self::SetMember => "SetMember",
            Self::Increment => "Increment",
            Self::Decrement => "Decrement",
            Self::CallMethod => "CallMethod",
            Self::NewMethod => "NewMethod",
            Self::InstanceOf => "InstanceOf",
            Self::Enumerate2 => "Enumerate2",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::BitLShift => "BitLShift",
            Self::BitRShift => "BitRShift",
            Self::BitURShift => "BitURShift",
            Self::StrictEquals => "StrictEquals",
            Self::Greater => "Greater",
            Self::StringGreater => "StringGreater",
            Self::Extends => "Extends",
            Self::GotoFrame => "GotoFrame",
            Self::GetUrl => "GetUrl",
            Self::StoreRegister => "StoreRegister",
            Self::ConstantPool => "ConstantPool",
            Self::WaitForFrame => "WaitForFrame",
            Self::SetTarget => "SetTarget",
            Self::GoToLabel => "GoToLabel",
            Self::WaitForFrame2 => "WaitForFrame2",
            Self::DefineFunction2 => "DefineFunction2",
            Self::Try => "Try",
            Self::With => "With",
            Self::Push => "Push",
            Self::Jump => "Jump",
            Self::GetUrl2 => "GetUrl2",
            Self::DefineFunction => "DefineFunction",
            Self::If => "If",
            Self::Call => "Call",
            Self::GotoFrame2 => "GotoFrame2",
        }
    }
}
