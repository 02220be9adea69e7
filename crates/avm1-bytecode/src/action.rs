//! Structured actions
//!
//! [`Action`] is a passive value type: it knows its encoded size and how to
//! write itself, nothing more. Label resolution, block sizing and stack
//! reasoning live in the assembler, disassembler and examiner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, EncodeResult};
use crate::opcode::{BODY_THRESHOLD, Opcode};
use crate::operand::{LabelId, Register};
use crate::record;
use crate::value::PushValue;
use crate::writer::ActionWriter;

/// Opcode byte plus the `u16` body length prefix
pub const HEADER_SIZE: usize = 3;

/// Encoded size of `Jump` and `If`.
///
/// Branch offsets are relative to the end of the branch action, so this is
/// the constant subtracted when resolving them. It holds for the two branch
/// actions only.
pub const BRANCH_SIZE: usize = HEADER_SIZE + 2;

/// Capability shared by the two branch actions
pub trait BranchTarget {
    /// Signed byte offset from the end of the branch
    fn offset(&self) -> i16;
    /// Overwrite the byte offset
    fn set_offset(&mut self, offset: i16);
    /// Label the branch resolves to, once known
    fn label(&self) -> Option<LabelId>;
    /// Bind the branch to a label
    fn set_label(&mut self, label: LabelId);
    /// Whether the fall-through edge is also taken
    fn is_conditional(&self) -> bool;
}

/// Unconditional branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jump {
    /// Byte offset from the end of this action
    pub offset: i16,
    /// Resolved target
    pub label: Option<LabelId>,
}

impl Jump {
    /// Branch to `label`; the offset is computed at assembly
    pub fn to(label: LabelId) -> Self {
        Self {
            offset: 0,
            label: Some(label),
        }
    }
}

impl BranchTarget for Jump {
    fn is_conditional(&self) -> bool {
        false
    }

    fn offset(&self) -> i16 {
        self.offset
    }

    fn set_offset(&mut self, offset: i16) {
        self.offset = offset;
    }

    fn label(&self) -> Option<LabelId> {
        self.label
    }

    fn set_label(&mut self, label: LabelId) {
        self.label = Some(label);
    }
}

/// Branch taken when the popped condition is true
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct If {
    /// Byte offset from the end of this action
    pub offset: i16,
    /// Resolved target
    pub label: Option<LabelId>,
}

impl If {
    /// Branch to `label`; the offset is computed at assembly
    pub fn to(label: LabelId) -> Self {
        Self {
            offset: 0,
            label: Some(label),
        }
    }
}

impl BranchTarget for If {
    fn is_conditional(&self) -> bool {
        true
    }

    fn offset(&self) -> i16 {
        self.offset
    }

    fn set_offset(&mut self, offset: i16) {
        self.offset = offset;
    }

    fn label(&self) -> Option<LabelId> {
        self.label
    }

    fn set_label(&mut self, label: LabelId) {
        self.label = Some(label);
    }
}

/// Pseudo actions that make implicit structure explicit.
///
/// Markers occupy no bytes and are never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// Branch target; precedes the action it labels
    Label(LabelId),
    /// End of a `With` scope
    EndWith,
    /// End of the actions skipped by a wait-for-frame
    EndWait,
    /// Start of a catch handler
    Catch,
    /// Start of a finally handler
    Finally,
    /// End of an exception block
    EndTry,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(id) => write!(f, "{id}:"),
            Self::EndWith => f.write_str("EndWith"),
            Self::EndWait => f.write_str("EndWait"),
            Self::Catch => f.write_str("Catch"),
            Self::Finally => f.write_str("Finally"),
            Self::EndTry => f.write_str("EndTry"),
        }
    }
}

/// `DefineFunction` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefineFunction {
    /// Function name (empty for anonymous functions)
    pub name: String,
    /// Parameter names
    pub params: Vec<String>,
    /// Function body
    pub body: Vec<Action>,
}

impl DefineFunction {
    fn header_len(&self) -> usize {
        self.name.len() + 1 + 2 + self.params.iter().map(|p| p.len() + 1).sum::<usize>() + 2
    }
}

/// Preload/suppress flags of `DefineFunction2`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FunctionFlags(pub u16);

impl FunctionFlags {
    /// Preload `this` into a register
    pub const PRELOAD_THIS: u16 = 0x0001;
    /// Do not create `this`
    pub const SUPPRESS_THIS: u16 = 0x0002;
    /// Preload `arguments` into a register
    pub const PRELOAD_ARGUMENTS: u16 = 0x0004;
    /// Do not create `arguments`
    pub const SUPPRESS_ARGUMENTS: u16 = 0x0008;
    /// Preload `super` into a register
    pub const PRELOAD_SUPER: u16 = 0x0010;
    /// Do not create `super`
    pub const SUPPRESS_SUPER: u16 = 0x0020;
    /// Preload `_root` into a register
    pub const PRELOAD_ROOT: u16 = 0x0040;
    /// Preload `_parent` into a register
    pub const PRELOAD_PARENT: u16 = 0x0080;
    /// Preload `_global` into a register
    pub const PRELOAD_GLOBAL: u16 = 0x0100;

    /// Whether every bit of `flag` is set
    #[inline]
    pub const fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }
}

/// Parameter of `DefineFunction2`; register 0 means "not in a register"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParam {
    /// Register the argument is stored in
    pub register: Register,
    /// Parameter name
    pub name: String,
}

/// `DefineFunction2` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefineFunction2 {
    /// Function name (empty for anonymous functions)
    pub name: String,
    /// Number of registers the function uses
    pub register_count: u8,
    /// Preload/suppress flags
    pub flags: FunctionFlags,
    /// Parameters
    pub params: Vec<RegisterParam>,
    /// Function body
    pub body: Vec<Action>,
}

impl DefineFunction2 {
    fn header_len(&self) -> usize {
        self.name.len()
            + 1
            + 2
            + 1
            + 2
            + self.params.iter().map(|p| 1 + p.name.len() + 1).sum::<usize>()
            + 2
    }
}

/// Flags byte of a `Try` action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TryFlags(pub u8);

impl TryFlags {
    /// A catch handler follows the try span
    pub const CATCH: u8 = 0x01;
    /// A finally handler follows
    pub const FINALLY: u8 = 0x02;
    /// The caught value goes to a register rather than a variable
    pub const CATCH_IN_REGISTER: u8 = 0x04;

    /// Whether every bit of `flag` is set
    #[inline]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

/// Where a `Try` stores the caught value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchTarget {
    /// Named variable
    Name(String),
    /// Register
    Register(Register),
}

/// `Try` payload. The sizes are byte lengths of the spans that follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryBlock {
    /// Flags byte; the register bit is derived from `catch_target` on write
    pub flags: TryFlags,
    /// Bytes covered by the try span
    pub try_size: u16,
    /// Bytes covered by the catch handler
    pub catch_size: u16,
    /// Bytes covered by the finally handler
    pub finally_size: u16,
    /// Destination of the caught value
    pub catch_target: CatchTarget,
}

impl TryBlock {
    /// Whether a catch span is present
    pub fn has_catch(&self) -> bool {
        self.flags.contains(TryFlags::CATCH) || self.catch_size > 0
    }

    /// Whether a finally span is present
    pub fn has_finally(&self) -> bool {
        self.flags.contains(TryFlags::FINALLY) || self.finally_size > 0
    }

    fn body_len(&self) -> usize {
        7 + match &self.catch_target {
            CatchTarget::Name(name) => name.len() + 1,
            CatchTarget::Register(_) => 1,
        }
    }

    fn flags_byte(&self) -> u8 {
        match self.catch_target {
            CatchTarget::Register(_) => self.flags.0 | TryFlags::CATCH_IN_REGISTER,
            CatchTarget::Name(_) => self.flags.0 & !TryFlags::CATCH_IN_REGISTER,
        }
    }
}

/// One structured action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Single-byte action with a fixed stack effect
    Basic(Opcode),

    // Single-byte actions whose operand count is on the stack. The count is
    // filled in by stack examination when it can be determined.
    /// Call a function by name
    CallFunction {
        /// Argument count
        args: Option<u32>,
    },
    /// Call a method
    CallMethod {
        /// Argument count
        args: Option<u32>,
    },
    /// Construct by constructor name
    NewObject {
        /// Argument count
        args: Option<u32>,
    },
    /// Construct via a method
    NewMethod {
        /// Argument count
        args: Option<u32>,
    },
    /// Array literal
    InitArray {
        /// Element count
        elements: Option<u32>,
    },
    /// Object literal
    InitObject {
        /// Property count (each property is a key/value pair)
        properties: Option<u32>,
    },
    /// Interface declaration
    ImplementsOp {
        /// Interface count
        interfaces: Option<u32>,
    },

    /// Go to a frame number
    GotoFrame {
        /// Zero-based frame
        frame: u16,
    },
    /// Load a URL
    GetUrl {
        /// URL
        url: String,
        /// Target window or level
        target: String,
    },
    /// Copy the top of the stack into a register
    StoreRegister {
        /// Destination register
        register: Register,
    },
    /// Define the constant pool
    ConstantPool {
        /// Pool entries
        constants: Vec<String>,
    },
    /// Skip `skip_count` records unless `frame` is loaded
    WaitForFrame {
        /// Frame to wait for
        frame: u16,
        /// Records skipped
        skip_count: u8,
    },
    /// Set the target clip by name
    SetTarget {
        /// Target path
        target: String,
    },
    /// Go to a frame label
    GoToLabel {
        /// Frame label
        label: String,
    },
    /// Skip `skip_count` records unless the popped frame is loaded
    WaitForFrame2 {
        /// Records skipped
        skip_count: u8,
    },
    /// Function definition
    DefineFunction(Box<DefineFunction>),
    /// Function definition with registers
    DefineFunction2(Box<DefineFunction2>),
    /// Exception block
    Try(Box<TryBlock>),
    /// Lexical scope over the popped object
    With {
        /// Bytes covered by the scope
        size: u16,
    },
    /// Push one literal
    Push(PushValue),
    /// Push several literals with one action
    PushList(Vec<PushValue>),
    /// Unconditional branch
    Jump(Jump),
    /// Conditional branch
    If(If),
    /// Load a URL from the stack
    GetUrl2 {
        /// Method and load flags
        flags: u8,
    },
    /// Call a frame script
    Call,
    /// Go to a frame from the stack
    GotoFrame2 {
        /// Play and scene-bias flags; bit 0x02 is derived from `scene_bias` on write
        flags: u8,
        /// Frame offset added to the popped frame
        scene_bias: Option<u16>,
    },

    /// Pseudo action inserted by disassembly
    Marker(Marker),

    /// Unrecognized opcode, preserved byte for byte
    Unknown {
        /// Opcode byte
        opcode: u8,
        /// Body bytes (empty for opcodes below 0x80)
        payload: Vec<u8>,
    },
}

impl Action {
    /// Shorthand for a label marker
    pub fn label(id: LabelId) -> Self {
        Self::Marker(Marker::Label(id))
    }

    /// Opcode byte, or `None` for markers
    pub fn opcode(&self) -> Option<u8> {
        let op = match self {
            Self::Basic(op) => *op,
            Self::CallFunction { .. } => Opcode::CallFunction,
            Self::CallMethod { .. } => Opcode::CallMethod,
            Self::NewObject { .. } => Opcode::NewObject,
            Self::NewMethod { .. } => Opcode::NewMethod,
            Self::InitArray { .. } => Opcode::InitArray,
            Self::InitObject { .. } => Opcode::InitObject,
            Self::ImplementsOp { .. } => Opcode::ImplementsOp,
            Self::GotoFrame { .. } => Opcode::GotoFrame,
            Self::GetUrl { .. } => Opcode::GetUrl,
            Self::StoreRegister { .. } => Opcode::StoreRegister,
            Self::ConstantPool { .. } => Opcode::ConstantPool,
            Self::WaitForFrame { .. } => Opcode::WaitForFrame,
            Self::SetTarget { .. } => Opcode::SetTarget,
            Self::GoToLabel { .. } => Opcode::GoToLabel,
            Self::WaitForFrame2 { .. } => Opcode::WaitForFrame2,
            Self::DefineFunction(_) => Opcode::DefineFunction,
            Self::DefineFunction2(_) => Opcode::DefineFunction2,
            Self::Try(_) => Opcode::Try,
            Self::With { .. } => Opcode::With,
            Self::Push(_) | Self::PushList(_) => Opcode::Push,
            Self::Jump(_) => Opcode::Jump,
            Self::If(_) => Opcode::If,
            Self::GetUrl2 { .. } => Opcode::GetUrl2,
            Self::Call => Opcode::Call,
            Self::GotoFrame2 { .. } => Opcode::GotoFrame2,
            Self::Marker(_) => return None,
            Self::Unknown { opcode, .. } => return Some(*opcode),
        };
        Some(op.to_byte())
    }

    /// Mnemonic
    pub fn name(&self) -> &'static str {
        match self {
            Self::PushList(_) => "PushList",
            Self::Marker(_) => "Marker",
            Self::Unknown { .. } => "Unknown",
            _ => self
                .opcode()
                .and_then(Opcode::from_byte)
                .map_or("Unknown", Opcode::name),
        }
    }

    /// Whether this is a pseudo action
    #[inline]
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker(_))
    }

    /// Label id if this is a label marker
    pub fn as_label(&self) -> Option<LabelId> {
        match self {
            Self::Marker(Marker::Label(id)) => Some(*id),
            _ => None,
        }
    }

    /// Branch view of `Jump` and `If`
    pub fn branch(&self) -> Option<&dyn BranchTarget> {
        match self {
            Self::Jump(jump) => Some(jump),
            Self::If(branch) => Some(branch),
            _ => None,
        }
    }

    /// Mutable branch view of `Jump` and `If`
    pub fn branch_mut(&mut self) -> Option<&mut dyn BranchTarget> {
        match self {
            Self::Jump(jump) => Some(jump),
            Self::If(branch) => Some(branch),
            _ => None,
        }
    }

    /// Nested body of a function definition
    pub fn function_body(&self) -> Option<&[Action]> {
        match self {
            Self::DefineFunction(func) => Some(&func.body),
            Self::DefineFunction2(func) => Some(&func.body),
            _ => None,
        }
    }

    /// Mutable nested body of a function definition
    pub fn function_body_mut(&mut self) -> Option<&mut Vec<Action>> {
        match self {
            Self::DefineFunction(func) => Some(&mut func.body),
            Self::DefineFunction2(func) => Some(&mut func.body),
            _ => None,
        }
    }

    /// Length of the body as declared by the `u16` prefix.
    ///
    /// Function code follows the declared body and is not included.
    fn body_len(&self) -> usize {
        match self {
            Self::GotoFrame { .. } => 2,
            Self::GetUrl { url, target } => url.len() + 1 + target.len() + 1,
            Self::StoreRegister { .. } | Self::WaitForFrame2 { .. } | Self::GetUrl2 { .. } => 1,
            Self::ConstantPool { constants } => {
                2 + constants.iter().map(|c| c.len() + 1).sum::<usize>()
            }
            Self::WaitForFrame { .. } => 3,
            Self::SetTarget { target } => target.len() + 1,
            Self::GoToLabel { label } => label.len() + 1,
            Self::DefineFunction(func) => func.header_len(),
            Self::DefineFunction2(func) => func.header_len(),
            Self::Try(block) => block.body_len(),
            Self::With { .. } | Self::Jump(_) | Self::If(_) => 2,
            Self::Push(value) => value.encoded_len(),
            Self::PushList(values) => values.iter().map(PushValue::encoded_len).sum(),
            Self::GotoFrame2 { scene_bias, .. } => 1 + if scene_bias.is_some() { 2 } else { 0 },
            Self::Unknown { payload, .. } => payload.len(),
            _ => 0,
        }
    }

    /// Encoded size in bytes, including nested function code
    pub fn byte_count(&self) -> usize {
        match self {
            Self::Marker(_) => 0,
            Self::Unknown { opcode, payload } if *opcode < BODY_THRESHOLD => 1 + payload.len(),
            Self::DefineFunction(func) => {
                HEADER_SIZE + func.header_len() + record::encoded_len(&func.body)
            }
            Self::DefineFunction2(func) => {
                HEADER_SIZE + func.header_len() + record::encoded_len(&func.body)
            }
            _ => match self.opcode() {
                Some(op) if op >= BODY_THRESHOLD => HEADER_SIZE + self.body_len(),
                _ => 1,
            },
        }
    }

    /// Serialize this action. Markers write nothing.
    pub fn write(&self, w: &mut ActionWriter) -> EncodeResult<()> {
        let Some(opcode) = self.opcode() else {
            return Ok(());
        };
        if opcode < BODY_THRESHOLD {
            w.write_u8(opcode);
            if let Self::Unknown { payload, .. } = self {
                w.write_bytes(payload);
            }
            return Ok(());
        }

        w.write_header(opcode, self.body_len())?;
        match self {
            Self::GotoFrame { frame } => w.write_u16(*frame),
            Self::GetUrl { url, target } => {
                w.write_str(url)?;
                w.write_str(target)?;
            }
            Self::StoreRegister { register } => w.write_u8(register.index()),
            Self::ConstantPool { constants } => {
                let count = u16::try_from(constants.len())
                    .map_err(|_| EncodeError::u16_overflow("constant pool size", constants.len()))?;
                w.write_u16(count);
                for constant in constants {
                    w.write_str(constant)?;
                }
            }
            Self::WaitForFrame { frame, skip_count } => {
                w.write_u16(*frame);
                w.write_u8(*skip_count);
            }
            Self::SetTarget { target } => w.write_str(target)?,
            Self::GoToLabel { label } => w.write_str(label)?,
            Self::WaitForFrame2 { skip_count } => w.write_u8(*skip_count),
            Self::DefineFunction(func) => {
                w.write_str(&func.name)?;
                w.write_u16(param_count(func.params.len())?);
                for param in &func.params {
                    w.write_str(param)?;
                }
                write_function_code(&func.body, w)?;
            }
            Self::DefineFunction2(func) => {
                w.write_str(&func.name)?;
                w.write_u16(param_count(func.params.len())?);
                w.write_u8(func.register_count);
                w.write_u16(func.flags.0);
                for param in &func.params {
                    w.write_u8(param.register.index());
                    w.write_str(&param.name)?;
                }
                write_function_code(&func.body, w)?;
            }
            Self::Try(block) => {
                w.write_u8(block.flags_byte());
                w.write_u16(block.try_size);
                w.write_u16(block.catch_size);
                w.write_u16(block.finally_size);
                match &block.catch_target {
                    CatchTarget::Name(name) => w.write_str(name)?,
                    CatchTarget::Register(register) => w.write_u8(register.index()),
                }
            }
            Self::With { size } => w.write_u16(*size),
            Self::Push(value) => value.write(w)?,
            Self::PushList(values) => {
                for value in values {
                    value.write(w)?;
                }
            }
            Self::Jump(jump) => w.write_i16(jump.offset),
            Self::If(branch) => w.write_i16(branch.offset),
            Self::GetUrl2 { flags } => w.write_u8(*flags),
            Self::GotoFrame2 { flags, scene_bias } => match scene_bias {
                Some(bias) => {
                    w.write_u8(flags | 0x02);
                    w.write_u16(*bias);
                }
                None => w.write_u8(flags & !0x02),
            },
            Self::Unknown { payload, .. } => w.write_bytes(payload),
            _ => {}
        }
        Ok(())
    }
}

fn param_count(len: usize) -> EncodeResult<u16> {
    u16::try_from(len).map_err(|_| EncodeError::u16_overflow("parameter count", len))
}

/// Code size field followed by the nested actions
fn write_function_code(body: &[Action], w: &mut ActionWriter) -> EncodeResult<()> {
    let code_len = record::encoded_len(body);
    let code_size = u16::try_from(code_len)
        .map_err(|_| EncodeError::u16_overflow("function code size", code_len))?;
    w.write_u16(code_size);
    record::write_sequence(body, w)
}

impl From<Opcode> for Action {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::CallFunction => Self::CallFunction { args: None },
            Opcode::CallMethod => Self::CallMethod { args: None },
            Opcode::NewObject => Self::NewObject { args: None },
            Opcode::NewMethod => Self::NewMethod { args: None },
            Opcode::InitArray => Self::InitArray { elements: None },
            Opcode::InitObject => Self::InitObject { properties: None },
            Opcode::ImplementsOp => Self::ImplementsOp { interfaces: None },
            Opcode::Call => Self::Call,
            op => Self::Basic(op),
        }
    }
}

fn write_count(f: &mut fmt::Formatter<'_>, name: &str, count: Option<u32>) -> fmt::Result {
    match count {
        Some(n) => write!(f, "{name} ({n})"),
        None => f.write_str(name),
    }
}

fn write_branch(f: &mut fmt::Formatter<'_>, name: &str, branch: &dyn BranchTarget) -> fmt::Result {
    match branch.label() {
        Some(label) => write!(f, "{name} {label}"),
        None => write!(f, "{name} {:+}", branch.offset()),
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(op) => f.write_str(op.name()),
            Self::CallFunction { args }
            | Self::CallMethod { args }
            | Self::NewObject { args }
            | Self::NewMethod { args } => write_count(f, self.name(), *args),
            Self::InitArray { elements } => write_count(f, self.name(), *elements),
            Self::InitObject { properties } => write_count(f, self.name(), *properties),
            Self::ImplementsOp { interfaces } => write_count(f, self.name(), *interfaces),
            Self::GotoFrame { frame } => write!(f, "GotoFrame {frame}"),
            Self::GetUrl { url, target } => write!(f, "GetUrl {url:?} {target:?}"),
            Self::StoreRegister { register } => write!(f, "StoreRegister {register}"),
            Self::ConstantPool { constants } => {
                f.write_str("ConstantPool ")?;
                let quoted: Vec<String> = constants.iter().map(|c| format!("{c:?}")).collect();
                write_list(f, &quoted)
            }
            Self::WaitForFrame { frame, skip_count } => {
                write!(f, "WaitForFrame {frame} skip {skip_count}")
            }
            Self::SetTarget { target } => write!(f, "SetTarget {target:?}"),
            Self::GoToLabel { label } => write!(f, "GoToLabel {label:?}"),
            Self::WaitForFrame2 { skip_count } => write!(f, "WaitForFrame2 skip {skip_count}"),
            Self::DefineFunction(func) => {
                write!(f, "DefineFunction {:?} (", func.name)?;
                write_list(f, &func.params)?;
                write!(f, ") [{} actions]", func.body.len())
            }
            Self::DefineFunction2(func) => {
                write!(f, "DefineFunction2 {:?} (", func.name)?;
                let params: Vec<String> = func
                    .params
                    .iter()
                    .map(|p| format!("{}={}", p.register, p.name))
                    .collect();
                write_list(f, &params)?;
                write!(
                    f,
                    ") registers {} flags 0x{:04X} [{} actions]",
                    func.register_count,
                    func.flags.0,
                    func.body.len()
                )
            }
            Self::Try(block) => {
                write!(
                    f,
                    "Try try {} catch {} finally {}",
                    block.try_size, block.catch_size, block.finally_size
                )?;
                match &block.catch_target {
                    CatchTarget::Name(name) => write!(f, " into {name:?}"),
                    CatchTarget::Register(register) => write!(f, " into {register}"),
                }
            }
            Self::With { size } => write!(f, "With {size}"),
            Self::Push(value) => write!(f, "Push {value}"),
            Self::PushList(values) => {
                f.write_str("Push ")?;
                write_list(f, values)
            }
            Self::Jump(jump) => write_branch(f, "Jump", jump),
            Self::If(branch) => write_branch(f, "If", branch),
            Self::GetUrl2 { flags } => write!(f, "GetUrl2 0x{flags:02X}"),
            Self::Call => f.write_str("Call"),
            Self::GotoFrame2 { flags, scene_bias } => {
                write!(f, "GotoFrame2 0x{flags:02X}")?;
                match scene_bias {
                    Some(bias) => write!(f, " bias {bias}"),
                    None => Ok(()),
                }
            }
            Self::Marker(marker) => write!(f, "{marker}"),
            Self::Unknown { opcode, payload } => {
                write!(f, "Unknown 0x{opcode:02X} [{} bytes]", payload.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(action: &Action) -> Vec<u8> {
        let mut w = ActionWriter::new();
        action.write(&mut w).unwrap();
        w.into_vec()
    }

    #[test]
    fn test_byte_count_matches_encoding() {
        let actions = vec![
            Action::Basic(Opcode::Add),
            Action::CallFunction { args: Some(2) },
            Action::GotoFrame { frame: 3 },
            Action::GetUrl {
                url: "http://a".into(),
                target: "_blank".into(),
            },
            Action::ConstantPool {
                constants: vec!["a".into(), "bc".into()],
            },
            Action::WaitForFrame {
                frame: 1,
                skip_count: 2,
            },
            Action::With { size: 0 },
            Action::Push(PushValue::Int(5)),
            Action::PushList(vec![PushValue::Int(5), PushValue::from("x")]),
            Action::Jump(Jump::default()),
            Action::If(If::default()),
            Action::Call,
            Action::GotoFrame2 {
                flags: 1,
                scene_bias: Some(4),
            },
            Action::Try(Box::new(TryBlock {
                flags: TryFlags(TryFlags::CATCH),
                try_size: 0,
                catch_size: 0,
                finally_size: 0,
                catch_target: CatchTarget::Name("e".into()),
            })),
            Action::DefineFunction(Box::new(DefineFunction {
                name: "f".into(),
                params: vec!["a".into()],
                body: vec![Action::Basic(Opcode::Return)],
            })),
            Action::DefineFunction2(Box::new(DefineFunction2 {
                name: "g".into(),
                register_count: 3,
                flags: FunctionFlags(FunctionFlags::SUPPRESS_THIS),
                params: vec![RegisterParam {
                    register: Register(1),
                    name: "x".into(),
                }],
                body: vec![Action::Push(PushValue::Null), Action::Basic(Opcode::Return)],
            })),
            Action::Unknown {
                opcode: 0xD0,
                payload: vec![1, 2, 3],
            },
            Action::Unknown {
                opcode: 0x01,
                payload: vec![],
            },
        ];

        for action in &actions {
            assert_eq!(encode(action).len(), action.byte_count(), "{action}");
        }
    }

    #[test]
    fn test_branch_size() {
        assert_eq!(Action::Jump(Jump::default()).byte_count(), BRANCH_SIZE);
        assert_eq!(Action::If(If::default()).byte_count(), BRANCH_SIZE);
    }

    #[test]
    fn test_markers_are_silent() {
        let marker = Action::label(LabelId(0));
        assert_eq!(marker.byte_count(), 0);
        assert_eq!(marker.opcode(), None);
        assert!(encode(&marker).is_empty());
    }

    #[test]
    fn test_push_layout() {
        let list = Action::PushList(vec![PushValue::Int(5), PushValue::from("x")]);
        assert_eq!(
            encode(&list),
            vec![0x96, 8, 0, 7, 5, 0, 0, 0, 0, b'x', 0]
        );
    }

    #[test]
    fn test_function_code_follows_header() {
        let func = Action::DefineFunction(Box::new(DefineFunction {
            name: "f".into(),
            params: vec![],
            body: vec![Action::Basic(Opcode::Return)],
        }));
        // header: "f\0", 0 params, code size 1; then the 1-byte body
        assert_eq!(
            encode(&func),
            vec![0x9B, 6, 0, b'f', 0, 0, 0, 1, 0, 0x3E]
        );
    }

    #[test]
    fn test_function_code_coalesces_pushes() {
        let func = Action::DefineFunction(Box::new(DefineFunction {
            name: String::new(),
            params: vec![],
            body: vec![
                Action::Push(PushValue::Int(1)),
                Action::Push(PushValue::Int(2)),
            ],
        }));
        let bytes = encode(&func);
        assert_eq!(bytes.len(), func.byte_count());
        // one push record: 3 + 5 + 5
        assert_eq!(&bytes[6..8], &[13, 0]);
        assert_eq!(&bytes[8..11], &[0x96, 10, 0]);
    }

    #[test]
    fn test_try_register_flag_follows_target() {
        let block = Action::Try(Box::new(TryBlock {
            flags: TryFlags(TryFlags::CATCH),
            try_size: 1,
            catch_size: 2,
            finally_size: 0,
            catch_target: CatchTarget::Register(Register(2)),
        }));
        assert_eq!(
            encode(&block),
            vec![0x8F, 8, 0, 0x05, 1, 0, 2, 0, 0, 0, 2]
        );
    }

    #[test]
    fn test_branch_capability() {
        let mut action = Action::If(If::default());
        let branch = action.branch_mut().unwrap();
        branch.set_label(LabelId(4));
        branch.set_offset(-10);
        assert_eq!(action.branch().unwrap().label(), Some(LabelId(4)));
        assert_eq!(action.to_string(), "If label_4");
        assert!(Action::Basic(Opcode::Add).branch().is_none());
    }

    #[test]
    fn test_from_opcode() {
        assert_eq!(
            Action::from(Opcode::CallMethod),
            Action::CallMethod { args: None }
        );
        assert_eq!(Action::from(Opcode::Add), Action::Basic(Opcode::Add));
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::Basic(Opcode::Add).to_string(), "Add");
        assert_eq!(
            Action::CallFunction { args: Some(2) }.to_string(),
            "CallFunction (2)"
        );
        assert_eq!(
            Action::PushList(vec![PushValue::Int(5), PushValue::from("x")]).to_string(),
            "Push 5, \"x\""
        );
        assert_eq!(Action::Jump(Jump::default()).to_string(), "Jump +0");
        assert_eq!(Action::label(LabelId(1)).to_string(), "label_1:");
    }

    #[test]
    fn test_serde_snapshot() {
        let action = Action::Jump(Jump::to(LabelId(2)));
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"Jump":{"offset":0,"label":2}}"#);
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}
