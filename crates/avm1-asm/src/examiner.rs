//! Operand stack simulation
//!
//! Recovers the operand counts of the dynamic-arity actions. Compilers push
//! the count as a literal right before the call, so tracking literals through
//! the simulated stack is usually enough to find it.

use avm1_bytecode::{Action, Opcode, PushValue};

use crate::traverse::{Examiner, traverse};

/// One simulated stack entry
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Value not known statically
    Unknown,
    /// Copy of a pushed literal
    Literal(PushValue),
}

impl Slot {
    fn from_push(value: &PushValue) -> Self {
        match value {
            PushValue::Register(_) | PushValue::Constant8(_) | PushValue::Constant16(_) => {
                Self::Unknown
            }
            value => Self::Literal(value.clone()),
        }
    }
}

/// Operands of a dynamic-arity action, from the top of the stack down
struct Arity {
    /// Operands above the count (name, object, constructor)
    fixed: usize,
    /// Operands per counted item
    per_item: usize,
    /// Whether a result is pushed
    pushes: bool,
}

impl Arity {
    const fn of(op: Opcode) -> Self {
        let (fixed, per_item, pushes) = match op {
            Opcode::CallMethod | Opcode::NewMethod => (2, 1, true),
            Opcode::CallFunction | Opcode::NewObject => (1, 1, true),
            Opcode::InitObject => (0, 2, true),
            Opcode::ImplementsOp => (1, 1, false),
            _ => (0, 1, true),
        };
        Self {
            fixed,
            per_item,
            pushes,
        }
    }
}

/// [`Examiner`] that simulates the operand stack
#[derive(Debug, Clone)]
pub struct StackExaminer {
    stack: Vec<Slot>,
    seed_slots: usize,
}

impl StackExaminer {
    /// Create an examiner whose stack starts with `seed_slots` unknown values
    pub fn new(seed_slots: usize) -> Self {
        Self {
            stack: vec![Slot::Unknown; seed_slots],
            seed_slots,
        }
    }

    /// Current simulated stack, bottom first
    pub fn stack(&self) -> &[Slot] {
        &self.stack
    }

    fn push_unknown(&mut self, count: usize) {
        self.stack.extend(std::iter::repeat_n(Slot::Unknown, count));
    }

    /// Drop `n` slots; `false` on underflow
    fn pop_n(&mut self, n: usize) -> bool {
        match self.stack.len().checked_sub(n) {
            Some(len) => {
                self.stack.truncate(len);
                true
            }
            None => false,
        }
    }

    fn reset(&mut self, action: &'static str, reason: &'static str) {
        tracing::debug!(
            target: "avm1::examine",
            action,
            depth = self.stack.len(),
            "{reason}; clearing simulated stack"
        );
        self.stack.clear();
    }

    /// Pop the operands of a dynamic-arity action and return its count
    fn pop_counted(&mut self, op: Opcode) -> Option<u32> {
        let arity = Arity::of(op);
        if !self.pop_n(arity.fixed) {
            self.reset(op.name(), "stack underflow");
            return None;
        }
        let count = match self.stack.pop() {
            Some(Slot::Literal(value)) => value.as_count(),
            Some(Slot::Unknown) => None,
            None => {
                self.reset(op.name(), "stack underflow");
                return None;
            }
        };
        let Some(count) = count else {
            self.reset(op.name(), "operand count is not a literal");
            return None;
        };
        let operands = (count as usize).saturating_mul(arity.per_item);
        if !self.pop_n(operands) {
            self.reset(op.name(), "stack underflow");
            return None;
        }
        if arity.pushes {
            self.push_unknown(1);
        }
        Some(count)
    }

    fn apply_fixed(&mut self, op: Opcode) {
        match op.stack_effect() {
            Some((pops, pushes)) => {
                if !self.pop_n(usize::from(pops)) {
                    self.reset(op.name(), "stack underflow");
                }
                self.push_unknown(usize::from(pushes));
            }
            None => self.reset(op.name(), "no fixed stack effect"),
        }
    }

    fn examine_function(&self, body: &mut [Action]) {
        traverse(body, StackExaminer::new(self.seed_slots));
    }
}

impl Examiner for StackExaminer {
    fn examine(&mut self, action: &mut Action) {
        match action {
            Action::Marker(_) => {}
            Action::Push(value) => self.stack.push(Slot::from_push(value)),
            Action::PushList(values) => self.stack.extend(values.iter().map(Slot::from_push)),
            Action::Basic(Opcode::StackSwap) => {
                let len = self.stack.len();
                if len < 2 {
                    self.reset("StackSwap", "stack underflow");
                } else {
                    self.stack.swap(len - 1, len - 2);
                }
            }
            Action::Basic(Opcode::PushDuplicate) => match self.stack.last().cloned() {
                Some(top) => self.stack.push(top),
                None => {
                    self.reset("PushDuplicate", "stack underflow");
                    self.push_unknown(1);
                }
            },
            Action::CallFunction { args } => *args = self.pop_counted(Opcode::CallFunction),
            Action::CallMethod { args } => *args = self.pop_counted(Opcode::CallMethod),
            Action::NewObject { args } => *args = self.pop_counted(Opcode::NewObject),
            Action::NewMethod { args } => *args = self.pop_counted(Opcode::NewMethod),
            Action::InitArray { elements } => *elements = self.pop_counted(Opcode::InitArray),
            Action::InitObject { properties } => {
                *properties = self.pop_counted(Opcode::InitObject)
            }
            Action::ImplementsOp { interfaces } => {
                *interfaces = self.pop_counted(Opcode::ImplementsOp)
            }
            Action::DefineFunction(func) => {
                self.examine_function(&mut func.body);
                self.push_unknown(1);
            }
            Action::DefineFunction2(func) => {
                self.examine_function(&mut func.body);
                self.push_unknown(1);
            }
            Action::Unknown { .. } => self.reset("Unknown", "unknown opcode"),
            other => match other.opcode().and_then(Opcode::from_byte) {
                Some(op) => self.apply_fixed(op),
                None => self.reset("Unknown", "unknown opcode"),
            },
        }
    }
}

/// Annotate the dynamic-arity actions of `actions` and of every nested
/// function body
pub fn examine(actions: &mut [Action], seed_slots: usize) {
    traverse(actions, StackExaminer::new(seed_slots));
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm1_bytecode::{DefineFunction, If, LabelId};

    fn push(value: impl Into<PushValue>) -> Action {
        Action::Push(value.into())
    }

    #[test]
    fn test_call_function_count() {
        let mut actions = vec![
            push("b"),
            push("a"),
            push(2),
            push("foo"),
            Action::CallFunction { args: None },
            Action::Basic(Opcode::Pop),
        ];
        examine(&mut actions, 0);
        assert_eq!(actions[4], Action::CallFunction { args: Some(2) });
    }

    #[test]
    fn test_call_method_pops_object_and_name() {
        let mut examiner = StackExaminer::new(0);
        let mut actions = vec![
            push(1),
            push(1.0),
            Action::Basic(Opcode::GetTime),
            push("m"),
            Action::CallMethod { args: None },
        ];
        for action in &mut actions {
            examiner.examine(action);
        }
        assert_eq!(actions[4], Action::CallMethod { args: Some(1) });
        assert_eq!(examiner.stack(), &[Slot::Unknown]);
    }

    #[test]
    fn test_init_object_pops_pairs() {
        let mut examiner = StackExaminer::new(0);
        let mut actions = vec![
            push(1),
            push("a"),
            push(2),
            push("b"),
            push(2),
            Action::InitObject { properties: None },
        ];
        for action in &mut actions {
            examiner.examine(action);
        }
        assert_eq!(actions[5], Action::InitObject { properties: Some(2) });
        assert_eq!(examiner.stack(), &[Slot::Unknown]);
    }

    #[test]
    fn test_implements_pushes_nothing() {
        let mut examiner = StackExaminer::new(1);
        let mut action = Action::ImplementsOp { interfaces: None };
        for mut prefix in [push("I"), push(1), push("C")] {
            examiner.examine(&mut prefix);
        }
        examiner.examine(&mut action);
        assert_eq!(action, Action::ImplementsOp { interfaces: Some(1) });
        assert_eq!(examiner.stack(), &[Slot::Unknown]);
    }

    #[test]
    fn test_non_literal_count_clears() {
        let mut examiner = StackExaminer::new(4);
        let mut actions = vec![
            Action::Basic(Opcode::GetVariable),
            push("f"),
            Action::CallFunction { args: None },
        ];
        for action in &mut actions {
            examiner.examine(action);
        }
        assert_eq!(actions[2], Action::CallFunction { args: None });
        assert!(examiner.stack().is_empty());
    }

    #[test]
    fn test_register_push_is_unknown() {
        let mut examiner = StackExaminer::new(0);
        examiner.examine(&mut push(PushValue::Register(1.into())));
        examiner.examine(&mut push(PushValue::Constant8(0)));
        examiner.examine(&mut push(3));
        assert_eq!(
            examiner.stack(),
            &[
                Slot::Unknown,
                Slot::Unknown,
                Slot::Literal(PushValue::Int(3))
            ]
        );
    }

    #[test]
    fn test_swap_and_duplicate() {
        let mut examiner = StackExaminer::new(0);
        let mut actions = vec![
            push(1),
            push(2),
            Action::Basic(Opcode::StackSwap),
            Action::Basic(Opcode::PushDuplicate),
        ];
        for action in &mut actions {
            examiner.examine(action);
        }
        assert_eq!(
            examiner.stack(),
            &[
                Slot::Literal(PushValue::Int(2)),
                Slot::Literal(PushValue::Int(1)),
                Slot::Literal(PushValue::Int(1)),
            ]
        );
    }

    #[test]
    fn test_underflow_recovers() {
        let mut examiner = StackExaminer::new(0);
        examiner.examine(&mut Action::Basic(Opcode::Add));
        assert_eq!(examiner.stack(), &[Slot::Unknown]);
    }

    #[test]
    fn test_branches_keep_separate_stacks() {
        let l = LabelId(0);
        let mut actions = vec![
            push(0),
            push("f"),
            push(true),
            Action::If(If::to(l)),
            push("x"),
            Action::Basic(Opcode::Return),
            Action::label(l),
            Action::CallFunction { args: None },
        ];
        examine(&mut actions, 0);
        // "x" was pushed on the fall-through path only
        assert_eq!(actions[7], Action::CallFunction { args: Some(0) });
    }

    #[test]
    fn test_function_body_examined_with_fresh_stack() {
        let mut actions = vec![
            push(7),
            Action::DefineFunction(Box::new(DefineFunction {
                name: "f".into(),
                params: vec![],
                body: vec![push(0), push("g"), Action::CallFunction { args: None }],
            })),
            Action::Basic(Opcode::Pop),
        ];
        examine(&mut actions, 0);
        assert_eq!(
            actions[1].function_body().unwrap()[2],
            Action::CallFunction { args: Some(0) }
        );
    }
}
