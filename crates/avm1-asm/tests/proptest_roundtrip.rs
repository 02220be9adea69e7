//! Property tests for byte-level round trips

use avm1_asm::{assemble, disassemble};
use avm1_bytecode::{Action, If, Jump, LabelId, Opcode, PushValue, Register};
use proptest::prelude::*;

fn push_value() -> impl Strategy<Value = PushValue> {
    prop_oneof![
        "[a-z]{0,8}".prop_map(PushValue::Str),
        (-1000.0f32..1000.0).prop_map(PushValue::Float),
        Just(PushValue::Null),
        Just(PushValue::Undefined),
        any::<u8>().prop_map(|r| PushValue::Register(Register(r))),
        any::<bool>().prop_map(PushValue::Bool),
        (-1.0e6f64..1.0e6).prop_map(PushValue::Double),
        any::<i32>().prop_map(PushValue::Int),
        any::<u8>().prop_map(PushValue::Constant8),
        any::<u16>().prop_map(PushValue::Constant16),
    ]
}

fn basic_opcode() -> impl Strategy<Value = Opcode> {
    prop::sample::select(vec![
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Pop,
        Opcode::Play,
        Opcode::Stop,
        Opcode::NextFrame,
        Opcode::Trace,
        Opcode::GetVariable,
        Opcode::SetVariable,
        Opcode::Not,
        Opcode::Equals2,
        Opcode::PushDuplicate,
        Opcode::StackSwap,
        Opcode::GetMember,
    ])
}

/// Straight-line actions without markers
fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => push_value().prop_map(Action::Push),
        3 => basic_opcode().prop_map(Action::Basic),
        1 => any::<u16>().prop_map(|frame| Action::GotoFrame { frame }),
        1 => any::<u8>().prop_map(|r| Action::StoreRegister { register: Register(r) }),
        1 => "[a-z/_]{0,10}".prop_map(|target| Action::SetTarget { target }),
        1 => prop::collection::vec("[a-z]{1,6}", 0..4)
            .prop_map(|constants| Action::ConstantPool { constants }),
        1 => (
            (0x80u8..=0xFF).prop_filter("unassigned opcode", |op| Opcode::from_byte(*op).is_none()),
            prop::collection::vec(any::<u8>(), 0..8),
        )
            .prop_map(|(opcode, payload)| Action::Unknown { opcode, payload }),
    ]
}

proptest! {
    #[test]
    fn prop_reassembly_is_byte_identical(actions in prop::collection::vec(action(), 0..32)) {
        let bytes = assemble(actions).unwrap();
        let again = assemble(disassemble(&bytes).unwrap()).unwrap();
        prop_assert_eq!(again, bytes);
    }

    #[test]
    fn prop_coalescing_is_idempotent(
        chunks in prop::collection::vec(prop::collection::vec(action(), 0..6), 0..5),
    ) {
        // chunks assembled separately may leave adjacent push records
        let mut bytes = Vec::new();
        for chunk in chunks {
            bytes.extend(assemble(chunk).unwrap());
        }
        let first = disassemble(&bytes).unwrap();
        let second = disassemble(&assemble(first.clone()).unwrap()).unwrap();
        prop_assert_eq!(second, first);
    }

    #[test]
    fn prop_branch_offset_matches_target(
        (actions, split, conditional) in prop::collection::vec(action(), 0..24)
            .prop_flat_map(|actions| {
                let len = actions.len();
                (Just(actions), 0..=len, any::<bool>())
            }),
    ) {
        let label = LabelId(0);
        let branch = if conditional {
            Action::If(If::to(label))
        } else {
            Action::Jump(Jump::to(label))
        };
        let skipped = assemble(actions[..split].to_vec()).unwrap().len();

        let mut sequence = vec![branch];
        sequence.extend_from_slice(&actions[..split]);
        sequence.push(Action::label(label));
        sequence.extend_from_slice(&actions[split..]);

        let bytes = assemble(sequence).unwrap();
        let offset = i16::try_from(skipped).unwrap();
        prop_assert_eq!(&bytes[3..5], &offset.to_le_bytes());

        let again = assemble(disassemble(&bytes).unwrap()).unwrap();
        prop_assert_eq!(again, bytes);
    }
}
