//! Indented text listing of a sequence

use std::fmt::{Display, Write};

use avm1_bytecode::{Action, Marker};

const INDENT: usize = 4;

/// Render `actions` one per line. Nested function bodies and block contents
/// are indented; labels sit at the indentation of their sequence.
pub fn listing(actions: &[Action]) -> String {
    let mut out = String::new();
    write_sequence(&mut out, actions, 0);
    out
}

fn line(out: &mut String, level: usize, item: impl Display) {
    let _ = writeln!(out, "{:indent$}{item}", "", indent = level * INDENT);
}

fn write_sequence(out: &mut String, actions: &[Action], depth: usize) {
    let mut level = depth;
    for action in actions {
        match action {
            Action::Marker(Marker::Label(_)) => line(out, depth, action),
            Action::Marker(Marker::EndWith | Marker::EndWait | Marker::EndTry) => {
                level = level.saturating_sub(1).max(depth);
                line(out, level, action);
            }
            Action::Marker(Marker::Catch | Marker::Finally) => {
                line(out, level.saturating_sub(1).max(depth), action);
            }
            _ => {
                line(out, level, action);
                if let Some(body) = action.function_body() {
                    write_sequence(out, body, level + 1);
                }
                if matches!(
                    action,
                    Action::With { .. }
                        | Action::Try(_)
                        | Action::WaitForFrame { .. }
                        | Action::WaitForFrame2 { .. }
                ) {
                    level += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm1_bytecode::{DefineFunction, LabelId, Opcode, PushValue};

    #[test]
    fn test_listing_indents_bodies_and_blocks() {
        let actions = vec![
            Action::label(LabelId(0)),
            Action::Push(PushValue::Int(1)),
            Action::DefineFunction(Box::new(DefineFunction {
                name: "f".into(),
                params: vec!["a".into()],
                body: vec![Action::Basic(Opcode::Return)],
            })),
            Action::With { size: 1 },
            Action::Basic(Opcode::Play),
            Action::Marker(Marker::EndWith),
        ];
        assert_eq!(
            listing(&actions),
            "label_0:\nPush 1\nDefineFunction \"f\" (a) [1 actions]\n    Return\nWith 1\n    Play\nEndWith\n"
        );
    }

    #[test]
    fn test_listing_empty() {
        assert_eq!(listing(&[]), "");
    }
}
