//! Encoded-record view of an action sequence
//!
//! A structured sequence and its byte encoding do not map one to one: a run
//! of consecutive single `Push` actions is written as one push record, and
//! markers are not written at all. Byte sizes, block lengths and
//! wait-for-frame skip counts are all measured in records.

use std::ops::Range;

use crate::action::{Action, HEADER_SIZE};
use crate::error::EncodeResult;
use crate::opcode::Opcode;
use crate::value::PushValue;
use crate::writer::ActionWriter;

/// One encoded record and the actions it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Indices of the covered actions
    pub range: Range<usize>,
    /// Encoded size in bytes
    pub bytes: usize,
    /// Whether the record is a real action (markers are not)
    pub counted: bool,
}

impl Record {
    /// Whether this record is a coalesced run of single pushes
    pub fn is_push_run(&self, actions: &[Action]) -> bool {
        matches!(actions.get(self.range.start), Some(Action::Push(_)))
    }
}

/// Record starting at index `start`
pub fn record_at(actions: &[Action], start: usize) -> Option<Record> {
    let first = actions.get(start)?;
    let record = match first {
        Action::Push(_) => {
            let mut end = start;
            let mut body = 0;
            while let Some(Action::Push(value)) = actions.get(end) {
                body += value.encoded_len();
                end += 1;
            }
            Record {
                range: start..end,
                bytes: HEADER_SIZE + body,
                counted: true,
            }
        }
        action => Record {
            range: start..start + 1,
            bytes: action.byte_count(),
            counted: !action.is_marker(),
        },
    };
    Some(record)
}

/// Iterator over the records of a sequence
#[derive(Debug, Clone)]
pub struct Records<'a> {
    actions: &'a [Action],
    pos: usize,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let record = record_at(self.actions, self.pos)?;
        self.pos = record.range.end;
        Some(record)
    }
}

/// Walk the records of `actions` in order
pub fn records(actions: &[Action]) -> Records<'_> {
    Records { actions, pos: 0 }
}

/// Encoded size of a sequence
pub fn encoded_len(actions: &[Action]) -> usize {
    records(actions).map(|r| r.bytes).sum()
}

/// Serialize a sequence, writing each push run as one record
pub fn write_sequence(actions: &[Action], w: &mut ActionWriter) -> EncodeResult<()> {
    for record in records(actions) {
        let covered = &actions[record.range.clone()];
        if record.is_push_run(actions) {
            w.write_header(Opcode::Push.to_byte(), record.bytes - HEADER_SIZE)?;
            for value in covered.iter().filter_map(single_push) {
                value.write(w)?;
            }
        } else {
            for action in covered {
                action.write(w)?;
            }
        }
    }
    Ok(())
}

fn single_push(action: &Action) -> Option<&PushValue> {
    match action {
        Action::Push(value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Jump, Marker};
    use crate::operand::LabelId;

    fn sample() -> Vec<Action> {
        vec![
            Action::Push(PushValue::Int(1)),
            Action::Push(PushValue::from("ab")),
            Action::Marker(Marker::Label(LabelId(0))),
            Action::Push(PushValue::Null),
            Action::Basic(Opcode::Add),
            Action::Jump(Jump::to(LabelId(0))),
        ]
    }

    #[test]
    fn test_push_run_is_one_record() {
        let actions = sample();
        let all: Vec<Record> = records(&actions).collect();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].range, 0..2);
        assert_eq!(all[0].bytes, 3 + 5 + 4);
        assert!(all[0].counted);
        assert!(!all[1].counted);
        assert_eq!(all[1].bytes, 0);
        assert_eq!(all[2].range, 3..4);
        assert_eq!(all[2].bytes, 4);
    }

    #[test]
    fn test_encoded_len() {
        let actions = sample();
        assert_eq!(encoded_len(&actions), 12 + 4 + 1 + 5);
        assert_eq!(encoded_len(&[]), 0);
    }

    #[test]
    fn test_write_sequence_matches_len() {
        let actions = sample();
        let mut w = ActionWriter::new();
        write_sequence(&actions, &mut w).unwrap();
        assert_eq!(w.len(), encoded_len(&actions));
        assert_eq!(&w.as_slice()[..3], &[0x96, 9, 0]);
    }

    #[test]
    fn test_push_list_is_its_own_record() {
        let actions = vec![
            Action::PushList(vec![PushValue::Int(1)]),
            Action::Push(PushValue::Int(2)),
        ];
        let all: Vec<Record> = records(&actions).collect();
        assert_eq!(all.len(), 2);
        assert!(!all[0].is_push_run(&actions));
        assert!(all[1].is_push_run(&actions));
    }
}
