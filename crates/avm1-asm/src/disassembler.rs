//! Bytes to structured actions
//!
//! Disassembly runs in fixed steps over each sequence:
//! 1. Flat decode; function bodies are disassembled recursively as they are met
//! 2. Branch offsets become labels
//! 3. Block spans become end markers
//! 4. Push lists are split into single pushes
//!
//! Stack examination then runs once over the finished top-level sequence.

use std::cmp::Reverse;

use avm1_bytecode::{
    Action, ActionReader, BODY_THRESHOLD, BRANCH_SIZE, CatchTarget, DecodeError, DecodeResult,
    DefineFunction, DefineFunction2, FunctionFlags, If, Jump, LabelId, Marker, Opcode,
    PushValue, Register, RegisterParam, TryBlock, TryFlags,
};
use rustc_hash::FxHashMap;

use crate::config::DisassemblerConfig;
use crate::error::{DisassembleError, DisassembleResult};
use crate::examiner;

/// Action with its position in the input
#[derive(Debug)]
struct Decoded {
    action: Action,
    /// Absolute offset in the outermost buffer
    offset: usize,
    /// Encoded size, including nested function code; zero for markers
    span: usize,
}

impl Decoded {
    fn marker(marker: Marker, offset: usize) -> Self {
        Self {
            action: Action::Marker(marker),
            offset,
            span: 0,
        }
    }
}

/// How a block measures its extent
#[derive(Debug, Clone, Copy)]
enum SpanUnit {
    Bytes,
    Records,
}

/// End marker waiting to be inserted before index `at`
#[derive(Debug)]
struct PendingMarker {
    at: usize,
    /// Index of the opening block
    block: usize,
    /// Order among one block's markers at the same index
    phase: u8,
    marker: Marker,
}

/// Converts raw action bytes into structured sequences
#[derive(Debug, Clone, Default)]
pub struct Disassembler {
    config: DisassemblerConfig,
}

impl Disassembler {
    /// Create a disassembler
    pub fn new(config: DisassemblerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &DisassemblerConfig {
        &self.config
    }

    /// Disassemble a complete action buffer
    pub fn disassemble(&self, bytes: &[u8]) -> DisassembleResult<Vec<Action>> {
        let mut cx = Context {
            config: &self.config,
            next_label: 0,
        };
        let mut actions = cx.sequence(ActionReader::new(bytes), 0)?;

        if self.config.examine_stack {
            examiner::examine(&mut actions, self.config.seed_slots);
        }

        tracing::debug!(
            target: "avm1::disasm",
            bytes = bytes.len(),
            actions = actions.len(),
            labels = cx.next_label,
            "disassembled"
        );
        Ok(actions)
    }
}

/// State scoped to one `disassemble` call
struct Context<'a> {
    config: &'a DisassemblerConfig,
    next_label: u32,
}

impl Context<'_> {
    fn allocate_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Disassemble every action left in `r` as one sequence
    fn sequence(&mut self, mut r: ActionReader<'_>, depth: usize) -> DisassembleResult<Vec<Action>> {
        let mut decoded = Vec::new();
        while !r.is_empty() {
            let offset = r.offset();
            let action = self.action(&mut r, depth)?;
            decoded.push(Decoded {
                action,
                offset,
                span: r.offset() - offset,
            });
        }
        let end = r.offset();

        let decoded = self.labels(decoded, end)?;
        let decoded = end_markers(decoded, end)?;
        Ok(explode(decoded))
    }

    fn action(&mut self, r: &mut ActionReader<'_>, depth: usize) -> DisassembleResult<Action> {
        let offset = r.offset();
        let opcode = r.read_u8()?;
        if opcode < BODY_THRESHOLD {
            return Ok(match Opcode::from_byte(opcode) {
                Some(op) => Action::from(op),
                None => Action::Unknown {
                    opcode,
                    payload: Vec::new(),
                },
            });
        }

        let declared = usize::from(r.read_u16()?);
        let mut body = r.sub_reader(declared)?;
        let action = match Opcode::from_byte(opcode) {
            Some(op) => self.body(op, &mut body, r, offset, depth)?,
            None => Action::Unknown {
                opcode,
                payload: body.read_bytes(declared)?.to_vec(),
            },
        };
        if !body.is_empty() {
            return Err(DecodeError::BodyLength {
                opcode,
                offset,
                declared,
                consumed: body.position(),
            }
            .into());
        }
        Ok(action)
    }

    /// Decode the body of a known opcode. Function code is read from `rest`,
    /// which continues after the declared body.
    fn body(
        &mut self,
        op: Opcode,
        body: &mut ActionReader<'_>,
        rest: &mut ActionReader<'_>,
        offset: usize,
        depth: usize,
    ) -> DisassembleResult<Action> {
        let action = match op {
            Opcode::GotoFrame => Action::GotoFrame {
                frame: body.read_u16()?,
            },
            Opcode::GetUrl => Action::GetUrl {
                url: body.read_str()?,
                target: body.read_str()?,
            },
            Opcode::StoreRegister => Action::StoreRegister {
                register: Register(body.read_u8()?),
            },
            Opcode::ConstantPool => {
                let count = body.read_u16()?;
                let constants = (0..count)
                    .map(|_| body.read_str())
                    .collect::<DecodeResult<Vec<_>>>()?;
                Action::ConstantPool { constants }
            }
            Opcode::WaitForFrame => Action::WaitForFrame {
                frame: body.read_u16()?,
                skip_count: body.read_u8()?,
            },
            Opcode::SetTarget => Action::SetTarget {
                target: body.read_str()?,
            },
            Opcode::GoToLabel => Action::GoToLabel {
                label: body.read_str()?,
            },
            Opcode::WaitForFrame2 => Action::WaitForFrame2 {
                skip_count: body.read_u8()?,
            },
            Opcode::DefineFunction => {
                let name = body.read_str()?;
                let count = body.read_u16()?;
                let params = (0..count)
                    .map(|_| body.read_str())
                    .collect::<DecodeResult<Vec<_>>>()?;
                let code_size = body.read_u16()?;
                let code = self.function_code(rest, code_size, offset, depth)?;
                Action::DefineFunction(Box::new(DefineFunction {
                    name,
                    params,
                    body: code,
                }))
            }
            Opcode::DefineFunction2 => {
                let name = body.read_str()?;
                let count = body.read_u16()?;
                let register_count = body.read_u8()?;
                let flags = FunctionFlags(body.read_u16()?);
                let params = (0..count)
                    .map(|_| {
                        Ok(RegisterParam {
                            register: Register(body.read_u8()?),
                            name: body.read_str()?,
                        })
                    })
                    .collect::<DecodeResult<Vec<_>>>()?;
                let code_size = body.read_u16()?;
                let code = self.function_code(rest, code_size, offset, depth)?;
                Action::DefineFunction2(Box::new(DefineFunction2 {
                    name,
                    register_count,
                    flags,
                    params,
                    body: code,
                }))
            }
            Opcode::Try => {
                let flags = TryFlags(body.read_u8()?);
                let try_size = body.read_u16()?;
                let catch_size = body.read_u16()?;
                let finally_size = body.read_u16()?;
                let catch_target = if flags.contains(TryFlags::CATCH_IN_REGISTER) {
                    CatchTarget::Register(Register(body.read_u8()?))
                } else {
                    CatchTarget::Name(body.read_str()?)
                };
                Action::Try(Box::new(TryBlock {
                    flags,
                    try_size,
                    catch_size,
                    finally_size,
                    catch_target,
                }))
            }
            Opcode::With => Action::With {
                size: body.read_u16()?,
            },
            Opcode::Push => {
                let mut values = Vec::new();
                while !body.is_empty() {
                    values.push(PushValue::read(body)?);
                }
                Action::PushList(values)
            }
            Opcode::Jump => Action::Jump(Jump {
                offset: body.read_i16()?,
                label: None,
            }),
            Opcode::If => Action::If(If {
                offset: body.read_i16()?,
                label: None,
            }),
            Opcode::GetUrl2 => Action::GetUrl2 {
                flags: body.read_u8()?,
            },
            Opcode::Call => Action::Call,
            Opcode::GotoFrame2 => {
                let flags = body.read_u8()?;
                let scene_bias = if flags & 0x02 != 0 {
                    Some(body.read_u16()?)
                } else {
                    None
                };
                Action::GotoFrame2 { flags, scene_bias }
            }
            op => Action::Unknown {
                opcode: op.to_byte(),
                payload: body.read_bytes(body.remaining())?.to_vec(),
            },
        };
        Ok(action)
    }

    fn function_code(
        &mut self,
        rest: &mut ActionReader<'_>,
        code_size: u16,
        offset: usize,
        depth: usize,
    ) -> DisassembleResult<Vec<Action>> {
        if depth + 1 > self.config.max_depth {
            return Err(DisassembleError::TooDeep {
                offset,
                max_depth: self.config.max_depth,
            });
        }
        let code = rest.sub_reader(usize::from(code_size))?;
        self.sequence(code, depth + 1)
    }

    /// Bind every branch to a label placed before its target
    fn labels(&mut self, mut decoded: Vec<Decoded>, end: usize) -> DisassembleResult<Vec<Decoded>> {
        let len = decoded.len();
        let base = decoded.first().map_or(end, |d| d.offset);
        let starts: Vec<usize> = decoded.iter().map(|d| d.offset - base).collect();
        let total = end - base;

        let mut targets: FxHashMap<usize, LabelId> = FxHashMap::default();
        for (i, d) in decoded.iter_mut().enumerate() {
            let Some(branch) = d.action.branch_mut() else {
                continue;
            };
            let target = (starts[i] + BRANCH_SIZE) as i64 + i64::from(branch.offset());
            if target < 0 || target > total as i64 {
                return Err(DisassembleError::BranchOutOfRange {
                    offset: d.offset,
                    target,
                });
            }
            let target = target as usize;
            let index = if target == total {
                len
            } else {
                starts
                    .binary_search(&target)
                    .map_err(|_| DisassembleError::MisalignedBranch {
                        offset: d.offset,
                        target,
                    })?
            };
            let label = match targets.get(&index) {
                Some(label) => *label,
                None => {
                    let label = self.allocate_label();
                    targets.insert(index, label);
                    label
                }
            };
            branch.set_label(label);
        }

        if targets.is_empty() {
            return Ok(decoded);
        }
        tracing::debug!(
            target: "avm1::disasm",
            labels = targets.len(),
            actions = len,
            "labels reconstructed"
        );

        let mut out = Vec::with_capacity(len + targets.len());
        for (i, d) in decoded.into_iter().enumerate() {
            if let Some(label) = targets.get(&i) {
                out.push(Decoded::marker(Marker::Label(*label), d.offset));
            }
            out.push(d);
        }
        if let Some(label) = targets.get(&len) {
            out.push(Decoded::marker(Marker::Label(*label), end));
        }
        Ok(out)
    }
}

/// Index just past `amount` bytes or records starting at `from`
fn span_end(
    decoded: &[Decoded],
    from: usize,
    amount: usize,
    unit: SpanUnit,
    offset: usize,
) -> DisassembleResult<usize> {
    let mut pos = from;
    let mut covered = 0;
    while covered < amount {
        let Some(d) = decoded.get(pos) else {
            return Err(DisassembleError::BlockOverrun {
                offset,
                size: amount,
            });
        };
        covered += match unit {
            SpanUnit::Bytes => d.span,
            SpanUnit::Records => usize::from(!d.action.is_marker()),
        };
        pos += 1;
    }
    if covered > amount {
        return Err(DisassembleError::MisalignedBlock {
            offset,
            size: amount,
        });
    }
    Ok(pos)
}

/// Insert the markers that close `With`, `Try` and wait-for-frame blocks
fn end_markers(decoded: Vec<Decoded>, end: usize) -> DisassembleResult<Vec<Decoded>> {
    let mut pending = Vec::new();
    for (i, d) in decoded.iter().enumerate() {
        let mut close = |at: usize, phase: u8, marker: Marker| {
            pending.push(PendingMarker {
                at,
                block: i,
                phase,
                marker,
            });
        };
        match &d.action {
            Action::With { size } => {
                let at = span_end(&decoded, i + 1, usize::from(*size), SpanUnit::Bytes, d.offset)?;
                close(at, 0, Marker::EndWith);
            }
            Action::WaitForFrame { skip_count, .. } | Action::WaitForFrame2 { skip_count } => {
                let at = span_end(
                    &decoded,
                    i + 1,
                    usize::from(*skip_count),
                    SpanUnit::Records,
                    d.offset,
                )?;
                close(at, 0, Marker::EndWait);
            }
            Action::Try(block) => {
                let span = |from: usize, size: u16| {
                    span_end(&decoded, from, usize::from(size), SpanUnit::Bytes, d.offset)
                };
                let try_end = span(i + 1, block.try_size)?;
                let catch_end = span(try_end, block.catch_size)?;
                let finally_end = span(catch_end, block.finally_size)?;
                if block.has_catch() {
                    close(try_end, 0, Marker::Catch);
                }
                if block.has_finally() {
                    close(catch_end, 1, Marker::Finally);
                }
                close(finally_end, 2, Marker::EndTry);
            }
            _ => {}
        }
    }

    if pending.is_empty() {
        return Ok(decoded);
    }
    // inner blocks close first; labels already in place stay after the markers
    pending.sort_by_key(|m| (m.at, Reverse(m.block), m.phase));

    let mut out = Vec::with_capacity(decoded.len() + pending.len());
    let mut pending = pending.into_iter().peekable();
    for (i, d) in decoded.into_iter().enumerate() {
        while let Some(m) = pending.next_if(|m| m.at == i) {
            out.push(Decoded::marker(m.marker, d.offset));
        }
        out.push(d);
    }
    out.extend(pending.map(|m| Decoded::marker(m.marker, end)));
    Ok(out)
}

/// Split push lists into single pushes. Empty lists are kept so their bytes
/// survive reassembly.
fn explode(decoded: Vec<Decoded>) -> Vec<Action> {
    let mut out = Vec::with_capacity(decoded.len());
    for d in decoded {
        match d.action {
            Action::PushList(values) if !values.is_empty() => {
                out.extend(values.into_iter().map(Action::Push));
            }
            action => out.push(action),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bytes: &[u8]) -> DisassembleResult<Vec<Action>> {
        Disassembler::new(DisassemblerConfig::raw()).disassemble(bytes)
    }

    #[test]
    fn test_forward_jump_to_end() {
        let actions = raw(&[0x99, 2, 0, 1, 0, 0x06]).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Jump(Jump {
                    offset: 1,
                    label: Some(LabelId(0))
                }),
                Action::Basic(Opcode::Play),
                Action::label(LabelId(0)),
            ]
        );
    }

    #[test]
    fn test_backward_jump() {
        let actions = raw(&[0x06, 0x99, 2, 0, 0xFA, 0xFF]).unwrap();
        assert_eq!(actions[0], Action::label(LabelId(0)));
        assert_eq!(actions[1], Action::Basic(Opcode::Play));
        assert_eq!(actions[2].branch().unwrap().label(), Some(LabelId(0)));
    }

    #[test]
    fn test_shared_label() {
        // two branches to the same Play
        let actions = raw(&[0x99, 2, 0, 5, 0, 0x9D, 2, 0, 0, 0, 0x06]).unwrap();
        let labels: Vec<_> = actions.iter().filter_map(Action::as_label).collect();
        assert_eq!(labels, vec![LabelId(0)]);
        assert_eq!(actions[2], Action::label(LabelId(0)));
    }

    #[test]
    fn test_misaligned_branch() {
        let bytes = [0x96, 5, 0, 7, 0, 0, 0, 0, 0x99, 2, 0, 0xF7, 0xFF];
        assert_eq!(
            raw(&bytes),
            Err(DisassembleError::MisalignedBranch {
                offset: 8,
                target: 4
            })
        );
    }

    #[test]
    fn test_branch_out_of_range() {
        assert_eq!(
            raw(&[0x99, 2, 0, 0x10, 0]),
            Err(DisassembleError::BranchOutOfRange {
                offset: 0,
                target: 21
            })
        );
    }

    #[test]
    fn test_with_end_marker() {
        let actions = raw(&[0x94, 2, 0, 2, 0, 0x06, 0x07, 0x00]).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::With { size: 2 },
                Action::Basic(Opcode::Play),
                Action::Basic(Opcode::Stop),
                Action::Marker(Marker::EndWith),
                Action::Basic(Opcode::End),
            ]
        );
    }

    #[test]
    fn test_try_markers() {
        let bytes = [
            0x8F, 9, 0, 0x03, 1, 0, 1, 0, 1, 0, b'e', 0, 0x06, 0x07, 0x08,
        ];
        let actions = raw(&bytes).unwrap();
        let listing: Vec<String> = actions.iter().map(ToString::to_string).collect();
        assert_eq!(
            &listing[1..],
            &["Play", "Catch", "Stop", "Finally", "ToggleQuality", "EndTry"]
        );
    }

    #[test]
    fn test_empty_catch_markers_ordered() {
        let bytes = [0x8F, 9, 0, 0x01, 0, 0, 0, 0, 0, 0, b'e', 0, 0x06];
        let actions = raw(&bytes).unwrap();
        assert_eq!(actions[1], Action::Marker(Marker::Catch));
        assert_eq!(actions[2], Action::Marker(Marker::EndTry));
        assert_eq!(actions[3], Action::Basic(Opcode::Play));
    }

    #[test]
    fn test_end_marker_precedes_label() {
        // With covers Play; a jump targets the Stop after it
        let bytes = [0x99, 2, 0, 6, 0, 0x94, 2, 0, 1, 0, 0x06, 0x07];
        let actions = raw(&bytes).unwrap();
        assert_eq!(actions[3], Action::Marker(Marker::EndWith));
        assert_eq!(actions[4], Action::label(LabelId(0)));
        assert_eq!(actions[5], Action::Basic(Opcode::Stop));
    }

    #[test]
    fn test_wait_for_frame_counts_records() {
        let bytes = [0x8A, 3, 0, 1, 0, 2, 0x96, 2, 0, 2, 3, 0x06, 0x07];
        let actions = raw(&bytes).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::WaitForFrame {
                    frame: 1,
                    skip_count: 2
                },
                Action::Push(PushValue::Null),
                Action::Push(PushValue::Undefined),
                Action::Basic(Opcode::Play),
                Action::Marker(Marker::EndWait),
                Action::Basic(Opcode::Stop),
            ]
        );
    }

    #[test]
    fn test_block_overrun() {
        assert_eq!(
            raw(&[0x94, 2, 0, 5, 0, 0x06]),
            Err(DisassembleError::BlockOverrun { offset: 0, size: 5 })
        );
    }

    #[test]
    fn test_block_misaligned() {
        assert_eq!(
            raw(&[0x94, 2, 0, 2, 0, 0x96, 2, 0, 2, 3]),
            Err(DisassembleError::MisalignedBlock { offset: 0, size: 2 })
        );
    }

    #[test]
    fn test_nested_function() {
        let bytes = [0x9B, 6, 0, b'f', 0, 0, 0, 1, 0, 0x3E];
        let actions = raw(&bytes).unwrap();
        assert_eq!(
            actions,
            vec![Action::DefineFunction(Box::new(DefineFunction {
                name: "f".into(),
                params: vec![],
                body: vec![Action::Basic(Opcode::Return)],
            }))]
        );
    }

    #[test]
    fn test_labels_unique_across_functions() {
        let bytes = [
            0x9B, 6, 0, b'f', 0, 0, 0, 5, 0, 0x99, 2, 0, 0, 0, 0x99, 2, 0, 0, 0,
        ];
        let actions = raw(&bytes).unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[1].branch().unwrap().label(), Some(LabelId(1)));
        assert_eq!(actions[2], Action::label(LabelId(1)));
        let body = actions[0].function_body().unwrap();
        assert_eq!(body[0].branch().unwrap().label(), Some(LabelId(0)));
        assert_eq!(body[1], Action::label(LabelId(0)));
    }

    #[test]
    fn test_too_deep() {
        let bytes = [0x9B, 6, 0, b'f', 0, 0, 0, 1, 0, 0x3E];
        let disassembler = Disassembler::new(DisassemblerConfig::new().with_max_depth(0));
        assert_eq!(
            disassembler.disassemble(&bytes),
            Err(DisassembleError::TooDeep {
                offset: 0,
                max_depth: 0
            })
        );
    }

    #[test]
    fn test_body_length_mismatch() {
        assert_eq!(
            raw(&[0x81, 3, 0, 1, 0, 0]),
            Err(DisassembleError::Decode(DecodeError::BodyLength {
                opcode: 0x81,
                offset: 0,
                declared: 3,
                consumed: 2
            }))
        );
    }

    #[test]
    fn test_truncated_body() {
        let err = raw(&[0x06, 0x81, 2, 0, 1]).unwrap_err();
        assert_eq!(err.offset(), 4);
    }

    #[test]
    fn test_unknown_opcodes() {
        let actions = raw(&[0x01, 0xD0, 3, 0, 1, 2, 3]).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Unknown {
                    opcode: 0x01,
                    payload: vec![]
                },
                Action::Unknown {
                    opcode: 0xD0,
                    payload: vec![1, 2, 3]
                },
            ]
        );
    }

    #[test]
    fn test_empty_push_kept() {
        assert_eq!(
            raw(&[0x96, 0, 0]).unwrap(),
            vec![Action::PushList(vec![])]
        );
    }

    #[test]
    fn test_goto_frame2_bias() {
        let actions = raw(&[0x9F, 3, 0, 0x03, 4, 0, 0x9F, 1, 0, 0x01]).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::GotoFrame2 {
                    flags: 0x03,
                    scene_bias: Some(4)
                },
                Action::GotoFrame2 {
                    flags: 0x01,
                    scene_bias: None
                },
            ]
        );
    }
}
