//! Structured actions to bytes
//!
//! Assembly runs four passes, each over every nested function body:
//! 1. Runs of single pushes are coalesced into push lists
//! 2. Labeled branches get their byte offsets
//! 3. Block lengths are measured from their end markers
//! 4. The sequence is serialized; markers emit nothing

use avm1_bytecode::{
    Action, ActionWriter, BRANCH_SIZE, EncodeError, LabelId, Marker, PushValue, Record, records,
    write_sequence,
};
use rustc_hash::FxHashMap;

use crate::config::AssemblerConfig;
use crate::error::{AssembleError, AssembleResult};

/// Converts structured sequences back into action bytes
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    /// Create an assembler
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble a sequence into bytes
    pub fn assemble(&self, actions: Vec<Action>) -> AssembleResult<Vec<u8>> {
        let mut actions = self.coalesce(actions, 0)?;
        resolve_branches(&mut actions)?;
        resolve_blocks(&mut actions)?;

        let mut w = ActionWriter::new();
        write_sequence(&actions, &mut w)?;
        tracing::debug!(
            target: "avm1::asm",
            actions = actions.len(),
            bytes = w.len(),
            "assembled"
        );
        Ok(w.into_vec())
    }

    /// Merge runs of two or more single pushes into push lists
    fn coalesce(&self, actions: Vec<Action>, depth: usize) -> AssembleResult<Vec<Action>> {
        let mut out = Vec::with_capacity(actions.len());
        let mut run = Vec::new();

        for mut action in actions {
            if let Action::Push(value) = action {
                run.push(value);
                continue;
            }
            flush_run(&mut run, &mut out);

            if let Some(body) = action.function_body_mut() {
                if depth + 1 > self.config.max_depth {
                    return Err(AssembleError::TooDeep {
                        max_depth: self.config.max_depth,
                    });
                }
                *body = self.coalesce(std::mem::take(body), depth + 1)?;
            }
            out.push(action);
        }
        flush_run(&mut run, &mut out);
        Ok(out)
    }
}

fn flush_run(run: &mut Vec<PushValue>, out: &mut Vec<Action>) {
    match run.len() {
        0 => {}
        1 => out.extend(run.drain(..).map(Action::Push)),
        _ => out.push(Action::PushList(std::mem::take(run))),
    }
}

/// Byte position of every action; pushes in a run share the run's position
fn positions(actions: &[Action]) -> Vec<usize> {
    let mut starts = vec![0; actions.len()];
    let mut pos = 0;
    for record in records(actions) {
        starts[record.range.clone()].fill(pos);
        pos += record.bytes;
    }
    starts
}

/// Set every labeled branch's offset from its label's position
fn resolve_branches(actions: &mut [Action]) -> AssembleResult<()> {
    for action in actions.iter_mut() {
        if let Some(body) = action.function_body_mut() {
            resolve_branches(body)?;
        }
    }

    let starts = positions(actions);
    let mut labels: FxHashMap<LabelId, usize> = FxHashMap::default();
    for (i, action) in actions.iter().enumerate() {
        if let Some(label) = action.as_label() {
            if labels.insert(label, starts[i]).is_some() {
                return Err(AssembleError::DuplicateLabel(label));
            }
        }
    }

    for (i, action) in actions.iter_mut().enumerate() {
        let Some(branch) = action.branch_mut() else {
            continue;
        };
        let Some(label) = branch.label() else {
            continue;
        };
        let target = *labels.get(&label).ok_or(AssembleError::MissingLabel(label))?;
        let offset = target as i64 - (starts[i] + BRANCH_SIZE) as i64;
        let offset = i16::try_from(offset)
            .map_err(|_| AssembleError::BranchOutOfRange { label, offset })?;
        branch.set_offset(offset);
    }
    Ok(())
}

/// Stage of an open exception block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TryStage {
    Try,
    Catch,
    Finally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    With,
    Wait,
    Try(TryStage),
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            Self::With => "With",
            Self::Wait => "WaitForFrame",
            Self::Try(_) => "Try",
        }
    }
}

/// Block opened but not yet closed
#[derive(Debug)]
struct OpenBlock {
    index: usize,
    kind: BlockKind,
    /// Byte position where the current span starts
    start: usize,
    /// Counted records before the span
    start_count: usize,
}

fn u16_size(field: &'static str, value: usize) -> AssembleResult<u16> {
    u16::try_from(value).map_err(|_| EncodeError::u16_overflow(field, value).into())
}

/// Write the current span of a try block into its size field
fn close_try_span(action: &mut Action, stage: TryStage, size: usize) -> AssembleResult<()> {
    let Action::Try(block) = action else {
        return Ok(());
    };
    match stage {
        TryStage::Try => {
            block.try_size = u16_size("try size", size)?;
            block.catch_size = 0;
            block.finally_size = 0;
        }
        TryStage::Catch => {
            block.catch_size = u16_size("catch size", size)?;
            block.finally_size = 0;
        }
        TryStage::Finally => block.finally_size = u16_size("finally size", size)?,
    }
    Ok(())
}

/// Fill in block length fields from the end markers
fn resolve_blocks(actions: &mut [Action]) -> AssembleResult<()> {
    for action in actions.iter_mut() {
        if let Some(body) = action.function_body_mut() {
            resolve_blocks(body)?;
        }
    }

    let all: Vec<Record> = records(actions).collect();
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut pos = 0;
    let mut count = 0;

    for record in all {
        let index = record.range.start;
        let kind = match &actions[index] {
            Action::With { .. } => Some(BlockKind::With),
            Action::WaitForFrame { .. } | Action::WaitForFrame2 { .. } => Some(BlockKind::Wait),
            Action::Try(_) => Some(BlockKind::Try(TryStage::Try)),
            _ => None,
        };
        let marker = match &actions[index] {
            Action::Marker(marker) => Some(*marker),
            _ => None,
        };

        pos += record.bytes;
        count += usize::from(record.counted);

        if let Some(kind) = kind {
            open.push(OpenBlock {
                index,
                kind,
                start: pos,
                start_count: count,
            });
            continue;
        }
        let Some(marker) = marker else {
            continue;
        };
        if let Marker::Label(_) = marker {
            continue;
        }

        let Some(top) = open.last_mut() else {
            return Err(AssembleError::unmatched(marker, None, index));
        };
        let size = pos - top.start;
        match (marker, top.kind) {
            (Marker::EndWith, BlockKind::With) => {
                actions[top.index] = Action::With {
                    size: u16_size("with size", size)?,
                };
                open.pop();
            }
            (Marker::EndWait, BlockKind::Wait) => {
                let skipped = count - top.start_count;
                let skip = u8::try_from(skipped)
                    .map_err(|_| EncodeError::u8_overflow("skip count", skipped))?;
                match &mut actions[top.index] {
                    Action::WaitForFrame { skip_count, .. } | Action::WaitForFrame2 { skip_count } => {
                        *skip_count = skip;
                    }
                    _ => {}
                }
                open.pop();
            }
            (Marker::Catch, BlockKind::Try(TryStage::Try)) => {
                close_try_span(&mut actions[top.index], TryStage::Try, size)?;
                top.kind = BlockKind::Try(TryStage::Catch);
                top.start = pos;
            }
            (Marker::Finally, BlockKind::Try(stage @ (TryStage::Try | TryStage::Catch))) => {
                close_try_span(&mut actions[top.index], stage, size)?;
                top.kind = BlockKind::Try(TryStage::Finally);
                top.start = pos;
            }
            (Marker::EndTry, BlockKind::Try(stage)) => {
                close_try_span(&mut actions[top.index], stage, size)?;
                open.pop();
            }
            (marker, kind) => {
                return Err(AssembleError::unmatched(marker, Some(kind.name()), index));
            }
        }
    }

    match open.last() {
        Some(block) => Err(AssembleError::missing_end(block.kind.name(), block.index)),
        None => Ok(()),
    }
}
