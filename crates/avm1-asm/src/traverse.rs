//! Control-flow traversal
//!
//! Walks a labeled sequence along its control flow and hands each action to
//! an [`Examiner`] exactly once. State is cloned at every conditional branch
//! so the taken and fall-through paths evolve independently.

use avm1_bytecode::{Action, LabelId, Opcode};
use rustc_hash::FxHashMap;

/// Per-path analysis state driven by [`traverse`]
pub trait Examiner: Clone {
    /// Observe (and possibly annotate) the next action on the current path
    fn examine(&mut self, action: &mut Action);
}

/// Where control goes after an action
enum Flow {
    Next,
    Stop,
    Goto(usize),
    Fork(usize),
}

fn flow(action: &Action, labels: &FxHashMap<LabelId, usize>) -> Flow {
    if let Some(branch) = action.branch() {
        // unresolved or dangling targets end the taken edge
        let target = branch.label().and_then(|label| labels.get(&label).copied());
        return match (target, branch.is_conditional()) {
            (Some(target), true) => Flow::Fork(target),
            (Some(target), false) => Flow::Goto(target),
            (None, true) => Flow::Next,
            (None, false) => Flow::Stop,
        };
    }
    match action {
        Action::Basic(Opcode::Return | Opcode::Throw | Opcode::End) => Flow::Stop,
        _ => Flow::Next,
    }
}

/// Visit every action of `actions` once, following control flow from the
/// first action. Regions unreachable from the entry are visited afterwards,
/// each from a fresh copy of `initial`.
pub fn traverse<E: Examiner>(actions: &mut [Action], initial: E) {
    let labels: FxHashMap<LabelId, usize> = actions
        .iter()
        .enumerate()
        .filter_map(|(i, action)| action.as_label().map(|label| (label, i)))
        .collect();

    let mut visited = vec![false; actions.len()];
    let mut worklist = vec![(0, initial.clone())];
    let mut scan = 0;

    loop {
        while let Some((start, mut state)) = worklist.pop() {
            let mut pc = start;
            while pc < actions.len() && !visited[pc] {
                visited[pc] = true;
                state.examine(&mut actions[pc]);
                pc = match flow(&actions[pc], &labels) {
                    Flow::Next => pc + 1,
                    Flow::Stop => break,
                    Flow::Goto(target) => target,
                    Flow::Fork(target) => {
                        worklist.push((target, state.clone()));
                        pc + 1
                    }
                };
            }
        }

        while scan < visited.len() && visited[scan] {
            scan += 1;
        }
        if scan == visited.len() {
            break;
        }
        worklist.push((scan, initial.clone()));
    }
}
