//! A minimal reference simulator for (restructured or unstructured) SCFGs,
//! used only to test the semantic-equivalence property (spec §8). It
//! interprets `SyntheticAssignment`/`SyntheticBranch`-family blocks
//! directly and treats `Basic` blocks as opaque no-ops that record their
//! name in the trace.
//!
//! A `Basic` block with more than one jump target models an opaque
//! frontend-level branch (e.g. an `if` inside a loop body); which way it
//! goes is supplied externally via `choices`, consumed in visitation
//! order. Restructuring never changes how many independent choices a
//! `Basic` block's own branch requires — it only reroutes individual
//! edges through synthetic scaffolding whose own decisions are fully
//! determined by prior variable assignments — so running the same
//! `choices` against a graph before and after `restructure()` produces
//! the same `choices` consumption and the same `Basic`-block trace.

use std::collections::HashMap;

use scfg_restructure::{Block, Name, Scfg, VarName};

/// Runs `scfg` from its head to the first true dead end (a block with no
/// jump targets, or a `SyntheticReturn`), returning the trace of `Basic`
/// block names visited, in order.
pub fn run(scfg: &Scfg, choices: &[usize]) -> Vec<Name> {
    let mut trace = Vec::new();
    let mut vars: HashMap<VarName, i64> = HashMap::new();
    let mut cursor = 0usize;
    let mut stack: Vec<&Scfg> = vec![scfg];
    let mut current = scfg.find_head().expect("simulated graphs have a unique head");

    loop {
        let level = *stack.last().expect("stack is never emptied below the root");
        let Some(block) = level.get(&current) else {
            // `current` belongs to an ancestor level: we've left every
            // region between here and there.
            if stack.pop().is_none() {
                return trace;
            }
            continue;
        };

        match block {
            Block::Basic(_) => {
                trace.push(current);
                match next_target(block.jump_targets(), choices, &mut cursor) {
                    Some(t) => current = t,
                    None => return trace,
                }
            }
            Block::SyntheticAssignment(b) => {
                for (k, v) in &b.variable_assignment {
                    vars.insert(k.clone(), *v);
                }
                match block.jump_targets().first() {
                    Some(&t) => current = t,
                    None => return trace,
                }
            }
            Block::SyntheticBranch(b) => {
                let value = *vars.get(&b.variable).unwrap_or(&0);
                current = b
                    .branch_value_table
                    .get(&value)
                    .copied()
                    .unwrap_or(block.jump_targets()[0]);
            }
            Block::SyntheticTail(_) | Block::SyntheticExit(_) | Block::SyntheticFill(_) => {
                match block.jump_targets().first() {
                    Some(&t) => current = t,
                    None => return trace,
                }
            }
            Block::SyntheticReturn(_) => return trace,
            Block::Region(r) => {
                let header = r.header.expect("non-meta regions have a header");
                stack.push(&r.subregion);
                current = header;
            }
        }
    }
}

fn next_target(targets: &[Name], choices: &[usize], cursor: &mut usize) -> Option<Name> {
    match targets.len() {
        0 => None,
        1 => Some(targets[0]),
        n => {
            let choice = choices.get(*cursor).copied().unwrap_or(0);
            *cursor += 1;
            Some(targets[choice % n])
        }
    }
}
