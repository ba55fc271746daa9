//! Structural edits: the building blocks both restructuring passes use to
//! reshape a graph in place (spec §4.8).

use smallvec::{smallvec, SmallVec};

use crate::block::{Block, BlockBase, SyntheticAssignmentBlock};
use crate::error::{Error, Result};
use crate::graph::Scfg;
use crate::name::{Kind, Name, VarName};
use crate::ordered_map::OrderedMap;

/// Inserts `new_block` (already fully built, with `jump_targets =
/// successors`) into `scfg`, redirecting each predecessor's edges into
/// `successors` to instead target `new_block`'s name (spec §4.8).
///
/// For every predecessor `p`, every edge `p -> s` with `s` in `successors`
/// is redirected to `p -> new_block`; if this collapses more than one edge
/// out of `p`, the duplicates are removed (a single edge `p -> new_block`
/// remains). If `successors` is empty, `new_block`'s name is instead
/// appended to every predecessor's target list (used to build synthetic
/// return joins, spec §4.8).
pub fn insert_block_between(
    scfg: &mut Scfg,
    new_block: Block,
    predecessors: &[Name],
    successors: &[Name],
) -> Result<()> {
    let new_name = new_block.name();
    for &pred in predecessors {
        let Some(block) = scfg.get(&pred) else {
            continue;
        };
        let old_targets: Vec<Name> = block.jump_targets().to_vec();
        let new_targets: SmallVec<[Name; 2]> = if successors.is_empty() {
            let mut t = old_targets.clone();
            t.push(new_name);
            t.into()
        } else {
            let mut t: SmallVec<[Name; 2]> = SmallVec::new();
            let mut inserted = false;
            for target in old_targets {
                if successors.contains(&target) || target == new_name {
                    if !inserted {
                        t.push(new_name);
                        inserted = true;
                    }
                } else {
                    t.push(target);
                }
            }
            t
        };
        let updated = block.replace_jump_targets(new_targets)?;
        scfg.set_block(updated);
    }
    scfg.add_block(new_block)?;
    Ok(())
}

/// Convenience constructor for the plain structural-join variants
/// (`SyntheticTail`/`SyntheticExit`/`SyntheticReturn`/`SyntheticFill`),
/// dispatched by `name`'s [`Kind`].
pub fn new_plain_join(name: Name, jump_targets: SmallVec<[Name; 2]>) -> Result<Block> {
    let base = BlockBase::new(name, jump_targets);
    match name.kind() {
        Kind::SynthTail => Ok(Block::SyntheticTail(base)),
        Kind::SynthExit => Ok(Block::SyntheticExit(base)),
        Kind::SynthReturn => Ok(Block::SyntheticReturn(base)),
        Kind::SynthFill => Ok(Block::SyntheticFill(base)),
        other => Err(Error::unreachable(format!(
            "{other:?} is not a plain structural join kind"
        ))),
    }
}

/// Inserts a `SyntheticHead`-kind multiplexer at `new_name`, branching on a
/// fresh control variable to dispatch between `successors` (spec §4.8).
///
/// For every existing predecessor-successor edge, a fresh
/// `SyntheticAssignment` block is inserted on that edge, setting the
/// control variable to the successor's index in `successors`; the
/// multiplexer's `branch_value_table` maps that index back to the
/// successor. Returns the fresh control variable.
///
/// Predecessor edges are substituted one at a time (rather than building
/// one fully-replaced target list), so that a predecessor which is itself
/// a `SyntheticBranch`-family block — and so can only have one target
/// replaced per call (spec §4.2) — is still handled correctly even when
/// more than one of its targets lands in `successors`.
pub fn insert_block_and_control_blocks(
    scfg: &mut Scfg,
    new_name: Name,
    predecessors: &[Name],
    successors: &[Name],
) -> Result<VarName> {
    let control_var = scfg.new_var_name(Kind::SynthHead);

    for &pred in predecessors {
        let Some(mut block) = scfg.get(&pred).cloned() else {
            continue;
        };
        let original_targets: Vec<Name> = block.jump_targets().to_vec();
        for target in original_targets {
            let Some(idx) = successors.iter().position(|s| *s == target) else {
                continue;
            };
            let assign_name = scfg.new_block_name(Kind::SynthAssign);
            let mut assignment = OrderedMap::new();
            assignment.insert(control_var.clone(), idx as i64);
            let assign_block = Block::SyntheticAssignment(SyntheticAssignmentBlock {
                base: BlockBase::new(assign_name, smallvec![new_name]),
                variable_assignment: assignment,
            });
            scfg.add_block(assign_block)?;

            // Substitute exactly one remaining occurrence of `target` with
            // the fresh assignment block's name.
            let mut current_targets = block.jump_targets().to_vec();
            let pos = current_targets
                .iter()
                .position(|t| *t == target)
                .ok_or_else(|| {
                    Error::unreachable(format!(
                        "predecessor {pred} lost its edge to {target} mid-substitution"
                    ))
                })?;
            current_targets[pos] = assign_name;
            block = block.replace_jump_targets(current_targets.into())?;
        }
        scfg.set_block(block);
    }

    let mut value_table = OrderedMap::new();
    for (idx, &succ) in successors.iter().enumerate() {
        value_table.insert(idx as i64, succ);
    }
    let head_block = Block::SyntheticBranch(crate::block::SyntheticBranchBlock {
        base: BlockBase::new(new_name, successors.iter().copied().collect()),
        variable: control_var.clone(),
        branch_value_table: value_table,
    });
    scfg.add_block(head_block)?;

    Ok(control_var)
}

/// Redirects the single edge `from -> old` to `from -> new`, tolerating
/// `from` being a [`Block::SyntheticBranch`] (at most one target may change
/// per call, spec §4.2). Used wherever a restructuring pass needs to swap
/// out exactly one outgoing edge of a block that might be a value-table
/// dispatcher.
pub fn redirect_single_target(scfg: &mut Scfg, from: Name, old: Name, new: Name) -> Result<()> {
    let Some(block) = scfg.get(&from) else {
        return Ok(());
    };
    let mut targets = block.jump_targets().to_vec();
    let pos = targets
        .iter()
        .position(|t| *t == old)
        .ok_or_else(|| Error::unreachable(format!("{from} lost its edge to {old}")))?;
    targets[pos] = new;
    let updated = block.replace_jump_targets(targets.into())?;
    scfg.set_block(updated);
    Ok(())
}

/// If more than one exiting block exists in `scfg`, inserts a single
/// `SyntheticReturn` successor to all of them. Leaves single-return graphs
/// untouched (spec §4.8).
pub fn join_returns(scfg: &mut Scfg) -> Result<()> {
    let mut exiting: Vec<Name> = scfg
        .sorted_names()
        .into_iter()
        .filter(|n| scfg.get(n).map(|b| b.is_exiting()).unwrap_or(false))
        .collect();
    exiting.sort();
    if exiting.len() <= 1 {
        return Ok(());
    }
    let new_name = scfg.new_block_name(Kind::SynthReturn);
    let new_block = new_plain_join(new_name, SmallVec::new())?;
    insert_block_between(scfg, new_block, &exiting, &[])
}

/// Closes a branch/loop region's multiple tails and/or multiple exits down
/// to a single `(solo_tail, solo_exit)` pair, inserting at most one
/// `SyntheticTail` and/or one `SyntheticExit`, chained `tail -> exit ->
/// exits` (spec §4.8).
pub fn join_tails_and_exits(scfg: &mut Scfg, tails: &[Name], exits: &[Name]) -> Result<(Name, Name)> {
    if tails.is_empty() || exits.is_empty() {
        return Err(Error::invariant(
            "join_tails_and_exits requires at least one tail and one exit",
        ));
    }

    match (tails.len() >= 2, exits.len() >= 2) {
        (false, false) => Ok((tails[0], exits[0])),
        (true, false) => {
            let tail_name = scfg.new_block_name(Kind::SynthTail);
            let tail_block = new_plain_join(tail_name, smallvec![exits[0]])?;
            insert_block_between(scfg, tail_block, tails, &[exits[0]])?;
            Ok((tail_name, exits[0]))
        }
        (false, true) => {
            let exit_name = scfg.new_block_name(Kind::SynthExit);
            let exit_block = new_plain_join(exit_name, exits.iter().copied().collect())?;
            insert_block_between(scfg, exit_block, &[tails[0]], exits)?;
            Ok((tails[0], exit_name))
        }
        (true, true) => {
            let tail_name = scfg.new_block_name(Kind::SynthTail);
            let tail_block = new_plain_join(tail_name, exits.iter().copied().collect())?;
            insert_block_between(scfg, tail_block, tails, exits)?;

            let exit_name = scfg.new_block_name(Kind::SynthExit);
            let exit_block = new_plain_join(exit_name, exits.iter().copied().collect())?;
            insert_block_between(scfg, exit_block, &[tail_name], exits)?;

            Ok((tail_name, exit_name))
        }
    }
}
