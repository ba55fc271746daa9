//! Loop restructuring: turning a strongly connected component into a
//! single-header, single-backedge, single-exit `loop` region (spec §4.9).

use smallvec::smallvec;

use crate::block::{Block, BlockBase, RegionKind, SyntheticAssignmentBlock, SyntheticBranchBlock};
use crate::config::RestructureConfig;
use crate::dominance::{self, DomSets};
use crate::edits::{insert_block_and_control_blocks, redirect_single_target};
use crate::error::{Error, Result};
use crate::graph::Scfg;
use crate::name::{Kind, Name, VarName};
use crate::ordered_map::OrderedMap;
use crate::queries::{find_exiting_and_exits, find_headers_and_entries};
use crate::region::extract_region;
use crate::scc::strongly_connected_components;

/// Repeatedly restructures every non-trivial loop at this single level of
/// `scfg`, until no strongly connected component remains (spec §4.9,
/// §4.12). Does not recurse into subregions; see
/// [`restructure_loops_recursive`].
pub fn restructure_loops(scfg: &mut Scfg, config: &RestructureConfig) -> Result<()> {
    loop {
        let sccs = strongly_connected_components(scfg);
        let mut loops: Vec<Vec<Name>> = sccs
            .iter()
            .filter(|scc| scc.has_cycle(scfg))
            .map(|scc| {
                let mut nodes: Vec<Name> = scc.iter().collect();
                nodes.sort();
                nodes
            })
            .collect();
        if loops.is_empty() {
            return Ok(());
        }
        loops.sort_by(|a, b| a[0].cmp(&b[0]));
        restructure_one_loop(scfg, &loops[0], config)?;
    }
}

/// As [`restructure_loops`], but recurses into every subregion afterwards
/// (spec §4.12).
pub fn restructure_loops_recursive(scfg: &mut Scfg, config: &RestructureConfig) -> Result<()> {
    restructure_loops(scfg, config)?;
    for region in scfg.iter_subregions_mut() {
        restructure_loops_recursive(&mut region.subregion, config)?;
        // A loop nested inside this subregion may have just replaced the
        // subregion's own header or exiting block with a freshly extracted
        // region (spec §4.11 step 6); keep the owning RegionBlock in sync.
        region.header = region.subregion.region.header;
        region.exiting = region.subregion.region.exiting;
    }
    Ok(())
}

/// Restructures a single strongly connected component `members` in `scfg`
/// into one `loop`-kind region (spec §4.9, steps 1-10). Returns the new
/// region's name.
fn restructure_one_loop(
    scfg: &mut Scfg,
    members: &[Name],
    config: &RestructureConfig,
) -> Result<Name> {
    if config.log_block_names {
        log::debug!("restructuring loop over members {members:?}");
    } else {
        log::debug!("restructuring loop with {} members", members.len());
    }
    let (headers, entries) = find_headers_and_entries(scfg, members)?;
    let (exiting_blocks, exit_blocks) = find_exiting_and_exits(scfg, members);
    if exit_blocks.is_empty() {
        return Err(Error::invariant(
            "loop has no exit: every exiting block's successors are inside the loop",
        ));
    }

    let mut enclosed: Vec<Name> = members.to_vec();

    let mut header_value_table: Option<OrderedMap<i64, Name>> = None;
    let mut unified_control_var: Option<VarName> = None;
    let loop_head = if headers.len() > 1 {
        let solo_head = scfg.new_block_name(Kind::SynthHead);
        let control_var = insert_block_and_control_blocks(scfg, solo_head, &entries, &headers)?;
        enclosed.push(solo_head);
        if let Some(table) = scfg
            .get(&solo_head)
            .and_then(Block::as_synthetic_branch)
            .map(|b| b.branch_value_table.clone())
        {
            header_value_table = Some(table);
        }
        unified_control_var = Some(control_var);
        solo_head
    } else {
        headers[0]
    };
    let headers_were_unified = headers.len() > 1;

    let backedge_blocks: Vec<Name> = members
        .iter()
        .copied()
        .filter(|&b| {
            scfg.get(&b)
                .map(|block| headers.iter().any(|h| block.jump_targets().contains(h)))
                .unwrap_or(false)
        })
        .collect();

    // Fast path: a natural loop whose single backedge block is also its
    // single exiting block. Only applies when headers didn't need
    // unifying — otherwise the loop-internal edge still targets the
    // original header, not `loop_head`, and the redirect machinery below
    // is needed instead.
    if !headers_were_unified
        && backedge_blocks.len() == 1
        && exiting_blocks.len() == 1
        && backedge_blocks[0] == exiting_blocks[0]
    {
        let b = backedge_blocks[0];
        let block = scfg
            .get(&b)
            .ok_or_else(|| Error::unreachable(format!("backedge block {b} vanished")))?;
        let updated = block.declare_backedge(loop_head)?;
        scfg.set_block(updated);
        let region = extract_region(scfg, &enclosed, RegionKind::Loop, scfg_parent(scfg))?;
        log::debug!("loop restructured via fast path into {region}");
        return Ok(region);
    }

    let needs_synth_exit = exit_blocks.len() > 1;
    let synth_exiting_latch = scfg.new_block_name(Kind::SynthExitLatch);
    let synth_exit = if needs_synth_exit {
        Some(scfg.new_block_name(Kind::SynthExitBranch))
    } else {
        None
    };

    let exit_variable: VarName =
        unified_control_var.unwrap_or_else(|| scfg.new_var_name(Kind::SynthExitBranch));
    let backedge_variable = scfg.new_var_name(Kind::SynthExitLatch);

    let mut exit_value_table: OrderedMap<i64, Name> = OrderedMap::new();
    for (idx, &exit) in exit_blocks.iter().enumerate() {
        exit_value_table.insert(idx as i64, exit);
    }
    let solo_exit_target = synth_exit.unwrap_or_else(|| exit_blocks[0]);
    let mut backedge_value_table: OrderedMap<i64, Name> = OrderedMap::new();
    backedge_value_table.insert(0, loop_head);
    backedge_value_table.insert(1, solo_exit_target);

    let doms: DomSets = dominance::doms(scfg)?;
    enclosed.push(synth_exiting_latch);
    if let Some(se) = synth_exit {
        enclosed.push(se);
    }

    let mut members_sorted = members.to_vec();
    members_sorted.sort();
    for b in members_sorted {
        let qualifies = exiting_blocks.contains(&b)
            || scfg
                .get(&b)
                .map(|block| headers.iter().any(|h| block.jump_targets().contains(h)))
                .unwrap_or(false);
        if !qualifies {
            continue;
        }

        let targets: Vec<Name> = scfg
            .get(&b)
            .map(|block| block.jump_targets().to_vec())
            .unwrap_or_default();

        for t in targets {
            if exit_blocks.contains(&t) {
                let assign_name = scfg.new_block_name(Kind::SynthAssign);
                let mut assignment = OrderedMap::new();
                let exit_idx = exit_value_table.reverse_lookup(&t).copied().unwrap_or(-1);
                assignment.insert(exit_variable.clone(), exit_idx);
                assignment.insert(backedge_variable.clone(), 1);
                let assign_block = Block::SyntheticAssignment(SyntheticAssignmentBlock {
                    base: BlockBase::new(assign_name, smallvec![synth_exiting_latch]),
                    variable_assignment: assignment,
                });
                scfg.add_block(assign_block)?;
                enclosed.push(assign_name);
                redirect_single_target(scfg, b, t, assign_name)?;
            } else if headers.contains(&t) {
                let b_doms = doms.get(&t);
                let dominates = b_doms.map(|s| s.contains(&b)).unwrap_or(false);
                if dominates && b != t {
                    continue;
                }
                let assign_name = scfg.new_block_name(Kind::SynthAssign);
                let mut assignment = OrderedMap::new();
                assignment.insert(backedge_variable.clone(), 0);
                if let Some(table) = &header_value_table {
                    if let Some(idx) = table.reverse_lookup(&t) {
                        assignment.insert(exit_variable.clone(), *idx);
                    }
                }
                let assign_block = Block::SyntheticAssignment(SyntheticAssignmentBlock {
                    base: BlockBase::new(assign_name, smallvec![synth_exiting_latch]),
                    variable_assignment: assignment,
                });
                scfg.add_block(assign_block)?;
                enclosed.push(assign_name);
                redirect_single_target(scfg, b, t, assign_name)?;
            }
        }
    }

    let latch_block = Block::SyntheticBranch(SyntheticBranchBlock {
        base: {
            let mut base = BlockBase::new(synth_exiting_latch, smallvec![solo_exit_target, loop_head]);
            base.backedges = smallvec![loop_head];
            base
        },
        variable: backedge_variable,
        branch_value_table: backedge_value_table,
    });
    scfg.add_block(latch_block)?;

    if let Some(se) = synth_exit {
        let exit_branch_block = Block::SyntheticBranch(SyntheticBranchBlock {
            base: BlockBase::new(se, exit_blocks.iter().copied().collect()),
            variable: exit_variable,
            branch_value_table: exit_value_table,
        });
        scfg.add_block(exit_branch_block)?;
    }

    let parent = scfg_parent(scfg);
    let region = extract_region(scfg, &enclosed, RegionKind::Loop, parent)?;
    log::debug!("loop restructured via general case into {region}");
    Ok(region)
}

fn scfg_parent(scfg: &Scfg) -> Option<Name> {
    scfg.region.self_name
}
