//! Branch restructuring: turning a conditional hammock into `head`/`branch`/
//! `tail` region hierarchy (spec §4.10).

use rustc_hash::FxHashSet;
use smallvec::smallvec;

use crate::block::RegionKind;
use crate::config::RestructureConfig;
use crate::dominance::{self, imm_doms};
use crate::edits::{insert_block_and_control_blocks, insert_block_between, join_tails_and_exits, new_plain_join};
use crate::error::{Error, Result};
use crate::graph::Scfg;
use crate::name::{Kind, Name};
use crate::queries::{find_exiting_and_exits, find_headers_and_entries};
use crate::region::extract_region;

/// Restructures every hammock at this single level of `scfg` (spec §4.10,
/// steps 1-6), one at a time until none remain. Does not recurse into
/// subregions; see [`restructure_branches_recursive`].
pub fn restructure_branches(scfg: &mut Scfg, config: &RestructureConfig) -> Result<()> {
    while let Some((begin, end)) = find_first_hammock(scfg)? {
        if config.log_block_names {
            log::debug!("restructuring hammock {begin} .. {end}");
        } else {
            log::debug!("restructuring a hammock");
        }
        restructure_one_branch(scfg, begin, end)?;
    }
    Ok(())
}

/// As [`restructure_branches`], but recurses into every subregion
/// afterwards (spec §4.12).
pub fn restructure_branches_recursive(scfg: &mut Scfg, config: &RestructureConfig) -> Result<()> {
    restructure_branches(scfg, config)?;
    for region in scfg.iter_subregions_mut() {
        restructure_branches_recursive(&mut region.subregion, config)?;
        // A hammock nested inside this subregion may have just replaced the
        // subregion's own header or exiting block with a freshly extracted
        // region (spec §4.11 step 6); keep the owning RegionBlock in sync.
        region.header = region.subregion.region.header;
        region.exiting = region.subregion.region.exiting;
    }
    Ok(())
}

/// Finds the first (by `begin`'s [`Name`] order) hammock: `begin` with ≥ 2
/// jump targets, `end = postimmdom(begin)`, `immdom(end) = begin` (spec
/// §4.10 step 1). Enumerated over the single-level (concealed) view: every
/// nested region already lives in its own [`Scfg`], so a `Block::Region`
/// here is just another node with its own jump targets.
fn find_first_hammock(scfg: &Scfg) -> Result<Option<(Name, Name)>> {
    if scfg.len() < 2 {
        return Ok(None);
    }
    let doms = dominance::doms(scfg)?;
    let post_doms = dominance::post_doms(scfg)?;
    let idom = imm_doms(&doms);
    let ipdom = imm_doms(&post_doms);

    for begin in scfg.sorted_names() {
        let Some(block) = scfg.get(&begin) else {
            continue;
        };
        if block.jump_targets().len() < 2 {
            continue;
        }
        let Some(&end) = ipdom.get(&begin) else {
            continue;
        };
        if idom.get(&end) == Some(&begin) {
            return Ok(Some((begin, end)));
        }
    }
    Ok(None)
}

fn restructure_one_branch(scfg: &mut Scfg, begin: Name, end: Name) -> Result<()> {
    let doms = dominance::doms(scfg)?;
    let head_region_blocks = linear_walk_to(scfg, begin)?;

    let targets = scfg
        .get(&begin)
        .map(|b| b.jump_targets().to_vec())
        .ok_or_else(|| Error::unreachable(format!("begin block {begin} vanished")))?;

    // Per target: a placeholder (`None`) if another target can already
    // reach it (it isn't a distinct hammock sub-branch), otherwise the set
    // of blocks dominated by that target but not by `end`.
    //
    // The spec's §4.10 step 3 writes the body set as `{k : begin∈doms[k] ∧
    // end∉doms[k]}`, which — read literally — does not depend on which
    // target is being considered and so cannot produce a "list indexed
    // parallel to jump_targets" with a distinct body per branch. This
    // doms-filters from each specific target `t` instead, which does
    // produce the required parallel structure; see `DESIGN.md`.
    let mut branch_regions: Vec<Option<Vec<Name>>> = Vec::with_capacity(targets.len());
    for (i, &t) in targets.iter().enumerate() {
        let reachable_from_sibling = targets
            .iter()
            .enumerate()
            .any(|(j, &other)| j != i && other != t && scfg.is_reachable_dfs(other, t));
        if reachable_from_sibling {
            branch_regions.push(None);
            continue;
        }
        let mut body: Vec<Name> = doms
            .iter()
            .filter(|(_, set)| set.contains(&t) && !set.contains(&end))
            .map(|(&k, _)| k)
            .collect();
        body.sort();
        branch_regions.push(Some(body));
    }

    let excluded_base: FxHashSet<Name> = {
        let mut excluded = head_region_blocks.iter().copied().collect::<FxHashSet<Name>>();
        for body in branch_regions.iter().flatten() {
            excluded.extend(body.iter().copied());
        }
        excluded
    };
    let tail_region_blocks_initial: Vec<Name> = scfg
        .sorted_names()
        .into_iter()
        .filter(|n| !excluded_base.contains(n))
        .collect();

    // Unify the tail's own header(s) first (spec §4.10 step 4), so the
    // placeholder fills below (step 5) have a single settled tail head to
    // target instead of whichever raw block happened to sit in that slot.
    let (tail_headers, tail_entries) = find_headers_and_entries(scfg, &tail_region_blocks_initial)?;
    let mut tail_head = if tail_headers.len() > 1 {
        let solo_tail_head = scfg.new_block_name(Kind::SynthHead);
        insert_block_and_control_blocks(scfg, solo_tail_head, &tail_entries, &tail_headers)?;
        solo_tail_head
    } else {
        *tail_headers
            .first()
            .ok_or_else(|| Error::invariant("branch region has no tail header"))?
    };

    // Placeholder slots: redirect `begin -> t` through a fresh
    // SyntheticFill wired straight to the tail head (spec §4.10 step 5).
    for (i, region) in branch_regions.iter().enumerate() {
        if region.is_some() {
            continue;
        }
        let t = targets[i];
        let fill_name = scfg.new_block_name(Kind::SynthFill);
        let fill_block = new_plain_join(fill_name, smallvec![tail_head])?;
        insert_block_between(scfg, fill_block, &[begin], &[t])?;
    }

    for body in branch_regions.iter_mut().flatten() {
        let (exiting_of_branch, _) = find_exiting_and_exits(scfg, body);
        let (solo_tail, _solo_exit) = join_tails_and_exits(scfg, &exiting_of_branch, &[tail_head])?;
        if !body.contains(&solo_tail) {
            body.push(solo_tail);
        }
    }

    // Recompute the tail region by elimination now that every synthetic
    // block above has been inserted (spec §4.10 step 6's "recompute
    // regions"), so fills and any multiplexer scaffolding fall into
    // `tail_region_blocks` automatically instead of needing ad-hoc pushes.
    // A fill is itself a fresh external entry, so this can reopen the
    // single-header question settled above; if it does, unify again.
    let mut excluded: FxHashSet<Name> = head_region_blocks.iter().copied().collect();
    for body in branch_regions.iter().flatten() {
        excluded.extend(body.iter().copied());
    }
    let mut tail_region_blocks: Vec<Name> = scfg
        .sorted_names()
        .into_iter()
        .filter(|n| !excluded.contains(n))
        .collect();
    let (final_headers, final_entries) = find_headers_and_entries(scfg, &tail_region_blocks)?;
    if final_headers.len() > 1 {
        let unified_tail_head = scfg.new_block_name(Kind::SynthHead);
        insert_block_and_control_blocks(scfg, unified_tail_head, &final_entries, &final_headers)?;
        tail_region_blocks.push(unified_tail_head);
        tail_head = unified_tail_head;
    }

    // Extract branch-region bodies first, so `begin`'s edges into them are
    // rewritten by region extraction's entry-fixup before the head region
    // (which still contains `begin`) is itself extracted.
    let parent = scfg.region.self_name;
    for body in branch_regions.into_iter().flatten() {
        if body.is_empty() {
            continue;
        }
        extract_region(scfg, &body, RegionKind::Branch, parent)?;
    }

    extract_region(scfg, &tail_region_blocks, RegionKind::Tail, parent)?;
    let head = extract_region(scfg, &head_region_blocks, RegionKind::Head, parent)?;
    log::debug!("hammock restructured, head region {head}");

    Ok(())
}

/// Walks single-successor blocks from `find_head()` up to and including
/// `begin`. Every intermediate block must have exactly one jump target
/// (spec §4.10 step 3).
fn linear_walk_to(scfg: &Scfg, begin: Name) -> Result<Vec<Name>> {
    let mut walk = Vec::new();
    let mut current = scfg.find_head()?;
    loop {
        walk.push(current);
        if current == begin {
            return Ok(walk);
        }
        let block = scfg
            .get(&current)
            .ok_or_else(|| Error::unreachable(format!("{current} vanished mid-walk")))?;
        if block.jump_targets().len() != 1 {
            return Err(Error::invariant(format!(
                "head-region walk encountered {current} with {} successors, expected 1",
                block.jump_targets().len()
            )));
        }
        current = block.jump_targets()[0];
    }
}
