//! Region extraction: replacing a set of blocks with a single
//! [`crate::block::RegionBlock`] owning them as a subregion (spec §4.11).

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::block::{Block, BlockBase, RegionBlock, RegionKind};
use crate::error::{Error, Result};
use crate::graph::{RegionMeta, Scfg};
use crate::name::Name;
use crate::queries::{find_exiting_and_exits, find_headers_and_entries};

/// Replaces `blocks_to_enclose` in `scfg` with a single [`Block::Region`] of
/// the given `kind`, moving the enclosed blocks into a fresh subregion
/// (spec §4.11).
///
/// Asserts `blocks_to_enclose` has a single header and a single exiting
/// block (any other shape is an [`Error::InvariantViolation`] — the callers
/// in `restructure::loop_` and `restructure::branch` are responsible for
/// having already closed the set down to single entry/exit via
/// [`crate::edits::join_tails_and_exits`] / multiplexing before calling
/// this).
///
/// Returns the name of the newly created region block.
pub fn extract_region(
    scfg: &mut Scfg,
    blocks_to_enclose: &[Name],
    kind: RegionKind,
    parent_region: Option<Name>,
) -> Result<Name> {
    let (headers, entries) = find_headers_and_entries(scfg, blocks_to_enclose)?;
    let (exiting, _exits) = find_exiting_and_exits(scfg, blocks_to_enclose);

    if headers.len() != 1 {
        return Err(Error::invariant(format!(
            "extract_region requires a single header, found {}: {headers:?}",
            headers.len()
        )));
    }
    if exiting.len() != 1 {
        return Err(Error::invariant(format!(
            "extract_region requires a single exiting block, found {}: {exiting:?}",
            exiting.len()
        )));
    }
    let header = headers[0];
    let exiting = exiting[0];

    let region_name = scfg.new_region_name();

    let mut sorted_enclosed = blocks_to_enclose.to_vec();
    sorted_enclosed.sort();
    let enclosed_set: FxHashSet<Name> = sorted_enclosed.iter().copied().collect();

    let mut subregion = Scfg::new_subregion(
        scfg.name_gen().clone(),
        RegionMeta {
            self_name: Some(region_name),
            kind,
            header: Some(header),
            exiting: Some(exiting),
            parent_region,
        },
    );
    for name in &sorted_enclosed {
        if let Some(block) = scfg.remove_block(name) {
            let block = if let Block::Region(mut r) = block {
                r.parent_region = Some(region_name);
                Block::Region(r)
            } else {
                block
            };
            subregion.set_block(block);
        }
    }

    // Redirect every entry's edge into `header` (and any declared backedge
    // to it) to point at `region_name` instead. If the entry is itself a
    // region, its *exiting* block's jump targets must be rewritten too —
    // they were pointing at `header` directly, a sibling region's interior,
    // which is no longer valid now that `header` is concealed inside
    // `region_name`'s subregion.
    for entry in entries {
        if enclosed_set.contains(&entry) {
            continue;
        }
        let Some(block) = scfg.get(&entry) else {
            continue;
        };
        let retargeted = retarget(block, header, region_name);
        scfg.set_block(retargeted);

        if let Some(entry_region) = scfg.get_mut(&entry).and_then(Block::as_region_mut) {
            if let Some(exiting_name) = entry_region.exiting {
                if let Some(exiting_block) = entry_region.subregion.get(&exiting_name) {
                    let retargeted = retarget(exiting_block, header, region_name);
                    entry_region.subregion.set_block(retargeted);
                }
            }
        }
    }

    // The region's own jump targets are the edges leaving it, i.e. the
    // exiting block's *effective* jump targets — its declared backedge (if
    // any, e.g. a loop's exiting latch looping back to its own header) is
    // purely internal to the subregion and must not surface here.
    let jump_targets: SmallVec<[Name; 2]> = subregion
        .get(&exiting)
        .map(|b| b.effective_jump_targets())
        .unwrap_or_default();

    let region_block = Block::Region(Box::new(RegionBlock {
        base: BlockBase::new(region_name, jump_targets),
        kind,
        header: Some(header),
        exiting: Some(exiting),
        subregion,
        parent_region,
    }));
    scfg.add_block(region_block)?;

    // If the enclosed set contained `scfg`'s own header or exiting block
    // (i.e. `scfg` is itself a subregion and one of those blocks just got
    // concealed inside the newly extracted region), the new region is what
    // the outside world now sees in its place (spec §4.11 step 6). The
    // caller is responsible for propagating this up to the RegionBlock that
    // owns `scfg`, since that lives one level further out than this
    // function can reach.
    if scfg.region.header == Some(header) {
        scfg.region.header = Some(region_name);
    }
    if scfg.region.exiting == Some(exiting) {
        scfg.region.exiting = Some(region_name);
    }

    log::debug!(
        "extracted {kind:?} region {region_name} enclosing {} block(s), header {header}, exiting {exiting}",
        sorted_enclosed.len()
    );

    Ok(region_name)
}

fn retarget(block: &Block, old: Name, new: Name) -> Block {
    let mut cloned = block.clone();
    match &mut cloned {
        Block::Basic(b) => retarget_base(&mut b.base, old, new),
        Block::SyntheticAssignment(b) => retarget_base(&mut b.base, old, new),
        Block::SyntheticBranch(b) => {
            for t in b.base.jump_targets.iter_mut() {
                if *t == old {
                    *t = new;
                }
            }
            for t in b.base.backedges.iter_mut() {
                if *t == old {
                    *t = new;
                }
            }
            b.branch_value_table.remap_value(&old, new);
        }
        Block::SyntheticTail(b)
        | Block::SyntheticExit(b)
        | Block::SyntheticReturn(b)
        | Block::SyntheticFill(b) => retarget_base(b, old, new),
        Block::Region(b) => retarget_base(&mut b.base, old, new),
    }
    cloned
}

fn retarget_base(base: &mut BlockBase, old: Name, new: Name) {
    for t in base.jump_targets.iter_mut() {
        if *t == old {
            *t = new;
        }
    }
    for t in base.backedges.iter_mut() {
        if *t == old {
            *t = new;
        }
    }
}
