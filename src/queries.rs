//! Subgraph queries: header/entry and exiting/exit partitioning (spec §4.7).

use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::graph::Scfg;
use crate::name::Name;

/// Partitions `set` into its headers (members with an incoming edge from
/// outside `set`) and entries (non-members with an edge into `set`).
///
/// If `set` has no external incoming edges — i.e. it is the entire
/// reachable graph at this level — `headers` is the single result of
/// [`Scfg::find_head`] and `entries` is empty.
///
/// The spec notes that, when operating inside a region whose *entire*
/// content is `set`, entries should instead be resolved by recursing into
/// the parent region's SCFG. This crate does not thread a parent handle
/// through nested [`Scfg`]s (see the back-pointer design note, spec §9),
/// so that case is treated the same as the true top-level case: `entries`
/// comes back empty. This only affects restructuring a subregion whose
/// entire content forms a single SCC with more than one header block, an
/// edge case documented in `DESIGN.md`.
///
/// Both returned lists are sorted by [`Name`] for reproducibility.
pub fn find_headers_and_entries(scfg: &Scfg, set: &[Name]) -> Result<(Vec<Name>, Vec<Name>)> {
    let members: FxHashSet<Name> = set.iter().copied().collect();

    let mut headers: Vec<Name> = Vec::new();
    let mut entries: FxHashSet<Name> = FxHashSet::default();

    for &member in set {
        let preds = scfg.predecessors(member);
        let mut has_external_pred = false;
        for pred in preds {
            if !members.contains(&pred) {
                has_external_pred = true;
                entries.insert(pred);
            }
        }
        if has_external_pred {
            headers.push(member);
        }
    }

    if headers.is_empty() {
        // `set` has no external incoming edges: either it is the whole
        // graph, or (the documented limitation above) it is the whole
        // content of a subregion.
        headers.push(scfg.find_head()?);
        entries.clear();
    }

    headers.sort();
    let mut entries: Vec<Name> = entries.into_iter().collect();
    entries.sort();
    Ok((headers, entries))
}

/// Partitions `set` into its exiting blocks (members with an edge — or no
/// edges at all — leaving `set`) and exits (non-members with an edge from
/// inside `set`).
///
/// Both returned lists are sorted by [`Name`] for reproducibility.
pub fn find_exiting_and_exits(scfg: &Scfg, set: &[Name]) -> (Vec<Name>, Vec<Name>) {
    let members: FxHashSet<Name> = set.iter().copied().collect();

    let mut exiting: Vec<Name> = Vec::new();
    let mut exits: FxHashSet<Name> = FxHashSet::default();

    for &member in set {
        let Some(block) = scfg.get(&member) else {
            continue;
        };
        let targets = block.effective_jump_targets();
        let mut has_external_target = targets.is_empty();
        for target in targets {
            if !members.contains(&target) {
                has_external_target = true;
                exits.insert(target);
            }
        }
        if has_external_target {
            exiting.push(member);
        }
    }

    exiting.sort();
    let mut exits: Vec<Name> = exits.into_iter().collect();
    exits.sort();
    (exiting, exits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockBase, RegionKind};
    use crate::graph::RegionMeta;
    use crate::name::Kind;
    use smallvec::smallvec;

    /// A set spanning the *entire* content of a subregion (not just the
    /// whole top-level graph) still only has this level's own blocks to
    /// look at, so it hits the same "no external incoming edge" fallback as
    /// the top-level case. The only consumers of `entries` are gated on
    /// `headers.len() > 1` (multi-header unification) or operate within
    /// this same `Scfg` (`extract_region`'s redirect loop, which has
    /// nothing left to redirect once `set` is everything there is) — so
    /// `entries = ∅` here is inert, not silently wrong, even without
    /// recursing to a parent graph this crate doesn't keep a handle to.
    #[test]
    fn whole_subregion_content_falls_back_to_find_head_with_no_entries() {
        let mut sub = Scfg::new_subregion(
            crate::name::NameGenerator::new_handle(),
            RegionMeta {
                self_name: Some(Name::new(Kind::Region, 0)),
                kind: RegionKind::Loop,
                header: None,
                exiting: None,
                parent_region: None,
            },
        );
        let h = Name::new(Kind::Basic, 0);
        sub.add_block(Block::Basic(crate::block::BasicBlock {
            base: {
                let mut base = BlockBase::new(h, smallvec![h]);
                base.backedges = smallvec![h];
                base
            },
            payload: crate::block::BasicPayload::Opaque,
        }))
        .unwrap();

        let (headers, entries) = find_headers_and_entries(&sub, &[h]).unwrap();
        assert_eq!(headers, vec![h]);
        assert!(entries.is_empty());
    }
}
