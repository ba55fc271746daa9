//! Dominator and post-dominator analysis (spec §4.5).
//!
//! This implements the simple iterative worklist dominator-set algorithm
//! the spec specifies directly, rather than the teacher's Semi-NCA
//! algorithm (`hir/src/ir/dominance/nca.rs`): the restructuring passes need
//! full dominator *sets* per block (queried as `b ∈ doms[t]` in loop
//! restructuring, and `begin ∈ doms[k] ∧ end ∉ doms[k]` in branch
//! restructuring), not just immediate dominators, so the set-based
//! dataflow formulation is the right fit even though it is less efficient
//! asymptotically than Semi-NCA.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::graph::Scfg;
use crate::name::Name;

/// `doms[n]` is the set of blocks that dominate `n` (including `n` itself).
pub type DomSets = FxHashMap<Name, FxHashSet<Name>>;

/// Computes, for every block in `scfg`, the set of blocks that dominate it.
///
/// Entries are the blocks with no predecessor within `scfg` (normally just
/// [`Scfg::find_head`]'s result, but the worklist formulation tolerates more
/// than one in case the caller is analyzing a graph mid-restructuring).
///
/// Fails with [`Error::InvariantViolation`] if there are no entries at all
/// (the spec's `NoEntryPoints` condition, folded into the broader
/// "Analysis precondition violated" error kind per spec §7).
pub fn doms(scfg: &Scfg) -> Result<DomSets> {
    compute(scfg, Direction::Forward)
}

/// As [`doms`], but over the reversed graph: entries are the blocks with no
/// outgoing effective jump target within `scfg`.
pub fn post_doms(scfg: &Scfg) -> Result<DomSets> {
    compute(scfg, Direction::Backward)
}

enum Direction {
    Forward,
    Backward,
}

fn compute(scfg: &Scfg, direction: Direction) -> Result<DomSets> {
    let all_names: FxHashSet<Name> = scfg.blocks().map(|(n, _)| *n).collect();
    if all_names.is_empty() {
        return Ok(DomSets::default());
    }

    let preds_of = |n: Name| -> Vec<Name> {
        match direction {
            Direction::Forward => scfg.effective_predecessors(n).into_vec(),
            Direction::Backward => scfg
                .get(&n)
                .map(|b| b.effective_jump_targets().into_vec())
                .unwrap_or_default(),
        }
    };
    let is_entry = |n: Name| -> bool {
        match direction {
            Direction::Forward => scfg.effective_predecessors(n).is_empty(),
            Direction::Backward => scfg
                .get(&n)
                .map(|b| b.effective_jump_targets().is_empty())
                .unwrap_or(true),
        }
    };

    let entries: Vec<Name> = {
        let mut names: Vec<Name> = all_names.iter().copied().filter(|n| is_entry(*n)).collect();
        names.sort();
        names
    };
    if entries.is_empty() {
        return Err(Error::invariant(
            "no entry points for dominator computation (NoEntryPoints)",
        ));
    }

    let mut sets: DomSets = FxHashMap::default();
    for entry in &entries {
        let mut singleton = FxHashSet::default();
        singleton.insert(*entry);
        sets.insert(*entry, singleton);
    }
    for name in &all_names {
        if !sets.contains_key(name) {
            sets.insert(*name, all_names.clone());
        }
    }

    let mut changed = true;
    let mut order: Vec<Name> = all_names.iter().copied().collect();
    order.sort();
    while changed {
        changed = false;
        for &name in &order {
            if entries.contains(&name) {
                continue;
            }
            let preds = preds_of(name);
            let mut new_set: Option<FxHashSet<Name>> = None;
            for pred in preds {
                let Some(pred_set) = sets.get(&pred) else {
                    continue;
                };
                new_set = Some(match new_set {
                    None => pred_set.clone(),
                    Some(acc) => acc.intersection(pred_set).copied().collect(),
                });
            }
            let mut new_set = new_set.unwrap_or_default();
            new_set.insert(name);
            let old_set = sets.get(&name);
            if old_set != Some(&new_set) {
                sets.insert(name, new_set);
                changed = true;
            }
        }
    }

    Ok(sets)
}

/// Derives the immediate-dominator function from a full [`DomSets`] map, by
/// repeatedly subtracting `idom(v)` from `idom(k)` for every `v ∈ idom(k)`,
/// iterated to a fixed point (spec §4.5). The result maps every non-entry
/// block to its unique immediate dominator; entries have no entry in the
/// returned map.
pub fn imm_doms(doms: &DomSets) -> FxHashMap<Name, Name> {
    let mut idom: FxHashMap<Name, FxHashSet<Name>> = doms
        .iter()
        .map(|(&n, set)| {
            let mut s = set.clone();
            s.remove(&n);
            (n, s)
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        let snapshot = idom.clone();
        for (&k, set) in idom.iter_mut() {
            for (&v, v_doms) in &snapshot {
                if v == k || !set.contains(&v) {
                    continue;
                }
                let before = set.len();
                for d in v_doms {
                    if *d != v {
                        set.remove(d);
                    }
                }
                if set.len() != before {
                    changed = true;
                }
            }
        }
    }

    idom.into_iter()
        .filter_map(|(k, set)| {
            debug_assert!(set.len() <= 1, "immediate dominator must be unique");
            set.into_iter().next().map(|v| (k, v))
        })
        .collect()
}
