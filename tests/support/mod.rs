//! Shared helpers for the integration tests: a compact graph builder
//! matching the `{idx -> {succs}}` notation the concrete scenarios in
//! spec §8 are written in, plus the reference simulator.

use scfg_restructure::{BasicBlock, BasicPayload, Block, BlockBase, Kind, Name, Scfg};
use smallvec::SmallVec;

pub mod simulator;

/// The [`Name`] of the `idx`-th `Basic` block in a graph built by [`build`].
pub fn basic(idx: u32) -> Name {
    Name::new(Kind::Basic, idx)
}

/// Builds a flat `Scfg` of opaque `Basic` blocks from a `(index,
/// successors)` edge list.
pub fn build(edges: &[(u32, &[u32])]) -> Scfg {
    let mut scfg = Scfg::new();
    for &(idx, succs) in edges {
        let jump_targets: SmallVec<[Name; 2]> = succs.iter().map(|&s| basic(s)).collect();
        let block = Block::Basic(BasicBlock {
            base: BlockBase::new(basic(idx), jump_targets),
            payload: BasicPayload::Opaque,
        });
        scfg.add_block(block).expect("scenario graphs use distinct indices");
    }
    scfg
}

/// All `Region` blocks at this single level, in ascending name order.
pub fn regions(scfg: &Scfg) -> Vec<Name> {
    scfg.sorted_names()
        .into_iter()
        .filter(|n| scfg.get(n).map(|b| b.is_region()).unwrap_or(false))
        .collect()
}
