//! The [`Scfg`] graph container (spec §3, §4.4).

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::block::{Block, RegionBlock, RegionKind};
use crate::error::{Error, Result};
use crate::name::{Kind, Name, NameGenerator, NameGeneratorHandle, VarName};

/// Metadata describing the region a particular [`Scfg`] level represents.
///
/// This mirrors (and must be kept in sync with) the `kind`/`header`/
/// `exiting`/`parent_region` fields of the owning
/// [`crate::block::RegionBlock`] when this `Scfg` is a nested subregion; see
/// the design note on back-pointers (spec §9).
#[derive(Debug, Clone)]
pub struct RegionMeta {
    /// The name by which the [`crate::block::RegionBlock`] owning this
    /// `Scfg` is keyed in its parent level. `None` only for the hierarchy
    /// root.
    pub self_name: Option<Name>,
    pub kind: RegionKind,
    pub header: Option<Name>,
    pub exiting: Option<Name>,
    pub parent_region: Option<Name>,
}

impl RegionMeta {
    fn meta_root() -> Self {
        Self {
            self_name: None,
            kind: RegionKind::Meta,
            header: None,
            exiting: None,
            parent_region: None,
        }
    }
}

/// A structured (or not-yet-structured) control flow graph: a map of
/// [`Name`] to [`Block`], plus the shared name generator and this level's
/// region metadata (spec §3).
#[derive(Debug, Clone)]
pub struct Scfg {
    blocks: FxHashMap<Name, Block>,
    name_gen: NameGeneratorHandle,
    pub region: RegionMeta,
}

impl Scfg {
    /// Construct an empty top-level SCFG, with a fresh name generator.
    pub fn new() -> Self {
        Self {
            blocks: FxHashMap::default(),
            name_gen: NameGenerator::new_handle(),
            region: RegionMeta::meta_root(),
        }
    }

    /// Construct an empty subregion SCFG, sharing `name_gen` with the rest
    /// of the hierarchy (spec §4.1, §5).
    pub(crate) fn new_subregion(name_gen: NameGeneratorHandle, region: RegionMeta) -> Self {
        Self {
            blocks: FxHashMap::default(),
            name_gen,
            region,
        }
    }

    pub fn name_gen(&self) -> &NameGeneratorHandle {
        &self.name_gen
    }

    pub fn new_block_name(&self, kind: Kind) -> Name {
        self.name_gen.borrow_mut().new_block_name(kind)
    }

    pub fn new_region_name(&self) -> Name {
        self.name_gen.borrow_mut().new_region_name()
    }

    pub fn new_var_name(&self, kind: Kind) -> VarName {
        self.name_gen.borrow_mut().new_var_name(kind)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn get(&self, name: &Name) -> Option<&Block> {
        self.blocks.get(name)
    }

    pub fn get_mut(&mut self, name: &Name) -> Option<&mut Block> {
        self.blocks.get_mut(name)
    }

    /// Insert `block`, keyed by its own name. Also registers the name with
    /// this hierarchy's generator, so it is never reissued (covers basic
    /// blocks supplied by a frontend, which aren't produced by
    /// `new_block_name`).
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let name = block.name();
        if self.blocks.contains_key(&name) {
            return Err(Error::malformed(format!("duplicate block name {name}")));
        }
        self.name_gen.borrow_mut().observe(name);
        self.blocks.insert(name, block);
        Ok(())
    }

    /// Insert or overwrite `block` under its own name, without a duplicate
    /// check. Used to write back a mutated record under the same name
    /// (spec §3, "Lifecycle").
    pub fn set_block(&mut self, block: Block) {
        let name = block.name();
        self.name_gen.borrow_mut().observe(name);
        self.blocks.insert(name, block);
    }

    pub fn remove_block(&mut self, name: &Name) -> Option<Block> {
        self.blocks.remove(name)
    }

    /// Remove every name in `names` from this level, in one pass. Blocks
    /// destroyed this way are dropped, not moved (contrast with region
    /// extraction, which moves blocks into a subregion).
    pub fn remove_blocks(&mut self, names: &[Name]) {
        for name in names {
            self.blocks.remove(name);
        }
    }

    /// All names at this level, in ascending [`Name`] order. Every
    /// order-sensitive operation in this crate iterates via this method
    /// rather than the map's native (unordered) iteration order, per the
    /// "Ordering" design note (spec §9).
    pub fn sorted_names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.blocks.keys().copied().collect();
        names.sort();
        names
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&Name, &Block)> {
        self.blocks.iter()
    }

    /// Predecessors of `name` at this level, counting every jump target
    /// (including declared backedges).
    pub fn predecessors(&self, name: Name) -> SmallVec<[Name; 4]> {
        self.blocks
            .values()
            .filter(|b| b.jump_targets().contains(&name))
            .map(|b| b.name())
            .collect()
    }

    /// Predecessors of `name` at this level via an *effective* (non-backedge)
    /// jump target.
    pub fn effective_predecessors(&self, name: Name) -> SmallVec<[Name; 4]> {
        self.blocks
            .values()
            .filter(|b| b.effective_jump_targets().contains(&name))
            .map(|b| b.name())
            .collect()
    }

    /// The unique block with no effective predecessor at this level (spec
    /// §4.4). Fails with [`Error::InvariantViolation`] if there isn't
    /// exactly one.
    pub fn find_head(&self) -> Result<Name> {
        let mut heads: Vec<Name> = self
            .sorted_names()
            .into_iter()
            .filter(|n| self.effective_predecessors(*n).is_empty())
            .collect();
        match heads.len() {
            1 => Ok(heads.pop().unwrap()),
            0 => Err(Error::invariant("no head: every block has a predecessor")),
            n => Err(Error::invariant(format!(
                "expected a unique head, found {n}: {heads:?}"
            ))),
        }
    }

    /// DFS reachability over effective (non-backedge) jump targets, at this
    /// level only (spec §4.4). Since a [`Block::Region`]'s jump targets are
    /// already just the edges leaving it, every single-level traversal is
    /// automatically a "concealed" view with respect to nested subregions —
    /// there is no need for a distinct concealed-view type.
    pub fn is_reachable_dfs(&self, src: Name, dst: Name) -> bool {
        if src == dst {
            return true;
        }
        let mut stack = vec![src];
        let mut seen = FxHashSet::default();
        seen.insert(src);
        while let Some(node) = stack.pop() {
            let Some(block) = self.blocks.get(&node) else {
                continue;
            };
            for next in block.effective_jump_targets() {
                if next == dst {
                    return true;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// BFS order over effective jump targets starting from [`Scfg::find_head`],
    /// at this level only.
    pub fn bfs_order(&self) -> Result<Vec<Name>> {
        let head = self.find_head()?;
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(head);
        seen.insert(head);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let Some(block) = self.blocks.get(&node) else {
                continue;
            };
            for next in block.jump_targets().iter().copied() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(order)
    }

    /// `iter(scfg)` from spec §4.4: BFS order at this level, recursing into
    /// any [`Block::Region`]'s subregion immediately after the region
    /// itself is yielded.
    pub fn iter_recursive(&self) -> Result<Vec<Name>> {
        let mut out = Vec::new();
        for name in self.bfs_order()? {
            out.push(name);
            if let Some(region) = self.blocks.get(&name).and_then(Block::as_region) {
                out.extend(region.subregion.iter_recursive()?);
            }
        }
        Ok(out)
    }

    /// Depth-first walk over every nested [`Block::Region`], yielding each
    /// subregion's [`Scfg`] (but not recursing further — callers recurse
    /// themselves via the returned references). Mirrors the driver's need
    /// to apply a single-level pass and then "iterate subregions" (spec
    /// §4.12).
    pub fn iter_subregions(&self) -> Vec<&Scfg> {
        self.blocks
            .values()
            .filter_map(Block::as_region)
            .map(|r| &r.subregion)
            .collect()
    }

    /// As [`Scfg::iter_subregions`], but yields the owning [`RegionBlock`]s
    /// themselves rather than just their subregions, so a caller that
    /// recurses through `r.subregion` can also repair `r.header`/`r.exiting`
    /// afterwards if restructuring inside the subregion replaced either
    /// with a newly extracted region (spec §4.11 step 6).
    pub fn iter_subregions_mut(&mut self) -> Vec<&mut RegionBlock> {
        self.blocks.values_mut().filter_map(Block::as_region_mut).collect()
    }
}

impl Default for Scfg {
    fn default() -> Self {
        Self::new()
    }
}
