//! The tagged block variants and their structural operations (spec §3, §4.2).

use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};
use crate::name::{Name, VarName};
use crate::ordered_map::OrderedMap;
use crate::graph::Scfg;

/// Fields common to every block variant (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBase {
    pub name: Name,
    /// Ordered successor list; the first target is the "false" branch for
    /// 2-way branches, the second the "true" branch (spec §4.3).
    pub jump_targets: SmallVec<[Name; 2]>,
    /// Subset of `jump_targets` that are declared loop backedges.
    pub backedges: SmallVec<[Name; 2]>,
}

impl BlockBase {
    pub fn new(name: Name, jump_targets: SmallVec<[Name; 2]>) -> Self {
        Self {
            name,
            jump_targets,
            backedges: SmallVec::new(),
        }
    }

    pub fn effective_jump_targets(&self) -> impl Iterator<Item = Name> + '_ {
        self.jump_targets
            .iter()
            .copied()
            .filter(|t| !self.backedges.contains(t))
    }

    pub fn is_exiting(&self) -> bool {
        self.effective_jump_targets().next().is_none()
    }

    pub fn fallthrough(&self) -> bool {
        self.jump_targets.len() == 1
    }
}

/// Opaque frontend payload carried by a [`Block::Basic`] block. The core
/// never inspects the contents beyond what's needed to serialize it back
/// out (spec §1, §6).
#[derive(Debug, Clone, PartialEq)]
pub enum BasicPayload {
    /// A basic block with no frontend-specific payload recorded.
    Opaque,
    /// Python-bytecode frontend payload: a bytecode offset range.
    PythonBytecode { begin: u32, end: u32 },
    /// Python-AST frontend payload: an opaque list of AST node records.
    PythonAst { tree: Vec<serde_yaml::Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub base: BlockBase,
    pub payload: BasicPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAssignmentBlock {
    pub base: BlockBase,
    pub variable_assignment: OrderedMap<VarName, i64>,
}

/// A multi-way switch on `variable`. Covers the `SyntheticBranch`,
/// `SyntheticHead`, `SyntheticExitingLatch`, and `SyntheticExitBranch`
/// "subtypes" from spec §3 — the distinction between them is carried by
/// `base.name`'s [`crate::name::Kind`], not by a separate field, since each
/// subtype is produced by a generator call tagged with its own `Kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticBranchBlock {
    pub base: BlockBase,
    pub variable: VarName,
    pub branch_value_table: OrderedMap<i64, Name>,
}

/// The semantic kind of a [`RegionBlock`] (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// The top-level wrapper region; every [`Scfg`] has exactly one.
    Meta,
    Loop,
    Head,
    Tail,
    Branch,
}

impl RegionKind {
    pub fn token(self) -> &'static str {
        match self {
            RegionKind::Meta => "meta",
            RegionKind::Loop => "loop",
            RegionKind::Head => "head",
            RegionKind::Tail => "tail",
            RegionKind::Branch => "branch",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "meta" => RegionKind::Meta,
            "loop" => RegionKind::Loop,
            "head" => RegionKind::Head,
            "tail" => RegionKind::Tail,
            "branch" => RegionKind::Branch,
            _ => return None,
        })
    }
}

/// A composite block that owns another [`Scfg`] as its `subregion` (spec
/// §3). `base.jump_targets` are the jump targets of the subregion's
/// `exiting` block — edges leaving the region.
#[derive(Debug, Clone)]
pub struct RegionBlock {
    pub base: BlockBase,
    pub kind: RegionKind,
    /// Entry point into `subregion`; `None` only for the top-level `meta`
    /// wrapper region.
    pub header: Option<Name>,
    /// The unique block in `subregion` with edges leaving the region;
    /// `None` only for the top-level `meta` wrapper region.
    pub exiting: Option<Name>,
    pub subregion: Scfg,
    pub parent_region: Option<Name>,
}

/// The tagged block variants (spec §3).
#[derive(Debug, Clone)]
pub enum Block {
    Basic(BasicBlock),
    SyntheticAssignment(SyntheticAssignmentBlock),
    SyntheticBranch(SyntheticBranchBlock),
    SyntheticTail(BlockBase),
    SyntheticExit(BlockBase),
    SyntheticReturn(BlockBase),
    SyntheticFill(BlockBase),
    Region(Box<RegionBlock>),
}

impl Block {
    pub fn base(&self) -> &BlockBase {
        match self {
            Block::Basic(b) => &b.base,
            Block::SyntheticAssignment(b) => &b.base,
            Block::SyntheticBranch(b) => &b.base,
            Block::SyntheticTail(b)
            | Block::SyntheticExit(b)
            | Block::SyntheticReturn(b)
            | Block::SyntheticFill(b) => b,
            Block::Region(b) => &b.base,
        }
    }

    fn base_mut(&mut self) -> &mut BlockBase {
        match self {
            Block::Basic(b) => &mut b.base,
            Block::SyntheticAssignment(b) => &mut b.base,
            Block::SyntheticBranch(b) => &mut b.base,
            Block::SyntheticTail(b)
            | Block::SyntheticExit(b)
            | Block::SyntheticReturn(b)
            | Block::SyntheticFill(b) => b,
            Block::Region(b) => &mut b.base,
        }
    }

    pub fn name(&self) -> Name {
        self.base().name
    }

    pub fn jump_targets(&self) -> &[Name] {
        &self.base().jump_targets
    }

    pub fn backedges(&self) -> &[Name] {
        &self.base().backedges
    }

    pub fn effective_jump_targets(&self) -> SmallVec<[Name; 2]> {
        self.base().effective_jump_targets().collect()
    }

    pub fn is_exiting(&self) -> bool {
        self.base().is_exiting()
    }

    pub fn fallthrough(&self) -> bool {
        self.base().fallthrough()
    }

    pub fn is_region(&self) -> bool {
        matches!(self, Block::Region(_))
    }

    pub fn as_region(&self) -> Option<&RegionBlock> {
        match self {
            Block::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_region_mut(&mut self) -> Option<&mut RegionBlock> {
        match self {
            Block::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_synthetic_branch(&self) -> Option<&SyntheticBranchBlock> {
        match self {
            Block::SyntheticBranch(b) => Some(b),
            _ => None,
        }
    }

    /// Returns a new block record with `jump_targets` replaced by
    /// `new_targets` (spec §4.2).
    ///
    /// For [`Block::SyntheticBranch`] variants, `old_targets` and
    /// `new_targets` must have the same length and differ in at most one
    /// position; the differing pair is used to remap `branch_value_table`
    /// entries that pointed at the old target so they point at the new one.
    /// Calling this with more than one differing position on a
    /// `SyntheticBranch` is an invariant violation: branch value tables
    /// only support single-target substitution (spec §4.2).
    pub fn replace_jump_targets(&self, new_targets: SmallVec<[Name; 2]>) -> Result<Block> {
        match self {
            Block::SyntheticBranch(branch) => {
                let old_targets = &branch.base.jump_targets;
                if old_targets.len() != new_targets.len() {
                    return Err(Error::invariant(format!(
                        "replace_jump_targets on synthetic branch {} must preserve arity: {} -> {}",
                        branch.base.name,
                        old_targets.len(),
                        new_targets.len()
                    )));
                }
                let mut diffs: Vec<(Name, Name)> = Vec::new();
                for (old, new) in old_targets.iter().zip(new_targets.iter()) {
                    if old != new {
                        diffs.push((*old, *new));
                    }
                }
                if diffs.len() > 1 {
                    return Err(Error::invariant(format!(
                        "replace_jump_targets on synthetic branch {} may only change one target \
                         at a time, found {} changes",
                        branch.base.name,
                        diffs.len()
                    )));
                }
                let mut new_table = branch.branch_value_table.clone();
                if let Some((old, new)) = diffs.into_iter().next() {
                    new_table.remap_value(&old, new);
                }
                let mut new_base = branch.base.clone();
                new_base.jump_targets = new_targets;
                Ok(Block::SyntheticBranch(SyntheticBranchBlock {
                    base: new_base,
                    variable: branch.variable.clone(),
                    branch_value_table: new_table,
                }))
            }
            other => {
                let mut clone = other.clone();
                {
                    let base = clone.base_mut();
                    // Preserve only the backedges that still appear among the
                    // new targets, keeping invariant 2 (backedges ⊆ jump_targets).
                    base.backedges.retain(|b| new_targets.contains(b));
                    base.jump_targets = new_targets;
                }
                Ok(clone)
            }
        }
    }

    /// Declares `target` as this block's sole backedge (spec §4.2).
    ///
    /// Asserts `backedges` is currently empty and `target` is one of this
    /// block's jump targets.
    pub fn declare_backedge(&self, target: Name) -> Result<Block> {
        let base = self.base();
        if !base.backedges.is_empty() {
            return Err(Error::invariant(format!(
                "block {} already has a declared backedge",
                base.name
            )));
        }
        if !base.jump_targets.contains(&target) {
            return Err(Error::invariant(format!(
                "{target} is not a jump target of block {}",
                base.name
            )));
        }
        self.replace_backedges(smallvec![target])
    }

    /// Returns a new block record with `backedges` replaced outright, with
    /// no containment check against `jump_targets` — used during synthetic
    /// construction where the target list and backedge set are built
    /// together (spec §4.2).
    pub fn replace_backedges(&self, new_backedges: SmallVec<[Name; 2]>) -> Result<Block> {
        let mut clone = self.clone();
        clone.base_mut().backedges = new_backedges;
        Ok(clone)
    }
}
