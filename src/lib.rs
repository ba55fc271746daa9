//! Restructures arbitrary control flow graphs into structured control flow
//! graphs (SCFGs), implementing the loop- and branch-restructuring
//! transformations of Bahmann et al., "Perfect Reconstructability of
//! Control Flow from Demand Dependence Graphs" (2015).
//!
//! The entry point is [`Scfg::restructure`] (or
//! [`Scfg::restructure_with_config`]), which runs `join_returns`, then loop
//! restructuring, then branch restructuring, recursively over every nested
//! region, until the graph is fully structured.

mod block;
mod config;
mod dominance;
mod edits;
mod error;
mod graph;
mod name;
mod ordered_map;
mod queries;
mod region;
mod restructure;
mod scc;
mod serde_format;

pub use self::{
    block::{
        BasicBlock, BasicPayload, Block, BlockBase, RegionBlock, RegionKind,
        SyntheticAssignmentBlock, SyntheticBranchBlock,
    },
    config::RestructureConfig,
    error::{Error, Result},
    graph::{RegionMeta, Scfg},
    name::{Kind, Name, NameGenerator, NameGeneratorHandle, VarName},
    ordered_map::OrderedMap,
    scc::StronglyConnectedComponent,
    serde_format::{BlockDict, ScfgDict},
};

use self::edits::join_returns;
use self::restructure::branch::restructure_branches_recursive;
use self::restructure::loop_::restructure_loops_recursive;

impl Scfg {
    /// Runs the full restructuring pipeline with default configuration
    /// (spec §4.12): join multiple `return`-equivalent exits, then
    /// restructure every loop, then restructure every branch, recursing
    /// into newly created regions as each pass goes.
    pub fn restructure(&mut self) -> Result<()> {
        self.restructure_with_config(&RestructureConfig::default())
    }

    /// As [`Scfg::restructure`], with an explicit [`RestructureConfig`].
    pub fn restructure_with_config(&mut self, config: &RestructureConfig) -> Result<()> {
        log::info!("starting restructuring pass");
        join_returns(self)?;
        restructure_loops_recursive(self, config)?;
        restructure_branches_recursive(self, config)?;
        log::info!("restructuring pass complete");
        Ok(())
    }
}
