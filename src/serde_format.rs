//! Dictionary/YAML (de)serialization (spec §6).
//!
//! `ScfgDict` is the wire-level tree: every block in the hierarchy is
//! emitted flat at the top level, keyed by its rendered [`Name`]; region
//! nesting is carried only by each region block's `contains` list.
//! Reconstructing the nested [`Scfg`] hierarchy recurses over those lists,
//! seeded from whichever names no region claims (spec §6, "Deserialization
//! reconstructs regions by recursion over `contains` lists").

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::block::{
    BasicBlock, BasicPayload, Block, BlockBase, RegionBlock, RegionKind, SyntheticAssignmentBlock,
    SyntheticBranchBlock,
};
use crate::error::{Error, Result};
use crate::graph::{RegionMeta, Scfg};
use crate::name::{Name, NameGeneratorHandle, VarName};
use crate::ordered_map::OrderedMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScfgDict {
    pub blocks: BTreeMap<String, BlockDict>,
    pub edges: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub backedges: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDict {
    Basic,
    PythonBytecode {
        begin: u32,
        end: u32,
    },
    PythonAst {
        tree: Vec<serde_yaml::Value>,
    },
    SynthAssign {
        variable_assignment: BTreeMap<String, i64>,
    },
    SynthHead {
        variable: String,
        branch_value_table: BTreeMap<i64, String>,
    },
    SynthBranch {
        variable: String,
        branch_value_table: BTreeMap<i64, String>,
    },
    SynthExitLatch {
        variable: String,
        branch_value_table: BTreeMap<i64, String>,
    },
    SynthExitBranch {
        variable: String,
        branch_value_table: BTreeMap<i64, String>,
    },
    SynthTail,
    SynthExit,
    SynthReturn,
    SynthFill,
    Region {
        kind: String,
        contains: Vec<String>,
        header: Option<String>,
        exiting: Option<String>,
        parent_region: Option<String>,
    },
}

impl Scfg {
    /// Serializes this hierarchy's full contents into dictionary form
    /// (spec §6).
    pub fn to_dict(&self) -> ScfgDict {
        let mut blocks = BTreeMap::new();
        let mut edges = BTreeMap::new();
        let mut backedges = BTreeMap::new();
        collect(self, &mut blocks, &mut edges, &mut backedges);
        ScfgDict {
            blocks,
            edges,
            backedges,
        }
    }

    /// Reconstructs an [`Scfg`] hierarchy from its dictionary form (spec
    /// §6). Fails with [`Error::Deserialize`] on a malformed name, a
    /// missing block record, or an unknown region `kind`. Edge targets
    /// are not cross-checked against the block set here; traversals treat
    /// a missing target as simply absent rather than erroring, so a
    /// dangling edge in the input is silently unreachable rather than
    /// rejected.
    pub fn from_dict(dict: &ScfgDict) -> Result<Scfg> {
        let mut contained: FxHashSet<&str> = FxHashSet::default();
        for block in dict.blocks.values() {
            if let BlockDict::Region { contains, .. } = block {
                contained.extend(contains.iter().map(String::as_str));
            }
        }
        let top_level: Vec<String> = dict
            .blocks
            .keys()
            .filter(|k| !contained.contains(k.as_str()))
            .cloned()
            .collect();

        let mut root = Scfg::new();
        let name_gen = root.name_gen().clone();
        build_into(&mut root, &top_level, dict, &name_gen)?;
        Ok(root)
    }

    /// Serializes this hierarchy to a YAML document (spec §6).
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_dict()).map_err(|e| Error::Serialize(e.to_string()))
    }

    /// Reconstructs an [`Scfg`] hierarchy from a YAML document (spec §6).
    pub fn from_yaml(text: &str) -> Result<Scfg> {
        let dict: ScfgDict =
            serde_yaml::from_str(text).map_err(|e| Error::Deserialize(e.to_string()))?;
        Scfg::from_dict(&dict)
    }
}

fn collect(
    scfg: &Scfg,
    blocks: &mut BTreeMap<String, BlockDict>,
    edges: &mut BTreeMap<String, Vec<String>>,
    backedges: &mut BTreeMap<String, Vec<String>>,
) {
    for name in scfg.sorted_names() {
        let Some(block) = scfg.get(&name) else {
            continue;
        };
        let name_str = name.to_string();
        edges.insert(
            name_str.clone(),
            block.jump_targets().iter().map(Name::to_string).collect(),
        );
        if !block.backedges().is_empty() {
            backedges.insert(
                name_str.clone(),
                block.backedges().iter().map(Name::to_string).collect(),
            );
        }

        let dict_entry = match block {
            Block::Basic(b) => match &b.payload {
                BasicPayload::Opaque => BlockDict::Basic,
                BasicPayload::PythonBytecode { begin, end } => BlockDict::PythonBytecode {
                    begin: *begin,
                    end: *end,
                },
                BasicPayload::PythonAst { tree } => BlockDict::PythonAst { tree: tree.clone() },
            },
            Block::SyntheticAssignment(b) => BlockDict::SynthAssign {
                variable_assignment: b
                    .variable_assignment
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
            },
            Block::SyntheticBranch(b) => {
                let variable = b.variable.to_string();
                let branch_value_table: BTreeMap<i64, String> = b
                    .branch_value_table
                    .iter()
                    .map(|(k, v)| (*k, v.to_string()))
                    .collect();
                match name.kind() {
                    crate::name::Kind::SynthHead => BlockDict::SynthHead {
                        variable,
                        branch_value_table,
                    },
                    crate::name::Kind::SynthExitLatch => BlockDict::SynthExitLatch {
                        variable,
                        branch_value_table,
                    },
                    crate::name::Kind::SynthExitBranch => BlockDict::SynthExitBranch {
                        variable,
                        branch_value_table,
                    },
                    _ => BlockDict::SynthBranch {
                        variable,
                        branch_value_table,
                    },
                }
            }
            Block::SyntheticTail(_) => BlockDict::SynthTail,
            Block::SyntheticExit(_) => BlockDict::SynthExit,
            Block::SyntheticReturn(_) => BlockDict::SynthReturn,
            Block::SyntheticFill(_) => BlockDict::SynthFill,
            Block::Region(r) => BlockDict::Region {
                kind: r.kind.token().to_string(),
                contains: r.subregion.sorted_names().iter().map(Name::to_string).collect(),
                header: r.header.map(|h| h.to_string()),
                exiting: r.exiting.map(|e| e.to_string()),
                parent_region: r.parent_region.map(|p| p.to_string()),
            },
        };
        blocks.insert(name_str, dict_entry);

        if let Block::Region(r) = block {
            collect(&r.subregion, blocks, edges, backedges);
        }
    }
}

fn build_into(
    scfg: &mut Scfg,
    names: &[String],
    dict: &ScfgDict,
    name_gen: &NameGeneratorHandle,
) -> Result<()> {
    let mut sorted = names.to_vec();
    sorted.sort();
    for name_str in sorted {
        let name = Name::parse(&name_str)
            .ok_or_else(|| Error::Deserialize(format!("malformed block name {name_str}")))?;
        let block_dict = dict
            .blocks
            .get(&name_str)
            .ok_or_else(|| Error::Deserialize(format!("no block record for {name_str}")))?;
        let jump_targets = parse_name_list(dict.edges.get(&name_str))?;
        let backedges = parse_name_list(dict.backedges.get(&name_str))?;
        let block = build_block(name, block_dict, jump_targets, backedges, dict, name_gen)?;
        scfg.add_block(block)?;
    }
    Ok(())
}

fn parse_name_list(names: Option<&Vec<String>>) -> Result<SmallVec<[Name; 2]>> {
    match names {
        None => Ok(SmallVec::new()),
        Some(list) => list
            .iter()
            .map(|s| {
                Name::parse(s).ok_or_else(|| Error::Deserialize(format!("malformed name {s}")))
            })
            .collect(),
    }
}

fn parse_opt_name(s: &Option<String>) -> Result<Option<Name>> {
    s.as_ref()
        .map(|s| Name::parse(s).ok_or_else(|| Error::Deserialize(format!("malformed name {s}"))))
        .transpose()
}

fn build_block(
    name: Name,
    bd: &BlockDict,
    jump_targets: SmallVec<[Name; 2]>,
    backedges: SmallVec<[Name; 2]>,
    dict: &ScfgDict,
    name_gen: &NameGeneratorHandle,
) -> Result<Block> {
    let mut base = BlockBase::new(name, jump_targets);
    base.backedges = backedges;

    Ok(match bd {
        BlockDict::Basic => Block::Basic(BasicBlock {
            base,
            payload: BasicPayload::Opaque,
        }),
        BlockDict::PythonBytecode { begin, end } => Block::Basic(BasicBlock {
            base,
            payload: BasicPayload::PythonBytecode {
                begin: *begin,
                end: *end,
            },
        }),
        BlockDict::PythonAst { tree } => Block::Basic(BasicBlock {
            base,
            payload: BasicPayload::PythonAst { tree: tree.clone() },
        }),
        BlockDict::SynthAssign {
            variable_assignment,
        } => {
            let mut map = OrderedMap::new();
            for (k, v) in variable_assignment {
                map.insert(VarName::from_raw(k.clone()), *v);
            }
            Block::SyntheticAssignment(SyntheticAssignmentBlock {
                base,
                variable_assignment: map,
            })
        }
        BlockDict::SynthHead {
            variable,
            branch_value_table,
        }
        | BlockDict::SynthBranch {
            variable,
            branch_value_table,
        }
        | BlockDict::SynthExitLatch {
            variable,
            branch_value_table,
        }
        | BlockDict::SynthExitBranch {
            variable,
            branch_value_table,
        } => {
            let mut table = OrderedMap::new();
            for (k, v) in branch_value_table {
                let target = Name::parse(v)
                    .ok_or_else(|| Error::Deserialize(format!("malformed name {v}")))?;
                table.insert(*k, target);
            }
            Block::SyntheticBranch(SyntheticBranchBlock {
                base,
                variable: VarName::from_raw(variable.clone()),
                branch_value_table: table,
            })
        }
        BlockDict::SynthTail => Block::SyntheticTail(base),
        BlockDict::SynthExit => Block::SyntheticExit(base),
        BlockDict::SynthReturn => Block::SyntheticReturn(base),
        BlockDict::SynthFill => Block::SyntheticFill(base),
        BlockDict::Region {
            kind,
            contains,
            header,
            exiting,
            parent_region,
        } => {
            let kind = RegionKind::from_token(kind)
                .ok_or_else(|| Error::Deserialize(format!("unknown region kind {kind}")))?;
            let header = parse_opt_name(header)?;
            let exiting = parse_opt_name(exiting)?;
            let parent_region = parse_opt_name(parent_region)?;
            let mut subregion = Scfg::new_subregion(
                name_gen.clone(),
                RegionMeta {
                    self_name: Some(name),
                    kind,
                    header,
                    exiting,
                    parent_region,
                },
            );
            build_into(&mut subregion, contains, dict, name_gen)?;
            Block::Region(Box::new(RegionBlock {
                base,
                kind,
                header,
                exiting,
                subregion,
                parent_region,
            }))
        }
    })
}
