//! Iterative (non-recursive) Tarjan SCC, for loop discovery (spec §4.6).
//!
//! Ported from the structure of the teacher's `StronglyConnectedComponents`
//! iterator (`hir/src/ir/cfg/scc.rs`): an explicit visit stack carrying the
//! current node, its remaining children iterator, and the minimum
//! back-reference seen so far, plus a separate node stack holding the
//! current SCC-in-progress. No recursion, so arbitrarily deep graphs don't
//! risk stack overflow.

use rustc_hash::FxHashMap;

use crate::graph::Scfg;
use crate::name::Name;

/// One strongly connected component, in the order Tarjan's algorithm
/// discovered its members.
#[derive(Debug, Clone, Default)]
pub struct StronglyConnectedComponent {
    nodes: Vec<Name>,
}

impl StronglyConnectedComponent {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn as_slice(&self) -> &[Name] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = Name> + '_ {
        self.nodes.iter().copied()
    }

    /// True if this component represents an actual cycle: either it has
    /// more than one node, or its single node has a self-loop among its
    /// effective jump targets.
    pub fn has_cycle(&self, scfg: &Scfg) -> bool {
        if self.nodes.len() > 1 {
            return true;
        }
        let node = self.nodes[0];
        scfg.get(&node)
            .map(|b| b.effective_jump_targets().contains(&node))
            .unwrap_or(false)
    }
}

struct StackElement {
    node: Name,
    next_child: std::vec::IntoIter<Name>,
    min_visited: usize,
}

/// Computes every strongly connected component of `scfg`'s *effective*
/// (non-backedge) edges, restricted to blocks that are still present in
/// `scfg` at the level being analyzed.
///
/// Declared backedges are excluded from the successor view fed to Tarjan's
/// algorithm, so an SCC pass run after a prior loop has already been
/// regionalized (and its backedge declared) does not rediscover the loop
/// that region now represents (spec §4.6).
pub fn strongly_connected_components(scfg: &Scfg) -> Vec<StronglyConnectedComponent> {
    let mut next_visit_num = 0usize;
    let mut visit_numbers: FxHashMap<Name, usize> = FxHashMap::default();
    let mut node_stack: Vec<Name> = Vec::new();
    let mut visit_stack: Vec<StackElement> = Vec::new();
    let mut result = Vec::new();

    let children = |node: Name| -> std::vec::IntoIter<Name> {
        scfg.get(&node)
            .map(|b| b.effective_jump_targets().into_vec())
            .unwrap_or_default()
            .into_iter()
    };

    let mut visit_one = |node: Name,
                         next_visit_num: &mut usize,
                         visit_numbers: &mut FxHashMap<Name, usize>,
                         node_stack: &mut Vec<Name>,
                         visit_stack: &mut Vec<StackElement>| {
        let visit_num = *next_visit_num;
        *next_visit_num += 1;
        visit_numbers.insert(node, visit_num);
        node_stack.push(node);
        visit_stack.push(StackElement {
            node,
            next_child: children(node),
            min_visited: visit_num,
        });
    };

    // Every block may be its own DFS root, since the graph need not be
    // fully connected from a single entry while restructuring is in
    // progress (e.g. once some blocks have already been moved into
    // sibling regions).
    for root in scfg.sorted_names() {
        if visit_numbers.contains_key(&root) {
            continue;
        }
        visit_one(
            root,
            &mut next_visit_num,
            &mut visit_numbers,
            &mut node_stack,
            &mut visit_stack,
        );

        while !visit_stack.is_empty() {
            // Drain the current frame's children.
            while let Some(child) = visit_stack.last_mut().unwrap().next_child.next() {
                match visit_numbers.get(&child).copied() {
                    None => {
                        visit_one(
                            child,
                            &mut next_visit_num,
                            &mut visit_numbers,
                            &mut node_stack,
                            &mut visit_stack,
                        );
                    }
                    Some(child_num) => {
                        let top = visit_stack.last_mut().unwrap();
                        top.min_visited = top.min_visited.min(child_num);
                    }
                }
            }

            let visiting = visit_stack.pop().unwrap();
            if let Some(parent) = visit_stack.last_mut() {
                parent.min_visited = parent.min_visited.min(visiting.min_visited);
            }

            if visiting.min_visited != visit_numbers[&visiting.node] {
                continue;
            }

            let mut current = StronglyConnectedComponent::default();
            loop {
                let node = node_stack.pop().unwrap();
                let done = node == visiting.node;
                *visit_numbers.get_mut(&node).unwrap() = usize::MAX;
                current.nodes.push(node);
                if done {
                    break;
                }
            }
            result.push(current);
        }
    }

    result
}
