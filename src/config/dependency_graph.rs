// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::template::{NodeId, Template};
use crate::errors::CycleError;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Newtype wrapper for the wire graph of a template.
///
/// Maps each node to the nodes directly downstream of it. Every node of the
/// template is a key, even when it has no wires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph(pub BTreeMap<NodeId, Vec<NodeId>>);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the graph from a template's wires.
    ///
    /// Wires whose endpoints fall outside the template are ignored here;
    /// template validation reports them.
    pub fn from_template(template: &Template) -> Self {
        let count = template.modules.len();
        let mut graph: BTreeMap<NodeId, Vec<NodeId>> = (0..count).map(|n| (n, Vec::new())).collect();
        for wire in &template.wires {
            let (source, target) = (wire.source_node(), wire.target_node());
            if source >= count || target >= count {
                continue;
            }
            if let Some(dependents) = graph.get_mut(&source) {
                if !dependents.contains(&target) {
                    dependents.push(target);
                }
            }
        }
        Self(graph)
    }

    /// Add an edge `source -> target`, creating either node if needed.
    pub fn add_dependency(&mut self, source: NodeId, target: NodeId) {
        self.0.entry(target).or_default();
        let dependents = self.0.entry(source).or_default();
        if !dependents.contains(&target) {
            dependents.push(target);
        }
    }

    pub fn get_dependents(&self, node: NodeId) -> Option<&Vec<NodeId>> {
        self.0.get(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }

    /// Invert the graph: each node mapped to its direct upstream nodes.
    pub fn build_reverse_dependencies(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut reverse: BTreeMap<NodeId, Vec<NodeId>> =
            self.0.keys().map(|&n| (n, Vec::new())).collect();
        for (&source, dependents) in &self.0 {
            for &target in dependents {
                reverse.entry(target).or_default().push(source);
            }
        }
        reverse
    }

    /// Nodes ordered so every node follows all of its upstream nodes.
    ///
    /// With `target`, only the target and its ancestors are returned; a target
    /// with no inbound wires yields `[target]`. Nodes still on the DFS stack
    /// when revisited mean the graph has a cycle, reported with its path.
    pub fn processing_order(&self, target: Option<NodeId>) -> Result<Vec<NodeId>, CycleError> {
        let upstream = self.build_reverse_dependencies();
        let mut state: HashMap<NodeId, Visit> = HashMap::new();
        let mut order = Vec::new();

        let roots: Vec<NodeId> = match target {
            Some(node) => vec![node],
            None => self.0.keys().copied().collect(),
        };
        for root in roots {
            if state.contains_key(&root) {
                continue;
            }
            Self::visit(root, &upstream, &mut state, &mut order)?;
        }
        Ok(order)
    }

    /// Post-order DFS over upstream edges from `root`, on an explicit stack
    /// of `(node, next parent index)` frames.
    fn visit(
        root: NodeId,
        upstream: &BTreeMap<NodeId, Vec<NodeId>>,
        state: &mut HashMap<NodeId, Visit>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        state.insert(root, Visit::InProgress);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let parents = upstream.get(&node).map(Vec::as_slice).unwrap_or_default();
            let Some(&parent) = parents.get(next) else {
                stack.pop();
                state.insert(node, Visit::Done);
                order.push(node);
                continue;
            };
            frame.1 += 1;

            match state.get(&parent) {
                Some(Visit::Done) => {}
                Some(Visit::InProgress) => {
                    let start = stack.iter().position(|&(n, _)| n == parent).unwrap_or(0);
                    let mut cycle: Vec<NodeId> = stack[start..].iter().map(|&(n, _)| n).collect();
                    cycle.push(parent);
                    // stack runs downstream-to-upstream; report it in wire direction
                    cycle.reverse();
                    return Err(CycleError { cycle });
                }
                None => {
                    state.insert(parent, Visit::InProgress);
                    stack.push((parent, 0));
                }
            }
        }
        Ok(())
    }

    /// `node` and every node reachable from it by following wires forward.
    pub fn dependents(&self, node: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(children) = self.0.get(&current) {
                queue.extend(children.iter().copied());
            }
        }
        seen
    }

    /// Group `nodes` into topological levels with Kahn's algorithm.
    ///
    /// Only edges between members of `nodes` count. Level 0 holds the nodes with
    /// no upstream member; level N holds nodes whose upstream members all sit in
    /// levels below N. Nodes inside a level are sorted by index.
    pub fn levels(&self, nodes: &[NodeId]) -> Result<Vec<Vec<NodeId>>, CycleError> {
        let members: BTreeSet<NodeId> = nodes.iter().copied().collect();
        let upstream = self.build_reverse_dependencies();

        let mut in_degree: BTreeMap<NodeId, usize> = members
            .iter()
            .map(|&n| {
                let count = upstream
                    .get(&n)
                    .map(|parents| parents.iter().filter(|p| members.contains(p)).count())
                    .unwrap_or(0);
                (n, count)
            })
            .collect();

        let mut current: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut levels = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for node in &current {
                for child in self.0.get(node).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.insert(*child);
                        }
                    }
                }
            }
            placed += current.len();
            levels.push(current);
            current = next.into_iter().collect();
        }

        if placed != members.len() {
            let cycle = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(n, _)| n)
                .collect();
            return Err(CycleError { cycle });
        }
        Ok(levels)
    }
}

impl From<BTreeMap<NodeId, Vec<NodeId>>> for DependencyGraph {
    fn from(graph: BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        Self(graph)
    }
}

impl From<DependencyGraph> for BTreeMap<NodeId, Vec<NodeId>> {
    fn from(graph: DependencyGraph) -> Self {
        graph.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(NodeId, NodeId)], count: usize) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for n in 0..count {
            g.0.entry(n).or_default();
        }
        for &(s, t) in edges {
            g.add_dependency(s, t);
        }
        g
    }

    fn position(order: &[NodeId], node: NodeId) -> usize {
        order.iter().position(|&n| n == node).unwrap()
    }

    #[test]
    fn test_full_order_respects_edges() {
        // diamond: 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3, plus isolated 4
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let g = graph(&edges, 5);
        let order = g.processing_order(None).unwrap();

        assert_eq!(order.len(), 5);
        for (s, t) in edges {
            assert!(position(&order, s) < position(&order, t), "{} before {}", s, t);
        }
    }

    #[test]
    fn test_target_order_is_restricted_to_ancestors() {
        // 0 -> 1 -> 2, 3 -> 4
        let g = graph(&[(0, 1), (1, 2), (3, 4)], 5);

        assert_eq!(g.processing_order(Some(2)).unwrap(), vec![0, 1, 2]);
        assert_eq!(g.processing_order(Some(4)).unwrap(), vec![3, 4]);
        assert_eq!(g.processing_order(Some(0)).unwrap(), vec![0]);
    }

    #[test]
    fn test_deep_chain_does_not_exhaust_the_stack() {
        let depth = 200_000;
        let edges: Vec<(NodeId, NodeId)> = (1..depth).map(|n| (n - 1, n)).collect();
        let g = graph(&edges, depth);

        let order = g.processing_order(Some(depth - 1)).unwrap();
        assert_eq!(order.len(), depth);
        assert!(order.windows(2).all(|w| w[0] + 1 == w[1]));
        assert_eq!(g.processing_order(None).unwrap().len(), depth);
    }

    #[test]
    fn test_isolated_target_yields_itself() {
        let g = graph(&[], 3);
        assert_eq!(g.processing_order(Some(1)).unwrap(), vec![1]);
    }

    #[test]
    fn test_cycle_is_reported_with_path() {
        // 0 -> 1 -> 2 -> 1
        let g = graph(&[(0, 1), (1, 2), (2, 1)], 3);
        let err = g.processing_order(None).unwrap_err();

        assert_eq!(err.cycle.first(), err.cycle.last());
        assert!(err.cycle.contains(&1));
        assert!(err.cycle.contains(&2));
        assert!(!err.cycle.contains(&0));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let g = graph(&[(0, 0)], 1);
        let err = g.processing_order(Some(0)).unwrap_err();
        assert_eq!(err.cycle, vec![0, 0]);
    }

    #[test]
    fn test_dependents_include_self() {
        // 0 -> 1 -> 3, 0 -> 2, 4 isolated
        let g = graph(&[(0, 1), (1, 3), (0, 2)], 5);

        assert_eq!(g.dependents(0), BTreeSet::from([0, 1, 2, 3]));
        assert_eq!(g.dependents(1), BTreeSet::from([1, 3]));
        assert_eq!(g.dependents(4), BTreeSet::from([4]));
    }

    #[test]
    fn test_levels() {
        let g = graph(&[(0, 1), (0, 2), (1, 3), (2, 3)], 5);
        let levels = g.levels(&[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(levels, vec![vec![0, 4], vec![1, 2], vec![3]]);

        // restricting the member set ignores edges from outside it
        let levels = g.levels(&[1, 3]).unwrap();
        assert_eq!(levels, vec![vec![1], vec![3]]);
    }

    #[test]
    fn test_levels_detect_cycles() {
        let g = graph(&[(0, 1), (1, 0), (1, 2)], 3);
        let err = g.levels(&[0, 1, 2]).unwrap_err();
        assert_eq!(err.cycle, vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_dependencies() {
        let g = graph(&[(0, 2), (1, 2)], 3);
        let reverse = g.build_reverse_dependencies();
        assert_eq!(reverse[&2], vec![0, 1]);
        assert!(reverse[&0].is_empty());
    }
}
