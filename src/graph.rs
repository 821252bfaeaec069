//! Dependency Graph
//!
//! Builds a directed graph over module summaries, breaks cycles by
//! demoting edges to soft references, and derives a deterministic
//! topological layering used to order generation.
//!
//! - Nodes are catalog paths in sorted order; indices are dense
//! - An edge `a -> b` means `a` depends on `b`
//! - Cycle breaking demotes the lexicographically last `(source, target)`
//!   path pair on each detected cycle, repeating until acyclic
//! - A node's layer is zero when it has no dependencies, otherwise one
//!   more than its deepest dependency; ties inside a layer break by path

use std::collections::HashMap;
use tracing::{debug, info};

use crate::analyzer::ModuleSummary;
use crate::error::{DocError, Result};

/// An edge demoted from hard dependency to soft reference during cycle
/// breaking. The dependency is still reported in output, but it no
/// longer constrains ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftEdge {
    pub source: String,
    pub target: String,
}

/// Summary counts for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub hard_edges: usize,
    pub soft_edges: usize,
    pub layers: usize,
}

/// Acyclic dependency graph with a deterministic generation order
#[derive(Debug)]
pub struct DependencyGraph {
    /// Paths in sorted order; index into this vec is the node id
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// Hard dependencies after cycle breaking, sorted per node
    deps: Vec<Vec<usize>>,
    soft_edges: Vec<SoftEdge>,
    layers: Vec<usize>,
    /// Node ids ordered by (layer, path)
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph from analyzed modules.
    ///
    /// Edges targeting paths that are not themselves analyzed modules
    /// (for example files that failed to parse) are dropped.
    pub fn build(modules: &[ModuleSummary]) -> Result<Self> {
        if modules.is_empty() {
            return Err(DocError::Graph(
                "No modules to build a dependency graph from".to_string(),
            ));
        }

        let mut nodes: Vec<String> = modules.iter().map(|m| m.path.clone()).collect();
        nodes.sort();
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for module in modules {
            let source = index[&module.path];
            for dep in &module.internal_deps {
                if let Some(&target) = index.get(dep)
                    && target != source
                    && !deps[source].contains(&target)
                {
                    deps[source].push(target);
                }
            }
        }
        for list in &mut deps {
            list.sort();
        }

        let mut graph = Self {
            nodes,
            index,
            deps,
            soft_edges: Vec::new(),
            layers: Vec::new(),
            order: Vec::new(),
        };
        graph.break_cycles();
        graph.compute_layers()?;

        info!(
            nodes = graph.nodes.len(),
            soft_edges = graph.soft_edges.len(),
            layers = graph.layer_count(),
            "Dependency graph ready"
        );
        Ok(graph)
    }

    /// Demote one edge per detected cycle until the graph is acyclic
    fn break_cycles(&mut self) {
        while let Some(cycle) = self.find_cycle() {
            // Pick the edge whose (source path, target path) pair sorts
            // last, so the choice is independent of traversal order.
            let chosen = cycle
                .iter()
                .zip(cycle.iter().cycle().skip(1))
                .take(cycle.len())
                .max_by_key(|&(&s, &t)| (self.nodes[s].clone(), self.nodes[t].clone()))
                .map(|(&s, &t)| (s, t));

            if let Some((source, target)) = chosen {
                debug!(
                    source = %self.nodes[source],
                    target = %self.nodes[target],
                    "Demoting cycle edge to soft reference"
                );
                self.deps[source].retain(|&t| t != target);
                self.soft_edges.push(SoftEdge {
                    source: self.nodes[source].clone(),
                    target: self.nodes[target].clone(),
                });
            }
        }
        self.soft_edges
            .sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
    }

    /// Find one cycle as a node sequence, or None if acyclic.
    ///
    /// Iterative three-color DFS; nodes are visited in index order so the
    /// same graph always yields the same first cycle.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let mut color = vec![WHITE; self.nodes.len()];
        let mut parent: Vec<Option<usize>> = vec![None; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if color[start] != WHITE {
                continue;
            }
            // Stack holds (node, next dependency position)
            let mut stack = vec![(start, 0usize)];
            color[start] = GRAY;

            while let Some(&mut (node, ref mut pos)) = stack.last_mut() {
                if *pos < self.deps[node].len() {
                    let next = self.deps[node][*pos];
                    *pos += 1;
                    match color[next] {
                        WHITE => {
                            color[next] = GRAY;
                            parent[next] = Some(node);
                            stack.push((next, 0));
                        }
                        GRAY => {
                            // Back edge: walk parents from `node` to `next`
                            let mut cycle = vec![node];
                            let mut cur = node;
                            while cur != next {
                                cur = parent[cur].unwrap_or(next);
                                cycle.push(cur);
                            }
                            cycle.reverse();
                            return Some(cycle);
                        }
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }
        None
    }

    /// Assign layers and the final (layer, path) generation order
    fn compute_layers(&mut self) -> Result<()> {
        let n = self.nodes.len();
        let mut layers = vec![0usize; n];
        let mut remaining: Vec<usize> = self.deps.iter().map(|d| d.len()).collect();

        // Reverse adjacency: who depends on each node
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (source, targets) in self.deps.iter().enumerate() {
            for &target in targets {
                dependents[target].push(source);
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
        let mut settled = 0usize;

        while let Some(node) = queue.pop() {
            settled += 1;
            for &dependent in &dependents[node] {
                layers[dependent] = layers[dependent].max(layers[node] + 1);
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if settled != n {
            // break_cycles guarantees acyclicity; reaching here is a bug
            return Err(DocError::Graph(
                "Cycle remained after cycle breaking".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| (layers[a], &self.nodes[a]).cmp(&(layers[b], &self.nodes[b])));

        self.layers = layers;
        self.order = order;
        Ok(())
    }

    /// Paths in node-id order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Hard dependencies of a node, as paths
    pub fn dependencies(&self, path: &str) -> Vec<&str> {
        self.index
            .get(path)
            .map(|&id| self.deps[id].iter().map(|&t| self.nodes[t].as_str()).collect())
            .unwrap_or_default()
    }

    /// Edges demoted during cycle breaking
    pub fn soft_edges(&self) -> &[SoftEdge] {
        &self.soft_edges
    }

    pub fn layer_of(&self, path: &str) -> Option<usize> {
        self.index.get(path).map(|&id| self.layers[id])
    }

    fn layer_count(&self) -> usize {
        self.layers.iter().max().map(|&m| m + 1).unwrap_or(0)
    }

    /// Paths in generation order: layer ascending, path ascending within
    /// a layer. Every node appears after all of its hard dependencies.
    pub fn generation_order(&self) -> Vec<&str> {
        self.order.iter().map(|&id| self.nodes[id].as_str()).collect()
    }

    /// All hard edges as (source, target) path pairs, sorted
    pub fn hard_edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .deps
            .iter()
            .enumerate()
            .flat_map(|(s, targets)| {
                targets
                    .iter()
                    .map(move |&t| (self.nodes[s].as_str(), self.nodes[t].as_str()))
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            hard_edges: self.deps.iter().map(|d| d.len()).sum(),
            soft_edges: self.soft_edges.len(),
            layers: self.layer_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::Language;

    fn module(path: &str, deps: &[&str]) -> ModuleSummary {
        ModuleSummary {
            path: path.to_string(),
            language: Language::TypeScript,
            symbols: vec![],
            internal_deps: deps.iter().map(|d| d.to_string()).collect(),
            external_deps: vec![],
            exports: vec![],
        }
    }

    #[test]
    fn test_chain_orders_dependencies_first() {
        // a -> b -> c: c must come first
        let graph = DependencyGraph::build(&[
            module("a.ts", &["b.ts"]),
            module("b.ts", &["c.ts"]),
            module("c.ts", &[]),
        ])
        .unwrap();

        assert_eq!(graph.generation_order(), vec!["c.ts", "b.ts", "a.ts"]);
        assert_eq!(graph.layer_of("c.ts"), Some(0));
        assert_eq!(graph.layer_of("a.ts"), Some(2));
    }

    #[test]
    fn test_two_cycle_breaks_one_edge() {
        let graph =
            DependencyGraph::build(&[module("a.ts", &["b.ts"]), module("b.ts", &["a.ts"])])
                .unwrap();

        let stats = graph.stats();
        assert_eq!(stats.soft_edges, 1);
        assert_eq!(stats.hard_edges, 1);
        // (b, a) sorts after (a, b), so b -> a is demoted
        assert_eq!(
            graph.soft_edges(),
            &[SoftEdge {
                source: "b.ts".to_string(),
                target: "a.ts".to_string(),
            }]
        );
        assert_eq!(graph.generation_order(), vec!["b.ts", "a.ts"]);
    }

    #[test]
    fn test_three_cycle_becomes_acyclic() {
        let graph = DependencyGraph::build(&[
            module("a.ts", &["b.ts"]),
            module("b.ts", &["c.ts"]),
            module("c.ts", &["a.ts"]),
        ])
        .unwrap();

        assert_eq!(graph.stats().soft_edges, 1);
        let order = graph.generation_order();
        // Every node must follow its remaining hard dependencies
        for (source, target) in graph.hard_edges() {
            let s = order.iter().position(|&p| p == source).unwrap();
            let t = order.iter().position(|&p| p == target).unwrap();
            assert!(t < s, "{} should precede {}", target, source);
        }
    }

    #[test]
    fn test_ties_break_by_path() {
        let graph = DependencyGraph::build(&[
            module("z.ts", &[]),
            module("a.ts", &[]),
            module("m.ts", &[]),
        ])
        .unwrap();
        assert_eq!(graph.generation_order(), vec!["a.ts", "m.ts", "z.ts"]);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            DependencyGraph::build(&[]),
            Err(DocError::Graph(_))
        ));
    }

    #[test]
    fn test_unknown_dep_targets_dropped() {
        let graph =
            DependencyGraph::build(&[module("a.ts", &["missing.ts"]), module("b.ts", &[])])
                .unwrap();
        assert_eq!(graph.stats().hard_edges, 0);
    }

    #[test]
    fn test_deterministic_across_builds() {
        let modules = vec![
            module("a.ts", &["b.ts", "c.ts"]),
            module("b.ts", &["c.ts", "a.ts"]),
            module("c.ts", &["a.ts"]),
        ];
        let g1 = DependencyGraph::build(&modules).unwrap();
        let g2 = DependencyGraph::build(&modules).unwrap();
        assert_eq!(g1.generation_order(), g2.generation_order());
        assert_eq!(g1.soft_edges(), g2.soft_edges());
    }
}
