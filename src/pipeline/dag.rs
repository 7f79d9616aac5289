// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! DAG (Directed Acyclic Graph) builder for pipeline tasks
//!
//! Edges come from two sources: explicit `depends_on` declarations and
//! inferred producer/consumer relations, where a task depends on another
//! task whose planned output matches one of its input globs.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;

use crate::errors::AssetflowError;
use crate::pipeline::{Pipeline, ProjectConfig, Task};
use crate::utils::globs::PatternSet;

/// Why an edge exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared with `depends_on`
    Declared,
    /// Upstream output matches downstream input
    Inferred,
}

/// Builder for task dependency DAGs
pub struct DagBuilder {
    /// Node weight is the position of the task in the pipeline listing
    graph: DiGraph<usize, EdgeKind>,
    names: Vec<String>,
    name_to_index: HashMap<String, NodeIndex>,
}

impl DagBuilder {
    /// Build the DAG of a pipeline.
    ///
    /// `root` is the project root, used to resolve planned template outputs.
    pub fn build(
        config: &ProjectConfig,
        pipeline: &Pipeline,
        root: &Path,
    ) -> Result<Self, AssetflowError> {
        let mut graph = DiGraph::new();
        let mut names = Vec::with_capacity(pipeline.tasks.len());
        let mut name_to_index = HashMap::new();
        let mut tasks: Vec<&Task> = Vec::with_capacity(pipeline.tasks.len());

        for (position, name) in pipeline.tasks.iter().enumerate() {
            if name_to_index.contains_key(name) {
                return Err(AssetflowError::InvalidConfig {
                    reason: format!(
                        "pipeline '{}' lists task '{}' more than once",
                        pipeline.name, name
                    ),
                    help: Some("List each task once; order comes from dependencies".into()),
                });
            }
            let task = config
                .get_task(name)
                .ok_or_else(|| AssetflowError::UnknownTask { task: name.clone() })?;
            let node = graph.add_node(position);
            name_to_index.insert(name.clone(), node);
            names.push(name.clone());
            tasks.push(task);
        }

        // Declared dependencies; those outside the pipeline are satisfied elsewhere
        for task in &tasks {
            let node = name_to_index[&task.name];
            for dep in &task.depends_on {
                if config.get_task(dep).is_none() {
                    return Err(AssetflowError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                if let Some(&dep_node) = name_to_index.get(dep) {
                    graph.update_edge(dep_node, node, EdgeKind::Declared);
                }
            }
        }

        // Inferred producer → consumer edges
        let matchers = tasks
            .iter()
            .map(|t| PatternSet::from_mixed(&t.input))
            .collect::<Result<Vec<_>, _>>()?;

        for (producer_idx, producer) in tasks.iter().enumerate() {
            let outputs = producer.planned_outputs(root);
            if outputs.is_empty() {
                continue;
            }
            let producer_node = name_to_index[&producer.name];

            for (consumer_idx, consumer) in tasks.iter().enumerate() {
                if producer_idx == consumer_idx {
                    continue;
                }
                let consumer_node = name_to_index[&consumer.name];
                if graph.contains_edge(producer_node, consumer_node) {
                    continue;
                }
                let consumes = outputs.iter().any(|out| {
                    let rel = out.to_string_lossy().replace('\\', "/");
                    matchers[consumer_idx].matches(&rel)
                });
                if consumes {
                    graph.add_edge(producer_node, consumer_node, EdgeKind::Inferred);
                }
            }
        }

        let builder = Self {
            graph,
            names,
            name_to_index,
        };
        builder.validate_acyclic()?;

        Ok(builder)
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), AssetflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(AssetflowError::CircularDependency {
                tasks: self.find_cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Find tasks on a cycle through `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut members: Vec<String> = self
            .graph
            .node_indices()
            .filter(|&n| {
                n == start
                    || (petgraph::algo::has_path_connecting(&self.graph, start, n, None)
                        && petgraph::algo::has_path_connecting(&self.graph, n, start, None))
            })
            .map(|n| self.names[self.graph[n]].clone())
            .collect();
        members.push(self.names[self.graph[start]].clone());
        members
    }

    /// Task names in execution order.
    ///
    /// Among tasks whose dependencies are satisfied, the one listed first in
    /// the pipeline runs first, so the order is stable across runs.
    pub fn execution_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| Reverse((self.graph[n], n)))
            .collect();

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(Reverse((position, node))) = ready.pop() {
            order.push(self.names[position].clone());
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse((self.graph[next], next)));
                    }
                }
            }
        }

        order
    }

    /// Get dependencies for a task (tasks that must run before it)
    pub fn dependencies(&self, task: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(task)?;
        let mut deps: Vec<(usize, String)> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|n| (self.graph[n], self.names[self.graph[n]].clone()))
            .collect();
        deps.sort();
        Some(deps.into_iter().map(|(_, name)| name).collect())
    }

    /// Check if task A depends (directly or transitively) on task B
    pub fn depends_on(&self, task_a: &str, task_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(task_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(task_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn sorted_edges(&self) -> Vec<(&str, &str, EdgeKind)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((self.graph[from], self.graph[to], self.graph[e]))
            })
            .collect();
        edges.sort_by_key(|(from, to, _)| (*to, *from));
        edges
            .into_iter()
            .map(|(from, to, kind)| (self.names[from].as_str(), self.names[to].as_str(), kind))
            .collect()
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in &self.names {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to, kind) in self.sorted_edges() {
            let arrow = match kind {
                EdgeKind::Declared => "-->",
                EdgeKind::Inferred => "-.->",
            };
            out.push_str(&format!("    {} {} {}\n", from, arrow, to));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to, kind) in self.sorted_edges() {
            let style = match kind {
                EdgeKind::Declared => "",
                EdgeKind::Inferred => " [style=dashed]",
            };
            out.push_str(&format!("    \"{}\" -> \"{}\"{};\n", from, to, style));
        }

        for name in &self.names {
            let node = self.name_to_index[name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, config: &ProjectConfig) -> String {
        let mut out = String::new();

        for (i, name) in self.execution_order().iter().enumerate() {
            let adapter = config
                .get_task(name)
                .map(|t| t.adapter_name())
                .unwrap_or("?");
            let deps = self.dependencies(name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, name, adapter));
            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }
            out.push('\n');
        }

        out
    }
}
