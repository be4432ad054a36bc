//! Dependency graph validation
//!
//! Edges point from a dependency to its dependent, so a topological order
//! is a valid execution order. Validation happens before any strategy runs:
//! a crew with a dangling dependency or a cycle never starts.

use crate::error::EngineError;
use evo_core::Task;
use indexmap::IndexMap;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
}

impl DependencyGraph {
    /// Build from registered tasks
    ///
    /// Fails on the first dependency that names an unregistered task.
    pub fn from_tasks(tasks: &IndexMap<String, Task>) -> Result<Self, EngineError> {
        let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
        // node indices follow registration order
        for id in tasks.keys() {
            graph.add_node(id.clone());
        }

        for (index, (id, task)) in tasks.iter().enumerate() {
            for dep in task.dependencies() {
                let dep_index =
                    tasks
                        .get_index_of(dep)
                        .ok_or_else(|| EngineError::UnknownDependency {
                            task: id.clone(),
                            dependency: dep.clone(),
                        })?;
                graph.add_edge(NodeIndex::new(dep_index), NodeIndex::new(index), ());
            }
        }

        Ok(Self { graph })
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Topological order of task ids
    pub fn topological_order(&self) -> Result<Vec<String>, EngineError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|index| self.graph[index].clone())
                .collect()),
            Err(cycle) => Err(EngineError::CycleDetected {
                cycle: self.trace_cycle(cycle.node_id()),
            }),
        }
    }

    /// A closed path through `start`, first and last entries equal
    fn trace_cycle(&self, start: NodeIndex) -> Vec<String> {
        let members: HashSet<NodeIndex> = kosaraju_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .unwrap_or_default()
            .into_iter()
            .collect();

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors(node) {
                if !members.contains(&next) {
                    continue;
                }
                if next == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while current != start {
                        match parent.get(&current) {
                            Some(&prev) => {
                                path.push(prev);
                                current = prev;
                            }
                            None => break,
                        }
                    }
                    path.reverse();
                    path.push(start);
                    return path
                        .into_iter()
                        .map(|index| self.graph[index].clone())
                        .collect();
                }
                if !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        vec![self.graph[start].clone()]
    }
}
