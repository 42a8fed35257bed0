//! Dependency graph and processing order for object types.
//!
//! An object type depends on every type its (non-deferred) references point
//! at: the referenced objects must exist before the referencing objects can
//! be restored. The graph yields types in dependency-first *layers*; all
//! types in one layer are independent of each other and may be processed
//! concurrently.
//!
//! # Example
//!
//! ```
//! use cfgsync_meta::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("cms.site");
//! graph.add_node("cms.role");
//! graph.add_edge("cms.role", "cms.site");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["cms.site", "cms.role"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::ObjectTypeDescriptor;
use crate::error::{Error, Result};

/// Directed graph of type dependencies.
///
/// Edges point from dependent to dependency: if A depends on B, the edge is
/// `A -> B`, and B is ordered before A. Edges to types that are not nodes of
/// the graph are kept but ignored for ordering.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list: key depends on each value.
    edges: BTreeMap<String, BTreeSet<String>>,
}

/// Processing order for a restore, with the cycle-breaking decisions made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePlan {
    /// Dependency-first layers, each sorted by name
    pub layers: Vec<Vec<String>>,
    /// `(dependent, dependency)` edges removed to break cycles. References
    /// from `dependent` to `dependency` must be resolved in a second pass.
    pub broken_edges: BTreeSet<(String, String)>,
}

impl RestorePlan {
    /// All types in processing order.
    pub fn order(&self) -> Vec<String> {
        self.layers.iter().flatten().cloned().collect()
    }

    pub fn is_broken(&self, dependent: &str, dependency: &str) -> bool {
        self.broken_edges
            .contains(&(dependent.to_string(), dependency.to_string()))
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of descriptors.
    pub fn from_descriptors<'a>(
        descriptors: impl IntoIterator<Item = &'a ObjectTypeDescriptor>,
    ) -> Self {
        let mut graph = Self::new();
        for descriptor in descriptors {
            graph.add_node(&descriptor.name);
            for dependency in descriptor.dependencies() {
                graph.add_edge(&descriptor.name, dependency);
            }
        }
        graph
    }

    pub fn add_node(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Dependency-first layers.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyCycle` naming the types that could not be
    /// ordered.
    pub fn layers(&self) -> Result<Vec<Vec<String>>> {
        let (plan, stuck) = self.plan(false);
        if stuck.is_empty() {
            Ok(plan.layers)
        } else {
            Err(Error::DependencyCycle {
                participants: stuck,
            })
        }
    }

    /// Flattened dependency-first order.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        self.layers()
            .map(|layers| layers.into_iter().flatten().collect())
    }

    /// Dependency-first layers that always succeed: cycles are broken by
    /// dropping the in-cycle edges of the lexicographically smallest type on
    /// the cycle, recorded in [`RestorePlan::broken_edges`].
    pub fn restore_plan(&self) -> RestorePlan {
        self.plan(true).0
    }

    /// Returns the plan and the types left unordered (only ever non-empty
    /// when cycles are not broken).
    fn plan(&self, break_cycles: bool) -> (RestorePlan, Vec<String>) {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .edges
            .iter()
            .map(|(id, deps)| {
                let known = deps
                    .iter()
                    .map(String::as_str)
                    .filter(|dep| self.edges.contains_key(*dep))
                    .collect();
                (id.as_str(), known)
            })
            .collect();

        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut plan = RestorePlan::default();

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, deps)| deps.iter().all(|dep| done.contains(dep)))
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                if !break_cycles {
                    let stuck = remaining.keys().map(|id| id.to_string()).collect();
                    return (plan, stuck);
                }
                let cycle = find_cycle(&remaining, &done);
                let Some(&victim) = cycle.iter().min() else {
                    break;
                };
                if let Some(deps) = remaining.get_mut(victim) {
                    for member in &cycle {
                        if deps.remove(member) {
                            tracing::debug!(
                                dependent = victim,
                                dependency = *member,
                                "Deferring references to break dependency cycle"
                            );
                            plan.broken_edges
                                .insert((victim.to_string(), member.to_string()));
                        }
                    }
                }
                continue;
            }

            for id in &ready {
                remaining.remove(id);
                done.insert(*id);
            }
            plan.layers
                .push(ready.into_iter().map(str::to_string).collect());
        }

        let stuck = remaining.keys().map(|id| id.to_string()).collect();
        (plan, stuck)
    }
}

/// Walk unsatisfied dependencies from the smallest blocked node until a node
/// repeats; the repeated stretch is a cycle.
fn find_cycle<'a>(
    remaining: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    done: &BTreeSet<&'a str>,
) -> Vec<&'a str> {
    let mut path: Vec<&str> = Vec::new();
    let mut current = remaining.keys().next().copied();

    while let Some(node) = current {
        if let Some(pos) = path.iter().position(|seen| *seen == node) {
            return path.split_off(pos);
        }
        path.push(node);
        current = remaining
            .get(node)
            .and_then(|deps| deps.iter().find(|dep| !done.contains(*dep)).copied());
    }

    Vec::new()
}
