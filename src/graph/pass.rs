// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Rewrite rules and the pass that applies them.

use super::{Graph, NodeId};

/// Veto predicate consulted before a rule rewrites a node.
///
/// Returning `true` leaves the node untouched.
pub type TransformationCallback = Box<dyn Fn(&Graph, NodeId) -> bool + Send + Sync>;

/// A single match-and-replace rule.
///
/// Rules never fail: a node the rule cannot handle is simply not matched.
pub trait MatcherRule {
    /// Rule name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Try to rewrite `node`. Returns `true` if the graph changed.
    ///
    /// A rule only touches `node` and the nodes it creates.
    fn apply(&self, graph: &mut Graph, node: NodeId) -> bool;
}

/// Runs a list of rules once over every node of a graph.
#[derive(Default)]
pub struct GraphRewrite {
    rules: Vec<Box<dyn MatcherRule>>,
}

impl GraphRewrite {
    /// Create a pass with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Rules are tried in insertion order.
    #[must_use]
    pub fn with_rule(mut self, rule: impl MatcherRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Visit every node live at the start of the pass in topological order.
    ///
    /// Nodes created by a rewrite are not revisited in the same run. The first
    /// rule that matches a node wins. Returns `true` if any rule matched.
    pub fn run(&self, graph: &mut Graph) -> bool {
        let mut changed = false;
        for id in graph.live_nodes() {
            for rule in &self.rules {
                let Some(node) = graph.get(id) else {
                    break;
                };
                let name = node.name.clone();
                if rule.apply(graph, id) {
                    tracing::debug!(
                        target: "rust_ai::graph",
                        rule = rule.name(),
                        node = %name,
                        "rewrote node"
                    );
                    changed = true;
                    break;
                }
            }
        }
        changed
    }
}

impl std::fmt::Debug for GraphRewrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRewrite")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}
