// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Arena-backed dataflow graph used by compile-time rewrites.
//!
//! Nodes live in a `Vec` and are referenced by stable [`NodeId`] indices. Each
//! node produces exactly one value whose static shape is stored on the node.
//! Replacing a node redirects every edge that referenced it to the
//! replacement and leaves a tombstone behind, so ids held elsewhere never
//! dangle.
//!
//! ## Modules
//!
//! - [`pass`] - Rewrite rule trait and the pass that drives it
//! - [`reshape_fc`] - Rank normalization of fully-connected inputs

pub mod pass;
pub mod reshape_fc;

use crate::dtype::ElementType;

/// Index of a node in its [`Graph`].
pub type NodeId = usize;

/// Operation a node performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Graph input.
    Parameter,
    /// Constant 64-bit integer data.
    Constant {
        /// Row-major values.
        values: Vec<i64>,
    },
    /// Reinterpret the data input with the shape given by the pattern input.
    Reshape {
        /// A `0` in the pattern copies the matching input dimension.
        special_zero: bool,
    },
    /// Dense layer over inputs `(data, weights, bias)`: `[I, K] x [O, K] -> [I, O]`.
    FullyConnected,
    /// Graph output.
    Result,
}

impl Op {
    /// Operation name used for generated node names.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parameter => "Parameter",
            Self::Constant { .. } => "Constant",
            Self::Reshape { .. } => "Reshape",
            Self::FullyConnected => "FullyConnected",
            Self::Result => "Result",
        }
    }
}

/// One operation and its single output value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Human-readable name, preserved across rewrites.
    pub name: String,
    /// Operation.
    pub op: Op,
    /// Producers of this node's inputs, in operand order.
    pub inputs: Vec<NodeId>,
    /// Static output shape.
    pub shape: Vec<usize>,
    /// Output element type.
    pub element_type: ElementType,
}

/// Dataflow graph with stable node indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    /// Live node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never allocated or has been replaced.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id} is not live"),
        }
    }

    /// Live node at `id`, if any.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Mutable live node at `id`, if any.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Number of id slots ever allocated, tombstones included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// `true` if no node is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First live node named `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|n| n.name == name))
    }

    /// Live nodes that consume `id`.
    #[must_use]
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.inputs.contains(&id))
            .map(|(consumer, _)| consumer)
            .collect()
    }

    /// Live `Result` nodes.
    #[must_use]
    pub fn results(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.op == Op::Result)
            .map(|(id, _)| id)
            .collect()
    }

    /// Live nodes with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|node| (id, node)))
    }

    /// Live nodes ordered so every producer precedes its consumers.
    #[must_use]
    pub fn live_nodes(&self) -> Vec<NodeId> {
        fn visit(graph: &Graph, id: NodeId, seen: &mut [bool], order: &mut Vec<NodeId>) {
            if seen[id] {
                return;
            }
            seen[id] = true;
            if let Some(node) = graph.get(id) {
                for &input in &node.inputs {
                    visit(graph, input, seen, order);
                }
                order.push(id);
            }
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for (id, _) in self.iter() {
            visit(self, id, &mut seen, &mut order);
        }
        order
    }

    fn unique_name(&self, op: &Op) -> String {
        format!("{}_{}", op.kind(), self.nodes.len())
    }

    /// Add a graph input.
    pub fn parameter(&mut self, name: &str, shape: &[usize], element_type: ElementType) -> NodeId {
        self.add_node(Node {
            name: name.to_string(),
            op: Op::Parameter,
            inputs: Vec::new(),
            shape: shape.to_vec(),
            element_type,
        })
    }

    /// Add a one-dimensional i64 constant with a generated name.
    pub fn constant_i64(&mut self, values: &[i64]) -> NodeId {
        let op = Op::Constant {
            values: values.to_vec(),
        };
        let name = self.unique_name(&op);
        self.add_node(Node {
            name,
            op,
            inputs: Vec::new(),
            shape: vec![values.len()],
            element_type: ElementType::I64,
        })
    }

    /// Add a reshape of `input` to the shape held by the constant `pattern`.
    ///
    /// Returns `None` if `pattern` is not a constant or does not describe a
    /// shape compatible with the input.
    pub fn reshape(
        &mut self,
        input: NodeId,
        pattern: NodeId,
        special_zero: bool,
    ) -> Option<NodeId> {
        let source = self.get(input)?;
        let Op::Constant { values } = &self.get(pattern)?.op else {
            return None;
        };
        let shape = infer_reshape(&source.shape, values, special_zero)?;
        let element_type = source.element_type;

        let op = Op::Reshape { special_zero };
        let name = self.unique_name(&op);
        Some(self.add_node(Node {
            name,
            op,
            inputs: vec![input, pattern],
            shape,
            element_type,
        }))
    }

    /// Add a reshape of `input` to the static `shape`.
    ///
    /// Returns `None` if the element counts differ.
    pub fn reshape_to(&mut self, input: NodeId, shape: &[usize]) -> Option<NodeId> {
        let pattern: Vec<i64> = shape
            .iter()
            .map(|&d| i64::try_from(d).ok())
            .collect::<Option<_>>()?;
        let pattern = self.constant_i64(&pattern);
        self.reshape(input, pattern, false)
    }

    /// Add a fully-connected node with a declared output shape.
    pub fn fully_connected(
        &mut self,
        data: NodeId,
        weights: NodeId,
        bias: NodeId,
        output_shape: &[usize],
    ) -> NodeId {
        let op = Op::FullyConnected;
        let name = self.unique_name(&op);
        let element_type = self.node(data).element_type;
        self.add_node(Node {
            name,
            op,
            inputs: vec![data, weights, bias],
            shape: output_shape.to_vec(),
            element_type,
        })
    }

    /// Mark `input` as a graph output.
    pub fn result(&mut self, name: &str, input: NodeId) -> NodeId {
        let source = self.node(input);
        let shape = source.shape.clone();
        let element_type = source.element_type;
        self.add_node(Node {
            name: name.to_string(),
            op: Op::Result,
            inputs: vec![input],
            shape,
            element_type,
        })
    }

    /// Set a node's name.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.name = name.into();
        }
    }

    /// Redirect every consumer of `old` to `new` and drop `old`.
    ///
    /// `new` must not depend on `old`.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) {
        for slot in self.nodes.iter_mut().flatten() {
            for input in &mut slot.inputs {
                if *input == old {
                    *input = new;
                }
            }
        }
        if let Some(slot) = self.nodes.get_mut(old) {
            *slot = None;
        }
    }
}

/// Output shape of a reshape of `input` by `pattern`.
///
/// A `-1` entry (at most one) takes whatever size keeps the element count;
/// with `special_zero`, a `0` entry copies the input dimension at the same
/// position. Returns `None` for inconsistent patterns.
#[must_use]
pub fn infer_reshape(input: &[usize], pattern: &[i64], special_zero: bool) -> Option<Vec<usize>> {
    let total: usize = input.iter().product();
    let mut inferred = None;
    let mut shape = Vec::with_capacity(pattern.len());

    for (axis, &dim) in pattern.iter().enumerate() {
        let size = match dim {
            -1 => {
                if inferred.replace(axis).is_some() {
                    return None;
                }
                1
            }
            0 if special_zero => *input.get(axis)?,
            d => usize::try_from(d).ok()?,
        };
        shape.push(size);
    }

    let known: usize = shape.iter().product();
    match inferred {
        Some(axis) => {
            if known == 0 {
                if total != 0 {
                    return None;
                }
                shape[axis] = 0;
            } else {
                if total % known != 0 {
                    return None;
                }
                shape[axis] = total / known;
            }
        }
        None if known != total => return None,
        None => {}
    }
    Some(shape)
}
