// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Rank normalization for fully-connected nodes.
//!
//! Backends lower `FullyConnected` only for rank-2 data. A node whose data
//! input has any other rank is rebuilt as
//!
//! ```text
//! data -> Reshape[-1, K] -> FullyConnected[I, O] -> Reshape[original]
//! ```
//!
//! where the trailing reshape is omitted when `[I, O]` already equals the
//! original output shape. The node visible to consumers keeps the original
//! name.

use super::pass::{MatcherRule, TransformationCallback};
use super::{infer_reshape, Graph, Node, NodeId, Op};

/// Rewrites fully-connected nodes so their data input is rank 2.
#[derive(Default)]
pub struct ReshapeFullyConnected {
    callback: Option<TransformationCallback>,
}

impl ReshapeFullyConnected {
    /// Rule without a veto.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule that skips every node for which `callback` returns `true`.
    #[must_use]
    pub fn with_callback(
        callback: impl Fn(&Graph, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    fn vetoed(&self, graph: &Graph, node: NodeId) -> bool {
        self.callback.as_ref().is_some_and(|veto| veto(graph, node))
    }
}

impl std::fmt::Debug for ReshapeFullyConnected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReshapeFullyConnected")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl MatcherRule for ReshapeFullyConnected {
    fn name(&self) -> &'static str {
        "ReshapeFullyConnected"
    }

    fn apply(&self, graph: &mut Graph, fc: NodeId) -> bool {
        let Some(node) = graph.get(fc) else {
            return false;
        };
        let &[data, weights, bias] = node.inputs.as_slice() else {
            return false;
        };
        if node.op != Op::FullyConnected || self.vetoed(graph, fc) {
            return false;
        }

        let name = node.name.clone();
        let output_shape = node.shape.clone();
        let data_shape = graph.node(data).shape.clone();
        if data_shape.len() == 2 {
            return false;
        }
        let Some(&k) = data_shape.last() else {
            return false;
        };
        let Some(&o) = graph.node(weights).shape.first() else {
            return false;
        };
        let Ok(k_dim) = i64::try_from(k) else {
            return false;
        };

        // Every shape is settled here; nothing below can decline.
        let input_pattern = vec![-1, k_dim];
        let Some(flat_shape) = infer_reshape(&data_shape, &input_pattern, true) else {
            return false;
        };
        let fc_shape = vec![flat_shape[0], o];
        if fc_shape.iter().product::<usize>() != output_shape.iter().product::<usize>() {
            return false;
        }
        let trailing_pattern = if fc_shape == output_shape {
            None
        } else {
            let Some(pattern) = output_shape
                .iter()
                .map(|&d| i64::try_from(d).ok())
                .collect::<Option<Vec<_>>>()
            else {
                return false;
            };
            Some(pattern)
        };

        let input_name = format!("{name}/Reshape");
        let reshape = add_reshape(graph, data, &input_pattern, true, flat_shape, input_name);
        let new_fc = graph.fully_connected(reshape, weights, bias, &fc_shape);

        let replacement = match trailing_pattern {
            None => new_fc,
            Some(pattern) => {
                graph.set_name(new_fc, format!("{name}/FC"));
                add_reshape(graph, new_fc, &pattern, false, output_shape, name.clone())
            }
        };
        graph.set_name(replacement, name);
        graph.replace_node(fc, replacement);
        true
    }
}

/// Append a reshape of `input` whose output shape is already known.
fn add_reshape(
    graph: &mut Graph,
    input: NodeId,
    pattern: &[i64],
    special_zero: bool,
    shape: Vec<usize>,
    name: String,
) -> NodeId {
    let pattern = graph.constant_i64(pattern);
    let element_type = graph.node(input).element_type;
    graph.add_node(Node {
        name,
        op: Op::Reshape { special_zero },
        inputs: vec![input, pattern],
        shape,
        element_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ElementType;
    use crate::graph::pass::GraphRewrite;

    struct Model {
        graph: Graph,
        fc: NodeId,
        out: NodeId,
    }

    fn model(data: &[usize], weights: &[usize], output: &[usize]) -> Model {
        let mut graph = Graph::new();
        let x = graph.parameter("x", data, ElementType::F32);
        let w = graph.parameter("w", weights, ElementType::F32);
        let b = graph.parameter("b", &weights[..1], ElementType::F32);
        let fc = graph.fully_connected(x, w, b, output);
        graph.set_name(fc, "dense");
        let out = graph.result("out", fc);
        Model { graph, fc, out }
    }

    #[test]
    fn test_rank2_input_is_left_alone() {
        let Model { mut graph, fc, .. } = model(&[6, 4], &[5, 4], &[6, 5]);
        let before = graph.clone();

        assert!(!ReshapeFullyConnected::new().apply(&mut graph, fc));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_rank3_input_gets_both_reshapes() {
        let Model { mut graph, fc, out } = model(&[2, 3, 4], &[5, 4], &[2, 3, 5]);

        assert!(ReshapeFullyConnected::new().apply(&mut graph, fc));
        assert!(graph.get(fc).is_none());

        let trailing = graph.node(out).inputs[0];
        let trailing_node = graph.node(trailing);
        assert_eq!(trailing_node.name, "dense");
        assert!(matches!(trailing_node.op, Op::Reshape { .. }));
        assert_eq!(trailing_node.shape, vec![2, 3, 5]);
        assert_eq!(graph.node(out).shape, vec![2, 3, 5]);

        let new_fc = trailing_node.inputs[0];
        assert_eq!(graph.node(new_fc).op, Op::FullyConnected);
        assert_eq!(graph.node(new_fc).name, "dense/FC");
        assert_eq!(graph.node(new_fc).shape, vec![6, 5]);

        let reshape = graph.node(new_fc).inputs[0];
        assert_eq!(graph.node(reshape).name, "dense/Reshape");
        assert_eq!(graph.node(reshape).shape, vec![6, 4]);
        assert_eq!(graph.node(reshape).inputs[0], graph.find_by_name("x").unwrap());

        assert_eq!(graph.node(reshape).op, Op::Reshape { special_zero: true });

        let pattern = graph.node(reshape).inputs[1];
        assert_eq!(graph.node(pattern).op, Op::Constant { values: vec![-1, 4] });
        let pattern = graph.node(trailing).inputs[1];
        assert_eq!(graph.node(pattern).op, Op::Constant { values: vec![2, 3, 5] });
        assert_eq!(graph.node(trailing).op, Op::Reshape { special_zero: false });
    }

    #[test]
    fn test_empty_last_axis_copies_input_dimension() {
        let Model { mut graph, fc, .. } = model(&[2, 3, 0], &[5, 0], &[2, 3, 5]);
        let before = graph.clone();

        // [-1, 0] with zero-copy reshapes [2, 3, 0] to [0, 3]; FC [0, 5] cannot
        // be reshaped back to the 30-element output, so nothing changes.
        assert!(!ReshapeFullyConnected::new().apply(&mut graph, fc));
        assert_eq!(graph, before);

        let Model { mut graph, fc, .. } = model(&[2, 3, 0], &[5, 0], &[0, 5]);
        assert!(ReshapeFullyConnected::new().apply(&mut graph, fc));
        let dense = graph.find_by_name("dense").unwrap();
        let reshape = graph.node(dense).inputs[0];
        assert_eq!(graph.node(reshape).shape, vec![0, 3]);
        assert_eq!(graph.node(dense).shape, vec![0, 5]);
    }

    #[test]
    fn test_matching_output_shape_skips_trailing_reshape() {
        let Model { mut graph, fc, out } = model(&[1, 2, 4], &[5, 4], &[2, 5]);

        assert!(ReshapeFullyConnected::new().apply(&mut graph, fc));

        let new_fc = graph.node(out).inputs[0];
        assert_eq!(graph.node(new_fc).op, Op::FullyConnected);
        assert_eq!(graph.node(new_fc).name, "dense");
        assert_eq!(graph.node(new_fc).shape, vec![2, 5]);
        assert_eq!(graph.node(graph.node(new_fc).inputs[0]).shape, vec![2, 4]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_unrepresentable_output_pattern_leaves_graph_untouched() {
        let huge = 1usize << 63;
        let Model { mut graph, fc, .. } = model(&[huge, 1, 1], &[1, 1], &[1, huge]);
        let before = graph.clone();

        assert!(!ReshapeFullyConnected::new().apply(&mut graph, fc));
        assert_eq!(graph, before);
        assert_eq!(graph.capacity(), before.capacity());
    }

    #[test]
    fn test_veto_keeps_graph_unchanged() {
        for data in [&[2, 3, 4][..], &[6, 4][..], &[1, 1, 2, 4][..]] {
            let batch: usize = data[..data.len() - 1].iter().product();
            let mut output = data[..data.len() - 1].to_vec();
            output.push(5);
            let Model { mut graph, fc, .. } = model(data, &[5, 4], &output);
            let before = graph.clone();

            let rule = ReshapeFullyConnected::with_callback(|_, _| true);
            assert!(!rule.apply(&mut graph, fc), "batch {batch}");
            assert_eq!(graph, before);
        }
    }

    #[test]
    fn test_veto_sees_candidate_node() {
        let Model { mut graph, fc, .. } = model(&[2, 3, 4], &[5, 4], &[2, 3, 5]);
        let rule = ReshapeFullyConnected::with_callback(|g, id| g.node(id).name == "dense");
        assert!(!rule.apply(&mut graph, fc));

        let rule = ReshapeFullyConnected::with_callback(|g, id| g.node(id).name == "other");
        assert!(rule.apply(&mut graph, fc));
    }

    #[test]
    fn test_non_fc_and_inconsistent_nodes_decline() {
        let Model { mut graph, out, .. } = model(&[2, 3, 4], &[5, 4], &[2, 3, 5]);
        assert!(!ReshapeFullyConnected::new().apply(&mut graph, out));

        let Model { mut graph, fc, .. } = model(&[2, 3, 4], &[5, 4], &[7, 7]);
        let before = graph.clone();
        assert!(!ReshapeFullyConnected::new().apply(&mut graph, fc));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_pass_rewrites_every_candidate() {
        let mut graph = Graph::new();
        let x = graph.parameter("x", &[2, 3, 4], ElementType::F32);
        let w1 = graph.parameter("w1", &[4, 4], ElementType::F32);
        let b1 = graph.parameter("b1", &[4], ElementType::F32);
        let fc1 = graph.fully_connected(x, w1, b1, &[2, 3, 4]);
        graph.set_name(fc1, "fc1");
        let w2 = graph.parameter("w2", &[8, 4], ElementType::F32);
        let b2 = graph.parameter("b2", &[8], ElementType::F32);
        let fc2 = graph.fully_connected(fc1, w2, b2, &[2, 3, 8]);
        graph.set_name(fc2, "fc2");
        let out = graph.result("out", fc2);

        let pass = GraphRewrite::new().with_rule(ReshapeFullyConnected::new());
        assert!(pass.run(&mut graph));

        let fc2_out = graph.node(out).inputs[0];
        assert_eq!(graph.node(fc2_out).name, "fc2");
        assert_eq!(graph.node(fc2_out).shape, vec![2, 3, 8]);
        let fc1_out = graph.find_by_name("fc1").unwrap();
        assert_eq!(graph.node(fc1_out).shape, vec![2, 3, 4]);
        assert!(matches!(graph.node(fc1_out).op, Op::Reshape { .. }));

        let lowered = graph
            .iter()
            .filter(|(_, n)| n.op == Op::FullyConnected)
            .map(|(_, n)| graph.node(n.inputs[0]).shape.len())
            .collect::<Vec<_>>();
        assert_eq!(lowered, vec![2, 2]);

        // Second run finds only rank-2 inputs.
        assert!(!pass.run(&mut graph));
    }
}
