// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node evaluation and dirty/invalid propagation.
//!
//! Evaluation is eager: a node that recomputes successfully re-evaluates
//! every child right away, so the whole downstream subgraph is current when
//! the triggering call returns. Failures stay local to the node: it turns
//! invalid, records a diagnostic, and downstream output nodes are reset.

use crate::node::NodeId;
use crate::scene::Scene;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Computed value of a node together with its expression text
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Numeric value
    pub value: f64,
    /// Human readable expression that produced the value
    pub text: String,
}

impl Evaluation {
    /// Create an evaluation result
    pub fn new(value: f64, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }
}

/// What an evaluator sees on one input socket
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Nothing is connected
    Disconnected,
    /// The upstream node has no trustworthy value
    Invalid,
    /// The upstream node's current value
    Ready(Evaluation),
}

impl InputValue {
    /// The upstream value, if there is one
    pub fn ready(&self) -> Option<&Evaluation> {
        match self {
            Self::Ready(evaluation) => Some(evaluation),
            Self::Disconnected | Self::Invalid => None,
        }
    }
}

/// Fetch input `index` or explain why it is unusable
pub fn require(inputs: &[InputValue], index: usize) -> Result<&Evaluation, EvaluationError> {
    match inputs.get(index) {
        Some(InputValue::Ready(evaluation)) => Ok(evaluation),
        Some(InputValue::Invalid) => Err(EvaluationError::InvalidInput(index)),
        Some(InputValue::Disconnected) | None => Err(EvaluationError::MissingInput(index)),
    }
}

/// Format a value for display: four decimals at most, no trailing `.0`
pub fn format_value(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Type-specific behavior of a node
pub trait NodeEvaluator: fmt::Debug {
    /// Compute this node's value from its inputs, in socket order
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError>;

    /// Output nodes notify the scene's evaluated listeners after every attempt
    fn is_output(&self) -> bool {
        false
    }

    /// Extra state stored in the node record
    fn content(&self) -> Value {
        Value::Null
    }

    /// Restore extra state from a node record
    fn restore_content(&mut self, _content: &Value) -> Result<(), serde_json::Error> {
        Ok(())
    }

    /// Upcast for downcasting to the concrete evaluator
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete evaluator
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// An input socket has no edge
    #[error("Connect all inputs (input {0} is not connected)")]
    MissingInput(usize),

    /// The node feeding an input failed
    #[error("Input {0} has no valid value")]
    InvalidInput(usize),

    /// The inputs are outside the operation's domain
    #[error("{0}")]
    Domain(String),

    /// Unexpected failure inside an evaluator
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Scene {
    /// The node feeding input socket `index` of `node`, if connected
    pub fn get_input(&self, node: NodeId, index: usize) -> Option<NodeId> {
        let socket = self.nodes.get(&node)?.input(index)?;
        let edge = self.edges.get(socket.edges().first()?)?;
        self.socket_owner(edge.start)
    }

    /// Nodes fed by any output socket of `node`, in connection order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let Some(n) = self.nodes.get(&node) else {
            return children;
        };
        for edge_id in n.outputs().iter().flat_map(|s| s.edges().iter()) {
            if let Some(child) = self
                .edges
                .get(edge_id)
                .and_then(|edge| self.socket_owner(edge.end))
            {
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }
        children
    }

    /// Set the dirty flag. Marking dirty also dirties every descendant.
    pub fn mark_dirty(&mut self, node: NodeId, dirty: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.set_dirty(dirty);
        }
        if dirty {
            self.mark_descendants_dirty(node);
        }
    }

    /// Set the invalid flag
    pub fn mark_invalid(&mut self, node: NodeId, invalid: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.set_invalid(invalid);
        }
    }

    /// Dirty every node reachable through output edges
    pub fn mark_descendants_dirty(&mut self, node: NodeId) {
        let mut stack = self.children(node);
        let mut seen = Vec::new();
        while let Some(current) = stack.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(n) = self.nodes.get_mut(&current) {
                n.set_dirty(true);
            }
            stack.extend(self.children(current));
        }
    }

    /// Evaluate a node, reusing the cache when it is clean and valid.
    ///
    /// Returns `None` when the node is missing or its evaluation failed; the
    /// failure itself is recorded on the node.
    pub fn eval(&mut self, node: NodeId) -> Option<Evaluation> {
        let n = self.nodes.get(&node)?;
        if let Some(cached) = n.cached() {
            return Some(cached);
        }
        let input_count = n.inputs().len();

        let inputs: Vec<InputValue> = (0..input_count)
            .map(|index| match self.get_input(node, index) {
                None => InputValue::Disconnected,
                Some(upstream) => match self.eval(upstream) {
                    Some(evaluation) => InputValue::Ready(evaluation),
                    None => InputValue::Invalid,
                },
            })
            .collect();

        let n = self.nodes.get_mut(&node)?;
        let result = n.evaluator().evaluate(&inputs);

        match result {
            Ok(evaluation) => {
                n.store_evaluation(&evaluation);
                let is_output = n.is_output();
                self.mark_descendants_dirty(node);
                if is_output {
                    self.notify_evaluated(node);
                }
                for child in self.children(node) {
                    self.eval(child);
                }
                Some(evaluation)
            }
            Err(err) => {
                tracing::debug!(node = node.0, "evaluation failed: {err}");
                n.store_failure(err.to_string());
                let is_output = n.is_output();
                self.mark_descendants_dirty(node);
                if is_output {
                    self.notify_evaluated(node);
                }
                self.reset_downstream_outputs(node);
                None
            }
        }
    }

    /// An upstream connection changed: recompute now
    pub fn on_input_changed(&mut self, node: NodeId) {
        self.mark_dirty(node, true);
        self.eval(node);
    }

    /// Evaluate every dirty or invalid node in insertion order
    pub fn evaluate_all(&mut self) {
        let pending: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.is_dirty() || n.is_invalid())
            .map(|n| n.id)
            .collect();
        for node in pending {
            let still_pending = self
                .nodes
                .get(&node)
                .is_some_and(|n| n.is_dirty() || n.is_invalid());
            if still_pending {
                self.eval(node);
            }
        }
    }

    /// Clear every output node below a failed node and notify listeners
    fn reset_downstream_outputs(&mut self, node: NodeId) {
        let mut stack = self.children(node);
        let mut seen = Vec::new();
        while let Some(current) = stack.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);

            let reset = match self.nodes.get_mut(&current) {
                Some(n) if n.is_output() => {
                    n.store_failure(EvaluationError::InvalidInput(0).to_string());
                    true
                }
                _ => false,
            };
            if reset {
                self.notify_evaluated(current);
            }
            stack.extend(self.children(current));
        }
    }
}
