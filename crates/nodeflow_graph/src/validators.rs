// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge validators.
//!
//! A [`ValidatorChain`] is consulted before any edge is created, rerouted or
//! loaded. Rules run in registration order and the first rejection wins.
//! Extra rules are appended with [`ValidatorChain::push`].

use crate::edge::EdgeError;
use crate::node::NodeId;
use crate::scene::Scene;
use crate::socket::Socket;
use std::fmt;
use std::sync::Arc;

/// A single validation rule over a prospective pair of sockets
pub type ValidatorFn = dyn Fn(&Scene, &Socket, &Socket) -> Result<(), EdgeError>;

/// Ordered list of edge validation rules
#[derive(Clone)]
pub struct ValidatorChain {
    validators: Vec<(String, Arc<ValidatorFn>)>,
}

impl ValidatorChain {
    /// A chain without any rules
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// The four built-in rules: direction, same node, type and loop
    pub fn standard() -> Self {
        let mut chain = Self::empty();
        chain.push("same_direction", cannot_connect_same_direction);
        chain.push("same_node", cannot_connect_same_node);
        chain.push("different_type", cannot_connect_different_types);
        chain.push("loop", cannot_create_loop);
        chain
    }

    /// Append a rule at the end of the chain
    pub fn push(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&Scene, &Socket, &Socket) -> Result<(), EdgeError> + 'static,
    ) {
        self.validators.push((name.into(), Arc::new(validator)));
    }

    /// Rule names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|(name, _)| name.as_str())
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the chain has no rules
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every rule in order, stopping at the first rejection
    pub fn validate(&self, scene: &Scene, a: &Socket, b: &Socket) -> Result<(), EdgeError> {
        for (name, validator) in &self.validators {
            if let Err(err) = validator(scene, a, b) {
                tracing::debug!(validator = %name, "edge rejected: {err}");
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for ValidatorChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Reject two inputs or two outputs
pub fn cannot_connect_same_direction(_: &Scene, a: &Socket, b: &Socket) -> Result<(), EdgeError> {
    if a.direction == b.direction {
        return Err(EdgeError::SameDirection);
    }
    Ok(())
}

/// Reject sockets of one node
pub fn cannot_connect_same_node(_: &Scene, a: &Socket, b: &Socket) -> Result<(), EdgeError> {
    if a.node == b.node {
        return Err(EdgeError::SameNode);
    }
    Ok(())
}

/// Reject sockets with different type tags
pub fn cannot_connect_different_types(_: &Scene, a: &Socket, b: &Socket) -> Result<(), EdgeError> {
    if a.socket_type != b.socket_type {
        return Err(EdgeError::TypeMismatch(a.socket_type.0, b.socket_type.0));
    }
    Ok(())
}

/// Reject an edge whose downstream node already reaches its upstream node
pub fn cannot_create_loop(scene: &Scene, a: &Socket, b: &Socket) -> Result<(), EdgeError> {
    let (input, output) = match (a.is_input(), b.is_input()) {
        (true, false) => (a, b),
        (false, true) => (b, a),
        // Caught by the direction rule
        _ => return Ok(()),
    };

    if has_path(scene, input.node, output.node) {
        return Err(EdgeError::Cycle);
    }
    Ok(())
}

/// Depth-first search along output edges from `from` looking for `to`
pub fn has_path(scene: &Scene, from: NodeId, to: NodeId) -> bool {
    let mut stack = vec![from];
    let mut visited = Vec::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if visited.contains(&current) {
            continue;
        }
        visited.push(current);
        stack.extend(scene.children(current));
    }
    false
}
