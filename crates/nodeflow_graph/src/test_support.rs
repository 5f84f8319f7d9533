// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for unit tests.

use crate::evaluation::{Evaluation, EvaluationError, InputValue, NodeEvaluator};
use crate::node::{NodeCategory, NodeId, NodeKind, NodeRegistry, NodeTemplate};
use crate::scene::Scene;
use crate::socket::SocketType;
use std::any::Any;
use std::sync::Arc;

/// Op code of the pass-through test node
pub const PASS_OP: u32 = 100;

/// Forwards input 0, or yields zero when nothing is connected
#[derive(Debug, Default)]
pub struct Pass;

impl NodeEvaluator for Pass {
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        match inputs.first() {
            Some(InputValue::Ready(evaluation)) => Ok(evaluation.clone()),
            Some(InputValue::Invalid) => Err(EvaluationError::InvalidInput(0)),
            Some(InputValue::Disconnected) | None => Ok(Evaluation::new(0.0, "0")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn pass_template() -> NodeTemplate {
    NodeTemplate::new("Pass", PASS_OP, &[SocketType(1)], &[SocketType(1)])
}

pub fn pass_evaluator() -> Box<dyn NodeEvaluator> {
    Box::new(Pass)
}

pub fn pass_registry() -> Arc<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    registry.register(NodeKind {
        name: "Pass".to_string(),
        category: NodeCategory::Custom,
        description: "Forwards its input".to_string(),
        template: pass_template(),
        build: pass_evaluator,
    });
    Arc::new(registry)
}

/// Scene with `n` unconnected pass nodes laid out left to right, 400 apart
pub fn scene_with_pass_nodes(n: usize) -> (Scene, Vec<NodeId>) {
    let mut scene = Scene::new(pass_registry());
    let template = pass_template();
    let ids = (0..n)
        .map(|i| {
            let id = scene.add_node(&template, pass_evaluator());
            if let Some(node) = scene.node_mut(id) {
                node.position = egui::pos2(i as f32 * 400.0, 0.0);
            }
            id
        })
        .collect();
    (scene, ids)
}
