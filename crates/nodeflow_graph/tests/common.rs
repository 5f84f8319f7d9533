// SPDX-License-Identifier: MIT OR Apache-2.0
//! Common test utilities for building calculator scenes.
use egui::Pos2;
use nodeflow_graph::graphs::calculator::{
    calculator_geometry, create_calculator_registry, set_input_value, OP_NODE_INPUT, SOCKET_NUMBER,
};
use nodeflow_graph::evaluation::require;
use nodeflow_graph::node::NodeCategory;
use nodeflow_graph::{
    EdgeId, EdgeType, Evaluation, EvaluationError, InputValue, NodeEvaluator, NodeId, NodeKind,
    NodeRegistry, NodeTemplate, Scene, SocketPosition,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Op code of the doubling node registered by [`test_registry`]
#[allow(dead_code)]
pub const OP_DOUBLE: u32 = 50;

/// Multiplies its single input by two
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct Doubler;

impl NodeEvaluator for Doubler {
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        let input = require(inputs, 0)?;
        Ok(Evaluation::new(input.value * 2.0, format!("2 * {}", input.text)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Doubler that counts how often it runs
#[allow(dead_code)]
#[derive(Debug)]
pub struct Counting {
    /// Number of `evaluate` calls so far
    pub calls: Rc<Cell<usize>>,
}

impl NodeEvaluator for Counting {
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        self.calls.set(self.calls.get() + 1);
        Doubler.evaluate(inputs)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One-in, one-out node laid out like the calculator nodes
#[allow(dead_code)]
pub fn double_template() -> NodeTemplate {
    NodeTemplate::new("Double", OP_DOUBLE, &[SOCKET_NUMBER], &[SOCKET_NUMBER])
        .with_positions(SocketPosition::LeftCenter, SocketPosition::RightCenter)
        .with_geometry(calculator_geometry())
}

/// Calculator registry plus the doubling node
#[allow(dead_code)]
pub fn test_registry() -> Arc<NodeRegistry> {
    let mut registry = create_calculator_registry();
    registry.register(NodeKind {
        name: "Double".to_string(),
        category: NodeCategory::Math,
        description: "Twice the input".to_string(),
        template: double_template(),
        build: || Box::new(Doubler),
    });
    Arc::new(registry)
}

/// Empty scene using [`test_registry`]
#[allow(dead_code)]
pub fn calc_scene() -> Scene {
    Scene::new(test_registry())
}

/// Spawn a registered node at a position
#[allow(dead_code)]
pub fn spawn_at(scene: &mut Scene, op_code: u32, x: f32, y: f32) -> NodeId {
    scene
        .spawn(op_code, Pos2::new(x, y))
        .expect("op code should be registered")
}

/// Spawn an input node holding `value`
#[allow(dead_code)]
pub fn spawn_input(scene: &mut Scene, value: f64, x: f32, y: f32) -> NodeId {
    let id = spawn_at(scene, OP_NODE_INPUT, x, y);
    assert!(set_input_value(scene, id, value));
    id
}

/// Connect output 0 of `from` to input `input` of `to`
#[allow(dead_code)]
pub fn link(scene: &mut Scene, from: NodeId, to: NodeId, input: usize) -> EdgeId {
    link_with(scene, from, to, input, EdgeType::Bezier)
}

/// Connect output 0 of `from` to input `input` of `to` with a path style
#[allow(dead_code)]
pub fn link_with(scene: &mut Scene, from: NodeId, to: NodeId, input: usize, edge_type: EdgeType) -> EdgeId {
    let out = scene.node(from).expect("from node").outputs()[0].id;
    let target = scene.node(to).expect("to node").inputs()[input].id;
    scene
        .connect(out, target, edge_type)
        .expect("edge should validate")
}

/// Collect `(node, display value)` for every evaluated output notification
#[allow(dead_code)]
pub fn record_outputs(scene: &mut Scene) -> Rc<RefCell<Vec<(NodeId, String)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    scene.add_evaluated_listener(move |node| {
        log.borrow_mut().push((node.id, node.display_value()));
    });
    seen
}

/// Descriptions of every history stamp, oldest first
#[allow(dead_code)]
pub fn history_descriptions(scene: &Scene) -> Vec<String> {
    scene.history().descriptions().map(str::to_string).collect()
}

/// Unique path in the temp directory
#[allow(dead_code)]
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nodeflow-{}-{name}", std::process::id()))
}
