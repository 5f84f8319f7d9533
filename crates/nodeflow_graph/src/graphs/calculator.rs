// SPDX-License-Identifier: MIT OR Apache-2.0
//! Calculator graph: numeric constants, the four arithmetic operations and
//! a result display.

use crate::evaluation::{format_value, require, Evaluation, EvaluationError, InputValue, NodeEvaluator};
use crate::geometry::NodeGeometry;
use crate::node::{NodeCategory, NodeId, NodeKind, NodeRegistry, NodeTemplate};
use crate::scene::Scene;
use crate::socket::{SocketPosition, SocketType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// Constant input
pub const OP_NODE_INPUT: u32 = 1;
/// Result display
pub const OP_NODE_OUTPUT: u32 = 2;
/// Addition
pub const OP_NODE_ADD: u32 = 3;
/// Subtraction
pub const OP_NODE_SUB: u32 = 4;
/// Multiplication
pub const OP_NODE_MUL: u32 = 5;
/// Division
pub const OP_NODE_DIV: u32 = 6;

/// The only socket type used by calculator nodes
pub const SOCKET_NUMBER: SocketType = SocketType(1);

/// Box used by every calculator node
pub fn calculator_geometry() -> NodeGeometry {
    NodeGeometry {
        width: 160.0,
        height: 74.0,
        title_height: 24.0,
        title_vertical_padding: 10.0,
        edge_roundness: 6.0,
        edge_padding: 0.0,
        socket_spacing: 22.0,
    }
}

fn template(title: &str, op_code: u32, inputs: usize, outputs: usize) -> NodeTemplate {
    NodeTemplate::new(
        title,
        op_code,
        &vec![SOCKET_NUMBER; inputs],
        &vec![SOCKET_NUMBER; outputs],
    )
    .with_positions(SocketPosition::LeftCenter, SocketPosition::RightCenter)
    .with_geometry(calculator_geometry())
}

/// Constant value node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputNode {
    /// Current constant
    pub value: f64,
}

impl Default for InputNode {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl NodeEvaluator for InputNode {
    fn evaluate(&self, _inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        if !self.value.is_finite() {
            return Err(EvaluationError::Domain("Value is not a number".to_string()));
        }
        Ok(Evaluation::new(self.value, format_value(self.value)))
    }

    fn content(&self) -> Value {
        serde_json::json!({ "value": format_value(self.value) })
    }

    fn restore_content(&mut self, content: &Value) -> Result<(), serde_json::Error> {
        if content.is_null() {
            return Ok(());
        }
        #[derive(Deserialize)]
        struct Stored {
            value: String,
        }
        let stored: Stored = serde_json::from_value(content.clone())?;
        // Unparsable text evaluates as invalid rather than failing the load
        self.value = stored.value.trim().parse().unwrap_or(f64::NAN);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Result display node
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputNode;

impl NodeEvaluator for OutputNode {
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        let input = require(inputs, 0)?;
        Ok(Evaluation::new(
            input.value,
            format!("{} = {}", input.text, format_value(input.value)),
        ))
    }

    fn is_output(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Binary arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// a + b
    Add,
    /// a - b
    Sub,
    /// a * b
    Mul,
    /// a / b
    Div,
}

impl Operation {
    /// Operator symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    fn apply(self, a: f64, b: f64) -> Result<f64, EvaluationError> {
        match self {
            Self::Add => Ok(a + b),
            Self::Sub => Ok(a - b),
            Self::Mul => Ok(a * b),
            Self::Div if b == 0.0 => Err(EvaluationError::Domain("Division by zero".to_string())),
            Self::Div => Ok(a / b),
        }
    }
}

/// Two-input arithmetic node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationNode {
    /// Which operation to apply
    pub operation: Operation,
}

impl NodeEvaluator for OperationNode {
    fn evaluate(&self, inputs: &[InputValue]) -> Result<Evaluation, EvaluationError> {
        let a = require(inputs, 0)?;
        let b = require(inputs, 1)?;
        let value = self.operation.apply(a.value, b.value)?;
        Ok(Evaluation::new(
            value,
            format!("({} {} {})", a.text, self.operation.symbol(), b.text),
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Create the calculator node registry with all available node types
pub fn create_calculator_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    registry.register(NodeKind {
        name: "Input".to_string(),
        category: NodeCategory::Input,
        description: "Constant number".to_string(),
        template: template("Input", OP_NODE_INPUT, 0, 1),
        build: || Box::<InputNode>::default(),
    });

    registry.register(NodeKind {
        name: "Output".to_string(),
        category: NodeCategory::Output,
        description: "Shows the incoming value".to_string(),
        template: template("Output", OP_NODE_OUTPUT, 1, 0),
        build: || Box::new(OutputNode),
    });

    let operations = [
        ("Add", OP_NODE_ADD, Operation::Add, "Sum of two numbers"),
        ("Subtract", OP_NODE_SUB, Operation::Sub, "Difference of two numbers"),
        ("Multiply", OP_NODE_MUL, Operation::Mul, "Product of two numbers"),
        ("Divide", OP_NODE_DIV, Operation::Div, "Quotient of two numbers"),
    ];
    for (name, op_code, operation, description) in operations {
        let build: fn() -> Box<dyn NodeEvaluator> = match operation {
            Operation::Add => || Box::new(OperationNode { operation: Operation::Add }),
            Operation::Sub => || Box::new(OperationNode { operation: Operation::Sub }),
            Operation::Mul => || Box::new(OperationNode { operation: Operation::Mul }),
            Operation::Div => || Box::new(OperationNode { operation: Operation::Div }),
        };
        registry.register(NodeKind {
            name: name.to_string(),
            category: NodeCategory::Math,
            description: description.to_string(),
            template: template(name, op_code, 2, 1),
            build,
        });
    }

    registry
}

/// Process-wide calculator registry, built on first use
pub fn calculator_registry() -> Arc<NodeRegistry> {
    static REGISTRY: OnceLock<Arc<NodeRegistry>> = OnceLock::new();
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(create_calculator_registry())))
}

/// Change the constant of an input node and recompute everything below it.
///
/// Returns false when `node` is not an input node.
pub fn set_input_value(scene: &mut Scene, node: NodeId, value: f64) -> bool {
    let Some(input) = scene
        .node_mut(node)
        .and_then(|n| n.evaluator_as_mut::<InputNode>())
    else {
        return false;
    };
    input.value = value;
    tracing::debug!(node = node.0, value, "input value changed");
    scene.on_input_changed(node);
    scene.set_modified(true);
    true
}
