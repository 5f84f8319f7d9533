// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions and the node type registry.

use crate::edge::EdgeId;
use crate::evaluation::{format_value, Evaluation, NodeEvaluator};
use crate::geometry::NodeGeometry;
use crate::socket::{Socket, SocketDirection, SocketId, SocketPosition, SocketType};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants)
    Input,
    /// Output nodes (result display)
    Output,
    /// Math operations
    Math,
    /// Custom/user-defined
    Custom,
}

/// Effective evaluation state of a node. Invalid wins over Dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Cached value is current
    Clean,
    /// Cached value is stale
    Dirty,
    /// Last evaluation failed
    Invalid,
}

/// Socket description inside a node template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketTemplate {
    /// Data type
    pub socket_type: SocketType,
    /// Display name
    pub name: String,
    /// Multiplicity override; `None` keeps the per-direction default
    pub multi_edges: Option<bool>,
}

impl SocketTemplate {
    /// Create a socket template with the default multiplicity
    pub fn new(socket_type: SocketType, name: impl Into<String>) -> Self {
        Self {
            socket_type,
            name: name.into(),
            multi_edges: None,
        }
    }

    /// Override the multiplicity
    pub fn multi_edges(mut self, multi_edges: bool) -> Self {
        self.multi_edges = Some(multi_edges);
        self
    }
}

/// Shape of a node: title, sockets and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Default title
    pub title: String,
    /// Type code used to look the node up again on load
    pub op_code: u32,
    /// Input sockets
    pub inputs: Vec<SocketTemplate>,
    /// Output sockets
    pub outputs: Vec<SocketTemplate>,
    /// Side inputs are laid out on
    pub input_position: SocketPosition,
    /// Side outputs are laid out on
    pub output_position: SocketPosition,
    /// Box dimensions
    pub geometry: NodeGeometry,
}

impl NodeTemplate {
    /// Create a template with sockets of the given types
    pub fn new(
        title: impl Into<String>,
        op_code: u32,
        inputs: &[SocketType],
        outputs: &[SocketType],
    ) -> Self {
        Self {
            title: title.into(),
            op_code,
            inputs: inputs.iter().map(|t| SocketTemplate::new(*t, "")).collect(),
            outputs: outputs.iter().map(|t| SocketTemplate::new(*t, "")).collect(),
            input_position: SocketPosition::LeftBottom,
            output_position: SocketPosition::RightTop,
            geometry: NodeGeometry::default(),
        }
    }

    /// Set socket sides
    pub fn with_positions(mut self, input: SocketPosition, output: SocketPosition) -> Self {
        self.input_position = input;
        self.output_position = output;
        self
    }

    /// Set the box dimensions
    pub fn with_geometry(mut self, geometry: NodeGeometry) -> Self {
        self.geometry = geometry;
        self
    }
}

/// A node instance in the scene
#[derive(Debug)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display title
    pub title: String,
    /// Top-left corner in scene space
    pub position: Pos2,
    /// Type code
    pub op_code: u32,
    /// Box dimensions
    pub geometry: NodeGeometry,
    pub(crate) inputs: Vec<Socket>,
    pub(crate) outputs: Vec<Socket>,
    dirty: bool,
    invalid: bool,
    value: Option<f64>,
    text: String,
    diagnostic: Option<String>,
    evaluator: Box<dyn NodeEvaluator>,
}

impl Node {
    /// Build a node from a template. Socket ids come from `next_socket_id`.
    ///
    /// New nodes start dirty so the first read forces an evaluation.
    pub fn build(
        id: NodeId,
        template: &NodeTemplate,
        evaluator: Box<dyn NodeEvaluator>,
        mut next_socket_id: impl FnMut() -> SocketId,
    ) -> Self {
        let mut make = |index: usize, t: &SocketTemplate, direction, position| {
            let socket = Socket::new(next_socket_id(), id, index, direction, position, t.socket_type)
                .with_name(t.name.clone());
            match t.multi_edges {
                Some(multi) => socket.with_multi_edges(multi),
                None => socket,
            }
        };

        let inputs = template
            .inputs
            .iter()
            .enumerate()
            .map(|(i, t)| make(i, t, SocketDirection::Input, template.input_position))
            .collect();
        let outputs = template
            .outputs
            .iter()
            .enumerate()
            .map(|(i, t)| make(i, t, SocketDirection::Output, template.output_position))
            .collect();

        Self {
            id,
            title: template.title.clone(),
            position: Pos2::ZERO,
            op_code: template.op_code,
            geometry: template.geometry,
            inputs,
            outputs,
            dirty: true,
            invalid: false,
            value: None,
            text: String::new(),
            diagnostic: None,
            evaluator,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Pos2::new(x, y);
        self
    }

    /// Input sockets in index order
    pub fn inputs(&self) -> &[Socket] {
        &self.inputs
    }

    /// Output sockets in index order
    pub fn outputs(&self) -> &[Socket] {
        &self.outputs
    }

    /// Get an input socket by index
    pub fn input(&self, index: usize) -> Option<&Socket> {
        self.inputs.get(index)
    }

    /// Get an output socket by index
    pub fn output(&self, index: usize) -> Option<&Socket> {
        self.outputs.get(index)
    }

    /// Get a socket by ID
    pub fn socket(&self, socket_id: SocketId) -> Option<&Socket> {
        self.sockets().find(|s| s.id == socket_id)
    }

    pub(crate) fn socket_mut(&mut self, socket_id: SocketId) -> Option<&mut Socket> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|s| s.id == socket_id)
    }

    /// Get all sockets, inputs first
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Every edge attached to any socket of this node
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = Vec::new();
        for edge in self.sockets().flat_map(|s| s.edges().iter().copied()) {
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
        edges
    }

    /// Whether `edge` is attached to this node
    pub fn has_connected_edge(&self, edge: EdgeId) -> bool {
        self.sockets().any(|s| s.has_edge(edge))
    }

    /// Whether any socket of this node has an edge
    pub fn is_connected(&self) -> bool {
        self.sockets().any(Socket::has_any_edge)
    }

    /// Absolute anchor of one of this node's sockets
    pub fn socket_scene_position(&self, socket: &Socket) -> Pos2 {
        let count = match socket.direction {
            SocketDirection::Input => self.inputs.len(),
            SocketDirection::Output => self.outputs.len(),
        };
        let offset = self
            .geometry
            .socket_offset(socket.position, socket.index, count);
        self.position + offset.to_vec2()
    }

    /// Bounding box in scene space
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(
            self.position,
            Vec2::new(self.geometry.width, self.geometry.height),
        )
    }

    /// Whether the cached value is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the last evaluation failed
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Effective state
    pub fn state(&self) -> NodeState {
        if self.invalid {
            NodeState::Invalid
        } else if self.dirty {
            NodeState::Dirty
        } else {
            NodeState::Clean
        }
    }

    /// Cached value, `None` when never evaluated or invalid
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Cached expression text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cached evaluation, only while clean and valid
    pub fn cached(&self) -> Option<Evaluation> {
        if self.dirty || self.invalid {
            return None;
        }
        self.value.map(|value| Evaluation::new(value, self.text.clone()))
    }

    /// Value formatted for display, `"0"` when there is none
    pub fn display_value(&self) -> String {
        self.value.map_or_else(|| "0".to_string(), format_value)
    }

    /// Diagnostic (tooltip) from the last failed evaluation
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Whether this node reports to the scene's evaluated listeners
    pub fn is_output(&self) -> bool {
        self.evaluator.is_output()
    }

    /// Type-specific evaluator
    pub fn evaluator(&self) -> &dyn NodeEvaluator {
        self.evaluator.as_ref()
    }

    /// Downcast the evaluator to a concrete type
    pub fn evaluator_as<T: Any>(&self) -> Option<&T> {
        self.evaluator.as_any().downcast_ref::<T>()
    }

    /// Downcast the evaluator to a concrete type, mutable
    pub fn evaluator_as_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.evaluator.as_any_mut().downcast_mut::<T>()
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub(crate) fn set_invalid(&mut self, invalid: bool) {
        self.invalid = invalid;
    }

    pub(crate) fn store_evaluation(&mut self, evaluation: &Evaluation) {
        self.value = Some(evaluation.value);
        self.text = evaluation.text.clone();
        self.dirty = false;
        self.invalid = false;
        self.diagnostic = None;
    }

    pub(crate) fn store_failure(&mut self, diagnostic: String) {
        self.value = None;
        self.text.clear();
        self.invalid = true;
        self.diagnostic = Some(diagnostic);
    }
}

/// A registered node type
#[derive(Debug, Clone)]
pub struct NodeKind {
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Sockets and layout
    pub template: NodeTemplate,
    /// Evaluator constructor
    pub build: fn() -> Box<dyn NodeEvaluator>,
}

impl NodeKind {
    /// Type code of this kind
    pub fn op_code(&self) -> u32 {
        self.template.op_code
    }
}

/// Registry of available node types, keyed by op code
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    kinds: IndexMap<u32, NodeKind>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any kind with the same op code
    pub fn register(&mut self, kind: NodeKind) {
        self.kinds.insert(kind.op_code(), kind);
    }

    /// Get a node type by op code
    pub fn get(&self, op_code: u32) -> Option<&NodeKind> {
        self.kinds.get(&op_code)
    }

    /// Get all registered types
    pub fn kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.kinds.values()
    }

    /// Get types by category
    pub fn kinds_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeKind> {
        self.kinds.values().filter(move |k| k.category == category)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
