// SPDX-License-Identifier: MIT OR Apache-2.0
//! The scene: owner of nodes, edges, selection, history and listeners.

use crate::edge::{Edge, EdgeError, EdgeId, EdgeType};
use crate::evaluation::NodeEvaluator;
use crate::geometry;
use crate::history::{History, HistoryError};
use crate::node::{Node, NodeId, NodeRegistry, NodeTemplate};
use crate::settings::EditorSettings;
use crate::socket::{Socket, SocketId};
use crate::validators::ValidatorChain;
use egui::Pos2;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default scene extent
pub const SCENE_SIZE: f32 = 64000.0;

/// Something that can be selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneItem {
    /// A node
    Node(NodeId),
    /// An edge
    Edge(EdgeId),
}

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    evaluated: Vec<(ListenerId, Box<dyn FnMut(&Node)>)>,
    modified: Vec<(ListenerId, Box<dyn FnMut(bool)>)>,
    item_selected: Vec<(ListenerId, Box<dyn FnMut()>)>,
    items_deselected: Vec<(ListenerId, Box<dyn FnMut()>)>,
}

impl Listeners {
    fn next(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.len();
        self.evaluated.retain(|(l, _)| *l != id);
        self.modified.retain(|(l, _)| *l != id);
        self.item_selected.retain(|(l, _)| *l != id);
        self.items_deselected.retain(|(l, _)| *l != id);
        self.len() != before
    }

    fn len(&self) -> usize {
        self.evaluated.len()
            + self.modified.len()
            + self.item_selected.len()
            + self.items_deselected.len()
    }
}

/// Errors raised by scene level operations
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The file does not exist
    #[error("File not found: {}", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The file exists but does not hold a valid document
    #[error("Invalid file {}: {reason}", path.display())]
    InvalidFile {
        /// Offending path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// No node type is registered for an op code
    #[error("Unknown op code {0}")]
    UnknownOpCode(u32),

    /// An edge references a socket that is not in the document
    #[error("Edge {edge} references missing socket {socket}")]
    DanglingSocket {
        /// Edge record id
        edge: u64,
        /// Missing socket id
        socket: u64,
    },

    /// Two records share an id
    #[error("Duplicate id {0}")]
    DuplicateId(u64),

    /// A record does not fit the node type it names
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// A stored edge fails validation
    #[error("Edge {edge} is invalid: {source}")]
    InvalidEdge {
        /// Edge record id
        edge: u64,
        /// Validation failure
        source: EdgeError,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// History error
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// A graph of nodes and edges with its editing state
pub struct Scene {
    /// Document id
    pub id: u64,
    /// Scene extent, horizontal
    pub scene_width: f32,
    /// Scene extent, vertical
    pub scene_height: f32,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) edges: IndexMap<EdgeId, Edge>,
    socket_owners: HashMap<SocketId, NodeId>,
    selection: IndexSet<SceneItem>,
    last_selection: Vec<SceneItem>,
    modified: bool,
    filename: Option<PathBuf>,
    pub(crate) history: History,
    validators: ValidatorChain,
    registry: Arc<NodeRegistry>,
    next_id: u64,
    listeners: Listeners,
}

impl Scene {
    /// Create an empty scene bound to a node type registry
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_settings(registry, &EditorSettings::default())
    }

    /// Create an empty scene using editor settings
    pub fn with_settings(registry: Arc<NodeRegistry>, settings: &EditorSettings) -> Self {
        Self {
            id: 0,
            scene_width: SCENE_SIZE,
            scene_height: SCENE_SIZE,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            socket_owners: HashMap::new(),
            selection: IndexSet::new(),
            last_selection: Vec::new(),
            modified: false,
            filename: None,
            history: History::new(settings.history_limit),
            validators: ValidatorChain::standard(),
            registry,
            next_id: 1,
            listeners: Listeners::default(),
        }
    }

    /// Node type registry
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Edge validation rules
    pub fn validators(&self) -> &ValidatorChain {
        &self.validators
    }

    /// Edge validation rules, mutable
    pub fn validators_mut(&mut self) -> &mut ValidatorChain {
        &mut self.validators
    }

    pub(crate) fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Make sure future ids do not collide with `id`
    pub(crate) fn reserve_id(&mut self, id: u64) {
        self.next_id = self.next_id.max(id.saturating_add(1));
    }

    // Nodes

    /// Build a node from a template and add it to the scene
    pub fn add_node(&mut self, template: &NodeTemplate, evaluator: Box<dyn NodeEvaluator>) -> NodeId {
        let id = NodeId(self.alloc_id());
        let node = Node::build(id, template, evaluator, || SocketId(self.alloc_id()));
        self.insert_node(node);
        self.set_modified(true);
        id
    }

    /// Create a node of a registered type at `pos`
    pub fn spawn(&mut self, op_code: u32, pos: Pos2) -> Result<NodeId, SceneError> {
        let registry = Arc::clone(&self.registry);
        let kind = registry.get(op_code).ok_or(SceneError::UnknownOpCode(op_code))?;
        let id = self.add_node(&kind.template, (kind.build)());
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = pos;
        }
        tracing::debug!(node = id.0, op_code, "spawned node");
        Ok(id)
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        for socket in node.sockets() {
            self.socket_owners.insert(socket.id, node.id);
        }
        self.nodes.insert(node.id, node);
    }

    /// Remove a node. Its edges go first, then the node; former downstream
    /// nodes are re-evaluated afterwards.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let edge_ids = self.nodes.get(&id)?.edge_ids();

        let mut downstream = Vec::new();
        for edge_id in edge_ids {
            if let Some(edge) = self.detach_edge(edge_id) {
                if let Some(owner) = self.socket_owner(edge.end) {
                    if owner != id && !downstream.contains(&owner) {
                        downstream.push(owner);
                    }
                }
            }
        }

        let node = self.nodes.shift_remove(&id)?;
        for socket in node.sockets() {
            self.socket_owners.remove(&socket.id);
        }
        self.selection.shift_remove(&SceneItem::Node(id));
        self.set_modified(true);

        for child in downstream {
            self.on_input_changed(child);
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a socket by ID
    pub fn socket(&self, id: SocketId) -> Option<&Socket> {
        let owner = self.socket_owners.get(&id)?;
        self.nodes.get(owner)?.socket(id)
    }

    fn socket_mut(&mut self, id: SocketId) -> Option<&mut Socket> {
        let owner = self.socket_owners.get(&id)?;
        self.nodes.get_mut(owner)?.socket_mut(id)
    }

    /// Node owning a socket
    pub fn socket_owner(&self, id: SocketId) -> Option<NodeId> {
        self.socket_owners.get(&id).copied()
    }

    /// Absolute anchor of a socket
    pub fn socket_scene_position(&self, id: SocketId) -> Option<Pos2> {
        let node = self.nodes.get(self.socket_owners.get(&id)?)?;
        Some(node.socket_scene_position(node.socket(id)?))
    }

    // Edges

    /// Run the validator chain over a prospective edge
    pub fn validate_edge(&self, a: SocketId, b: SocketId) -> Result<(), EdgeError> {
        let sa = self.socket(a).ok_or(EdgeError::SocketNotFound(a))?;
        let sb = self.socket(b).ok_or(EdgeError::SocketNotFound(b))?;
        self.validators.validate(self, sa, sb)
    }

    /// Connect two sockets in either order.
    ///
    /// Edges already on a single-edge socket of the pair are replaced. The
    /// receiving node is re-evaluated.
    pub fn connect(&mut self, a: SocketId, b: SocketId, edge_type: EdgeType) -> Result<EdgeId, EdgeError> {
        self.validate_edge(a, b)?;

        let (start, end) = match self.socket(a) {
            Some(socket) if socket.is_output() => (a, b),
            _ => (b, a),
        };

        let mut displaced = Vec::new();
        for socket_id in [start, end] {
            let replaced: Vec<EdgeId> = match self.socket(socket_id) {
                Some(socket) if !socket.multi_edges => socket.edges().to_vec(),
                _ => Vec::new(),
            };
            for edge_id in replaced {
                if let Some(old) = self.detach_edge(edge_id) {
                    tracing::debug!(edge = edge_id.0, "replaced edge on single-edge socket");
                    if let Some(owner) = self.socket_owner(old.end) {
                        displaced.push(owner);
                    }
                }
            }
        }

        let id = EdgeId(self.alloc_id());
        self.insert_edge(Edge::new(id, start, end, edge_type));
        self.set_modified(true);

        let target = self.socket_owner(end);
        for node in displaced {
            if Some(node) != target {
                self.on_input_changed(node);
            }
        }
        if let Some(target) = target {
            self.on_input_changed(target);
        }
        Ok(id)
    }

    /// Register an edge without validation or notifications
    pub(crate) fn insert_edge(&mut self, edge: Edge) {
        if let Some(socket) = self.socket_mut(edge.start) {
            socket.connect(edge.id);
        }
        if let Some(socket) = self.socket_mut(edge.end) {
            socket.connect(edge.id);
        }
        self.edges.insert(edge.id, edge);
    }

    /// Unlink an edge from its sockets, the edge set and the selection
    fn detach_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(&id)?;
        if let Some(socket) = self.socket_mut(edge.start) {
            socket.disconnect(id);
        }
        if let Some(socket) = self.socket_mut(edge.end) {
            socket.disconnect(id);
        }
        self.selection.shift_remove(&SceneItem::Edge(id));
        Some(edge)
    }

    /// Remove an edge and re-evaluate the node it fed. Returns whether it existed.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.detach_edge(id) else {
            return false;
        };
        self.set_modified(true);
        if let Some(target) = self.socket_owner(edge.end) {
            self.on_input_changed(target);
        }
        true
    }

    /// Move one endpoint of an edge from `from` to `to`, keeping the other.
    ///
    /// On rejection the edge keeps its previous endpoints.
    pub fn reconnect_edge(&mut self, id: EdgeId, from: SocketId, to: SocketId) -> Result<(), EdgeError> {
        let edge = self.edges.get(&id).ok_or(EdgeError::EdgeNotFound(id))?;
        let anchor = edge.other_socket(from).ok_or(EdgeError::SocketNotFound(from))?;
        let old_end = edge.end;
        if from == to {
            return Ok(());
        }

        let target = self.socket(to).ok_or(EdgeError::SocketNotFound(to))?;
        if !target.multi_edges && target.has_any_edge() {
            return Err(EdgeError::SocketOccupied(to));
        }
        self.validate_edge(anchor, to)?;

        let Some(mut edge) = self.detach_edge(id) else {
            return Err(EdgeError::EdgeNotFound(id));
        };
        let to_is_output = self.socket(to).is_some_and(Socket::is_output);
        if to_is_output {
            edge.start = to;
            edge.end = anchor;
        } else {
            edge.start = anchor;
            edge.end = to;
        }
        let new_end = edge.end;
        self.insert_edge(edge);
        self.set_modified(true);

        let old_target = self.socket_owner(old_end);
        let new_target = self.socket_owner(new_end);
        if old_target != new_target {
            if let Some(node) = old_target {
                self.on_input_changed(node);
            }
        }
        if let Some(node) = new_target {
            self.on_input_changed(node);
        }
        Ok(())
    }

    /// Get an edge by ID
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sampled path of an edge in scene space
    pub fn edge_path(&self, id: EdgeId) -> Option<Vec<Pos2>> {
        let edge = self.edges.get(&id)?;
        let start = self.socket_scene_position(edge.start)?;
        let end = self.socket_scene_position(edge.end)?;
        Some(geometry::edge_path(start, end, edge.edge_type))
    }

    /// Drop every node and edge and reset the modified flag. Listeners stay.
    pub fn clear(&mut self) {
        self.reset_contents();
        self.set_modified(false);
    }

    pub(crate) fn reset_contents(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.socket_owners.clear();
        self.selection.clear();
        self.last_selection.clear();
    }

    /// Move nodes and socket ownership from a staged scene into this one
    pub(crate) fn absorb(&mut self, staged: Scene) {
        let Scene {
            nodes,
            edges,
            socket_owners,
            ..
        } = staged;
        self.socket_owners.extend(socket_owners);
        for (id, node) in nodes {
            self.reserve_id(id.0);
            for socket in node.sockets() {
                self.reserve_id(socket.id.0);
            }
            self.nodes.insert(id, node);
        }
        for (id, edge) in edges {
            self.reserve_id(id.0);
            self.edges.insert(id, edge);
        }
    }

    /// A scene sharing registry and rules with this one but no content
    pub(crate) fn staging(&self) -> Scene {
        let mut staged = Scene::new(Arc::clone(&self.registry));
        staged.validators = self.validators.clone();
        staged
    }

    // Selection

    fn item_exists(&self, item: SceneItem) -> bool {
        match item {
            SceneItem::Node(id) => self.nodes.contains_key(&id),
            SceneItem::Edge(id) => self.edges.contains_key(&id),
        }
    }

    /// Select an item. Without `additive` the previous selection is dropped.
    pub fn select(&mut self, item: SceneItem, additive: bool) -> bool {
        if !self.item_exists(item) {
            return false;
        }
        if !additive {
            self.selection.clear();
        }
        self.selection.insert(item);
        true
    }

    /// Remove an item from the selection
    pub fn deselect(&mut self, item: SceneItem) -> bool {
        self.selection.shift_remove(&item)
    }

    /// Flip the selection state of an item
    pub fn toggle_selection(&mut self, item: SceneItem) {
        if !self.deselect(item) {
            self.select(item, true);
        }
    }

    /// Drop the whole selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Replace the selection, skipping items that no longer exist
    pub fn set_selection(&mut self, items: &[SceneItem]) {
        self.selection.clear();
        for item in items {
            if self.item_exists(*item) {
                self.selection.insert(*item);
            }
        }
    }

    /// Whether an item is selected
    pub fn is_selected(&self, item: SceneItem) -> bool {
        self.selection.contains(&item)
    }

    /// Selected items in selection order
    pub fn selected_items(&self) -> Vec<SceneItem> {
        self.selection.iter().copied().collect()
    }

    /// Selected nodes in selection order
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.selection
            .iter()
            .filter_map(|item| match item {
                SceneItem::Node(id) => Some(*id),
                SceneItem::Edge(_) => None,
            })
            .collect()
    }

    /// Selected edges in selection order
    pub fn selected_edges(&self) -> Vec<EdgeId> {
        self.selection
            .iter()
            .filter_map(|item| match item {
                SceneItem::Edge(id) => Some(*id),
                SceneItem::Node(_) => None,
            })
            .collect()
    }

    /// Fire selection listeners if the selection differs from the last
    /// notified one. Returns whether anything fired.
    pub fn notify_selection_changed(&mut self) -> bool {
        let current = self.selected_items();
        if current == self.last_selection {
            return false;
        }
        if current.is_empty() {
            for (_, listener) in &mut self.listeners.items_deselected {
                listener();
            }
        } else {
            for (_, listener) in &mut self.listeners.item_selected {
                listener();
            }
        }
        self.last_selection = current;
        true
    }

    /// Delete every selected edge and node as one undo step.
    /// Returns the number of removed items.
    pub fn delete_selected(&mut self) -> usize {
        let mut removed = 0;
        for edge in self.selected_edges() {
            if self.remove_edge(edge) {
                removed += 1;
            }
        }
        for node in self.selected_nodes() {
            if self.remove_node(node).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.store_history("Delete selected", true);
        }
        removed
    }

    // Modified flag and file

    /// Whether there are unsaved changes
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set the modified flag, notifying listeners when it changes
    pub fn set_modified(&mut self, modified: bool) {
        if self.modified == modified {
            return;
        }
        self.modified = modified;
        for (_, listener) in &mut self.listeners.modified {
            listener(modified);
        }
    }

    /// File the scene was last loaded from or saved to
    pub fn filename(&self) -> Option<&PathBuf> {
        self.filename.as_ref()
    }

    pub(crate) fn set_filename(&mut self, path: PathBuf) {
        self.filename = Some(path);
    }

    // Listeners

    /// Called with every output node after each evaluation attempt
    pub fn add_evaluated_listener(&mut self, listener: impl FnMut(&Node) + 'static) -> ListenerId {
        let id = self.listeners.next();
        self.listeners.evaluated.push((id, Box::new(listener)));
        id
    }

    /// Called with the new value whenever the modified flag changes
    pub fn add_modified_listener(&mut self, listener: impl FnMut(bool) + 'static) -> ListenerId {
        let id = self.listeners.next();
        self.listeners.modified.push((id, Box::new(listener)));
        id
    }

    /// Called when a notified selection is non-empty
    pub fn add_item_selected_listener(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let id = self.listeners.next();
        self.listeners.item_selected.push((id, Box::new(listener)));
        id
    }

    /// Called when a notified selection becomes empty
    pub fn add_items_deselected_listener(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let id = self.listeners.next();
        self.listeners.items_deselected.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener of any kind
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub(crate) fn notify_evaluated(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get(&id) {
            for (_, listener) in &mut self.listeners.evaluated {
                listener(node);
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Arc::new(NodeRegistry::new()))
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("selection", &self.selection)
            .field("modified", &self.modified)
            .field("filename", &self.filename)
            .field("validators", &self.validators)
            .finish_non_exhaustive()
    }
}
