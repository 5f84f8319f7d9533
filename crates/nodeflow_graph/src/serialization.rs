// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flat JSON document format, file I/O and the clipboard.
//!
//! Loading is staged: every node and edge is rebuilt and validated in a
//! scratch scene first, so a bad document never leaves a half-loaded scene
//! behind.

use crate::edge::{Edge, EdgeError, EdgeId, EdgeType};
use crate::node::{Node, NodeId};
use crate::scene::{Scene, SceneError, SceneItem};
use crate::socket::{Socket, SocketId, SocketPosition, SocketType};
use egui::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

/// Whole-scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Document id
    pub id: u64,
    /// Scene extent, horizontal
    pub scene_width: f32,
    /// Scene extent, vertical
    pub scene_height: f32,
    /// Nodes in insertion order
    pub nodes: Vec<NodeRecord>,
    /// Edges in insertion order
    pub edges: Vec<EdgeRecord>,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id
    pub id: u64,
    /// Title
    pub title: String,
    /// Left edge
    pub pos_x: f32,
    /// Top edge
    pub pos_y: f32,
    /// Input sockets
    pub inputs: Vec<SocketRecord>,
    /// Output sockets
    pub outputs: Vec<SocketRecord>,
    /// Node type code
    pub op_code: u32,
    /// Evaluator-specific state
    #[serde(default)]
    pub content: Value,
}

/// Serialized socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketRecord {
    /// Socket id
    pub id: u64,
    /// Index within its side
    pub index: usize,
    /// Layout side
    pub position: SocketPosition,
    /// Type tag
    pub socket_type: SocketType,
    /// Multiplicity
    pub multi_edges: bool,
}

/// Serialized edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Edge id
    pub id: u64,
    /// Path style
    pub edge_type: EdgeType,
    /// Output-side socket id
    pub start: u64,
    /// Input-side socket id
    pub end: u64,
}

/// Old id → new id table filled while loading with fresh ids
#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    map: HashMap<u64, u64>,
}

impl IdRemap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a translation
    pub fn insert(&mut self, old: u64, new: u64) {
        self.map.insert(old, new);
    }

    /// Translate an id
    pub fn get(&self, old: u64) -> Option<u64> {
        self.map.get(&old).copied()
    }

    /// Number of recorded translations
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl SocketRecord {
    fn from_socket(socket: &Socket) -> Self {
        Self {
            id: socket.id.0,
            index: socket.index,
            position: socket.position,
            socket_type: socket.socket_type,
            multi_edges: socket.multi_edges,
        }
    }
}

impl NodeRecord {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.0,
            title: node.title.clone(),
            pos_x: node.position.x,
            pos_y: node.position.y,
            inputs: node.inputs().iter().map(SocketRecord::from_socket).collect(),
            outputs: node.outputs().iter().map(SocketRecord::from_socket).collect(),
            op_code: node.op_code,
            content: node.evaluator().content(),
        }
    }
}

impl EdgeRecord {
    fn from_edge(edge: &Edge) -> Self {
        Self {
            id: edge.id.0,
            edge_type: edge.edge_type,
            start: edge.start.0,
            end: edge.end.0,
        }
    }
}

/// Hands out ids while loading and remembers the translation
struct IdAssigner<'a> {
    remap: &'a mut IdRemap,
    seen: HashSet<u64>,
    restore_ids: bool,
}

impl IdAssigner<'_> {
    fn assign(&mut self, scene: &mut Scene, old: u64) -> Result<u64, SceneError> {
        if old == u64::MAX {
            return Err(SceneError::Malformed(format!("id {old} is out of range")));
        }
        if !self.seen.insert(old) {
            return Err(SceneError::DuplicateId(old));
        }
        // Fresh ids come from the receiving scene so a merge cannot collide
        let new = if self.restore_ids { old } else { scene.alloc_id() };
        self.remap.insert(old, new);
        Ok(new)
    }

    /// Translate a socket reference from an edge record
    fn socket(&self, staged: &Scene, edge: u64, old: u64) -> Result<SocketId, SceneError> {
        self.remap
            .get(old)
            .map(SocketId)
            .filter(|id| staged.socket(*id).is_some())
            .ok_or(SceneError::DanglingSocket { edge, socket: old })
    }
}

/// Apply stored socket records over freshly built template sockets
fn apply_socket_records(
    sockets: &mut [Socket],
    records: &[SocketRecord],
    node: u64,
    mut assign: impl FnMut(u64) -> Result<u64, SceneError>,
) -> Result<(), SceneError> {
    if sockets.len() != records.len() {
        return Err(SceneError::Malformed(format!(
            "node {node} has {} sockets on a side that takes {}",
            records.len(),
            sockets.len()
        )));
    }
    let mut applied = vec![false; sockets.len()];
    for record in records {
        if applied.get(record.index).copied().unwrap_or(false) {
            return Err(SceneError::Malformed(format!(
                "node {node} repeats socket index {}",
                record.index
            )));
        }
        let socket = sockets.get_mut(record.index).ok_or_else(|| {
            SceneError::Malformed(format!("node {node} has no socket index {}", record.index))
        })?;
        socket.id = SocketId(assign(record.id)?);
        socket.position = record.position;
        socket.socket_type = record.socket_type;
        socket.multi_edges = record.multi_edges;
        applied[record.index] = true;
    }
    Ok(())
}

impl Scene {
    /// Snapshot the whole scene as a document
    pub fn serialize(&self) -> SceneDocument {
        SceneDocument {
            id: self.id,
            scene_width: self.scene_width,
            scene_height: self.scene_height,
            nodes: self.nodes().map(NodeRecord::from_node).collect(),
            edges: self.edges().map(EdgeRecord::from_edge).collect(),
        }
    }

    /// Load a document.
    ///
    /// With `restore_ids` the scene contents are replaced and record ids are
    /// kept. Without it the document is merged in under fresh ids, recorded in
    /// `remap`. Returns the loaded nodes in document order. On error the scene
    /// is left untouched.
    pub fn deserialize(
        &mut self,
        document: SceneDocument,
        remap: &mut IdRemap,
        restore_ids: bool,
    ) -> Result<Vec<NodeId>, SceneError> {
        let mut staged = self.staging();
        let registry = Arc::clone(self.registry());
        let mut ids = IdAssigner {
            remap,
            seen: HashSet::new(),
            restore_ids,
        };
        let mut loaded = Vec::with_capacity(document.nodes.len());

        for record in &document.nodes {
            let kind = registry
                .get(record.op_code)
                .ok_or(SceneError::UnknownOpCode(record.op_code))?;
            let mut evaluator = (kind.build)();
            evaluator.restore_content(&record.content)?;

            let id = NodeId(ids.assign(self, record.id)?);
            let mut node = Node::build(id, &kind.template, evaluator, || SocketId(0))
                .with_position(record.pos_x, record.pos_y);
            node.title = record.title.clone();
            apply_socket_records(&mut node.inputs, &record.inputs, record.id, |old| {
                ids.assign(self, old)
            })?;
            apply_socket_records(&mut node.outputs, &record.outputs, record.id, |old| {
                ids.assign(self, old)
            })?;

            loaded.push(id);
            staged.insert_node(node);
        }

        for record in &document.edges {
            let mut start = ids.socket(&staged, record.id, record.start)?;
            let mut end = ids.socket(&staged, record.id, record.end)?;
            if staged.socket(start).is_some_and(Socket::is_input) {
                std::mem::swap(&mut start, &mut end);
            }

            let invalid = |source: EdgeError| SceneError::InvalidEdge {
                edge: record.id,
                source,
            };
            staged.validate_edge(start, end).map_err(invalid)?;
            for id in [start, end] {
                if staged.socket(id).is_some_and(|s| !s.multi_edges && s.has_any_edge()) {
                    return Err(invalid(EdgeError::SocketOccupied(id)));
                }
            }

            let id = EdgeId(ids.assign(self, record.id)?);
            staged.insert_edge(Edge::new(id, start, end, record.edge_type));
        }

        if restore_ids {
            self.reset_contents();
            self.id = document.id;
            self.scene_width = document.scene_width;
            self.scene_height = document.scene_height;
        }
        self.absorb(staged);
        tracing::debug!(
            nodes = loaded.len(),
            edges = document.edges.len(),
            restore_ids,
            "deserialized document"
        );

        self.evaluate_all();
        Ok(loaded)
    }

    /// Serialize the selected nodes and the edges between them
    pub fn copy_selected(&self) -> SceneDocument {
        let selected = self.selected_nodes();
        let nodes: Vec<NodeRecord> = selected
            .iter()
            .filter_map(|id| self.node(*id))
            .map(NodeRecord::from_node)
            .collect();

        let edges = self
            .edges()
            .filter(|edge| {
                let inside = |socket| {
                    self.socket_owner(socket)
                        .is_some_and(|owner| selected.contains(&owner))
                };
                inside(edge.start) && inside(edge.end)
            })
            .map(EdgeRecord::from_edge)
            .collect();

        SceneDocument {
            id: self.id,
            scene_width: self.scene_width,
            scene_height: self.scene_height,
            nodes,
            edges,
        }
    }

    /// Insert a copied document under fresh ids, shifted by `offset`, and
    /// select the pasted nodes
    pub fn paste(&mut self, document: SceneDocument, offset: Vec2) -> Result<Vec<NodeId>, SceneError> {
        let pasted = self.deserialize(document, &mut IdRemap::new(), false)?;
        self.clear_selection();
        for id in &pasted {
            if let Some(node) = self.node_mut(*id) {
                node.position += offset;
            }
            self.select(SceneItem::Node(*id), true);
        }
        self.store_history("Pasted elements", true);
        Ok(pasted)
    }

    /// Write the scene to a JSON file and clear the modified flag
    pub fn save_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(&self.serialize())?;
        fs::write(path, contents)?;
        self.set_filename(path.to_path_buf());
        self.set_modified(false);
        tracing::info!("Saved scene to {}", path.display());
        Ok(())
    }

    /// Replace the scene with the contents of a JSON file.
    ///
    /// History restarts from the loaded state.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => SceneError::NotFound {
                path: path.to_path_buf(),
            },
            _ => SceneError::Io(err),
        })?;

        let invalid = |reason: String| SceneError::InvalidFile {
            path: path.to_path_buf(),
            reason,
        };
        let document: SceneDocument =
            serde_json::from_str(&contents).map_err(|err| invalid(err.to_string()))?;
        self.deserialize(document, &mut IdRemap::new(), true)
            .map_err(|err| invalid(err.to_string()))?;

        self.set_filename(path.to_path_buf());
        self.set_modified(false);
        self.history.clear();
        self.store_initial_history_stamp();
        tracing::info!("Loaded scene from {}", path.display());
        Ok(())
    }
}
