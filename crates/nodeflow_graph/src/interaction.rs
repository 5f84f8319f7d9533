// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven editing state machine.
//!
//! The presentation layer feeds press, move and release events in scene
//! coordinates together with what lies under the pointer. The state machine
//! turns gestures into scene edits and records one history entry per
//! completed gesture. Every gesture fails closed: a rejected edit leaves the
//! scene as it was.
//!
//! While ctrl is held and snapping is enabled, presses, moves and releases
//! resolve to the nearest socket in snapping range.
//!
//! | Mode             | Entered by                         | Finished by                     |
//! |------------------|------------------------------------|---------------------------------|
//! | `EdgeDragging`   | press on a socket                  | release past threshold, or press |
//! | `EdgesRerouting` | ctrl-press on a connected socket   | release                         |
//! | `EdgeCutting`    | ctrl-press away from any socket    | release                         |
//! | `NodeDragging`   | press on a node                    | release                         |

use crate::edge::{EdgeError, EdgeId, EdgeType};
use crate::geometry::{polyline_intersects_rect, polyline_intersects_segment, socket_hot_zone};
use crate::node::NodeId;
use crate::scene::{Scene, SceneItem};
use crate::settings::EditorSettings;
use crate::snapping::SocketSnapping;
use crate::socket::SocketId;
use egui::{vec2, Pos2, Rect, Vec2};

/// Distance from an edge path that still counts as a hit
const EDGE_HIT_TOLERANCE: f32 = 4.0;

/// Keyboard modifiers held during a pointer event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl (or command)
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
    /// Alt
    pub alt: bool,
}

impl Modifiers {
    /// Only ctrl held
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// What lies under the pointer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HitTarget {
    /// Empty canvas
    #[default]
    None,
    /// A node body
    Node(NodeId),
    /// A socket hot zone
    Socket(SocketId),
    /// An edge path
    Edge(EdgeId),
}

/// A pointer event in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Pointer position
    pub pos: Pos2,
    /// Held modifiers
    pub modifiers: Modifiers,
    /// Item under the pointer
    pub hit: HitTarget,
}

impl PointerEvent {
    /// Event without modifiers
    pub fn new(pos: Pos2, hit: HitTarget) -> Self {
        Self {
            pos,
            modifiers: Modifiers::default(),
            hit,
        }
    }

    /// Set the held modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// An edge being dragged out of a socket
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDrag {
    /// Socket the drag started from
    pub from: SocketId,
    /// Where the press happened
    pub press_pos: Pos2,
    /// Free end of the edge, snapped when a socket is in range
    pub pointer: Pos2,
    /// Socket the free end is snapped to
    pub snapped: Option<SocketId>,
}

/// Edges of one socket being moved to another
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeReroute {
    /// Socket the edges are taken from
    pub socket: SocketId,
    /// Edges being moved
    pub edges: Vec<EdgeId>,
    /// Free end position, snapped when a socket is in range
    pub pointer: Pos2,
    /// Socket the free end is snapped to
    pub snapped: Option<SocketId>,
}

/// Selected nodes following the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDrag {
    /// Node that was pressed
    pub node: NodeId,
    /// Last pointer position
    pub last: Pos2,
    /// Whether anything moved yet
    pub moved: bool,
    /// Edges under the pressed node
    pub hovered: Vec<EdgeId>,
}

/// Current interaction mode
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    /// Nothing in progress
    #[default]
    Idle,
    /// Dragging a new edge
    EdgeDragging(EdgeDrag),
    /// Drawing a cut line
    EdgeCutting(Vec<Pos2>),
    /// Moving edges between sockets
    EdgesRerouting(EdgeReroute),
    /// Moving nodes
    NodeDragging(NodeDrag),
}

/// What a pointer event did to the scene
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Nothing finished
    None,
    /// A gesture ended without changes
    Cancelled,
    /// A dragged edge was connected
    EdgeCreated(EdgeId),
    /// A dragged edge was refused by validation
    EdgeRejected(EdgeError),
    /// Edges removed by a cut line
    EdgesCut(usize),
    /// Edges moved to another socket
    EdgesRerouted(usize),
    /// Nodes were moved
    NodesMoved,
    /// A dropped node was spliced into this edge
    NodeDroppedOnEdge(EdgeId),
}

/// The editing state machine
#[derive(Debug, Clone)]
pub struct InteractionState {
    mode: InteractionMode,
    edge_drag_threshold: f32,
    snapping_enabled: bool,
    edge_type: EdgeType,
    snapping: SocketSnapping,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

impl InteractionState {
    /// Create from editor settings
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            mode: InteractionMode::Idle,
            edge_drag_threshold: settings.edge_drag_threshold,
            snapping_enabled: settings.snapping_enabled,
            edge_type: settings.default_edge_type,
            snapping: SocketSnapping::new(settings.snapping_radius),
        }
    }

    /// Current mode
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// Whether no gesture is in progress
    pub fn is_idle(&self) -> bool {
        self.mode == InteractionMode::Idle
    }

    /// Edges under the node being dragged
    pub fn hovered_edges(&self) -> &[EdgeId] {
        match &self.mode {
            InteractionMode::NodeDragging(drag) => &drag.hovered,
            _ => &[],
        }
    }

    /// Abandon the current gesture without touching the scene
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            tracing::debug!("interaction cancelled");
        }
        self.mode = InteractionMode::Idle;
    }

    /// Handle a button press
    pub fn pointer_down(&mut self, scene: &mut Scene, event: PointerEvent) -> Gesture {
        if let InteractionMode::EdgeDragging(drag) = &self.mode {
            // Click-to-connect: the second press finishes the drag
            let drag = drag.clone();
            return self.finish_edge_drag(scene, &drag, &event);
        }
        if !self.is_idle() {
            return Gesture::None;
        }

        let ctrl = event.modifiers.ctrl;
        let shift = event.modifiers.shift;
        let hit = match self.snap_target(scene, &event, None) {
            Some((socket, _)) => HitTarget::Socket(socket),
            None => event.hit,
        };
        match hit {
            HitTarget::Socket(socket) => {
                let edges = scene
                    .socket(socket)
                    .map(|s| s.edges().to_vec())
                    .unwrap_or_default();
                if ctrl && !edges.is_empty() {
                    tracing::debug!(socket = socket.0, edges = edges.len(), "start rerouting");
                    self.mode = InteractionMode::EdgesRerouting(EdgeReroute {
                        socket,
                        edges,
                        pointer: event.pos,
                        snapped: None,
                    });
                } else if scene.socket(socket).is_some() {
                    tracing::debug!(socket = socket.0, "start edge drag");
                    self.mode = InteractionMode::EdgeDragging(EdgeDrag {
                        from: socket,
                        press_pos: event.pos,
                        pointer: event.pos,
                        snapped: None,
                    });
                }
            }
            HitTarget::Node(node) => {
                let item = SceneItem::Node(node);
                if shift {
                    scene.toggle_selection(item);
                } else if !scene.is_selected(item) {
                    scene.select(item, false);
                }
                self.mode = InteractionMode::NodeDragging(NodeDrag {
                    node,
                    last: event.pos,
                    moved: false,
                    hovered: Vec::new(),
                });
            }
            HitTarget::Edge(edge) => {
                let item = SceneItem::Edge(edge);
                if shift {
                    scene.toggle_selection(item);
                } else {
                    scene.select(item, false);
                }
            }
            HitTarget::None => {
                if ctrl {
                    tracing::debug!("start cut line");
                    self.mode = InteractionMode::EdgeCutting(vec![event.pos]);
                } else if !shift {
                    scene.clear_selection();
                }
            }
        }
        Gesture::None
    }

    /// Handle pointer motion
    pub fn pointer_move(&mut self, scene: &mut Scene, event: PointerEvent) {
        let source = match &self.mode {
            InteractionMode::EdgeDragging(drag) => Some(drag.from),
            InteractionMode::EdgesRerouting(reroute) => Some(reroute.socket),
            _ => None,
        };
        let snap = source.and_then(|from| self.snap_target(scene, &event, Some(from)));
        let pointer = snap.map_or(event.pos, |(_, anchor)| anchor);
        let snapped = snap.map(|(socket, _)| socket);

        match &mut self.mode {
            InteractionMode::Idle => {}
            InteractionMode::EdgeDragging(drag) => {
                drag.pointer = pointer;
                drag.snapped = snapped;
            }
            InteractionMode::EdgeCutting(points) => points.push(event.pos),
            InteractionMode::EdgesRerouting(reroute) => {
                reroute.pointer = pointer;
                reroute.snapped = snapped;
            }
            InteractionMode::NodeDragging(drag) => {
                let delta = event.pos - drag.last;
                drag.last = event.pos;
                if delta != Vec2::ZERO {
                    for id in scene.selected_nodes() {
                        if let Some(node) = scene.node_mut(id) {
                            node.position += delta;
                        }
                    }
                    drag.moved = true;
                }
                drag.hovered = scene.edges_under_node(drag.node);
            }
        }
    }

    /// Handle a button release
    pub fn pointer_up(&mut self, scene: &mut Scene, event: PointerEvent) -> Gesture {
        let mode = std::mem::take(&mut self.mode);
        let gesture = match mode {
            InteractionMode::Idle => Gesture::None,
            InteractionMode::EdgeDragging(drag) => {
                let travelled = drag.press_pos.distance(event.pos);
                if travelled > self.edge_drag_threshold {
                    self.finish_edge_drag(scene, &drag, &event)
                } else if matches!(event.hit, HitTarget::Socket(_)) {
                    // Released on a socket without dragging: wait for a second press
                    self.mode = InteractionMode::EdgeDragging(drag);
                    Gesture::None
                } else {
                    Gesture::Cancelled
                }
            }
            InteractionMode::EdgeCutting(mut points) => {
                points.push(event.pos);
                let cut = scene.cut_edges(&points);
                if cut > 0 {
                    scene.store_history("Delete cutted edges", true);
                    Gesture::EdgesCut(cut)
                } else {
                    Gesture::Cancelled
                }
            }
            InteractionMode::EdgesRerouting(reroute) => {
                match self.target_socket(scene, &event, reroute.socket) {
                    Some(target) => {
                        let moved = reroute
                            .edges
                            .iter()
                            .filter(|edge| {
                                scene
                                    .reconnect_edge(**edge, reroute.socket, target)
                                    .inspect_err(|err| {
                                        tracing::debug!(edge = edge.0, "reroute rejected: {err}");
                                    })
                                    .is_ok()
                            })
                            .count();
                        if moved > 0 {
                            scene.store_history("Rerouted edges", true);
                            Gesture::EdgesRerouted(moved)
                        } else {
                            Gesture::Cancelled
                        }
                    }
                    None => Gesture::Cancelled,
                }
            }
            InteractionMode::NodeDragging(drag) => {
                if drag.moved {
                    scene.store_history("Node moved", true);
                }
                match scene.drop_node_on_edge(drag.node) {
                    Some(edge) => Gesture::NodeDroppedOnEdge(edge),
                    None if drag.moved => Gesture::NodesMoved,
                    None => Gesture::None,
                }
            }
        };
        scene.notify_selection_changed();
        gesture
    }

    fn finish_edge_drag(&mut self, scene: &mut Scene, drag: &EdgeDrag, event: &PointerEvent) -> Gesture {
        self.mode = InteractionMode::Idle;
        let Some(target) = self.target_socket(scene, event, drag.from) else {
            return Gesture::Cancelled;
        };

        match scene.connect(drag.from, target, self.edge_type) {
            Ok(edge) => {
                scene.store_history("Created new edge by dragging", true);
                Gesture::EdgeCreated(edge)
            }
            Err(err) => {
                tracing::debug!("edge drag rejected: {err}");
                Gesture::EdgeRejected(err)
            }
        }
    }

    /// Socket in snapping range of the pointer while ctrl is held
    fn snap_target(
        &self,
        scene: &Scene,
        event: &PointerEvent,
        skip: Option<SocketId>,
    ) -> Option<(SocketId, Pos2)> {
        if !(event.modifiers.ctrl && self.snapping_enabled) {
            return None;
        }
        self.snapping.snap_where(scene, event.pos, |id| Some(id) != skip)
    }

    /// Socket a gesture ends on, other than `source`
    fn target_socket(&self, scene: &Scene, event: &PointerEvent, source: SocketId) -> Option<SocketId> {
        match self.snap_target(scene, event, Some(source)) {
            Some((socket, _)) => Some(socket),
            None => match event.hit {
                HitTarget::Socket(socket) if socket != source => Some(socket),
                _ => None,
            },
        }
    }
}

impl Scene {
    /// Topmost item under a scene position: sockets, then nodes, then edges
    pub fn hit_test(&self, pos: Pos2) -> HitTarget {
        for node in self.nodes.values().rev() {
            for socket in node.sockets() {
                if socket_hot_zone(node.socket_scene_position(socket)).contains(pos) {
                    return HitTarget::Socket(socket.id);
                }
            }
        }
        if let Some(node) = self.nodes.values().rev().find(|n| n.rect().contains(pos)) {
            return HitTarget::Node(node.id);
        }

        let area = Rect::from_center_size(pos, vec2(2.0, 2.0) * EDGE_HIT_TOLERANCE);
        self.edges()
            .map(|edge| edge.id)
            .find(|id| {
                self.edge_path(*id)
                    .is_some_and(|path| polyline_intersects_rect(&path, area))
            })
            .map_or(HitTarget::None, HitTarget::Edge)
    }

    /// Edges whose path crosses the box of `node`, ignoring its own edges
    pub fn edges_under_node(&self, node: NodeId) -> Vec<EdgeId> {
        let Some(n) = self.node(node) else {
            return Vec::new();
        };
        let rect = n.rect();
        self.edges()
            .filter(|edge| !n.has_connected_edge(edge.id))
            .filter(|edge| {
                self.edge_path(edge.id)
                    .is_some_and(|path| polyline_intersects_rect(&path, rect))
            })
            .map(|edge| edge.id)
            .collect()
    }

    /// Remove every edge crossed by the polyline. Returns how many went.
    pub fn cut_edges(&mut self, line: &[Pos2]) -> usize {
        let crossed: Vec<EdgeId> = self
            .edges()
            .map(|edge| edge.id)
            .filter(|id| {
                self.edge_path(*id).is_some_and(|path| {
                    line.windows(2)
                        .any(|seg| polyline_intersects_segment(&path, seg[0], seg[1]))
                })
            })
            .collect();
        for id in &crossed {
            self.remove_edge(*id);
        }
        crossed.len()
    }

    /// Splice a free node into the first edge under it.
    ///
    /// The node needs at least one input and one output and no edges. Both
    /// replacement edges are validated before anything changes. Returns the
    /// edge that was replaced.
    pub fn drop_node_on_edge(&mut self, node: NodeId) -> Option<EdgeId> {
        let n = self.node(node)?;
        if n.is_connected() {
            return None;
        }
        let input = n.input(0)?.id;
        let output = n.output(0)?.id;

        let edge_id = *self.edges_under_node(node).first()?;
        let edge = self.edge(edge_id)?.clone();

        if let Err(err) = self
            .validate_edge(edge.start, input)
            .and_then(|()| self.validate_edge(output, edge.end))
        {
            tracing::debug!(edge = edge_id.0, node = node.0, "node drop rejected: {err}");
            return None;
        }

        self.remove_edge(edge_id);
        self.store_history("Delete existing edge", true);

        let first = self.connect(edge.start, input, edge.edge_type);
        let second = self.connect(output, edge.end, edge.edge_type);
        if let Err(err) = first.and(second) {
            tracing::warn!(edge = edge_id.0, "splicing node into edge failed: {err}");
        }
        self.store_history("Created new edges by dropping node", true);
        Some(edge_id)
    }
}
