// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui front end for a [`Scene`].
//!
//! Translates egui pointer and keyboard input into interaction events and
//! paints nodes, sockets and edges. All editing goes through
//! [`InteractionState`]; this module only converts coordinates and draws.

use crate::edge::EdgeType;
use crate::geometry::{edge_path, SOCKET_RADIUS};
use crate::interaction::{Gesture, InteractionMode, InteractionState, Modifiers, PointerEvent};
use crate::node::{Node, NodeState};
use crate::scene::{Scene, SceneItem};
use crate::settings::EditorSettings;
use crate::socket::Socket;
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const NODE_SHADOW_OFFSET: f32 = 3.0;
const EDGE_THICKNESS: f32 = 2.5;
const GRID_SPACING: f32 = 20.0;

/// View state of the graph editor widget
#[derive(Debug, Clone)]
pub struct GraphEditorState {
    /// Editing state machine
    pub interaction: InteractionState,
    /// Pan offset in graph units
    pub pan: Vec2,
    /// Zoom factor
    pub zoom: f32,
    /// Show grid
    pub show_grid: bool,
    last_mouse_pos: Pos2,
}

impl GraphEditorState {
    /// Create a new editor view
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            interaction: InteractionState::new(settings),
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_grid: true,
            last_mouse_pos: Pos2::ZERO,
        }
    }

    /// Convert screen position to graph position
    pub fn screen_to_graph(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (screen_pos.x - center.x) / self.zoom - self.pan.x,
            (screen_pos.y - center.y) / self.zoom - self.pan.y,
        )
    }

    /// Convert graph position to screen position
    pub fn graph_to_screen(&self, graph_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (graph_pos.x + self.pan.x) * self.zoom + center.x,
            (graph_pos.y + self.pan.y) * self.zoom + center.y,
        )
    }

    /// Render the editor and apply input to `scene`
    pub fn ui(&mut self, ui: &mut egui::Ui, scene: &mut Scene) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.show_grid {
            self.draw_grid(&painter, rect);
        }

        self.handle_input(ui, &response, rect, scene);

        self.draw_edges(&painter, rect, scene);
        self.draw_pending(&painter, rect, scene);
        self.draw_nodes(&painter, rect, scene);
        self.draw_status_bar(ui, rect, scene);
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect, scene: &mut Scene) {
        let mouse_pos = ui.input(|i| i.pointer.hover_pos().unwrap_or(self.last_mouse_pos));
        let delta = mouse_pos - self.last_mouse_pos;
        self.last_mouse_pos = mouse_pos;

        // Zoom with scroll wheel
        ui.input(|i| {
            if rect.contains(mouse_pos) {
                let scroll_delta = i.raw_scroll_delta.y;
                if scroll_delta != 0.0 {
                    let zoom_factor = 1.0 + scroll_delta * 0.001;
                    self.zoom = (self.zoom * zoom_factor).clamp(0.1, 4.0);
                }
            }
        });

        // Pan with middle mouse
        if response.dragged_by(egui::PointerButton::Middle) {
            self.pan += delta / self.zoom;
        }

        let (pressed, released, moved, modifiers) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.delta() != Vec2::ZERO,
                Modifiers {
                    ctrl: i.modifiers.command,
                    shift: i.modifiers.shift,
                    alt: i.modifiers.alt,
                },
            )
        });

        let pos = self.screen_to_graph(mouse_pos, rect);
        let event = PointerEvent::new(pos, scene.hit_test(pos)).with_modifiers(modifiers);

        if pressed && rect.contains(mouse_pos) {
            report(self.interaction.pointer_down(scene, event));
        }
        if moved {
            self.interaction.pointer_move(scene, event);
        }
        if released {
            report(self.interaction.pointer_up(scene, event));
        }

        self.handle_keys(ui, scene);
    }

    fn handle_keys(&mut self, ui: &egui::Ui, scene: &mut Scene) {
        let (delete, undo, redo, escape) = ui.input(|i| {
            (
                i.key_pressed(egui::Key::Delete),
                i.modifiers.command && !i.modifiers.shift && i.key_pressed(egui::Key::Z),
                i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if escape {
            self.interaction.cancel();
        }
        if delete && self.interaction.is_idle() {
            scene.delete_selected();
        }
        if undo {
            if let Err(err) = scene.undo() {
                tracing::debug!("undo: {err}");
            }
        }
        if redo {
            if let Err(err) = scene.redo() {
                tracing::debug!("redo: {err}");
            }
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = GRID_SPACING * self.zoom;
        let grid_color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let offset = self.pan * self.zoom;

        let mut x = rect.left() + (rect.width() / 2.0 + offset.x) % spacing;
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, grid_color),
            );
            x += spacing;
        }

        let mut y = rect.top() + (rect.height() / 2.0 + offset.y) % spacing;
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, grid_color),
            );
            y += spacing;
        }
    }

    fn to_screen(&self, points: &[Pos2], rect: Rect) -> Vec<Pos2> {
        points.iter().map(|p| self.graph_to_screen(*p, rect)).collect()
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, scene: &Scene) {
        let hovered = self.interaction.hovered_edges();
        for edge in scene.edges() {
            let Some(path) = scene.edge_path(edge.id) else {
                continue;
            };
            let color = if scene.is_selected(SceneItem::Edge(edge.id)) {
                Color32::from_rgb(255, 167, 38)
            } else if hovered.contains(&edge.id) {
                Color32::from_rgb(74, 179, 255)
            } else {
                scene
                    .socket(edge.start)
                    .map_or(Color32::GRAY, socket_color)
            };
            painter.add(egui::Shape::line(
                self.to_screen(&path, rect),
                Stroke::new(EDGE_THICKNESS * self.zoom, color),
            ));
        }
    }

    fn draw_pending(&self, painter: &egui::Painter, rect: Rect, scene: &Scene) {
        match self.interaction.mode() {
            InteractionMode::EdgeDragging(drag) => {
                let Some(socket) = scene.socket(drag.from) else {
                    return;
                };
                let Some(anchor) = scene.socket_scene_position(drag.from) else {
                    return;
                };
                let (start, end) = if socket.is_output() {
                    (anchor, drag.pointer)
                } else {
                    (drag.pointer, anchor)
                };
                let path = edge_path(start, end, EdgeType::Bezier);
                painter.add(egui::Shape::dashed_line(
                    &self.to_screen(&path, rect),
                    Stroke::new(EDGE_THICKNESS * self.zoom, socket_color(socket)),
                    6.0,
                    4.0,
                ));
            }
            InteractionMode::EdgesRerouting(reroute) => {
                let pointer = self.graph_to_screen(reroute.pointer, rect);
                for edge in reroute.edges.iter().filter_map(|id| scene.edge(*id)) {
                    let Some(anchor) = edge
                        .other_socket(reroute.socket)
                        .and_then(|s| scene.socket_scene_position(s))
                    else {
                        continue;
                    };
                    painter.line_segment(
                        [self.graph_to_screen(anchor, rect), pointer],
                        Stroke::new(EDGE_THICKNESS * self.zoom, Color32::LIGHT_GRAY),
                    );
                }
            }
            InteractionMode::EdgeCutting(points) => {
                painter.add(egui::Shape::dashed_line(
                    &self.to_screen(points, rect),
                    Stroke::new(1.5, Color32::WHITE),
                    3.0,
                    3.0,
                ));
            }
            InteractionMode::Idle | InteractionMode::NodeDragging(_) => {}
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, scene: &Scene) {
        for node in scene.nodes() {
            let node_rect = node.rect();
            let screen_rect = Rect::from_min_size(
                self.graph_to_screen(node_rect.min, rect),
                node_rect.size() * self.zoom,
            );
            if !screen_rect.intersects(rect) {
                continue;
            }

            let rounding = node.geometry.edge_roundness * self.zoom;
            let is_selected = scene.is_selected(SceneItem::Node(node.id));

            let shadow_rect = screen_rect.translate(Vec2::new(NODE_SHADOW_OFFSET, NODE_SHADOW_OFFSET));
            painter.rect_filled(shadow_rect, rounding, Color32::from_rgba_unmultiplied(0, 0, 0, 60));

            let bg_color = if is_selected {
                Color32::from_rgb(60, 70, 90)
            } else {
                Color32::from_rgb(45, 45, 48)
            };
            painter.rect_filled(screen_rect, rounding, bg_color);

            let header_rect = Rect::from_min_size(
                screen_rect.min,
                Vec2::new(screen_rect.width(), node.geometry.title_height * self.zoom),
            );
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: rounding,
                    ne: rounding,
                    sw: 0.0,
                    se: 0.0,
                },
                state_color(node.state()),
            );
            painter.text(
                header_rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.title,
                egui::FontId::proportional(12.0 * self.zoom),
                Color32::WHITE,
            );
            painter.text(
                screen_rect.center() + Vec2::new(0.0, header_rect.height() / 2.0),
                egui::Align2::CENTER_CENTER,
                node.display_value(),
                egui::FontId::monospace(12.0 * self.zoom),
                Color32::from_gray(220),
            );

            if is_selected {
                painter.rect_stroke(
                    screen_rect,
                    rounding,
                    Stroke::new(2.0, Color32::from_rgb(255, 167, 38)),
                );
            }

            self.draw_sockets(painter, rect, node);
        }
    }

    fn draw_sockets(&self, painter: &egui::Painter, rect: Rect, node: &Node) {
        let radius = SOCKET_RADIUS * self.zoom;
        for socket in node.sockets() {
            let pos = self.graph_to_screen(node.socket_scene_position(socket), rect);
            painter.circle_filled(pos, radius, socket_color(socket));
            painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::BLACK));
        }
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui, rect: Rect, scene: &Scene) {
        let status_rect = Rect::from_min_size(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 20.0),
            Vec2::new(rect.width() - 10.0, 18.0),
        );

        ui.painter().text(
            status_rect.left_center(),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Edges: {} | Zoom: {:.0}% | Selected: {}{}",
                scene.node_count(),
                scene.edge_count(),
                self.zoom * 100.0,
                scene.selected_items().len(),
                if scene.is_modified() { " | modified" } else { "" },
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

impl Default for GraphEditorState {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

fn socket_color(socket: &Socket) -> Color32 {
    let [r, g, b] = socket.socket_type.color();
    Color32::from_rgb(r, g, b)
}

/// Title bar color for an evaluation state
fn state_color(state: NodeState) -> Color32 {
    match state {
        NodeState::Clean => Color32::from_rgb(70, 100, 130),
        NodeState::Dirty => Color32::from_rgb(150, 120, 40),
        NodeState::Invalid => Color32::from_rgb(150, 50, 50),
    }
}

fn report(gesture: Gesture) {
    match gesture {
        Gesture::None => {}
        Gesture::EdgeRejected(err) => tracing::info!("Cannot connect: {err}"),
        other => tracing::debug!("gesture finished: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_graph_round_trip() {
        let mut state = GraphEditorState::default();
        state.pan = Vec2::new(30.0, -12.0);
        state.zoom = 2.0;
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));

        let graph = Pos2::new(15.0, 40.0);
        let screen = state.graph_to_screen(graph, rect);
        let back = state.screen_to_graph(screen, rect);
        assert!((back - graph).length() < 1e-4);
    }

    #[test]
    fn test_state_colors_differ() {
        assert_ne!(state_color(NodeState::Clean), state_color(NodeState::Dirty));
        assert_ne!(state_color(NodeState::Dirty), state_color(NodeState::Invalid));
    }
}
