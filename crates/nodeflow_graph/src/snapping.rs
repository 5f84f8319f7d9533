// SPDX-License-Identifier: MIT OR Apache-2.0
//! Magnetic socket lookup for edge dragging.

use crate::geometry::socket_hot_zone;
use crate::scene::Scene;
use crate::socket::SocketId;
use egui::{vec2, Pos2, Rect};

/// Finds the socket closest to the pointer within a square scan area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocketSnapping {
    /// Half-size of the scan square
    pub radius: f32,
}

impl Default for SocketSnapping {
    fn default() -> Self {
        Self { radius: 24.0 }
    }
}

impl SocketSnapping {
    /// Create with a scan radius
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// Nearest socket whose hot zone touches the scan square around `pos`,
    /// with its exact anchor. Ties keep the first socket found.
    pub fn snap(&self, scene: &Scene, pos: Pos2) -> Option<(SocketId, Pos2)> {
        self.snap_where(scene, pos, |_| true)
    }

    /// Like [`SocketSnapping::snap`], considering only sockets `accept` allows
    pub fn snap_where(
        &self,
        scene: &Scene,
        pos: Pos2,
        accept: impl Fn(SocketId) -> bool,
    ) -> Option<(SocketId, Pos2)> {
        let scan = Rect::from_center_size(pos, vec2(2.0 * self.radius, 2.0 * self.radius));

        let mut best: Option<(SocketId, Pos2, f32)> = None;
        for node in scene.nodes() {
            for socket in node.sockets().filter(|s| accept(s.id)) {
                let anchor = node.socket_scene_position(socket);
                if !socket_hot_zone(anchor).intersects(scan) {
                    continue;
                }
                let dist = anchor.distance_sq(pos);
                if best.map_or(true, |(_, _, d)| dist < d) {
                    best = Some((socket.id, anchor, dist));
                }
            }
        }
        best.map(|(id, anchor, _)| (id, anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scene_with_pass_nodes;

    #[test]
    fn test_nearest_socket_wins() {
        let (mut scene, ids) = scene_with_pass_nodes(2);
        let near = scene.node(ids[0]).unwrap().inputs()[0].id;
        let anchor = scene.socket_scene_position(near).unwrap();

        // Second node's output sits 12 px away from the cursor
        let cursor = anchor + vec2(5.0, 0.0);
        let offset = {
            let node = scene.node(ids[1]).unwrap();
            let out = &node.outputs()[0];
            node.socket_scene_position(out) - node.position
        };
        scene.node_mut(ids[1]).unwrap().position = cursor + vec2(0.0, 12.0) - offset;

        let (found, at) = SocketSnapping::new(24.0).snap(&scene, cursor).unwrap();
        assert_eq!(found, near);
        assert_eq!(at, anchor);
    }

    #[test]
    fn test_nothing_in_range() {
        let (scene, ids) = scene_with_pass_nodes(1);
        let socket = scene.node(ids[0]).unwrap().inputs()[0].id;
        let anchor = scene.socket_scene_position(socket).unwrap();
        assert!(SocketSnapping::new(24.0)
            .snap(&scene, anchor + vec2(200.0, 200.0))
            .is_none());
    }
}
