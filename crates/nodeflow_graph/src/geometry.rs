// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layout geometry: node boxes, socket anchors, edge paths and hit math.
//!
//! All coordinates are scene space. Nothing here paints; the presentation
//! layer and the interaction state machine both read these shapes.

use crate::edge::EdgeType;
use crate::socket::SocketPosition;
use egui::{pos2, vec2, Pos2, Rect};
use serde::{Deserialize, Serialize};

/// Radius of the drawn socket circle
pub const SOCKET_RADIUS: f32 = 6.0;
/// Outline width around the socket circle
pub const SOCKET_OUTLINE: f32 = 1.0;
/// Vertical control point offset for backwards bezier edges
pub const EDGE_CP_ROUNDNESS: f32 = 100.0;
/// Line segments used to approximate a bezier edge
const BEZIER_SEGMENTS: usize = 20;

/// Node box dimensions used for socket layout and hit testing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometry {
    /// Box width
    pub width: f32,
    /// Box height
    pub height: f32,
    /// Height of the title bar
    pub title_height: f32,
    /// Padding above and below the title text
    pub title_vertical_padding: f32,
    /// Corner rounding
    pub edge_roundness: f32,
    /// Padding around the content area
    pub edge_padding: f32,
    /// Vertical distance between neighbouring sockets
    pub socket_spacing: f32,
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 240.0,
            title_height: 24.0,
            title_vertical_padding: 4.0,
            edge_roundness: 10.0,
            edge_padding: 10.0,
            socket_spacing: 22.0,
        }
    }
}

impl NodeGeometry {
    /// Offset of a socket anchor relative to the node's top-left corner.
    ///
    /// `count` is the number of sockets sharing the same side.
    pub fn socket_offset(&self, position: SocketPosition, index: usize, count: usize) -> Pos2 {
        let x = if position.is_left() {
            -SOCKET_OUTLINE
        } else {
            self.width + SOCKET_OUTLINE
        };
        let index = index as f32;

        let y = match position {
            SocketPosition::LeftBottom | SocketPosition::RightBottom => {
                self.height
                    - self.edge_roundness
                    - self.title_vertical_padding
                    - index * self.socket_spacing
            }
            SocketPosition::LeftCenter | SocketPosition::RightCenter => {
                let top = self.title_height + 2.0 * self.title_vertical_padding + self.edge_padding;
                let available = self.height - top;
                let mut y = top + available / 2.0 + (index - 0.5) * self.socket_spacing;
                if count > 1 {
                    y -= self.socket_spacing * (count - 1) as f32 / 2.0;
                }
                y
            }
            SocketPosition::LeftTop | SocketPosition::RightTop => {
                self.title_height
                    + self.title_vertical_padding
                    + self.edge_roundness
                    + index * self.socket_spacing
            }
        };

        pos2(x, y)
    }
}

/// Square hot zone around a socket anchor
pub fn socket_hot_zone(anchor: Pos2) -> Rect {
    let half = SOCKET_RADIUS + SOCKET_OUTLINE;
    Rect::from_center_size(anchor, vec2(2.0 * half, 2.0 * half))
}

/// Sample the path of an edge into a polyline.
///
/// `start` is the output-side anchor. Bezier edges that run backwards bend
/// vertically so they stay readable.
pub fn edge_path(start: Pos2, end: Pos2, edge_type: EdgeType) -> Vec<Pos2> {
    match edge_type {
        EdgeType::Direct => vec![start, end],
        EdgeType::Square => {
            let mid_x = start.x + (end.x - start.x) * 0.5;
            vec![start, pos2(mid_x, start.y), pos2(mid_x, end.y), end]
        }
        EdgeType::Bezier => {
            let dist = (end.x - start.x) * 0.5;
            let (mut cpx_s, mut cpx_d) = (dist, -dist);
            let (mut cpy_s, mut cpy_d) = (0.0, 0.0);

            if start.x > end.x {
                cpx_s = -cpx_s;
                cpx_d = -cpx_d;
                let dy = start.y - end.y;
                let sign = if dy == 0.0 { 0.0 } else { dy.signum() };
                cpy_d = sign * EDGE_CP_ROUNDNESS;
                cpy_s = -sign * EDGE_CP_ROUNDNESS;
            }

            bezier_points(
                start,
                pos2(start.x + cpx_s, start.y + cpy_s),
                pos2(end.x + cpx_d, end.y + cpy_d),
                end,
                BEZIER_SEGMENTS,
            )
        }
    }
}

/// Generate points along a cubic bezier curve
pub fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
        let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;

        points.push(pos2(x, y));
    }
    points
}

/// Whether segment `a1-a2` crosses segment `b1-b2`. Parallel segments never cross.
pub fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    let denom = (a1.x - a2.x) * (b1.y - b2.y) - (a1.y - a2.y) * (b1.x - b2.x);
    if denom.abs() < 1e-4 {
        return false;
    }

    let t = ((a1.x - b1.x) * (b1.y - b2.y) - (a1.y - b1.y) * (b1.x - b2.x)) / denom;
    let u = -((a1.x - a2.x) * (a1.y - b1.y) - (a1.y - a2.y) * (a1.x - b1.x)) / denom;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Whether any segment of `path` crosses segment `a-b`
pub fn polyline_intersects_segment(path: &[Pos2], a: Pos2, b: Pos2) -> bool {
    path.windows(2)
        .any(|w| segments_intersect(w[0], w[1], a, b))
}

/// Whether `path` enters `rect`, either by a vertex inside it or by crossing its border
pub fn polyline_intersects_rect(path: &[Pos2], rect: Rect) -> bool {
    if path.iter().any(|p| rect.contains(*p)) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|i| polyline_intersects_segment(path, corners[i], corners[(i + 1) % 4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_offsets_by_side() {
        let geometry = NodeGeometry::default();

        let left = geometry.socket_offset(SocketPosition::LeftTop, 0, 1);
        let right = geometry.socket_offset(SocketPosition::RightTop, 0, 1);
        assert_eq!(left.x, -1.0);
        assert_eq!(right.x, 181.0);
        assert_eq!(left.y, 24.0 + 4.0 + 10.0);

        let second = geometry.socket_offset(SocketPosition::LeftTop, 1, 2);
        assert_eq!(second.y - left.y, 22.0);

        let bottom = geometry.socket_offset(SocketPosition::RightBottom, 0, 1);
        assert_eq!(bottom.y, 240.0 - 10.0 - 4.0);
    }

    #[test]
    fn test_center_sockets_are_symmetric() {
        let geometry = NodeGeometry::default();
        let a = geometry.socket_offset(SocketPosition::LeftCenter, 0, 2);
        let b = geometry.socket_offset(SocketPosition::LeftCenter, 1, 2);
        assert_eq!(b.y - a.y, geometry.socket_spacing);
    }

    #[test]
    fn test_segments_intersect() {
        assert!(segments_intersect(
            pos2(0.0, 0.0),
            pos2(10.0, 10.0),
            pos2(0.0, 10.0),
            pos2(10.0, 0.0),
        ));
        assert!(!segments_intersect(
            pos2(0.0, 0.0),
            pos2(10.0, 0.0),
            pos2(0.0, 5.0),
            pos2(10.0, 5.0),
        ));
        assert!(!segments_intersect(
            pos2(0.0, 0.0),
            pos2(1.0, 1.0),
            pos2(5.0, 0.0),
            pos2(5.0, 10.0),
        ));
    }

    #[test]
    fn test_paths_keep_endpoints() {
        let start = pos2(0.0, 0.0);
        let end = pos2(200.0, 50.0);
        for edge_type in [EdgeType::Direct, EdgeType::Bezier, EdgeType::Square] {
            let path = edge_path(start, end, edge_type);
            assert_eq!(path.first(), Some(&start));
            assert_eq!(path.last().copied().map(|p| p.round()), Some(end));
        }
    }

    #[test]
    fn test_polyline_rect() {
        let rect = Rect::from_min_max(pos2(40.0, -10.0), pos2(60.0, 10.0));
        let through = [pos2(0.0, 0.0), pos2(100.0, 0.0)];
        let beside = [pos2(0.0, 50.0), pos2(100.0, 50.0)];
        assert!(polyline_intersects_rect(&through, rect));
        assert!(!polyline_intersects_rect(&beside, rect));
    }
}
