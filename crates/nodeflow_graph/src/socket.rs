// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::edge::EdgeId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(pub u64);

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketDirection {
    /// Input socket
    Input,
    /// Output socket
    Output,
}

/// Side of the node a socket is laid out on.
///
/// Serialized as the integers `1..=6` used by the document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SocketPosition {
    /// Left edge, stacked from the top
    LeftTop,
    /// Left edge, centered vertically
    LeftCenter,
    /// Left edge, stacked from the bottom
    LeftBottom,
    /// Right edge, stacked from the top
    RightTop,
    /// Right edge, centered vertically
    RightCenter,
    /// Right edge, stacked from the bottom
    RightBottom,
}

impl SocketPosition {
    /// Whether the socket sits on the left edge of its node
    pub fn is_left(self) -> bool {
        matches!(self, Self::LeftTop | Self::LeftCenter | Self::LeftBottom)
    }
}

impl From<SocketPosition> for u8 {
    fn from(position: SocketPosition) -> Self {
        match position {
            SocketPosition::LeftTop => 1,
            SocketPosition::LeftCenter => 2,
            SocketPosition::LeftBottom => 3,
            SocketPosition::RightTop => 4,
            SocketPosition::RightCenter => 5,
            SocketPosition::RightBottom => 6,
        }
    }
}

impl TryFrom<u8> for SocketPosition {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::LeftTop),
            2 => Ok(Self::LeftCenter),
            3 => Ok(Self::LeftBottom),
            4 => Ok(Self::RightTop),
            5 => Ok(Self::RightCenter),
            6 => Ok(Self::RightBottom),
            other => Err(format!("invalid socket position {other}")),
        }
    }
}

/// Data type tag of a socket. Sockets only connect to the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketType(pub u32);

impl SocketType {
    /// Get the color for this socket type (for UI)
    pub fn color(self) -> [u8; 3] {
        const PALETTE: [[u8; 3]; 7] = [
            [255, 119, 0],
            [82, 226, 32],
            [0, 86, 166],
            [168, 109, 177],
            [181, 71, 71],
            [219, 226, 32],
            [136, 136, 136],
        ];
        PALETTE[self.0 as usize % PALETTE.len()]
    }
}

/// A socket on a node
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    /// Unique socket ID
    pub id: SocketId,
    /// Owning node
    pub node: NodeId,
    /// Index within the owning node's inputs or outputs
    pub index: usize,
    /// Socket direction
    pub direction: SocketDirection,
    /// Side the socket is laid out on
    pub position: SocketPosition,
    /// Data type
    pub socket_type: SocketType,
    /// Display name
    pub name: String,
    /// Whether multiple edges are allowed
    pub multi_edges: bool,
    edges: Vec<EdgeId>,
}

impl Socket {
    /// Create a new socket without any edges
    pub fn new(
        id: SocketId,
        node: NodeId,
        index: usize,
        direction: SocketDirection,
        position: SocketPosition,
        socket_type: SocketType,
    ) -> Self {
        Self {
            id,
            node,
            index,
            direction,
            position,
            socket_type,
            name: String::new(),
            // Outputs fan out by default, inputs take a single edge
            multi_edges: direction == SocketDirection::Output,
            edges: Vec::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the multiplicity policy
    pub fn with_multi_edges(mut self, multi_edges: bool) -> Self {
        self.multi_edges = multi_edges;
        self
    }

    /// Check if this is an input socket
    pub fn is_input(&self) -> bool {
        self.direction == SocketDirection::Input
    }

    /// Check if this is an output socket
    pub fn is_output(&self) -> bool {
        self.direction == SocketDirection::Output
    }

    /// Record a connected edge
    pub fn connect(&mut self, edge: EdgeId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Forget a connected edge. Returns whether it was present.
    pub fn disconnect(&mut self, edge: EdgeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| *e != edge);
        self.edges.len() != before
    }

    /// Whether any edge is attached
    pub fn has_any_edge(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Whether a specific edge is attached
    pub fn has_edge(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    /// Connected edges in connection order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}
