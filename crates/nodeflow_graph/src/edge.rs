// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge (connection) definitions for the graph.

use crate::socket::SocketId;
use serde::{Deserialize, Serialize};

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

/// Path style used to draw an edge. Presentation only, kept for round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EdgeType {
    /// Straight line
    Direct,
    /// Cubic bezier curve
    #[default]
    Bezier,
    /// Orthogonal elbow path
    Square,
}

impl From<EdgeType> for u8 {
    fn from(edge_type: EdgeType) -> Self {
        match edge_type {
            EdgeType::Direct => 1,
            EdgeType::Bezier => 2,
            EdgeType::Square => 3,
        }
    }
}

impl TryFrom<u8> for EdgeType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Direct),
            2 => Ok(Self::Bezier),
            3 => Ok(Self::Square),
            other => Err(format!("invalid edge type {other}")),
        }
    }
}

/// A directed connection from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Output-side socket
    pub start: SocketId,
    /// Input-side socket
    pub end: SocketId,
    /// Path style
    pub edge_type: EdgeType,
}

impl Edge {
    /// Create a new edge
    pub fn new(id: EdgeId, start: SocketId, end: SocketId, edge_type: EdgeType) -> Self {
        Self {
            id,
            start,
            end,
            edge_type,
        }
    }

    /// Check if this edge touches a specific socket
    pub fn involves_socket(&self, socket: SocketId) -> bool {
        self.start == socket || self.end == socket
    }

    /// The endpoint opposite to `socket`, if `socket` is one of the ends
    pub fn other_socket(&self, socket: SocketId) -> Option<SocketId> {
        if self.start == socket {
            Some(self.end)
        } else if self.end == socket {
            Some(self.start)
        } else {
            None
        }
    }
}

/// Why an edge could not be created or rerouted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    /// Socket not found
    #[error("Socket not found: {0:?}")]
    SocketNotFound(SocketId),

    /// Edge not found
    #[error("Edge not found: {0:?}")]
    EdgeNotFound(EdgeId),

    /// Both sockets are inputs or both are outputs
    #[error("Cannot connect two sockets of the same direction")]
    SameDirection,

    /// Both sockets belong to one node
    #[error("Cannot connect a node to itself")]
    SameNode,

    /// Socket type tags differ
    #[error("Socket types differ ({0} vs {1})")]
    TypeMismatch(u32, u32),

    /// The edge would close a directed cycle
    #[error("Connection would create a loop")]
    Cycle,

    /// Target socket takes a single edge and is occupied
    #[error("Socket already connected: {0:?}")]
    SocketOccupied(SocketId),

    /// Rejected by a user-registered validator
    #[error("Rejected by validator '{0}'")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_socket() {
        let edge = Edge::new(EdgeId(1), SocketId(2), SocketId(3), EdgeType::Direct);
        assert_eq!(edge.other_socket(SocketId(2)), Some(SocketId(3)));
        assert_eq!(edge.other_socket(SocketId(3)), Some(SocketId(2)));
        assert_eq!(edge.other_socket(SocketId(4)), None);
        assert!(edge.involves_socket(SocketId(3)));
    }

    #[test]
    fn test_edge_type_codes() {
        assert_eq!(serde_json::to_string(&EdgeType::Square).unwrap(), "3");
        assert_eq!(serde_json::from_str::<EdgeType>("1").unwrap(), EdgeType::Direct);
        assert!(serde_json::from_str::<EdgeType>("0").is_err());
    }
}
