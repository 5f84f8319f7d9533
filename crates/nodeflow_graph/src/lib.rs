// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editing core for `nodeflow`.
//!
//! This crate provides everything a visual node editor needs below the
//! painting layer:
//! - Typed sockets and validated edges
//! - Nodes with cached values and dirty/invalid propagation
//! - A scene with selection, listeners and undo/redo history
//! - JSON documents with id remapping for copy/paste
//! - A pointer-driven interaction state machine
//!
//! ## Architecture
//!
//! A [`Scene`] owns nodes and edges by id. Sockets keep back references to
//! their edges as id lists. Node behavior is supplied through the
//! [`NodeEvaluator`] trait and looked up by op code in a [`NodeRegistry`].

pub mod socket;
pub mod edge;
pub mod validators;
pub mod node;
pub mod evaluation;
pub mod scene;
pub mod history;
pub mod serialization;
pub mod geometry;
pub mod snapping;
pub mod interaction;
pub mod settings;
pub mod ui;
pub mod graphs;

#[cfg(test)]
pub(crate) mod test_support;

pub use edge::{Edge, EdgeError, EdgeId, EdgeType};
pub use evaluation::{Evaluation, EvaluationError, InputValue, NodeEvaluator};
pub use history::{History, HistoryError};
pub use interaction::{Gesture, HitTarget, InteractionMode, InteractionState, Modifiers, PointerEvent};
pub use node::{Node, NodeId, NodeKind, NodeRegistry, NodeState, NodeTemplate};
pub use scene::{ListenerId, Scene, SceneError, SceneItem};
pub use serialization::{IdRemap, SceneDocument};
pub use settings::EditorSettings;
pub use socket::{Socket, SocketDirection, SocketId, SocketPosition, SocketType};
pub use validators::ValidatorChain;
