// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history built from whole-scene snapshots.
//!
//! Each stamp stores the serialized document plus the selection at the time
//! it was taken. Undo and redo move a cursor over the stack and restore the
//! stamp under it.

use crate::scene::{Scene, SceneItem};
use crate::serialization::{IdRemap, SceneDocument};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum number of stamps
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot could not be loaded back into the scene
    #[error("Failed to restore snapshot: {0}")]
    Restore(String),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized scene state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized document
    pub data: Vec<u8>,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_vec(value)?))
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

/// One undo step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStamp {
    /// Human-readable description
    pub description: String,
    /// Scene state after the change
    pub snapshot: StateSnapshot,
    /// Selection after the change
    pub selection: Vec<SceneItem>,
}

/// Bounded undo/redo stack
#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<HistoryStamp>,
    /// Number of stamps up to and including the current one
    cursor: usize,
    limit: usize,
}

impl History {
    /// Create an empty history holding at most `limit` stamps
    pub fn new(limit: usize) -> Self {
        Self {
            stack: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Append a stamp, dropping the redo tail and the oldest stamp past the limit
    pub fn push(&mut self, stamp: HistoryStamp) {
        self.stack.truncate(self.cursor);
        if self.stack.len() >= self.limit {
            self.stack.remove(0);
        }
        self.stack.push(stamp);
        self.cursor = self.stack.len();
    }

    /// Whether there is an earlier stamp to go back to
    pub fn can_undo(&self) -> bool {
        self.cursor > 1
    }

    /// Whether there is a later stamp to go forward to
    pub fn can_redo(&self) -> bool {
        self.cursor < self.stack.len()
    }

    /// Move one step back and return the stamp to restore
    pub fn step_back(&mut self) -> Option<&HistoryStamp> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Move one step forward and return the stamp to restore
    pub fn step_forward(&mut self) -> Option<&HistoryStamp> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Stamp under the cursor
    pub fn current(&self) -> Option<&HistoryStamp> {
        self.cursor.checked_sub(1).and_then(|i| self.stack.get(i))
    }

    /// Zero-based index of the current stamp
    pub fn current_step(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    /// Descriptions of every stamp, oldest first
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().map(|s| s.description.as_str())
    }

    /// Drop every stamp
    pub fn clear(&mut self) {
        self.stack.clear();
        self.cursor = 0;
    }

    /// Number of stamps
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether there are no stamps
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl Scene {
    /// Record the current state as a named undo step
    pub fn store_history(&mut self, description: &str, set_modified: bool) {
        if set_modified {
            self.set_modified(true);
        }
        match StateSnapshot::from_value(&self.serialize()) {
            Ok(snapshot) => {
                tracing::debug!(description, "storing history stamp");
                let selection = self.selected_items();
                self.history.push(HistoryStamp {
                    description: description.to_string(),
                    snapshot,
                    selection,
                });
            }
            Err(err) => tracing::warn!(description, "failed to snapshot scene: {err}"),
        }
    }

    /// Record the baseline state every undo eventually returns to
    pub fn store_initial_history_stamp(&mut self) {
        self.store_history("Initial History Stamp", false);
    }

    /// Restore the previous stamp
    pub fn undo(&mut self) -> Result<()> {
        let stamp = self
            .history
            .step_back()
            .cloned()
            .ok_or(HistoryError::NothingToUndo)?;
        self.restore_stamp(&stamp).inspect_err(|_| {
            self.history.step_forward();
        })
    }

    /// Restore the next stamp
    pub fn redo(&mut self) -> Result<()> {
        let stamp = self
            .history
            .step_forward()
            .cloned()
            .ok_or(HistoryError::NothingToRedo)?;
        self.restore_stamp(&stamp).inspect_err(|_| {
            self.history.step_back();
        })
    }

    /// Whether undo is possible
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is possible
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The undo stack
    pub fn history(&self) -> &History {
        &self.history
    }

    fn restore_stamp(&mut self, stamp: &HistoryStamp) -> Result<()> {
        let document: SceneDocument = stamp.snapshot.to_value()?;
        if let Err(err) = self.deserialize(document, &mut IdRemap::new(), true) {
            tracing::warn!(description = %stamp.description, "history restore failed: {err}");
            return Err(HistoryError::Restore(err.to_string()));
        }
        self.set_selection(&stamp.selection);
        self.set_modified(true);
        tracing::debug!(description = %stamp.description, "restored history stamp");
        Ok(())
    }
}
