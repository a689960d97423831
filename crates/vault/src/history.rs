//! The undo/redo action log.
//!
//! Each action records enough to invert one mutation. Reverting an action goes through the
//! ordinary `put`/`unput` paths, which record the inverse action in the chosen log, so replay
//! can never bypass id allocation or the timestamp rules.

use crate::model::{Entry, EntryId, Field, VaultDocument};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HistoryAction {
    /// An entry was created. Reverting deletes it.
    Create { id: EntryId },
    /// Fields of an entry changed. Reverting restores every `before` value.
    Update { id: EntryId, properties: Vec<PropertyChange> },
    /// An entry was deleted. Reverting re-inserts the snapshot under its original id.
    Delete { entry: Entry },
}

impl HistoryAction {
    /// The entry the action concerns.
    #[must_use]
    pub const fn entry_id(&self) -> EntryId {
        match self {
            Self::Create { id } | Self::Update { id, .. } => *id,
            Self::Delete { entry } => entry.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub key: Field,
    pub before: String,
    pub after: String,
}

/// Which log an action is appended to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryTarget {
    #[default]
    Undo,
    Redo,
}

impl HistoryTarget {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

/// Where a mutation records its history, and whether it invalidates the redo log.
///
/// The default appends to the undo log and clears the redo log, which is what every
/// user-initiated mutation needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    pub target: HistoryTarget,
    pub keep_redo: bool,
}

impl HistoryOptions {
    /// Appends to `target` and keeps the redo log, as undo and redo replay do.
    #[must_use]
    pub const fn replay(target: HistoryTarget) -> Self {
        Self { target, keep_redo: true }
    }
}

/// Options for `revert`. Unlike [`HistoryOptions`], the redo log is kept by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevertOptions {
    pub target: HistoryTarget,
    pub keep_redo: bool,
}

impl Default for RevertOptions {
    fn default() -> Self {
        Self { target: HistoryTarget::Undo, keep_redo: true }
    }
}

impl From<RevertOptions> for HistoryOptions {
    fn from(options: RevertOptions) -> Self {
        Self { target: options.target, keep_redo: options.keep_redo }
    }
}

impl VaultDocument {
    #[must_use]
    pub fn log(&self, target: HistoryTarget) -> &[HistoryAction] {
        match target {
            HistoryTarget::Undo => &self.undo_history,
            HistoryTarget::Redo => &self.redo_history,
        }
    }

    pub(crate) fn log_mut(&mut self, target: HistoryTarget) -> &mut Vec<HistoryAction> {
        match target {
            HistoryTarget::Undo => &mut self.undo_history,
            HistoryTarget::Redo => &mut self.redo_history,
        }
    }

    /// Appends `action` to the target log, then clears the redo log unless told to keep it.
    ///
    /// An action appended to the redo log without `keep_redo` is cleared along with it.
    pub(crate) fn record(&mut self, action: HistoryAction, options: HistoryOptions) {
        self.log_mut(options.target).push(action);
        if !options.keep_redo {
            self.redo_history.clear();
        }
    }
}
