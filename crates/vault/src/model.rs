//! The decrypted vault document and its entries.
//!
//! The JSON shape is the plaintext inside every envelope:
//!
//! ```json
//! { "nextId": 3,
//!   "passwords": [ { "id": 1, "description": "", "url": "", "username": "",
//!                    "password": "…", "created": 1700000000000, "modified": 1700000000000 } ],
//!   "undoHistory": [ { "action": "create", "id": 1 } ],
//!   "redoHistory": [] }
//! ```
//!
//! Timestamps are Unix milliseconds.

use crate::history::HistoryAction;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub type EntryId = u64;

/// One stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Set once when the entry is first created.
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    /// Refreshed only when the password changes.
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub modified: DateTime<Utc>,
    /// Applied in memory but not yet confirmed by the store. Never persisted.
    #[serde(skip)]
    pub volatile: bool,
}

impl Entry {
    /// A draft that updates this entry when passed to `put`.
    #[must_use]
    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            id: Some(self.id),
            description: self.description.clone(),
            url: self.url.clone(),
            username: self.username.clone(),
            password: Some(self.password.clone()),
        }
    }

    #[must_use]
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Description => &self.description,
            Field::Url => &self.url,
            Field::Username => &self.username,
            Field::Password => &self.password,
        }
    }
}

/// The writable fields of an [`Entry`].
///
/// `created` and `modified` are managed by the vault and cannot be set through a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Description,
    Url,
    Username,
    Password,
}

impl Field {
    pub const ALL: [Self; 4] = [Self::Description, Self::Url, Self::Username, Self::Password];

    /// Fields that search may look at. The password is never among them.
    pub const SEARCHABLE: [Self; 3] = [Self::Description, Self::Url, Self::Username];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Url => "url",
            Self::Username => "username",
            Self::Password => "password",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to `put`: a new entry when `id` is `None`, otherwise an update of that entry.
///
/// A missing or empty password is replaced with a generated one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub id: Option<EntryId>,
    pub description: String,
    pub url: String,
    pub username: String,
    pub password: Option<String>,
}

impl EntryDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Description => self.description = value,
            Field::Url => self.url = value,
            Field::Username => self.username = value,
            Field::Password => self.password = Some(value),
        }
    }
}

/// The decrypted root object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDocument {
    /// Next id to hand out. Strictly greater than every id ever assigned.
    #[serde(default = "first_id")]
    pub next_id: EntryId,
    /// Entries in display order.
    #[serde(rename = "passwords", default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub undo_history: Vec<HistoryAction>,
    #[serde(default)]
    pub redo_history: Vec<HistoryAction>,
}

const fn first_id() -> EntryId {
    1
}

impl Default for VaultDocument {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            entries: Vec::new(),
            undo_history: Vec::new(),
            redo_history: Vec::new(),
        }
    }
}

impl VaultDocument {
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub(crate) fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Checks id uniqueness and raises `next_id` above the largest id present.
    ///
    /// Returns the first duplicated id, if any.
    pub(crate) fn repair(&mut self) -> Result<(), EntryId> {
        let mut seen = fxhash::FxHashSet::default();
        for entry in &self.entries {
            if !seen.insert(entry.id) {
                return Err(entry.id);
            }
        }
        if let Some(max) = self.entries.iter().map(|entry| entry.id).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        Ok(())
    }
}

/// The current time at the millisecond precision documents are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_uses_the_stored_field_names() {
        let mut doc = VaultDocument::default();
        doc.entries.push(Entry {
            id: 1,
            description: "Amazon".into(),
            url: String::new(),
            username: "john".into(),
            password: "12345".into(),
            created: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            modified: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            volatile: true,
        });
        doc.next_id = 2;

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["nextId"], 2);
        assert_eq!(json["passwords"][0]["created"], 1_700_000_000_000_i64);
        assert!(json["passwords"][0].get("volatile").is_none());
        assert!(json["undoHistory"].as_array().unwrap().is_empty());
    }

    #[test]
    fn legacy_entries_without_timestamps_still_parse() {
        let doc: VaultDocument = serde_json::from_str(
            r#"{"nextId":2,"passwords":[{"id":1,"username":"john","password":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.entries[0].created, DateTime::<Utc>::default());
        assert!(doc.redo_history.is_empty());
    }

    #[test]
    fn repair_raises_next_id_and_finds_duplicates() {
        let mut doc: VaultDocument =
            serde_json::from_str(r#"{"nextId":1,"passwords":[{"id":4},{"id":2}]}"#).unwrap();
        assert_eq!(doc.repair(), Ok(()));
        assert_eq!(doc.next_id, 5);

        let mut dup: VaultDocument =
            serde_json::from_str(r#"{"passwords":[{"id":3},{"id":3}]}"#).unwrap();
        assert_eq!(dup.repair(), Err(3));
    }

    #[test]
    fn draft_round_trips_an_entry() {
        let draft = EntryDraft::new().description("mail").username("me").password("pw");
        assert_eq!(draft.id, None);
        assert_eq!(draft.password.as_deref(), Some("pw"));
    }
}
