//! # Command Layer
//!
//! Each command lives in its own submodule and exposes a `run` function that
//! composes catalog operations into one user-level action.
//!
//! Commands:
//! - take typed arguments (selectors, JSON attribute maps, principals)
//! - return a structured [`CmdResult`] with affected entries and messages
//! - never print, exit, or prompt
//!
//! The UI layer decides how to render a [`CmdResult`].
//!
//! ## Testing Strategy
//!
//! Command tests run against [`crate::test_utils::Fixture`], an in-memory
//! catalog with a small infrastructure schema. Engine invariants are tested in
//! their own modules; command tests cover resolution and result shaping.
//!
//! ## Command Modules
//!
//! - [`schema`]: Load or reload a schema document
//! - [`create`]: Create an entry with initial attribute values
//! - [`update`]: Rename an entry or write attribute values
//! - [`values`]: Append to or remove from an array attribute
//! - [`view`]: Snapshots and portable exports
//! - [`copy`]: Copy an entry under new names
//! - [`delete`]: Soft-delete entries with chained referents
//! - [`restore`]: Restore soft-deleted entries
//! - [`purge`]: Destroy soft-deleted entries
//! - [`history`]: Value history of an entry
//! - [`referrals`]: Reverse references and referral candidates
//! - [`search`]: Faceted and keyword search, reindexing
//! - [`helpers`]: Selector parsing and resolution

use crate::entries::{Candidate, EntrySnapshot, HistoryRecord};
use crate::model::{EntryId, Entry};
use crate::search::{SearchResults, SimpleResults};
use serde::Serialize;
use serde_json::Value as Json;

pub mod copy;
pub mod create;
pub mod delete;
pub mod helpers;
pub mod history;
pub mod purge;
pub mod referrals;
pub mod restore;
pub mod schema;
pub mod search;
pub mod update;
pub mod values;
pub mod view;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// An entry as listed in command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRow {
    pub id: EntryId,
    pub entity: String,
    pub name: String,
    pub is_active: bool,
}

impl EntryRow {
    pub fn new(entry: &Entry, entity: impl Into<String>) -> Self {
        Self {
            id: entry.id,
            entity: entity.into(),
            name: entry.name.clone(),
            is_active: entry.is_active,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    /// Entries the command modified.
    pub affected_entries: Vec<EntryRow>,
    /// Entries to display (referrers, listings).
    pub listed_entries: Vec<EntryRow>,
    pub snapshots: Vec<EntrySnapshot>,
    pub exports: Vec<Json>,
    pub history: Vec<HistoryRecord>,
    pub candidates: Vec<Candidate>,
    pub search: Option<SearchResults>,
    pub simple_search: Option<SimpleResults>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_entries(mut self, entries: Vec<EntryRow>) -> Self {
        self.affected_entries = entries;
        self
    }

    pub fn with_listed_entries(mut self, entries: Vec<EntryRow>) -> Self {
        self.listed_entries = entries;
        self
    }
}
