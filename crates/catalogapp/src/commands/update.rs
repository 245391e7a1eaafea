use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;
use serde_json::{Map, Value as Json};

pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    new_name: Option<&str>,
    attrs: &Map<String, Json>,
) -> Result<CmdResult> {
    let entry = resolve_entry(catalog, selector, EntryState::Active)?;
    let updated = catalog.update_entry(entry.id, new_name, attrs, actor)?;
    let mut result = CmdResult::default();
    if updated.name != entry.name {
        result.add_message(CmdMessage::success(format!(
            "Entry renamed: {} -> {}",
            entry.name, updated.name
        )));
    } else {
        result.add_message(CmdMessage::success(format!("Entry updated: {}", updated.name)));
    }
    result.affected_entries.push(entry_row(catalog, &updated)?);
    Ok(result)
}
