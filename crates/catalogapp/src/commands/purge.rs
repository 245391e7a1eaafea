use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Permanently destroy soft-deleted entries. Values elsewhere that pointed
/// at them keep their keys and lose the reference.
pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selectors: &[EntrySelector],
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for selector in selectors {
        let entry = resolve_entry(catalog, selector, EntryState::Deleted)?;
        let row = entry_row(catalog, &entry)?;
        catalog.purge_entry(entry.id, actor)?;
        result.add_message(CmdMessage::success(format!("Entry purged: {}", entry.base_name())));
        result.affected_entries.push(row);
    }
    Ok(result)
}
