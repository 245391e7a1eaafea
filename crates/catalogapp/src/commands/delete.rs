use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Soft-delete each selected entry. Chained referents go with it.
pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selectors: &[EntrySelector],
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for selector in selectors {
        let entry = resolve_entry(catalog, selector, EntryState::Active)?;
        let original = entry.name.clone();
        let deleted = catalog.soft_delete(entry.id, actor)?;
        result.add_message(CmdMessage::success(format!("Entry deleted: {}", original)));
        result.affected_entries.push(entry_row(catalog, &deleted)?);
    }
    Ok(result)
}
