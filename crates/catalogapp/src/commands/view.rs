use crate::catalog::Catalog;
use crate::commands::helpers::{resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Snapshots of the selected entries. Entries the actor cannot read are
/// reported as messages rather than failing the whole batch.
pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selectors: &[EntrySelector],
    with_metadata: bool,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for selector in selectors {
        let entry = resolve_entry(catalog, selector, EntryState::Active)?;
        match catalog.snapshot(&entry, actor, with_metadata)? {
            Some(snapshot) => result.snapshots.push(snapshot),
            None => result.add_message(CmdMessage::warning(format!("{} is not readable", selector))),
        }
    }
    Ok(result)
}

/// Portable `{"name", "entity", "attrs"}` documents of the selected entries.
pub fn export<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selectors: &[EntrySelector],
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for selector in selectors {
        let entry = resolve_entry(catalog, selector, EntryState::Active)?;
        match catalog.export_entry(&entry, actor)? {
            Some(doc) => result.exports.push(doc),
            None => result.add_message(CmdMessage::warning(format!("{} is not readable", selector))),
        }
    }
    Ok(result)
}
