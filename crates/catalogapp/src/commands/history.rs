use crate::catalog::Catalog;
use crate::commands::helpers::{resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Value history of an active entry. `count` defaults to the configured
/// history page size.
pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    count: Option<usize>,
    offset: usize,
) -> Result<CmdResult> {
    let entry = resolve_entry(catalog, selector, EntryState::Active)?;
    let count = count.unwrap_or(catalog.config().max_history_count);
    let mut result = CmdResult::default();
    result.history = catalog.history(&entry, actor, count, offset)?;
    if result.history.is_empty() {
        result.add_message(CmdMessage::info(format!("No history for {}", entry.name)));
    }
    Ok(result)
}
