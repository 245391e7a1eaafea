use crate::catalog::Catalog;
use crate::commands::helpers::{entity_id, entry_row};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;
use serde_json::{Map, Value as Json};

pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    entity: &str,
    name: &str,
    attrs: &Map<String, Json>,
) -> Result<CmdResult> {
    let entry = catalog.create_entry(entity_id(catalog, entity)?, name, attrs, actor)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Entry created: {}/{} (#{})",
        entity, entry.name, entry.id
    )));
    result.affected_entries.push(entry_row(catalog, &entry)?);
    Ok(result)
}
