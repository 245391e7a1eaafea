//! Element-level edits of array attributes.

use crate::acl::AclLevel;
use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CatalogError, Result};
use crate::model::{Actor, Attribute, Entry};
use crate::store::StorageBackend;
use serde_json::Value as Json;

pub fn append<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    attr: &str,
    element: &Json,
) -> Result<CmdResult> {
    let (entry, attribute) = writable_attribute(catalog, actor, selector, attr)?;
    let written = catalog.append(&attribute, actor, element)?;
    finish(catalog, &entry, attr, written.is_some(), "appended to")
}

pub fn remove<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    attr: &str,
    element: &Json,
) -> Result<CmdResult> {
    let (entry, attribute) = writable_attribute(catalog, actor, selector, attr)?;
    let written = catalog.remove(&attribute, actor, element)?;
    finish(catalog, &entry, attr, written.is_some(), "removed from")
}

fn writable_attribute<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    name: &str,
) -> Result<(Entry, Attribute)> {
    let entry = resolve_entry(catalog, selector, EntryState::Active)?;
    catalog.require(actor, entry.id, &entry.acl, AclLevel::Writable, "editing an entry")?;
    let schema = catalog
        .active_schema_attrs(entry.entity_id)?
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| CatalogError::NotFound(format!("attribute '{}'", name)))?;
    let attribute = catalog.ensure_attribute(&entry, &schema, actor)?;
    if !catalog.can_access_attr(actor, &schema, Some(&attribute), AclLevel::Writable) {
        return Err(CatalogError::PermissionDenied(format!(
            "editing {} requires Writable permission",
            name
        )));
    }
    Ok((entry, attribute))
}

fn finish<B: StorageBackend>(
    catalog: &Catalog<B>,
    entry: &Entry,
    attr: &str,
    changed: bool,
    verb: &str,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if changed {
        let entry = catalog.entry_or_err(entry.id)?;
        catalog.publish_entry(&entry);
        result.add_message(CmdMessage::success(format!("Element {} {}", verb, attr)));
        result.affected_entries.push(entry_row(catalog, &entry)?);
    } else {
        result.add_message(CmdMessage::info(format!("{} unchanged", attr)));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn append_then_remove_element() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"ports": ["80"]}));
        let selector = EntrySelector::Id(server.id);

        let result = append(&fx.catalog, &fx.admin, &selector, "ports", &json!("443")).unwrap();
        assert_eq!(result.affected_entries.len(), 1);
        assert_eq!(fx.value_of(&server, "ports"), json!(["80", "443"]));

        remove(&fx.catalog, &fx.admin, &selector, "ports", &json!("80")).unwrap();
        assert_eq!(fx.value_of(&server, "ports"), json!(["443"]));
    }

    #[test]
    fn empty_element_reports_unchanged() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        let selector = EntrySelector::Id(server.id);
        let result = append(&fx.catalog, &fx.admin, &selector, "ports", &json!("")).unwrap();
        assert!(result.affected_entries.is_empty());
        assert!(result.messages[0].content.contains("unchanged"));
    }

    #[test]
    fn appended_values_are_searchable() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        append(&fx.catalog, &fx.admin, &EntrySelector::Id(server.id), "ports", &json!("8080")).unwrap();
        let hits = fx
            .catalog
            .search_simple(&fx.admin, "8080", &[], 10, 0)
            .unwrap();
        assert_eq!(hits.total, 1);
    }
}
