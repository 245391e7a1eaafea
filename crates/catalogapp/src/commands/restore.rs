use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Restore each selected soft-deleted entry with its chained referents.
pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selectors: &[EntrySelector],
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for selector in selectors {
        let entry = resolve_entry(catalog, selector, EntryState::Deleted)?;
        let restored = catalog.restore(entry.id, actor)?;
        result.add_message(CmdMessage::success(format!("Entry restored: {}", restored.name)));
        result.affected_entries.push(entry_row(catalog, &restored)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::delete;
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn restores_by_original_name() {
        let fx = Fixture::new();
        fx.create("Server", "web-01", json!({}));
        let selector: EntrySelector = "Server/web-01".parse().unwrap();
        delete::run(&fx.catalog, &fx.admin, &[selector.clone()]).unwrap();

        let result = run(&fx.catalog, &fx.admin, &[selector]).unwrap();
        assert_eq!(result.affected_entries[0].name, "web-01");
        assert!(result.affected_entries[0].is_active);
    }

    #[test]
    fn restore_into_taken_name_fails() {
        let fx = Fixture::new();
        let old = fx.create("Server", "web-01", json!({}));
        fx.catalog.soft_delete(old.id, &fx.admin).unwrap();
        fx.create("Server", "web-01", json!({}));

        let err = run(&fx.catalog, &fx.admin, &[EntrySelector::Id(old.id)]).unwrap_err();
        assert!(err.is_validation());
    }
}
