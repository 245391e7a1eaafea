use crate::catalog::Catalog;
use crate::commands::helpers::{entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

pub fn run<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    source: &EntrySelector,
    names: &[String],
) -> Result<CmdResult> {
    let source = resolve_entry(catalog, source, EntryState::Active)?;
    let copies = catalog.copy_entry(source.id, names, actor)?;
    let mut result = CmdResult::default();
    for copy in &copies {
        result.affected_entries.push(entry_row(catalog, copy)?);
    }
    let requested = names.iter().filter(|n| !n.trim().is_empty()).count();
    let skipped = requested.saturating_sub(copies.len());
    result.add_message(CmdMessage::success(format!(
        "Copied {} to {} entries",
        source.name,
        copies.len()
    )));
    if skipped > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} names were skipped because they are already in use",
            skipped
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn copies_and_reports_skipped_names() {
        let fx = Fixture::new();
        let source = fx.create("Server", "web-01", json!({"ports": ["80"]}));
        fx.create("Server", "web-03", json!({}));
        let names = vec!["web-02".to_string(), "web-03".to_string(), " ".to_string()];

        let result = run(&fx.catalog, &fx.admin, &EntrySelector::Id(source.id), &names).unwrap();
        assert_eq!(result.affected_entries.len(), 1);
        assert_eq!(result.affected_entries[0].name, "web-02");
        assert_eq!(result.messages.len(), 2);

        let copy = fx.catalog.entry_or_err(result.affected_entries[0].id).unwrap();
        assert_eq!(fx.value_of(&copy, "ports"), json!(["80"]));
    }
}
