use crate::catalog::Catalog;
use crate::commands::helpers::{entity_id, entry_row, resolve_entry, EntrySelector, EntryState};
use crate::commands::{CmdMessage, CmdResult};
use crate::entries::ReferrerFilter;
use crate::error::Result;
use crate::model::Actor;
use crate::store::StorageBackend;

/// Active entries referring to the selected entry, scoped by referrer
/// schema names.
pub fn referrers<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    selector: &EntrySelector,
    include: &[String],
    exclude: &[String],
    keyword: Option<&str>,
) -> Result<CmdResult> {
    let entry = resolve_entry(catalog, selector, EntryState::Active)?;
    let filter = ReferrerFilter {
        include_entities: include
            .iter()
            .map(|name| entity_id(catalog, name))
            .collect::<Result<_>>()?,
        exclude_entities: exclude
            .iter()
            .map(|name| entity_id(catalog, name))
            .collect::<Result<_>>()?,
    };
    let mut result = CmdResult::default();
    for referrer in catalog.referrers(&entry, &filter, keyword, actor)? {
        result.listed_entries.push(entry_row(catalog, &referrer)?);
    }
    if result.listed_entries.is_empty() {
        result.add_message(CmdMessage::info(format!("Nothing refers to {}", entry.name)));
    }
    Ok(result)
}

/// Records the attribute (or schema attribute) `id` may point at.
pub fn candidates<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    id: u64,
    keyword: Option<&str>,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    result.candidates = catalog.referral_candidates(id, keyword, actor)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn lists_referrers_by_entity_name() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        fx.create("Server", "web-01", json!({"network": net.id.0}));
        let selector = EntrySelector::Id(net.id);

        let result = referrers(&fx.catalog, &fx.admin, &selector, &["Server".into()], &[], None).unwrap();
        assert_eq!(result.listed_entries.len(), 1);
        assert_eq!(result.listed_entries[0].name, "web-01");

        let none = referrers(&fx.catalog, &fx.admin, &selector, &[], &["Server".into()], None).unwrap();
        assert!(none.listed_entries.is_empty());
        assert_eq!(none.messages.len(), 1);
    }

    #[test]
    fn unknown_scope_entity_fails() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        assert!(referrers(
            &fx.catalog,
            &fx.admin,
            &EntrySelector::Id(net.id),
            &["Rack".into()],
            &[],
            None
        )
        .is_err());
    }

    #[test]
    fn candidates_for_schema_attribute() {
        let fx = Fixture::new();
        fx.create("Network", "net-a", json!({}));
        let schema = fx.schema_attr("Server", "uplink");
        let result = candidates(&fx.catalog, &fx.admin, schema.id.0, None).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].name, "net-a");
    }
}
