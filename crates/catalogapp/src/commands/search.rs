use crate::catalog::Catalog;
use crate::commands::helpers::entity_id;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CatalogError, Result};
use crate::model::{Actor, EntityId};
use crate::search::{AttrHint, ReferralFilter, SearchRequest};
use crate::store::StorageBackend;

/// Faceted search arguments as a user types them.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    /// Entity names; empty means every active entity.
    pub entities: Vec<String>,
    /// `name`, `name=keyword` (substring) or `name==keyword` (exact).
    pub hints: Vec<String>,
    pub entry_name: String,
    /// `*` for any live referrer, otherwise a referrer name keyword.
    pub referral: Option<String>,
    pub limit: Option<usize>,
    pub output_all: bool,
}

pub fn parse_hint(raw: &str) -> Result<AttrHint> {
    let (name, keyword, exact) = match raw.split_once("==") {
        Some((name, keyword)) => (name, Some(keyword), true),
        None => match raw.split_once('=') {
            Some((name, keyword)) => (name, Some(keyword), false),
            None => (raw, None, false),
        },
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Api(format!("Invalid attribute hint '{}'", raw)));
    }
    let mut hint = AttrHint::new(name);
    if let Some(keyword) = keyword {
        hint = hint.with_keyword(keyword);
    }
    hint.exact = exact;
    Ok(hint)
}

pub fn advanced<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    args: &SearchArgs,
) -> Result<CmdResult> {
    let entities = if args.entities.is_empty() {
        catalog
            .store()
            .entities()?
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| e.id)
            .collect()
    } else {
        entity_ids(catalog, &args.entities)?
    };
    let mut request = SearchRequest::new(
        entities,
        args.limit.unwrap_or(catalog.config().max_list_entries),
    );
    request.attrs = args.hints.iter().map(|h| parse_hint(h)).collect::<Result<_>>()?;
    request.entry_name = args.entry_name.clone();
    request.referral = args.referral.as_deref().map(|r| match r.trim() {
        "*" => ReferralFilter::Any,
        keyword => ReferralFilter::Name(keyword.to_string()),
    });
    request.output_all = args.output_all;

    let found = catalog.search_entries(actor, &request)?;
    let mut result = CmdResult::default();
    if found.results.is_empty() {
        result.add_message(CmdMessage::info("No entries matched"));
    }
    result.search = Some(found);
    Ok(result)
}

pub fn simple<B: StorageBackend>(
    catalog: &Catalog<B>,
    actor: &Actor,
    keyword: &str,
    exclude: &[String],
    limit: Option<usize>,
    offset: usize,
) -> Result<CmdResult> {
    let exclude = entity_ids(catalog, exclude)?;
    let limit = limit.unwrap_or(catalog.config().max_list_entries);
    let found = catalog.search_simple(actor, keyword, &exclude, limit, offset)?;
    let mut result = CmdResult::default();
    if found.results.is_empty() {
        result.add_message(CmdMessage::info("No entries matched"));
    }
    result.simple_search = Some(found);
    Ok(result)
}

/// Rebuild every document from the store.
pub fn reindex<B: StorageBackend>(catalog: &Catalog<B>) -> Result<CmdResult> {
    let count = catalog.reindex()?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Reindexed {} entries", count)));
    Ok(result)
}

fn entity_ids<B: StorageBackend>(catalog: &Catalog<B>, names: &[String]) -> Result<Vec<EntityId>> {
    names.iter().map(|name| entity_id(catalog, name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn parses_hint_forms() {
        assert_eq!(parse_hint("hostname").unwrap(), AttrHint::new("hostname"));
        assert_eq!(
            parse_hint("hostname=web").unwrap(),
            AttrHint::new("hostname").with_keyword("web")
        );
        let exact = parse_hint("hostname==web-01").unwrap();
        assert!(exact.exact);
        assert_eq!(exact.keyword.as_deref(), Some("web-01"));
        assert!(parse_hint("=web").is_err());
    }

    #[test]
    fn advanced_search_defaults_to_all_entities() {
        let fx = Fixture::new();
        fx.create("Network", "net-a", json!({"cidr": "10.0.0.0/24"}));
        fx.create("Server", "web-01", json!({"hostname": "web-01.tokyo"}));

        let args = SearchArgs {
            output_all: true,
            ..SearchArgs::default()
        };
        let result = advanced(&fx.catalog, &fx.admin, &args).unwrap();
        assert_eq!(result.search.unwrap().total, 2);
    }

    #[test]
    fn advanced_search_filters_by_hint_and_referral() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        fx.create("Network", "net-b", json!({}));
        fx.create("Server", "web-01", json!({"network": net.id.0}));

        let args = SearchArgs {
            entities: vec!["Network".into()],
            referral: Some("*".into()),
            ..SearchArgs::default()
        };
        let found = advanced(&fx.catalog, &fx.admin, &args).unwrap().search.unwrap();
        assert_eq!(found.results.len(), 1);
        assert_eq!(found.results[0].entry.name, "net-a");

        let args = SearchArgs {
            entities: vec!["Server".into()],
            hints: vec!["network=net-b".into()],
            ..SearchArgs::default()
        };
        let result = advanced(&fx.catalog, &fx.admin, &args).unwrap();
        assert!(result.search.unwrap().results.is_empty());
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn simple_search_and_reindex() {
        let fx = Fixture::new();
        fx.create("Server", "web-01", json!({"hostname": "web-01.osaka"}));
        let result = reindex(&fx.catalog).unwrap();
        assert_eq!(result.messages[0].content, "Reindexed 1 entries");

        let found = simple(&fx.catalog, &fx.admin, "osaka", &[], None, 0)
            .unwrap()
            .simple_search
            .unwrap();
        assert_eq!(found.results.len(), 1);
        let excluded = simple(&fx.catalog, &fx.admin, "osaka", &["Server".into()], None, 0)
            .unwrap()
            .simple_search
            .unwrap();
        assert!(excluded.results.is_empty());
    }
}
