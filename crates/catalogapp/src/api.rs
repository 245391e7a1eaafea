//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for UI
//! clients. It:
//!
//! - parses user-facing selectors (`#42`, `Entity/name`) into [`EntrySelector`]s
//! - carries the acting [`Actor`] so callers don't thread it through every call
//! - returns structured [`CmdResult`]s
//!
//! Business logic belongs in `commands/*.rs` and the engine modules; the
//! facade only normalizes inputs and dispatches.
//!
//! ## Generic Over StorageBackend
//!
//! `CatalogApi<B: StorageBackend>` runs on [`crate::store::FsBackend`] in
//! production and [`crate::store::MemBackend`] in tests.

use crate::catalog::Catalog;
use crate::commands::{self, helpers::parse_selectors, search::SearchArgs};
use crate::error::Result;
use crate::model::Actor;
use crate::schema::SchemaDocument;
use crate::store::StorageBackend;
use serde_json::{Map, Value as Json};

pub use crate::commands::helpers::EntrySelector;
pub use crate::commands::{CmdMessage, CmdResult, EntryRow, MessageLevel};

pub struct CatalogApi<B: StorageBackend> {
    catalog: Catalog<B>,
    actor: Actor,
}

impl<B: StorageBackend> CatalogApi<B> {
    pub fn new(catalog: Catalog<B>, actor: Actor) -> Self {
        Self { catalog, actor }
    }

    /// Act as the actor registered under `name`, registering it if needed.
    pub fn for_actor_named(catalog: Catalog<B>, name: &str) -> Result<Self> {
        let actor = commands::helpers::resolve_actor(&catalog, name)?;
        Ok(Self::new(catalog, actor))
    }

    pub fn catalog(&self) -> &Catalog<B> {
        &self.catalog
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn load_schema(&self, doc: &SchemaDocument) -> Result<CmdResult> {
        commands::schema::run(&self.catalog, doc)
    }

    pub fn create_entry(&self, entity: &str, name: &str, attrs: &Map<String, Json>) -> Result<CmdResult> {
        commands::create::run(&self.catalog, &self.actor, entity, name, attrs)
    }

    pub fn update_entry(
        &self,
        selector: &str,
        new_name: Option<&str>,
        attrs: &Map<String, Json>,
    ) -> Result<CmdResult> {
        let selector: EntrySelector = selector.parse()?;
        commands::update::run(&self.catalog, &self.actor, &selector, new_name, attrs)
    }

    pub fn append_value(&self, selector: &str, attr: &str, element: &Json) -> Result<CmdResult> {
        let selector: EntrySelector = selector.parse()?;
        commands::values::append(&self.catalog, &self.actor, &selector, attr, element)
    }

    pub fn remove_value(&self, selector: &str, attr: &str, element: &Json) -> Result<CmdResult> {
        let selector: EntrySelector = selector.parse()?;
        commands::values::remove(&self.catalog, &self.actor, &selector, attr, element)
    }

    pub fn view_entries<I: AsRef<str>>(&self, selectors: &[I], with_metadata: bool) -> Result<CmdResult> {
        let selectors = parse_selectors(selectors)?;
        commands::view::run(&self.catalog, &self.actor, &selectors, with_metadata)
    }

    pub fn export_entries<I: AsRef<str>>(&self, selectors: &[I]) -> Result<CmdResult> {
        let selectors = parse_selectors(selectors)?;
        commands::view::export(&self.catalog, &self.actor, &selectors)
    }

    pub fn copy_entry(&self, source: &str, names: &[String]) -> Result<CmdResult> {
        let source: EntrySelector = source.parse()?;
        commands::copy::run(&self.catalog, &self.actor, &source, names)
    }

    pub fn delete_entries<I: AsRef<str>>(&self, selectors: &[I]) -> Result<CmdResult> {
        let selectors = parse_selectors(selectors)?;
        commands::delete::run(&self.catalog, &self.actor, &selectors)
    }

    pub fn restore_entries<I: AsRef<str>>(&self, selectors: &[I]) -> Result<CmdResult> {
        let selectors = parse_selectors(selectors)?;
        commands::restore::run(&self.catalog, &self.actor, &selectors)
    }

    pub fn purge_entries<I: AsRef<str>>(&self, selectors: &[I]) -> Result<CmdResult> {
        let selectors = parse_selectors(selectors)?;
        commands::purge::run(&self.catalog, &self.actor, &selectors)
    }

    pub fn history(&self, selector: &str, count: Option<usize>, offset: usize) -> Result<CmdResult> {
        let selector: EntrySelector = selector.parse()?;
        commands::history::run(&self.catalog, &self.actor, &selector, count, offset)
    }

    pub fn referrers(
        &self,
        selector: &str,
        include: &[String],
        exclude: &[String],
        keyword: Option<&str>,
    ) -> Result<CmdResult> {
        let selector: EntrySelector = selector.parse()?;
        commands::referrals::referrers(&self.catalog, &self.actor, &selector, include, exclude, keyword)
    }

    pub fn referral_candidates(&self, attr_id: u64, keyword: Option<&str>) -> Result<CmdResult> {
        commands::referrals::candidates(&self.catalog, &self.actor, attr_id, keyword)
    }

    pub fn search(&self, args: &SearchArgs) -> Result<CmdResult> {
        commands::search::advanced(&self.catalog, &self.actor, args)
    }

    pub fn search_simple(
        &self,
        keyword: &str,
        exclude: &[String],
        limit: Option<usize>,
        offset: usize,
    ) -> Result<CmdResult> {
        commands::search::simple(&self.catalog, &self.actor, keyword, exclude, limit, offset)
    }

    pub fn reindex(&self) -> Result<CmdResult> {
        commands::search::reindex(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::store::MemBackend;
    use crate::test_utils::schema_document;
    use serde_json::json;

    fn api() -> CatalogApi<MemBackend> {
        let api = CatalogApi::for_actor_named(Catalog::new(MemBackend::new()), "admin").unwrap();
        api.load_schema(&schema_document()).unwrap();
        api
    }

    fn attrs(value: Json) -> Map<String, Json> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn create_then_view_by_name() {
        let api = api();
        api.create_entry("Server", "web-01", &attrs(json!({"hostname": "h"})))
            .unwrap();
        let result = api.view_entries(&["Server/web-01"], false).unwrap();
        assert_eq!(result.snapshots.len(), 1);
        assert_eq!(result.snapshots[0].attr("hostname").unwrap().value, json!("h"));
    }

    #[test]
    fn bad_selectors_are_api_errors() {
        let api = api();
        assert!(matches!(api.view_entries(&["web-01"], false), Err(CatalogError::Api(_))));
        assert!(matches!(api.delete_entries(&["Server/"]), Err(CatalogError::Api(_))));
    }

    #[test]
    fn delete_restore_purge_dispatch() {
        let api = api();
        api.create_entry("Server", "web-01", &Map::new()).unwrap();
        assert_eq!(api.delete_entries(&["Server/web-01"]).unwrap().affected_entries.len(), 1);
        assert_eq!(api.restore_entries(&["Server/web-01"]).unwrap().affected_entries.len(), 1);
        api.delete_entries(&["Server/web-01"]).unwrap();
        assert_eq!(api.purge_entries(&["Server/web-01"]).unwrap().affected_entries.len(), 1);
        assert!(api.view_entries(&["Server/web-01"], false).is_err());
    }

    #[test]
    fn values_and_history_dispatch() {
        let api = api();
        api.create_entry("Server", "web-01", &Map::new()).unwrap();
        api.append_value("Server/web-01", "ports", &json!("22")).unwrap();
        api.append_value("Server/web-01", "ports", &json!("80")).unwrap();
        api.remove_value("Server/web-01", "ports", &json!("22")).unwrap();

        let history = api.history("Server/web-01", None, 0).unwrap().history;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].attribute, "ports");
    }
}
