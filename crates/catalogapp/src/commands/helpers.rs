use super::EntryRow;
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, ActorId, EntityId, Entry, EntryId};
use crate::store::StorageBackend;
use std::fmt;
use std::str::FromStr;

/// How a user names an entry: `#42`/`42` by id, or `Entity/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySelector {
    Id(EntryId),
    Name { entity: String, name: String },
}

impl FromStr for EntrySelector {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        if let Ok(id) = digits.parse::<u64>() {
            return Ok(EntrySelector::Id(EntryId(id)));
        }
        match raw.split_once('/') {
            Some((entity, name)) if !entity.trim().is_empty() && !name.trim().is_empty() => {
                Ok(EntrySelector::Name {
                    entity: entity.trim().to_string(),
                    name: name.trim().to_string(),
                })
            }
            _ => Err(CatalogError::Api(format!(
                "Invalid entry selector '{}': expected an id or Entity/name",
                raw
            ))),
        }
    }
}

impl fmt::Display for EntrySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySelector::Id(id) => write!(f, "#{}", id),
            EntrySelector::Name { entity, name } => write!(f, "{}/{}", entity, name),
        }
    }
}

/// Which lifecycle state a selector must resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Active,
    Deleted,
}

pub fn parse_selectors<I: AsRef<str>>(raw: &[I]) -> Result<Vec<EntrySelector>> {
    let mut selectors: Vec<EntrySelector> = Vec::new();
    for item in raw {
        let selector = item.as_ref().parse()?;
        if !selectors.contains(&selector) {
            selectors.push(selector);
        }
    }
    Ok(selectors)
}

pub fn entity_id<B: StorageBackend>(catalog: &Catalog<B>, name: &str) -> Result<EntityId> {
    catalog
        .store()
        .entity_by_name(name)?
        .filter(|e| e.is_active)
        .map(|e| e.id)
        .ok_or_else(|| CatalogError::NotFound(format!("entity '{}'", name)))
}

/// Resolve a selector to an entry in `state`. Deleted entries are matched
/// on their original name; the most recently deleted one wins.
pub fn resolve_entry<B: StorageBackend>(
    catalog: &Catalog<B>,
    selector: &EntrySelector,
    state: EntryState,
) -> Result<Entry> {
    let found = match selector {
        EntrySelector::Id(id) => catalog
            .store()
            .entry(*id)?
            .filter(|e| e.is_active == (state == EntryState::Active)),
        EntrySelector::Name { entity, name } => {
            let entries = catalog.store().entries_of(entity_id(catalog, entity)?)?;
            match state {
                EntryState::Active => entries.into_iter().find(|e| e.is_active && &e.name == name),
                EntryState::Deleted => entries
                    .into_iter()
                    .filter(|e| !e.is_active && &e.base_name() == name)
                    .max_by_key(|e| (e.deleted_at, e.id)),
            }
        }
    };
    found.ok_or_else(|| {
        let what = match state {
            EntryState::Active => "entry",
            EntryState::Deleted => "deleted entry",
        };
        CatalogError::NotFound(format!("{} {}", what, selector))
    })
}

pub fn entry_row<B: StorageBackend>(catalog: &Catalog<B>, entry: &Entry) -> Result<EntryRow> {
    let entity = catalog.entity_or_err(entry.entity_id)?;
    Ok(EntryRow::new(entry, entity.name))
}

/// The actor registered under `name`, registering it on first use.
pub fn resolve_actor<B: StorageBackend>(catalog: &Catalog<B>, name: &str) -> Result<Actor> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Api("An actor name is required".to_string()));
    }
    if let Some(actor) = catalog.store().actor_by_name(name)? {
        return Ok(actor);
    }
    let actor = Actor::new(ActorId(catalog.store().next_id()?), name);
    catalog.store().save_actor(&actor)?;
    Ok(actor)
}
