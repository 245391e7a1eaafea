//! Decoding stored values into typed output.
//!
//! Decoding follows the value's pinned kind. Unresolvable references degrade
//! to empty output rather than errors: scalars render `None`, array elements
//! are dropped (named elements keep their key with no referent).

use super::normalize::principal_kind;
use super::Value;
use crate::attributes::{AttrValue, AttributeKind, BaseKind, NamedRef, Referent};
use crate::error::Result;
use crate::model::{EntryId, PrincipalId};
use crate::store::StorageBackend;
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Reference rendering in [`render_json`]: `{"id", "name"}` instead of the name.
    pub with_metadata: bool,
    /// Only resolve references to live records.
    pub active_only: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            with_metadata: false,
            active_only: true,
        }
    }
}

impl RenderOptions {
    pub fn with_metadata() -> Self {
        Self {
            with_metadata: true,
            active_only: true,
        }
    }

    /// Resolve soft-deleted referents too; used for history.
    pub fn including_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }
}

pub fn render<B: StorageBackend + ?Sized>(
    backend: &B,
    value: &Value,
    options: RenderOptions,
) -> Result<AttrValue> {
    if value.kind.is_array() {
        let element = value.kind.element();
        let mut items = Vec::new();
        for child in backend.children_of(value.id)? {
            let rendered = render_scalar(backend, element, &child, options)?;
            let keep = match &rendered {
                AttrValue::Ref(referent) => referent.is_some(),
                AttrValue::Named(named) => !named.key.is_empty() || named.referent.is_some(),
                _ => true,
            };
            if keep {
                items.push(rendered);
            }
        }
        return Ok(AttrValue::List(items));
    }
    render_scalar(backend, value.kind, value, options)
}

/// [`render`] followed by the plain JSON form.
pub fn render_json<B: StorageBackend + ?Sized>(
    backend: &B,
    value: &Value,
    options: RenderOptions,
) -> Result<Json> {
    Ok(render(backend, value, options)?.to_plain(options.with_metadata))
}

fn render_scalar<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: AttributeKind,
    value: &Value,
    options: RenderOptions,
) -> Result<AttrValue> {
    if kind.is_named() {
        return Ok(AttrValue::Named(NamedRef {
            key: value.text.clone(),
            referent: resolve_entry(backend, value.referral, options)?,
        }));
    }
    Ok(match kind.base_kind() {
        BaseKind::String | BaseKind::Text => AttrValue::Text(value.text.clone()),
        BaseKind::Boolean => AttrValue::Bool(value.boolean),
        BaseKind::Date => AttrValue::Date(value.date),
        BaseKind::Object => AttrValue::Ref(resolve_entry(backend, value.referral, options)?),
        BaseKind::Group | BaseKind::Role => {
            let referent = match (principal_kind(kind), value.text.parse::<u64>()) {
                (Some(principal), Ok(id)) => backend
                    .principal(principal, PrincipalId(id))?
                    .filter(|p| p.is_active || !options.active_only)
                    .map(|p| Referent::new(p.id, p.name)),
                _ => None,
            };
            AttrValue::Ref(referent)
        }
    })
}

fn resolve_entry<B: StorageBackend + ?Sized>(
    backend: &B,
    referral: Option<EntryId>,
    options: RenderOptions,
) -> Result<Option<Referent>> {
    let Some(id) = referral else {
        return Ok(None);
    };
    Ok(backend
        .entry(id)?
        .filter(|e| e.is_active || !options.active_only)
        .map(|e| Referent::new(e.id, e.name)))
}
