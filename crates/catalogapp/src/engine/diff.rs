use super::write::encode_element;
use crate::attributes::{AttributeKind, BaseKind, DATE_FORMAT};
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Attribute, EntityAttr, PrincipalId};
use crate::store::StorageBackend;
use crate::values::validate::is_empty_input;
use crate::values::{principal_kind, Payload, Value};
use serde_json::Value as Json;

/// Separates the key from the reference in a named element's canonical form.
const NAMED_SEPARATOR: char = '\u{1f}';

impl<B: StorageBackend> Catalog<B> {
    /// Whether writing `proposed` would change the attribute's content.
    ///
    /// Array kinds compare as multisets, so element order never counts as a
    /// change. A first write of any boolean is a change.
    pub fn is_changed(&self, attr: &Attribute, proposed: &Json) -> Result<bool> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        self.is_changed_for(attr, &schema, proposed)
    }

    pub(crate) fn is_changed_for(
        &self,
        attr: &Attribute,
        schema: &EntityAttr,
        proposed: &Json,
    ) -> Result<bool> {
        if self.store().values_of(attr.id)?.is_empty() {
            return Ok(match proposed {
                Json::Bool(_) => true,
                other => !is_empty_input(schema.kind, other),
            });
        }
        let Some(latest) = self.latest_value_for(attr, schema, true)? else {
            return Ok(true);
        };

        let proposed = match self.canonical_input(schema.kind, proposed) {
            Ok(canonical) => canonical,
            Err(e) if e.is_validation() => return Ok(true),
            Err(e) => return Err(e),
        };
        Ok(self.canonical_value(&latest)? != proposed)
    }

    /// Comparable form of a stored value: zero or one string for scalars,
    /// a sorted list for arrays. References only count while their target lives.
    fn canonical_value(&self, value: &Value) -> Result<Vec<String>> {
        if !value.kind.is_array() {
            return Ok(canonical_payload(self.store(), value.kind, &value.payload(), true)?
                .into_iter()
                .collect());
        }
        let element = value.kind.element();
        let mut items = Vec::new();
        for child in self.store().children_of(value.id)? {
            if let Some(canonical) = canonical_payload(self.store(), element, &child.payload(), true)? {
                items.push(canonical);
            }
        }
        items.sort();
        Ok(items)
    }

    fn canonical_input(&self, kind: AttributeKind, input: &Json) -> Result<Vec<String>> {
        if !kind.is_array() {
            return Ok(match encode_element(self.store(), kind, input)? {
                Some(payload) => canonical_payload(self.store(), kind, &payload, false)?
                    .into_iter()
                    .collect(),
                None => Vec::new(),
            });
        }
        let items = match input {
            Json::Null => return Ok(Vec::new()),
            Json::Array(items) => items,
            other => return Err(CatalogError::validation(format!("value({}) is not a list", other))),
        };
        let element = kind.element();
        let mut canonical = Vec::new();
        for item in items {
            if let Some(payload) = encode_element(self.store(), element, item)? {
                canonical.extend(canonical_payload(self.store(), element, &payload, false)?);
            }
        }
        canonical.sort();
        Ok(canonical)
    }
}

/// Canonical string of one scalar payload, or `None` when it carries no content.
/// With `live`, references to inactive or missing records count as empty.
pub(crate) fn canonical_payload<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: AttributeKind,
    payload: &Payload,
    live: bool,
) -> Result<Option<String>> {
    let entry_ref = |payload: &Payload| -> Result<Option<String>> {
        let Some(id) = payload.referral else {
            return Ok(None);
        };
        if live && !backend.entry(id)?.is_some_and(|e| e.is_active) {
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    };

    if kind.is_named() {
        let referral = entry_ref(payload)?;
        if payload.text.is_empty() && referral.is_none() {
            return Ok(None);
        }
        return Ok(Some(format!(
            "{}{}{}",
            payload.text,
            NAMED_SEPARATOR,
            referral.unwrap_or_default()
        )));
    }

    Ok(match kind.base_kind() {
        BaseKind::String | BaseKind::Text => {
            (!payload.text.is_empty()).then(|| payload.text.clone())
        }
        BaseKind::Boolean => Some(payload.boolean.to_string()),
        BaseKind::Date => payload.date.map(|d| d.format(DATE_FORMAT).to_string()),
        BaseKind::Object => entry_ref(payload)?,
        BaseKind::Group | BaseKind::Role => {
            if payload.text.is_empty() {
                None
            } else if !live {
                Some(payload.text.clone())
            } else {
                let alive = match (principal_kind(kind), payload.text.parse::<u64>()) {
                    (Some(principal), Ok(id)) => backend
                        .principal(principal, PrincipalId(id))?
                        .is_some_and(|p| p.is_active),
                    _ => false,
                };
                alive.then(|| payload.text.clone())
            }
        }
    })
}
