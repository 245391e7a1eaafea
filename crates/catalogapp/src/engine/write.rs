use super::diff::canonical_payload;
use crate::attributes::{AttributeKind, BaseKind, DATE_FORMAT};
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, Attribute, EntityAttr, ValueId};
use crate::store::StorageBackend;
use crate::values::validate::is_empty_input;
use crate::values::{
    normalize_for_storage, parse_entry_ref, parse_named, principal_kind, render, validate,
    Payload, RenderOptions, Value, Verdict,
};
use chrono::NaiveDate;
use serde_json::Value as Json;
use tracing::debug;

/// Encode one scalar input into stored payload fields.
///
/// `Ok(None)` means the element carries no content; array writes drop such
/// elements and scalar writes store a blank value. Malformed input is a
/// validation error.
pub fn encode_element<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: AttributeKind,
    input: &Json,
) -> Result<Option<Payload>> {
    if kind.is_named() {
        if input.is_null() {
            return Ok(None);
        }
        let (key, referral) = parse_named(input).map_err(CatalogError::Validation)?;
        if key.is_empty() && referral.is_none() {
            return Ok(None);
        }
        return Ok(Some(Payload {
            text: key,
            referral,
            ..Default::default()
        }));
    }

    match kind.base_kind() {
        BaseKind::String | BaseKind::Text => match input {
            Json::Null => Ok(None),
            Json::String(s) if s.is_empty() => Ok(None),
            Json::String(s) => Ok(Some(Payload {
                text: s.clone(),
                ..Default::default()
            })),
            other => Err(CatalogError::validation(format!("value({}) is not a string", other))),
        },
        BaseKind::Boolean => match input {
            Json::Bool(b) => Ok(Some(Payload {
                boolean: *b,
                ..Default::default()
            })),
            other => Err(CatalogError::validation(format!("value({}) is not a boolean", other))),
        },
        BaseKind::Date => match input {
            Json::Null => Ok(None),
            Json::String(s) if s.is_empty() => Ok(None),
            Json::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(|date| {
                    Some(Payload {
                        date: Some(date),
                        ..Default::default()
                    })
                })
                .map_err(|_| CatalogError::validation(format!("value({}) is not a YYYY-MM-DD date", s))),
            other => Err(CatalogError::validation(format!("value({}) is not a date string", other))),
        },
        BaseKind::Object => Ok(parse_entry_ref(input)
            .map_err(CatalogError::Validation)?
            .map(|referral| Payload {
                referral: Some(referral),
                ..Default::default()
            })),
        BaseKind::Group | BaseKind::Role => {
            if is_empty_input(kind, input) {
                return Ok(None);
            }
            let Some(principal) = principal_kind(kind) else {
                return Ok(None);
            };
            let id = normalize_for_storage(backend, principal, input)?;
            if id.is_empty() {
                return Err(CatalogError::validation(format!(
                    "{}({}) does not exist",
                    principal, input
                )));
            }
            Ok(Some(Payload {
                text: id,
                ..Default::default()
            }))
        }
    }
}

impl<B: StorageBackend> Catalog<B> {
    /// Validate `input` against a schema attribute, naming the attribute in
    /// the failure reason.
    pub fn validate_input(&self, schema: &EntityAttr, input: &Json) -> Result<()> {
        let verdict = validate(
            self.store(),
            schema.kind,
            input,
            schema.is_mandatory,
            self.config().max_value_size,
        )?;
        match verdict {
            Verdict::Valid => Ok(()),
            Verdict::Invalid(reason) => Err(CatalogError::Validation(format!(
                "{}: {}",
                schema.name, reason
            ))),
        }
    }

    /// Record `input` as a new version and make it latest.
    ///
    /// Array kinds store a container plus one child per non-empty element,
    /// inserted as a single batch. Does not consult [`Catalog::is_changed`];
    /// use [`Catalog::write_if_changed`] on user-facing paths.
    pub fn write(&self, attr: &Attribute, actor: &Actor, input: &Json) -> Result<Value> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        self.write_for(attr, &schema, actor, input)
    }

    pub(crate) fn write_for(
        &self,
        attr: &Attribute,
        schema: &EntityAttr,
        actor: &Actor,
        input: &Json,
    ) -> Result<Value> {
        self.validate_input(schema, input)?;
        let kind = schema.kind;

        let mut batch = Vec::new();
        let mut head = if kind.is_array() {
            let mut container = Value::create(
                ValueId(self.next_id()?),
                attr.id,
                kind,
                Payload::default(),
                actor,
            );
            if let Json::Array(items) = input {
                let element = kind.element();
                for item in items {
                    let Some(payload) = encode_element(self.store(), element, item)? else {
                        continue;
                    };
                    let child = Value::create(ValueId(self.next_id()?), attr.id, element, payload, actor)
                        .with_parent(container.id);
                    container.children.push(child.id);
                    batch.push(child);
                }
            }
            container
        } else {
            let payload = encode_element(self.store(), kind, input)?.unwrap_or_default();
            Value::create(ValueId(self.next_id()?), attr.id, kind, payload, actor)
        };
        batch.push(head.clone());

        self.store().insert_values(&batch)?;
        self.store().promote_latest(attr.id, head.id)?;
        head.is_latest = true;
        debug!(attr = %attr.id, value = %head.id, children = head.children.len(), "value written");
        Ok(head)
    }

    /// [`Catalog::write`] gated on [`Catalog::is_changed`]. `None` when the
    /// content is unchanged and no version was recorded.
    pub fn write_if_changed(&self, attr: &Attribute, actor: &Actor, input: &Json) -> Result<Option<Value>> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        self.write_if_changed_for(attr, &schema, actor, input)
    }

    pub(crate) fn write_if_changed_for(
        &self,
        attr: &Attribute,
        schema: &EntityAttr,
        actor: &Actor,
        input: &Json,
    ) -> Result<Option<Value>> {
        if !self.is_changed_for(attr, schema, input)? {
            return Ok(None);
        }
        self.write_for(attr, schema, actor, input).map(Some)
    }

    /// Add one element to an array attribute.
    pub fn append(&self, attr: &Attribute, actor: &Actor, element: &Json) -> Result<Option<Value>> {
        let schema = self.array_schema(attr)?;
        if encode_element(self.store(), schema.kind.element(), element)?.is_none() {
            return Ok(None);
        }
        let mut items = self.current_items(attr, &schema)?;
        items.push(element.clone());
        self.write_if_changed_for(attr, &schema, actor, &Json::Array(items))
    }

    /// Drop every element matching `element` from an array attribute.
    ///
    /// Named elements match by reference id when one is given, otherwise by
    /// key. Other kinds match on their canonical stored form.
    pub fn remove(&self, attr: &Attribute, actor: &Actor, element: &Json) -> Result<Option<Value>> {
        let schema = self.array_schema(attr)?;
        let kind = schema.kind.element();
        let Some(target) = encode_element(self.store(), kind, element)? else {
            return Ok(None);
        };
        let target_canonical = canonical_payload(self.store(), kind, &target, false)?;

        let mut kept = Vec::new();
        for item in self.current_items(attr, &schema)? {
            let matched = match encode_element(self.store(), kind, &item)? {
                None => false,
                Some(payload) if kind.is_named() => match target.referral {
                    Some(id) => payload.referral == Some(id),
                    None => payload.text == target.text,
                },
                Some(payload) => canonical_payload(self.store(), kind, &payload, false)? == target_canonical,
            };
            if !matched {
                kept.push(item);
            }
        }
        self.write_if_changed_for(attr, &schema, actor, &Json::Array(kept))
    }

    /// The latest content in writable form, without triggering repairs.
    pub(crate) fn current_input(&self, attr: &Attribute, schema: &EntityAttr) -> Result<Json> {
        Ok(match self.latest_value_for(attr, schema, true)? {
            Some(value) => render(self.store(), &value, RenderOptions::default())?.to_input(),
            None => Json::Null,
        })
    }

    fn current_items(&self, attr: &Attribute, schema: &EntityAttr) -> Result<Vec<Json>> {
        Ok(match self.current_input(attr, schema)? {
            Json::Array(items) => items,
            _ => Vec::new(),
        })
    }

    fn array_schema(&self, attr: &Attribute) -> Result<EntityAttr> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        if !schema.kind.is_array() {
            return Err(CatalogError::validation(format!(
                "{} is not an array attribute",
                schema.name
            )));
        }
        Ok(schema)
    }
}
