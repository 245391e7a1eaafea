use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{Actor, Attribute, EntityAttr, ValueId};
use crate::store::StorageBackend;
use crate::values::{Payload, Value};
use tracing::debug;

impl<B: StorageBackend> Catalog<B> {
    /// The attribute's latest value, healed to the schema's current kind.
    ///
    /// When there is no latest value, or its pinned kind no longer matches the
    /// schema, a blank value of the current kind is created and promoted.
    /// With `read_only` the repair is skipped and `None` is returned instead.
    pub fn latest_value(&self, attr: &Attribute, read_only: bool) -> Result<Option<Value>> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        self.latest_value_for(attr, &schema, read_only)
    }

    pub(crate) fn latest_value_for(
        &self,
        attr: &Attribute,
        schema: &EntityAttr,
        read_only: bool,
    ) -> Result<Option<Value>> {
        let latest = self
            .store()
            .values_of(attr.id)?
            .into_iter()
            .rev()
            .find(|v| v.is_latest);
        if let Some(value) = latest {
            if value.kind == schema.kind {
                return Ok(Some(value));
            }
        }
        if read_only {
            return Ok(None);
        }

        let mut blank = Value::create(
            ValueId(self.next_id()?),
            attr.id,
            schema.kind,
            Payload::default(),
            &Actor::system(),
        );
        self.store().insert_values(std::slice::from_ref(&blank))?;
        self.store().promote_latest(attr.id, blank.id)?;
        blank.is_latest = true;
        debug!(attr = %attr.id, kind = %schema.kind, "blank latest value materialized");
        Ok(Some(blank))
    }
}
