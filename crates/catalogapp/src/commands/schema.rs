use crate::catalog::Catalog;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::schema::SchemaDocument;
use crate::store::StorageBackend;

pub fn run<B: StorageBackend>(catalog: &Catalog<B>, doc: &SchemaDocument) -> Result<CmdResult> {
    let summary = catalog.load_schema(doc)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Schema loaded: {} entities, {} attributes, {} groups and roles",
        summary.entities, summary.attrs, summary.principals
    )));
    if summary.deactivated_attrs > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} attributes no longer in the schema were deactivated",
            summary.deactivated_attrs
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::test_utils::{schema_document, Fixture};

    #[test]
    fn reports_deactivated_attributes() {
        let fx = Fixture::new();
        let mut doc = schema_document();
        doc.entities[0].attrs.clear();

        let result = run(&fx.catalog, &doc).unwrap();
        assert_eq!(result.messages.len(), 2);
        assert!(matches!(result.messages[1].level, MessageLevel::Warning));
        assert!(result.messages[1].content.starts_with("1 attributes"));
    }
}
