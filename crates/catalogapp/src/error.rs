use crate::model::{AttributeId, EntityId, EntryId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(AttributeId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl CatalogError {
    pub fn validation(reason: impl Into<String>) -> Self {
        CatalogError::Validation(reason.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
