//! Per-kind validation of proposed content.
//!
//! Validation never changes state and never fails on bad input: it returns a
//! [`Verdict`]. The outer `Result` only carries store failures hit while
//! checking that referents exist.

use super::normalize::{normalize_for_storage, parse_entry_ref, parse_named, principal_kind};
use crate::attributes::{AttributeKind, BaseKind, DATE_FORMAT};
use crate::error::{CatalogError, Result};
use crate::model::EntryId;
use crate::store::StorageBackend;
use chrono::NaiveDate;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid(reason) => Some(reason.as_str()),
        }
    }

    /// Turn an invalid verdict into a validation error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Verdict::Valid => Ok(()),
            Verdict::Invalid(reason) => Err(CatalogError::Validation(reason)),
        }
    }
}

/// True when `input` carries no content for `kind`. Booleans are never empty.
pub fn is_empty_input(kind: AttributeKind, input: &Json) -> bool {
    if kind.is_array() {
        return match input {
            Json::Null => true,
            Json::Array(items) => items.iter().all(|i| is_empty_input(kind.element(), i)),
            _ => false,
        };
    }
    if kind.is_named() {
        return match parse_named(input) {
            Ok((key, referral)) => key.is_empty() && referral.is_none(),
            Err(_) => matches!(input, Json::Null),
        };
    }
    match input {
        Json::Null => kind.base_kind() != BaseKind::Boolean,
        Json::String(s) => s.is_empty(),
        _ => false,
    }
}

pub fn validate<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: AttributeKind,
    input: &Json,
    mandatory: bool,
    max_value_size: usize,
) -> Result<Verdict> {
    if mandatory && is_empty_input(kind, input) {
        return Ok(Verdict::Invalid("mandatory value is missing".to_string()));
    }
    if kind.is_array() {
        let items = match input {
            Json::Null => return Ok(Verdict::Valid),
            Json::Array(items) => items,
            other => return Ok(Verdict::Invalid(format!("value({}) is not a list", other))),
        };
        for item in items {
            let verdict = validate_scalar(backend, kind.element(), item, max_value_size)?;
            if !verdict.is_valid() {
                return Ok(verdict);
            }
        }
        return Ok(Verdict::Valid);
    }
    validate_scalar(backend, kind, input, max_value_size)
}

fn validate_scalar<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: AttributeKind,
    input: &Json,
    max_value_size: usize,
) -> Result<Verdict> {
    if kind.is_named() {
        if input.is_null() {
            return Ok(Verdict::Valid);
        }
        let (key, referral) = match parse_named(input) {
            Ok(pair) => pair,
            Err(reason) => return Ok(Verdict::Invalid(reason)),
        };
        if key.len() > max_value_size {
            return Ok(Verdict::Invalid(size_exceeded(key.len(), max_value_size)));
        }
        return check_entry(backend, referral);
    }

    let verdict = match kind.base_kind() {
        BaseKind::String | BaseKind::Text => match input {
            Json::Null => Verdict::Valid,
            Json::String(s) if s.len() > max_value_size => {
                Verdict::Invalid(size_exceeded(s.len(), max_value_size))
            }
            Json::String(_) => Verdict::Valid,
            other => Verdict::Invalid(format!("value({}) is not a string", other)),
        },
        BaseKind::Boolean => match input {
            Json::Bool(_) => Verdict::Valid,
            other => Verdict::Invalid(format!("value({}) is not a boolean", other)),
        },
        BaseKind::Date => match input {
            Json::Null => Verdict::Valid,
            Json::String(s) if s.is_empty() => Verdict::Valid,
            Json::String(s) => match NaiveDate::parse_from_str(s, DATE_FORMAT) {
                Ok(_) => Verdict::Valid,
                Err(_) => Verdict::Invalid(format!("value({}) is not a YYYY-MM-DD date", s)),
            },
            other => Verdict::Invalid(format!("value({}) is not a date string", other)),
        },
        BaseKind::Object => match parse_entry_ref(input) {
            Ok(referral) => return check_entry(backend, referral),
            Err(reason) => Verdict::Invalid(reason),
        },
        BaseKind::Group | BaseKind::Role => {
            let Some(principal) = principal_kind(kind) else {
                return Ok(Verdict::Valid);
            };
            if is_empty_input(kind, input) {
                Verdict::Valid
            } else if normalize_for_storage(backend, principal, input)?.is_empty() {
                Verdict::Invalid(format!("{}({}) does not exist", principal, input))
            } else {
                Verdict::Valid
            }
        }
    };
    Ok(verdict)
}

fn check_entry<B: StorageBackend + ?Sized>(
    backend: &B,
    referral: Option<EntryId>,
) -> Result<Verdict> {
    let Some(id) = referral else {
        return Ok(Verdict::Valid);
    };
    Ok(match backend.entry(id)? {
        Some(entry) if entry.is_active => Verdict::Valid,
        _ => Verdict::Invalid(format!("referenced entry({}) does not exist", id)),
    })
}

fn size_exceeded(len: usize, max: usize) -> String {
    format!("value size {} exceeds the limit of {} bytes", len, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, ActorId, EntityId, Entry, Principal, PrincipalId, PrincipalKind};
    use crate::store::MemBackend;
    use serde_json::json;

    const MAX: usize = 16;

    fn backend() -> MemBackend {
        let backend = MemBackend::new();
        let actor = Actor::new(ActorId(1), "alice");
        backend
            .insert_entry(&Entry::new(EntryId(7), EntityId(2), "net-a", &actor))
            .unwrap();
        let mut gone = Entry::new(EntryId(8), EntityId(2), "net-b", &actor);
        gone.is_active = false;
        backend.insert_entry(&gone).unwrap();
        backend
            .save_principal(&Principal {
                id: PrincipalId(5),
                kind: PrincipalKind::Role,
                name: "operator".into(),
                is_active: true,
            })
            .unwrap();
        backend
    }

    fn check(kind: AttributeKind, input: Json, mandatory: bool) -> Verdict {
        validate(&backend(), kind, &input, mandatory, MAX).unwrap()
    }

    #[test]
    fn strings_respect_size_ceiling() {
        assert!(check(AttributeKind::STRING, json!("short"), false).is_valid());
        let verdict = check(AttributeKind::TEXT, json!("x".repeat(MAX + 1)), false);
        assert!(verdict.reason().unwrap().contains("exceeds"));
        assert!(!check(AttributeKind::STRING, json!(12), false).is_valid());
    }

    #[test]
    fn mandatory_empty_fails() {
        assert!(!check(AttributeKind::STRING, json!(""), true).is_valid());
        assert!(!check(AttributeKind::ARRAY_STRING, json!([]), true).is_valid());
        assert!(!check(AttributeKind::ARRAY_STRING, json!(["", null]), true).is_valid());
        assert!(!check(AttributeKind::NAMED_OBJECT, json!({"name": "", "id": null}), true).is_valid());
        assert!(check(AttributeKind::BOOLEAN, json!(false), true).is_valid());
        assert!(check(AttributeKind::STRING, json!(""), false).is_valid());
    }

    #[test]
    fn dates_need_iso_format() {
        assert!(check(AttributeKind::DATE, json!("2024-02-29"), false).is_valid());
        assert!(!check(AttributeKind::DATE, json!("2023-02-29"), false).is_valid());
        assert!(!check(AttributeKind::DATE, json!("29/02/2024"), false).is_valid());
        assert!(check(AttributeKind::DATE, json!(""), false).is_valid());
    }

    #[test]
    fn booleans_need_bool() {
        assert!(check(AttributeKind::BOOLEAN, json!(true), false).is_valid());
        assert!(!check(AttributeKind::BOOLEAN, json!("true"), false).is_valid());
    }

    #[test]
    fn objects_need_live_referents() {
        assert!(check(AttributeKind::OBJECT, json!(7), false).is_valid());
        assert!(!check(AttributeKind::OBJECT, json!(8), false).is_valid());
        assert!(!check(AttributeKind::OBJECT, json!(99), false).is_valid());
        assert!(!check(AttributeKind::OBJECT, json!("net-a"), false).is_valid());
    }

    #[test]
    fn named_needs_dict_shape() {
        assert!(check(AttributeKind::NAMED_OBJECT, json!({"name": "a", "id": 7}), false).is_valid());
        assert!(check(AttributeKind::NAMED_OBJECT, json!({"name": "a", "id": null}), false).is_valid());
        assert!(!check(AttributeKind::NAMED_OBJECT, json!("a"), false).is_valid());
        assert!(!check(AttributeKind::NAMED_OBJECT, json!({"name": "a", "id": 99}), false).is_valid());
    }

    #[test]
    fn arrays_need_lists_of_valid_elements() {
        assert!(check(AttributeKind::ARRAY_OBJECT, json!([7]), false).is_valid());
        assert!(!check(AttributeKind::ARRAY_OBJECT, json!(7), false).is_valid());
        assert!(!check(AttributeKind::ARRAY_OBJECT, json!([7, 99]), false).is_valid());
        assert!(check(
            AttributeKind::ARRAY_NAMED_OBJECT,
            json!([{"name": "a", "id": 7}, {"name": "b", "id": null}]),
            false
        )
        .is_valid());
    }

    #[test]
    fn principals_must_exist() {
        assert!(check(AttributeKind::ROLE, json!("operator"), false).is_valid());
        assert!(check(AttributeKind::ROLE, json!(5), false).is_valid());
        assert!(!check(AttributeKind::ROLE, json!("ghost"), false).is_valid());
        assert!(!check(AttributeKind::GROUP, json!(5), false).is_valid());
        assert!(check(AttributeKind::ARRAY_ROLE, json!(["operator", ""]), false).is_valid());
    }

    #[test]
    fn invalid_verdict_becomes_validation_error() {
        let err = Verdict::Invalid("nope".into()).into_result().unwrap_err();
        assert!(err.is_validation());
    }
}
