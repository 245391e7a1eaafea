//! Input canonicalization for reference-bearing kinds.
//!
//! Callers hand the engine references in several shapes: numeric ids, digit
//! strings, names, or a record-like object carrying an `id`. These helpers fold
//! them into the stored form.

use crate::attributes::{AttributeKind, BaseKind};
use crate::error::Result;
use crate::model::{EntryId, PrincipalId, PrincipalKind};
use crate::store::StorageBackend;
use serde_json::Value as Json;

pub fn principal_kind(kind: AttributeKind) -> Option<PrincipalKind> {
    match kind.base_kind() {
        BaseKind::Group => Some(PrincipalKind::Group),
        BaseKind::Role => Some(PrincipalKind::Role),
        _ => None,
    }
}

/// Canonical stored id string of a group or role, or `""` when the input
/// does not resolve to an active record. Idempotent on canonical ids.
pub fn normalize_for_storage<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: PrincipalKind,
    input: &Json,
) -> Result<String> {
    let found = match input {
        Json::Number(n) => match n.as_u64() {
            Some(id) => backend.principal(kind, PrincipalId(id))?,
            None => None,
        },
        Json::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else if s.chars().all(|c| c.is_ascii_digit()) {
                match s.parse::<u64>() {
                    Ok(id) => backend.principal(kind, PrincipalId(id))?,
                    Err(_) => None,
                }
            } else {
                backend.principal_by_name(kind, s)?
            }
        }
        Json::Object(map) => match map.get("id") {
            Some(id) if !id.is_object() => return normalize_for_storage(backend, kind, id),
            _ => None,
        },
        _ => None,
    };
    Ok(found
        .filter(|p| p.is_active)
        .map(|p| p.id.to_string())
        .unwrap_or_default())
}

/// Parse an entry reference. `Ok(None)` means "empty", `Err` carries the
/// reason the input is malformed.
pub fn parse_entry_ref(input: &Json) -> std::result::Result<Option<EntryId>, String> {
    match input {
        Json::Null => Ok(None),
        Json::Number(n) => n
            .as_u64()
            .map(|id| Some(EntryId(id)))
            .ok_or_else(|| format!("value({}) is not an entry id", n)),
        Json::String(s) if s.trim().is_empty() => Ok(None),
        Json::String(s) => s
            .trim()
            .parse::<u64>()
            .map(|id| Some(EntryId(id)))
            .map_err(|_| format!("value({}) is not an entry id", s)),
        Json::Object(map) => match map.get("id") {
            Some(id) if !id.is_object() => parse_entry_ref(id),
            _ => Err("reference object has no id".to_string()),
        },
        other => Err(format!("value({}) is not an entry id", other)),
    }
}

/// Parse a `{"name": key, "id": ref}` pair. `id` may be absent or null.
pub fn parse_named(input: &Json) -> std::result::Result<(String, Option<EntryId>), String> {
    let Json::Object(map) = input else {
        return Err(format!("value({}) is not a dict", input));
    };
    let key = match map.get("name") {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => return Err(format!("name({}) is not a string", other)),
    };
    let referral = match map.get("id") {
        Some(id) => parse_entry_ref(id)?,
        None => None,
    };
    Ok((key, referral))
}
