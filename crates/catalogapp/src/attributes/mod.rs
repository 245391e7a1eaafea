//! # Attribute Kinds and Typed Values
//!
//! Schema attributes declare a composable [`AttributeKind`]: one base kind
//! (string, text, boolean, date, object, group, role) plus optional `array`
//! and `named` modifiers.
//!
//! | Kind | Stored as | Typed value |
//! |------|-----------|-------------|
//! | `string`, `text` | text payload | [`AttrValue::Text`] |
//! | `boolean` | boolean payload | [`AttrValue::Bool`] |
//! | `date` | date payload | [`AttrValue::Date`] |
//! | `object` | weak entry reference | [`AttrValue::Ref`] |
//! | `group`, `role` | canonical id string | [`AttrValue::Ref`] |
//! | `named_object` | key + weak entry reference | [`AttrValue::Named`] |
//! | `array_*` | container value with child values | [`AttrValue::List`] |
//!
//! [`KeywordFilter`] implements the keyword language used by search hints.

mod filter;
mod kind;
mod value;

pub use filter::{parse_date_literal, FieldRef, FilterOp, KeywordFilter};
pub use kind::{AttributeKind, BaseKind, KindModifiers};
pub use value::{default_value, AttrValue, NamedRef, Referent, DATE_FORMAT};
