//! Attribute kinds.
//!
//! A kind is exactly one [`BaseKind`] plus an independent set of
//! [`KindModifiers`]. The packed integer form (`bits`) is what gets persisted,
//! so the bit positions below are part of the storage format.

use crate::error::{CatalogError, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseKind {
    Object,
    String,
    Text,
    Boolean,
    Group,
    Date,
    Role,
}

impl BaseKind {
    pub const ALL: [BaseKind; 7] = [
        BaseKind::Object,
        BaseKind::String,
        BaseKind::Text,
        BaseKind::Boolean,
        BaseKind::Group,
        BaseKind::Date,
        BaseKind::Role,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            BaseKind::Object => 1 << 0,
            BaseKind::String => 1 << 1,
            BaseKind::Text => 1 << 2,
            BaseKind::Boolean => 1 << 3,
            BaseKind::Group => 1 << 4,
            BaseKind::Date => 1 << 5,
            BaseKind::Role => 1 << 6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BaseKind::Object => "object",
            BaseKind::String => "string",
            BaseKind::Text => "text",
            BaseKind::Boolean => "boolean",
            BaseKind::Group => "group",
            BaseKind::Date => "date",
            BaseKind::Role => "role",
        }
    }

    /// Object, group and role values point at another record.
    pub const fn is_reference(self) -> bool {
        matches!(self, BaseKind::Object | BaseKind::Group | BaseKind::Role)
    }

    fn from_name(name: &str) -> Option<Self> {
        BaseKind::ALL.into_iter().find(|base| base.name() == name)
    }
}

bitflags! {
    /// Modifiers composable with any legal base.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KindModifiers: u32 {
        /// Ordered collection of the element kind.
        const ARRAY = 1 << 10;
        /// (free-text key, optional reference) pair.
        const NAMED = 1 << 11;
    }
}

const BASE_MASK: u32 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KindRepr", into = "u32")]
pub struct AttributeKind {
    base: BaseKind,
    modifiers: KindModifiers,
}

/// Accepted input forms: the packed integer or a label such as `array_named_object`.
#[derive(Deserialize)]
#[serde(untagged)]
enum KindRepr {
    Bits(u32),
    Label(String),
}

impl TryFrom<KindRepr> for AttributeKind {
    type Error = CatalogError;

    fn try_from(repr: KindRepr) -> Result<Self> {
        match repr {
            KindRepr::Bits(bits) => AttributeKind::from_bits(bits),
            KindRepr::Label(label) => AttributeKind::parse(&label),
        }
    }
}

impl From<AttributeKind> for u32 {
    fn from(kind: AttributeKind) -> u32 {
        kind.bits()
    }
}

impl AttributeKind {
    pub const STRING: Self = Self::plain(BaseKind::String);
    pub const TEXT: Self = Self::plain(BaseKind::Text);
    pub const BOOLEAN: Self = Self::plain(BaseKind::Boolean);
    pub const DATE: Self = Self::plain(BaseKind::Date);
    pub const OBJECT: Self = Self::plain(BaseKind::Object);
    pub const GROUP: Self = Self::plain(BaseKind::Group);
    pub const ROLE: Self = Self::plain(BaseKind::Role);
    pub const NAMED_OBJECT: Self = Self {
        base: BaseKind::Object,
        modifiers: KindModifiers::NAMED,
    };
    pub const ARRAY_STRING: Self = Self::array_of(BaseKind::String);
    pub const ARRAY_OBJECT: Self = Self::array_of(BaseKind::Object);
    pub const ARRAY_GROUP: Self = Self::array_of(BaseKind::Group);
    pub const ARRAY_ROLE: Self = Self::array_of(BaseKind::Role);
    pub const ARRAY_NAMED_OBJECT: Self = Self {
        base: BaseKind::Object,
        modifiers: KindModifiers::ARRAY.union(KindModifiers::NAMED),
    };

    const fn plain(base: BaseKind) -> Self {
        Self {
            base,
            modifiers: KindModifiers::empty(),
        }
    }

    const fn array_of(base: BaseKind) -> Self {
        Self {
            base,
            modifiers: KindModifiers::ARRAY,
        }
    }

    /// Compose a kind, rejecting combinations the value store cannot hold.
    pub fn new(base: BaseKind, modifiers: KindModifiers) -> Result<Self> {
        if modifiers.contains(KindModifiers::NAMED) && base != BaseKind::Object {
            return Err(CatalogError::validation(format!(
                "named modifier requires the object base, got {}",
                base.name()
            )));
        }
        if modifiers.contains(KindModifiers::ARRAY)
            && matches!(base, BaseKind::Text | BaseKind::Boolean | BaseKind::Date)
        {
            return Err(CatalogError::validation(format!(
                "array modifier is not supported for {}",
                base.name()
            )));
        }
        Ok(Self { base, modifiers })
    }

    /// Decode the packed storage form. Exactly one base bit must be set.
    pub fn from_bits(bits: u32) -> Result<Self> {
        let base_bits = bits & BASE_MASK;
        let base = BaseKind::ALL
            .into_iter()
            .find(|base| base.bit() == base_bits)
            .ok_or_else(|| {
                CatalogError::validation(format!("kind {} must carry exactly one base", bits))
            })?;
        let modifiers = KindModifiers::from_bits(bits & !BASE_MASK).ok_or_else(|| {
            CatalogError::validation(format!("kind {} carries unknown modifier bits", bits))
        })?;
        Self::new(base, modifiers)
    }

    pub fn bits(self) -> u32 {
        self.base.bit() | self.modifiers.bits()
    }

    /// Parse a label like `string`, `named_object` or `array_named_object`.
    pub fn parse(label: &str) -> Result<Self> {
        let mut rest = label.trim().to_ascii_lowercase();
        let mut modifiers = KindModifiers::empty();
        if let Some(stripped) = rest.strip_prefix("array_") {
            modifiers |= KindModifiers::ARRAY;
            rest = stripped.to_string();
        }
        if let Some(stripped) = rest.strip_prefix("named_") {
            modifiers |= KindModifiers::NAMED;
            rest = stripped.to_string();
        }
        let base = BaseKind::from_name(&rest)
            .ok_or_else(|| CatalogError::validation(format!("unknown kind label: {}", label)))?;
        Self::new(base, modifiers)
    }

    pub fn base_kind(self) -> BaseKind {
        self.base
    }

    pub fn modifiers(self) -> KindModifiers {
        self.modifiers
    }

    pub fn is_array(self) -> bool {
        self.modifiers.contains(KindModifiers::ARRAY)
    }

    pub fn is_named(self) -> bool {
        self.modifiers.contains(KindModifiers::NAMED)
    }

    /// The kind of one array element (the kind itself for scalars).
    pub fn element(self) -> Self {
        Self {
            base: self.base,
            modifiers: self.modifiers.difference(KindModifiers::ARRAY),
        }
    }

    /// True when values hold a weak reference to another entry.
    pub fn refers_entries(self) -> bool {
        self.base == BaseKind::Object
    }

    pub fn is_reference(self) -> bool {
        self.base.is_reference()
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            write!(f, "array_")?;
        }
        if self.is_named() {
            write!(f, "named_")?;
        }
        write!(f, "{}", self.base.name())
    }
}
