//! Attribute values and the per-cluster attribute name table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Numeric attribute identifier within a cluster
pub type AttributeId = u16;

/// A single attribute value as carried by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
}

impl AttributeValue {
    /// Signed integer view, if the value is numeric and fits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i16> for AttributeValue {
    fn from(v: i16) -> Self {
        Self::Int(v.into())
    }
}

impl From<u8> for AttributeValue {
    fn from(v: u8) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u16> for AttributeValue {
    fn from(v: u16) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Name an attribute report resolves to
///
/// Reports for ids missing from the cluster table are never dropped; they
/// carry the raw id instead of a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeName {
    Known(String),
    Raw(AttributeId),
}

impl AttributeName {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(name) => Some(name),
            Self::Raw(_) => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.as_known() == Some(name)
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => write!(f, "{}", name),
            Self::Raw(id) => write!(f, "0x{:04x}", id),
        }
    }
}

/// Bidirectional attribute name/id table for one cluster
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    by_id: HashMap<AttributeId, &'static str>,
    by_name: HashMap<&'static str, AttributeId>,
}

impl AttributeTable {
    /// Build a table from a static `(id, name)` list
    pub fn from_static(entries: &[(AttributeId, &'static str)]) -> Self {
        let mut table = Self::default();
        for &(id, name) in entries {
            table.by_id.insert(id, name);
            table.by_name.insert(name, id);
        }
        table
    }

    pub fn id_of(&self, name: &str) -> Option<AttributeId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: AttributeId) -> Option<&'static str> {
        self.by_id.get(&id).copied()
    }

    /// Resolve a reported id, falling back to the raw id
    pub fn resolve(&self, id: AttributeId) -> AttributeName {
        match self.name_of(id) {
            Some(name) => AttributeName::Known(name.to_string()),
            None => AttributeName::Raw(id),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
