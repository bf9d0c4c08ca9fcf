//! Keys and values as stored in the index
//!
//! The store holds plain strings. A value without a tab is one external id;
//! a value with tabs is the ordered chain of every id that shared the content
//! hash, oldest first. [`ExternalIds`] is the typed view of that encoding and
//! only gets converted back to a string at the store edge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between external ids in a collision chain
pub const CHAIN_SEPARATOR: char = '\t';

/// Content digest used as the store key (e.g. an uppercase sequence MD5).
/// Opaque and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Query-side normalisation: surrounding whitespace removed, uppercased.
    pub fn canonical(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accession the hash resolves to (e.g. `UPI0000000001`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either a single item or an ordered list.
///
/// Values decoded from the store are never empty and only use `Many` for two
/// or more items; a hand-built `Many(vec![])` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Number of items held
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    /// Append `item` after the existing ones.
    pub fn appended(self, item: T) -> Self {
        match self {
            OneOrMany::One(first) => OneOrMany::Many(vec![first, item]),
            OneOrMany::Many(mut items) => {
                items.push(item);
                OneOrMany::Many(items)
            },
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|existing| existing == item)
    }
}

/// External ids resolved from one content hash
pub type ExternalIds = OneOrMany<ExternalId>;

impl ExternalIds {
    /// Decode a stored value. Segments are kept verbatim, so
    /// `decode(v).encode() == v` for every string `v`.
    pub fn decode(value: &str) -> Self {
        if value.contains(CHAIN_SEPARATOR) {
            OneOrMany::Many(value.split(CHAIN_SEPARATOR).map(ExternalId::new).collect())
        } else {
            OneOrMany::One(ExternalId::new(value))
        }
    }

    /// Encode for storage: ids joined by [`CHAIN_SEPARATOR`].
    pub fn encode(&self) -> String {
        match self {
            OneOrMany::One(id) => id.0.clone(),
            OneOrMany::Many(ids) => {
                let mut encoded = String::with_capacity(ids.iter().map(|id| id.0.len() + 1).sum());
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        encoded.push(CHAIN_SEPARATOR);
                    }
                    encoded.push_str(&id.0);
                }
                encoded
            },
        }
    }

    /// True when the value records a hash collision
    pub fn is_collision(&self) -> bool {
        self.len() > 1
    }
}

impl From<ExternalId> for ExternalIds {
    fn from(id: ExternalId) -> Self {
        OneOrMany::One(id)
    }
}

/// True if an encoded store value holds more than one external id.
pub fn is_collision_value(value: &str) -> bool {
    value.contains(CHAIN_SEPARATOR)
}
