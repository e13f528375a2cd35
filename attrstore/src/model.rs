//! Data types for attribute-store reads.

use std::collections::{BTreeMap, BTreeSet};

use common::ItemData;

/// A reference to one item within a domain.
///
/// Pure value: constructing it has no network effect, and it carries no
/// cached attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    /// The domain holding the item.
    pub domain: String,
    /// The item's name within the domain.
    pub name: String,
}

impl Item {
    /// Creates a new item reference.
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }
}

/// An immutable point-in-time view of one item's attributes.
///
/// Captured by a read call and never mutated afterwards; each read produces
/// a fresh snapshot. Attribute names are unique and each maps to a set of
/// string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSnapshot {
    item: Item,
    attributes: BTreeMap<String, BTreeSet<String>>,
}

impl ItemSnapshot {
    /// Builds a snapshot from wire pairs, folding duplicate values.
    pub(crate) fn new(item: Item, pairs: Vec<(String, String)>) -> Self {
        let mut attributes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, value) in pairs {
            attributes.entry(name).or_default().insert(value);
        }
        Self { item, attributes }
    }

    pub(crate) fn from_data(domain: &str, data: ItemData) -> Self {
        Self::new(Item::new(domain, data.name), data.pairs)
    }

    /// The item this snapshot was read from.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// The item's name.
    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Consumes the snapshot, keeping only the item reference.
    pub fn into_item(self) -> Item {
        self.item
    }

    /// Values held by the named attribute.
    ///
    /// An absent attribute yields an empty iterator, never an error.
    pub fn values(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        self.attributes
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The first value of the named attribute, if any.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name).next()
    }

    /// Whether the named attribute holds the given value.
    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|values| values.contains(value))
    }

    /// All attribute names, in lexicographic order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.keys().map(String::as_str)
    }

    /// All `(name, value set)` pairs, in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> + '_ {
        self.attributes.iter().map(|(name, values)| (name.as_str(), values))
    }

    /// Number of attributes in the snapshot.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the snapshot holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
