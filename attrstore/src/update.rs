//! Builder for single-item attribute updates.

use std::collections::BTreeMap;

use common::{AttributeOp, AttributeUpdate};

/// Accumulates attribute changes for one item.
///
/// Values added for the same attribute accumulate into its value set
/// (duplicates collapse); [`set`](Update::set) replaces the attribute
/// wholesale. An absent value contributes nothing and is skipped silently,
/// so callers can feed optional fields without guarding each one. An
/// `Update` is consumed by exactly one write call.
#[derive(Debug, Clone, Default)]
pub struct Update {
    attributes: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    values: Vec<String>,
    replace: bool,
}

impl Entry {
    fn push(&mut self, value: String) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the attribute's value set.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Adds a value if present; `None` is a no-op, never an error.
    pub fn add_opt(self, name: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.add(name, value),
            None => self,
        }
    }

    /// Replaces the attribute's value set wholesale.
    ///
    /// Prior accumulation for the attribute is discarded; values added
    /// afterwards extend the replacing set.
    pub fn set(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut entry = Entry {
            values: Vec::new(),
            replace: true,
        };
        for value in values {
            entry.push(value.into());
        }
        self.attributes.insert(name.into(), entry);
        self
    }

    /// Replaces the attribute with a single value.
    pub fn set_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, [value.into()])
    }

    /// Whether the update carries no changes.
    pub fn is_empty(&self) -> bool {
        self.attributes.values().all(|entry| entry.values.is_empty())
    }

    /// Wire form for a single-item put.
    pub(crate) fn into_updates(self) -> Vec<AttributeUpdate> {
        self.attributes
            .into_iter()
            .flat_map(|(name, entry)| {
                entry
                    .values
                    .into_iter()
                    .map(move |value| AttributeUpdate::new(name.clone(), value, entry.replace))
            })
            .collect()
    }

    /// Item-addressed form for a batched write.
    pub fn into_operations(self, item: impl Into<String>) -> Vec<AttributeOp> {
        let item = item.into();
        self.attributes
            .into_iter()
            .flat_map(|(name, entry)| {
                let item = item.clone();
                entry.values.into_iter().map(move |value| {
                    if entry.replace {
                        AttributeOp::replace(item.clone(), name.clone(), value)
                    } else {
                        AttributeOp::add(item.clone(), name.clone(), value)
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accumulate_values_for_the_same_attribute() {
        // given
        let update = Update::new().add("tags", "x").add("tags", "y").add("tags", "x");

        // when
        let updates = update.into_updates();

        // then - duplicates collapse, order preserved
        assert_eq!(
            updates,
            vec![
                AttributeUpdate::new("tags", "x", false),
                AttributeUpdate::new("tags", "y", false),
            ]
        );
    }

    #[test]
    fn should_skip_absent_values_silently() {
        // given
        let update = Update::new()
            .add_opt("tags", Some("x".to_string()))
            .add_opt("color", None);

        // when
        let updates = update.into_updates();

        // then
        assert_eq!(updates, vec![AttributeUpdate::new("tags", "x", false)]);
    }

    #[test]
    fn should_treat_all_absent_values_as_empty_update() {
        // given
        let update = Update::new().add_opt("a", None).add_opt("b", None);

        // then
        assert!(update.is_empty());
    }

    #[test]
    fn should_replace_wholesale_on_set() {
        // given - accumulation first, then a set call
        let update = Update::new()
            .add("tags", "old")
            .set("tags", ["new1", "new2"]);

        // when
        let updates = update.into_updates();

        // then - prior accumulation discarded, replace flag on
        assert_eq!(
            updates,
            vec![
                AttributeUpdate::new("tags", "new1", true),
                AttributeUpdate::new("tags", "new2", true),
            ]
        );
    }

    #[test]
    fn should_tag_batch_operations_by_replace_flag() {
        // given
        let update = Update::new().add("tags", "x").set_value("state", "open");

        // when
        let operations = update.into_operations("item-1");

        // then
        assert_eq!(
            operations,
            vec![
                AttributeOp::replace("item-1", "state", "open"),
                AttributeOp::add("item-1", "tags", "x"),
            ]
        );
    }

    #[test]
    fn should_produce_no_operations_for_empty_update() {
        // given
        let update = Update::new();

        // then
        assert!(update.is_empty());
        assert!(update.into_operations("item-1").is_empty());
    }
}
