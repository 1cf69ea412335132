//! Component registry: the nine named collections of reusable content
//! built up during one merge run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::types::ComponentKind;

/// A component registered from its file location before the resolver has
/// visited it. Its content is still the raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub source: PathBuf,
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The name was free.
    Inserted,
    /// The name held a raw pre-registration, now replaced by resolved content.
    ResolvedPending,
    /// The name held resolved content, which was overwritten.
    Replaced { previous: Value },
}

/// Run-scoped set of component collections.
///
/// Names are unique within a collection; a later registration under the same
/// name overwrites the earlier one. Insertion order is kept.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    collections: BTreeMap<ComponentKind, Map<String, Value>>,
    pending: Vec<PendingComponent>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register raw document content found by its directory convention.
    pub fn preregister(
        &mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        content: Value,
        source: PathBuf,
    ) {
        let name = name.into();
        self.pending.retain(|p| !(p.kind == kind && p.name == name));
        self.pending.push(PendingComponent {
            kind,
            name: name.clone(),
            source,
        });
        self.collections
            .entry(kind)
            .or_default()
            .insert(name, content);
    }

    /// Register resolved content, overwriting any earlier entry.
    pub fn register(
        &mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        content: Value,
    ) -> Registration {
        let name = name.into();
        let was_pending = self.clear_pending(kind, &name);
        let previous = self
            .collections
            .entry(kind)
            .or_default()
            .insert(name, content);

        match previous {
            None => Registration::Inserted,
            Some(_) if was_pending => Registration::ResolvedPending,
            Some(previous) => Registration::Replaced { previous },
        }
    }

    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&Value> {
        self.collections.get(&kind)?.get(name)
    }

    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, kind: ComponentKind, name: &str) -> Option<Value> {
        self.clear_pending(kind, name);
        self.collections.get_mut(&kind)?.shift_remove(name)
    }

    /// Move an entry to a new name in the same position.
    ///
    /// `Map` has no positional insert, so the collection is rebuilt.
    ///
    /// Returns false if `old` doesn't exist or `new` is already taken.
    pub fn rename(&mut self, kind: ComponentKind, old: &str, new: &str) -> bool {
        let Some(collection) = self.collections.get_mut(&kind) else {
            return false;
        };
        if !collection.contains_key(old) || collection.contains_key(new) {
            return false;
        }
        let mut renamed = Map::with_capacity(collection.len());
        for (key, value) in std::mem::take(collection) {
            if key == old {
                renamed.insert(new.to_string(), value);
            } else {
                renamed.insert(key, value);
            }
        }
        *collection = renamed;
        for pending in &mut self.pending {
            if pending.kind == kind && pending.name == old {
                pending.name = new.to_string();
            }
        }
        true
    }

    /// Entry names of one collection, in insertion order.
    pub fn names(&self, kind: ComponentKind) -> Vec<String> {
        self.collections
            .get(&kind)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// One collection, if anything was ever registered into it.
    pub fn collection(&self, kind: ComponentKind) -> Option<&Map<String, Value>> {
        self.collections.get(&kind)
    }

    pub fn collection_mut(&mut self, kind: ComponentKind) -> Option<&mut Map<String, Value>> {
        self.collections.get_mut(&kind)
    }

    /// Mutable access to every entry of every collection.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.collections.values_mut().flat_map(|c| c.values_mut())
    }

    pub fn is_pending(&self, kind: ComponentKind, name: &str) -> bool {
        self.pending.iter().any(|p| p.kind == kind && p.name == name)
    }

    /// The oldest pre-registration not yet replaced by resolved content.
    pub fn next_pending(&self) -> Option<PendingComponent> {
        self.pending.first().cloned()
    }

    /// Total number of entries across all collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the registry, yielding every collection in output order.
    pub fn into_collections(mut self) -> Vec<(ComponentKind, Map<String, Value>)> {
        ComponentKind::ALL
            .into_iter()
            .map(|kind| (kind, self.collections.remove(&kind).unwrap_or_default()))
            .collect()
    }

    fn clear_pending(&mut self, kind: ComponentKind, name: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| !(p.kind == kind && p.name == name));
        self.pending.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_then_overwrite() {
        let mut registry = ComponentRegistry::new();
        let first = registry.register(ComponentKind::Schemas, "User", json!({"type": "object"}));
        assert_eq!(first, Registration::Inserted);

        let second = registry.register(ComponentKind::Schemas, "User", json!({"type": "string"}));
        assert_eq!(
            second,
            Registration::Replaced {
                previous: json!({"type": "object"})
            }
        );
        assert_eq!(
            registry.get(ComponentKind::Schemas, "User"),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn collections_are_independent() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentKind::Schemas, "Error", json!({"type": "object"}));
        registry.register(ComponentKind::Responses, "Error", json!({"description": "x"}));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(ComponentKind::Responses, "Error"));
        assert!(!registry.contains(ComponentKind::Headers, "Error"));
    }

    #[test]
    fn preregistration_is_pending_until_resolved() {
        let mut registry = ComponentRegistry::new();
        registry.preregister(
            ComponentKind::Schemas,
            "Pet",
            json!({"$ref": "./Tag.yaml"}),
            PathBuf::from("/api/components/schemas/Pet.yaml"),
        );
        assert!(registry.is_pending(ComponentKind::Schemas, "Pet"));

        let outcome = registry.register(
            ComponentKind::Schemas,
            "Pet",
            json!({"$ref": "#/components/schemas/Tag"}),
        );
        assert_eq!(outcome, Registration::ResolvedPending);
        assert!(!registry.is_pending(ComponentKind::Schemas, "Pet"));
        assert_eq!(registry.next_pending(), None);
    }

    #[test]
    fn remove_and_rename_keep_order() {
        let mut registry = ComponentRegistry::new();
        for name in ["a", "{b}", "c"] {
            registry.register(ComponentKind::Schemas, name, json!({}));
        }

        assert!(registry.rename(ComponentKind::Schemas, "{b}", "_b_"));
        assert_eq!(registry.names(ComponentKind::Schemas), vec!["a", "_b_", "c"]);

        assert_eq!(registry.remove(ComponentKind::Schemas, "a"), Some(json!({})));
        assert_eq!(registry.names(ComponentKind::Schemas), vec!["_b_", "c"]);
        assert_eq!(registry.remove(ComponentKind::Schemas, "a"), None);
    }

    #[test]
    fn remove_from_middle_keeps_tail_order() {
        let mut registry = ComponentRegistry::new();
        for name in ["a", "b", "c", "d"] {
            registry.register(ComponentKind::Responses, name, json!(name));
        }

        assert_eq!(registry.remove(ComponentKind::Responses, "b"), Some(json!("b")));
        assert_eq!(registry.names(ComponentKind::Responses), vec!["a", "c", "d"]);
        assert_eq!(registry.remove(ComponentKind::Headers, "b"), None);
    }

    #[test]
    fn rename_refuses_taken_name() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentKind::Schemas, "x", json!(1));
        registry.register(ComponentKind::Schemas, "y", json!(2));
        assert!(!registry.rename(ComponentKind::Schemas, "x", "y"));
        assert!(!registry.rename(ComponentKind::Schemas, "missing", "z"));
    }

    #[test]
    fn into_collections_yields_all_kinds_in_order() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentKind::Callbacks, "cb", json!({}));
        let collections = registry.into_collections();
        assert_eq!(collections.len(), 9);
        assert_eq!(collections[0].0, ComponentKind::Schemas);
        assert!(collections[0].1.is_empty());
        assert_eq!(collections[8].0, ComponentKind::Callbacks);
        assert_eq!(collections[8].1.len(), 1);
    }
}
