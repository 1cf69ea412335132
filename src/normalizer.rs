//! Post-resolution normalization.
//!
//! Takes the resolved root tree and the final registry and produces the
//! output document:
//!
//! - the root's own `components` collections are merged with the registry
//! - operation collections misfiled as schemas move back to the path items
//!   that reference them (or to `components.pathItems` when a pointer
//!   elsewhere still needs them)
//! - component names that are not valid identifiers are renamed, and every
//!   internal pointer to them is rewritten
//! - `components` and `components.schemas` always exist; other collections
//!   are emitted only when non-empty or already present in the root

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::naming::{escape_pointer_segment, internal_pointer, is_valid_name, sanitize_name};
use crate::registry::ComponentRegistry;
use crate::types::{
    has_operation_keys, ref_pointer, ComponentKind, COMPONENTS_KEY, HTTP_METHODS, PATHS_KEY,
    REF_KEY,
};

const WEBHOOKS_KEY: &str = "webhooks";
const PATH_ITEMS_KEY: &str = "pathItems";
const CALLBACKS_KEY: &str = "callbacks";

/// Produce the output document from a resolved root and the registry.
pub fn normalize(root: Value, registry: ComponentRegistry, diagnostics: &mut Diagnostics) -> Value {
    let mut document = match root {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let mut components = match document.get_mut(COMPONENTS_KEY).map(std::mem::take) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut registry = absorb_existing(&mut components, registry, diagnostics);
    let mut tree = Tree {
        document: &mut document,
        components: &mut components,
        registry: &mut registry,
    };

    inline_path_table(&mut tree, diagnostics);
    reclassify_operations(&mut tree, diagnostics);
    sanitize_names(&mut tree, diagnostics);

    for (kind, collection) in registry.into_collections() {
        let key = kind.container();
        if components.contains_key(key) || !collection.is_empty() || kind == ComponentKind::Schemas
        {
            components.insert(key.to_string(), Value::Object(collection));
        }
    }
    document.insert(COMPONENTS_KEY.to_string(), Value::Object(components));
    Value::Object(document)
}

/// Every part of the output that may hold internal pointers.
struct Tree<'a> {
    document: &'a mut Map<String, Value>,
    /// Non-collection keys left under `components` (`pathItems`, `x-*`).
    components: &'a mut Map<String, Value>,
    registry: &'a mut ComponentRegistry,
}

impl Tree<'_> {
    fn for_each_value(&mut self, mut f: impl FnMut(&mut Value)) {
        self.document.values_mut().for_each(&mut f);
        self.components.values_mut().for_each(&mut f);
        self.registry.values_mut().for_each(&mut f);
    }
}

/// Merge the root's own component collections with the registry.
///
/// Root entries keep their position. A root entry that merely points at its
/// own slot takes the registry content; any other root entry wins over the
/// registry, with a collision reported when the two differ.
fn absorb_existing(
    components: &mut Map<String, Value>,
    registry: ComponentRegistry,
    diagnostics: &mut Diagnostics,
) -> ComponentRegistry {
    let mut merged = ComponentRegistry::new();

    for (kind, collected) in registry.into_collections() {
        let existing = match components.get_mut(kind.container()) {
            Some(value) if value.is_object() => std::mem::take(value),
            _ => Value::Null,
        };
        let Value::Object(existing) = existing else {
            for (name, value) in collected {
                merged.register(kind, name, value);
            }
            continue;
        };

        let mut seen = HashSet::new();
        for (name, value) in existing {
            let own_pointer = internal_pointer(kind, &name);
            match collected.get(&name) {
                Some(resolved) if ref_pointer(&value) == Some(own_pointer.as_str()) => {
                    merged.register(kind, name.as_str(), resolved.clone());
                }
                Some(resolved) => {
                    if resolved != &value {
                        diagnostics.warn(
                            DiagnosticKind::ComponentCollision,
                            name.as_str(),
                            format!(
                                "root document defines {} itself; resolved content dropped",
                                own_pointer
                            ),
                        );
                    }
                    merged.register(kind, name.as_str(), value);
                }
                None => {
                    merged.register(kind, name.as_str(), value);
                }
            }
            seen.insert(name);
        }
        for (name, value) in collected {
            if !seen.contains(&name) {
                merged.register(kind, name, value);
            }
        }
    }

    merged
}

/// A top-level `paths` that resolved to a schema pointer came from a single
/// file holding the whole path table; put it back inline.
fn inline_path_table(tree: &mut Tree<'_>, diagnostics: &mut Diagnostics) {
    let Some(pointer) = tree.document.get(PATHS_KEY).and_then(ref_pointer) else {
        return;
    };
    let Some(name) = find_component(tree.registry, ComponentKind::Schemas, pointer) else {
        return;
    };
    let Some(content) = tree.registry.remove(ComponentKind::Schemas, &name) else {
        return;
    };

    if let Some(paths) = tree.document.get_mut(PATHS_KEY) {
        *paths = inline_content(paths, content);
    }
    diagnostics.warn(
        DiagnosticKind::Reclassified,
        name,
        "path table moved out of components.schemas into paths",
    );
}

/// Move operation collections out of the schema-like collection.
///
/// An entry is an operation collection when it has an HTTP verb key. It is
/// inlined at every path-item position pointing at it: `paths` and
/// `webhooks` entries, `components.pathItems` entries and callback
/// expressions. If any other pointer still targets it afterwards, it moves
/// to `components.pathItems` and those pointers follow; otherwise it is
/// dropped.
fn reclassify_operations(tree: &mut Tree<'_>, diagnostics: &mut Diagnostics) {
    let misfiled: Vec<String> = tree
        .registry
        .names(ComponentKind::Schemas)
        .into_iter()
        .filter(|name| {
            tree.registry
                .get(ComponentKind::Schemas, name)
                .map(has_operation_keys)
                .unwrap_or(false)
        })
        .collect();

    for name in misfiled {
        let Some(content) = tree.registry.remove(ComponentKind::Schemas, &name) else {
            continue;
        };
        let pointer = internal_pointer(ComponentKind::Schemas, &name);

        let inlined = inline_path_item_sites(tree, &pointer, &content);

        let mut remaining = 0;
        tree.for_each_value(|value| remaining += count_refs(value, &pointer));

        let message = if remaining == 0 {
            match inlined {
                0 => "operation collection dropped from components.schemas (unreferenced)"
                    .to_string(),
                n => format!("operation collection inlined at {} path item(s)", n),
            }
        } else {
            match move_to_path_items(tree, &name, &content) {
                Some(moved) => {
                    tree.for_each_value(|value| rewrite_pointer(value, &pointer, &moved));
                    format!(
                        "operation collection inlined at {} path item(s), {} other pointer(s) now target {}",
                        inlined, remaining, moved
                    )
                }
                None => {
                    tree.registry.register(ComponentKind::Schemas, name.as_str(), content);
                    format!(
                        "operation collection kept in components.schemas: {} pointer(s) still target it",
                        remaining
                    )
                }
            }
        };
        diagnostics.warn(DiagnosticKind::Reclassified, name, message);
    }
}

/// Inline `content` at every path-item position pointing at `pointer`.
fn inline_path_item_sites(tree: &mut Tree<'_>, pointer: &str, content: &Value) -> usize {
    let mut count = 0;
    for key in [PATHS_KEY, WEBHOOKS_KEY] {
        if let Some(Value::Object(items)) = tree.document.get_mut(key) {
            for item in items.values_mut() {
                count += inline_path_item(item, pointer, content);
            }
        }
    }
    if let Some(Value::Object(items)) = tree.components.get_mut(PATH_ITEMS_KEY) {
        for item in items.values_mut() {
            count += inline_path_item(item, pointer, content);
        }
    }
    if let Some(callbacks) = tree.registry.collection_mut(ComponentKind::Callbacks) {
        for callback in callbacks.values_mut() {
            count += inline_in_callback(callback, pointer, content);
        }
    }
    count
}

/// Inline at a path item, or at callback expressions of its operations.
/// Freshly inlined content is not searched again.
fn inline_path_item(item: &mut Value, pointer: &str, content: &Value) -> usize {
    if ref_pointer(item) == Some(pointer) {
        *item = inline_content(item, content.clone());
        return 1;
    }
    let Value::Object(operations) = item else {
        return 0;
    };
    let mut count = 0;
    for (verb, operation) in operations.iter_mut() {
        if !HTTP_METHODS.contains(&verb.as_str()) {
            continue;
        }
        if let Some(Value::Object(callbacks)) = operation.get_mut(CALLBACKS_KEY) {
            for callback in callbacks.values_mut() {
                count += inline_in_callback(callback, pointer, content);
            }
        }
    }
    count
}

fn inline_in_callback(callback: &mut Value, pointer: &str, content: &Value) -> usize {
    let Value::Object(expressions) = callback else {
        return 0;
    };
    expressions
        .iter_mut()
        .filter(|(key, _)| key.as_str() != REF_KEY)
        .map(|(_, item)| inline_path_item(item, pointer, content))
        .sum()
}

/// Put an operation collection under `components.pathItems`, returning its
/// new pointer. `None` if `pathItems` exists but is not a mapping.
fn move_to_path_items(tree: &mut Tree<'_>, name: &str, content: &Value) -> Option<String> {
    let items = tree
        .components
        .entry(PATH_ITEMS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(items) = items else {
        return None;
    };

    let base = sanitize_name(name);
    let mut target = base.clone();
    let mut suffix = 2;
    while items.get(&target).is_some_and(|existing| existing != content) {
        target = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    items.insert(target.clone(), content.clone());
    Some(format!(
        "#/{}/{}/{}",
        COMPONENTS_KEY,
        PATH_ITEMS_KEY,
        escape_pointer_segment(&target)
    ))
}

/// Rename components whose names are not valid identifiers.
fn sanitize_names(tree: &mut Tree<'_>, diagnostics: &mut Diagnostics) {
    for kind in ComponentKind::ALL {
        for name in tree.registry.names(kind) {
            if is_valid_name(&name) {
                continue;
            }

            let base = sanitize_name(&name);
            let mut renamed = base.clone();
            let mut suffix = 2;
            while tree.registry.contains(kind, &renamed) {
                renamed = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            if !tree.registry.rename(kind, &name, &renamed) {
                continue;
            }

            let old = internal_pointer(kind, &name);
            let new = internal_pointer(kind, &renamed);
            tree.for_each_value(|value| rewrite_pointer(value, &old, &new));
            diagnostics.warn(
                DiagnosticKind::ComponentRenamed,
                name,
                format!("renamed to {}", renamed),
            );
        }
    }
}

fn find_component(registry: &ComponentRegistry, kind: ComponentKind, pointer: &str) -> Option<String> {
    registry
        .names(kind)
        .into_iter()
        .find(|name| internal_pointer(kind, name) == pointer)
}

/// Replace a reference node by `content`, keeping the node's own sibling keys.
fn inline_content(node: &Value, content: Value) -> Value {
    match (node, content) {
        (Value::Object(node), Value::Object(mut map)) => {
            for (key, value) in node {
                if key != REF_KEY {
                    map.insert(key.clone(), value.clone());
                }
            }
            Value::Object(map)
        }
        (_, content) => content,
    }
}

/// Number of reference nodes pointing at `pointer`.
fn count_refs(value: &Value, pointer: &str) -> usize {
    let own = usize::from(ref_pointer(value) == Some(pointer));
    own + match value {
        Value::Object(map) => map.values().map(|v| count_refs(v, pointer)).sum(),
        Value::Array(items) => items.iter().map(|v| count_refs(v, pointer)).sum(),
        _ => 0,
    }
}

/// Exact-string substitution on every `$ref` value equal to `old`.
fn rewrite_pointer(value: &mut Value, old: &str, new: &str) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get_mut(REF_KEY) {
                if pointer == old {
                    *pointer = new.to_string();
                }
            }
            for child in map.values_mut() {
                rewrite_pointer(child, old, new);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_pointer(item, old, new);
            }
        }
        _ => {}
    }
}
