//! Reference resolution.
//!
//! Walks a document tree and replaces every external `$ref` with either an
//! internal pointer to a registered component or the inlined target content.
//!
//! # Procedure for one reference node
//!
//! 1. Internal pointers (`#...`) are returned unchanged.
//! 2. A pointer already in the [`RefMap`] becomes its recorded internal pointer.
//! 3. A pointer already open on the current branch is a cycle: it becomes an
//!    internal pointer to the component the open ancestor will register, or
//!    an inline placeholder when no name can be derived.
//! 4. Otherwise the pointer is looked up in the [`DocumentTable`].
//! 5. On a miss, a stub component is registered (or the node is kept as is
//!    when no name can be derived).
//! 6. On a hit, the target is resolved recursively from its own directory,
//!    registered under its derived name and replaced by an internal pointer,
//!    or inlined when no name can be derived.
//!
//! # Placement
//!
//! A pointer that names a component directory (`components/responses/...`,
//! also inside a fragment) registers there. A whole document sitting in a
//! component directory registers there too, whatever the pointer looks like
//! (`./Shared.yaml` from a sibling response). Anything else holding
//! operations is a bare path item and is inlined; the rest registers as a
//! schema under the file base name.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::MergeError;
use crate::loader::navigate_fragment;
use crate::naming::{component_target, explicit_target, internal_pointer, split_pointer};
use crate::registry::{ComponentRegistry, Registration};
use crate::table::{convention_component, Document, DocumentTable};
use crate::types::{has_operation_keys, ComponentKind, REF_KEY};

/// Reference strings open on the current resolution path.
///
/// Cloned, never shared, when descending into a resolved document, so that
/// sibling references to the same target are not mistaken for a cycle.
pub type BranchVisited = HashSet<String>;

/// Memo from external reference strings to the internal pointers they were
/// rewritten to. Guarantees at most one registered component per distinct
/// reference string.
#[derive(Debug, Clone, Default)]
pub struct RefMap {
    translations: HashMap<String, String>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pointer: &str) -> Option<&str> {
        self.translations.get(pointer).map(String::as_str)
    }

    pub fn insert(&mut self, pointer: impl Into<String>, internal: impl Into<String>) {
        self.translations.insert(pointer.into(), internal.into());
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

/// Resolves references against a document table, threading the run-scoped
/// registry, memo and diagnostics through every call.
pub struct Resolver<'a> {
    table: &'a DocumentTable,
    registry: &'a mut ComponentRegistry,
    ref_map: &'a mut RefMap,
    diagnostics: &'a mut Diagnostics,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        table: &'a DocumentTable,
        registry: &'a mut ComponentRegistry,
        ref_map: &'a mut RefMap,
        diagnostics: &'a mut Diagnostics,
        max_depth: usize,
    ) -> Self {
        Self {
            table,
            registry,
            ref_map,
            diagnostics,
            max_depth,
        }
    }

    /// Resolve the root document of the table.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::DepthExceeded` if references nest deeper than the
    /// configured limit.
    pub fn resolve_root(&mut self) -> Result<Value, MergeError> {
        let table = self.table;
        let root = table.root();
        self.resolve(&root.content, root.dir(), &BranchVisited::new())
    }

    /// Resolve one value.
    ///
    /// Scalars pass through, sequences resolve element-wise, mappings are
    /// rebuilt in key order with resolved values, and reference nodes go
    /// through the reference procedure. The result never aliases the table.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::DepthExceeded` if references nest deeper than the
    /// configured limit.
    pub fn resolve(
        &mut self,
        node: &Value,
        base_dir: &Path,
        visited: &BranchVisited,
    ) -> Result<Value, MergeError> {
        match node {
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, base_dir, visited))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                if let Some(pointer) = map.get(REF_KEY).and_then(Value::as_str) {
                    return self.resolve_reference(map, pointer, base_dir, visited);
                }
                let mut resolved = Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key.clone(), self.resolve(value, base_dir, visited)?);
                }
                Ok(Value::Object(resolved))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    /// Resolve every pre-registered component the walk from the root never
    /// reached, so unreferenced components carry no external pointers either.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::DepthExceeded` if references nest deeper than the
    /// configured limit.
    pub fn resolve_pending(&mut self) -> Result<(), MergeError> {
        let table = self.table;
        while let Some(pending) = self.registry.next_pending() {
            let resolved = match table.by_path(&pending.source) {
                Some(doc) => self.resolve(&doc.content, doc.dir(), &BranchVisited::new())?,
                // pre-registered from a document the table doesn't hold
                None => self
                    .registry
                    .get(pending.kind, &pending.name)
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            log::debug!(
                "resolved unreferenced component {}/{}",
                pending.kind.container(),
                pending.name
            );
            self.register(pending.kind, &pending.name, resolved);
        }
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        node: &Map<String, Value>,
        pointer: &str,
        base_dir: &Path,
        visited: &BranchVisited,
    ) -> Result<Value, MergeError> {
        if pointer.starts_with('#') {
            return Ok(Value::Object(node.clone()));
        }

        if let Some(internal) = self.ref_map.get(pointer) {
            let internal = internal.to_string();
            log::debug!("memo hit {} -> {}", pointer, internal);
            let siblings = self.resolve_siblings(node, base_dir, visited)?;
            return Ok(pointer_node(&internal, siblings));
        }

        if visited.contains(pointer) {
            return self.break_cycle(node, pointer, base_dir, visited);
        }

        if visited.len() >= self.max_depth {
            return Err(MergeError::DepthExceeded {
                pointer: pointer.to_string(),
                max_depth: self.max_depth,
            });
        }

        let Some((doc, content)) = self.find_target(pointer, base_dir) else {
            return self.unresolved(node, pointer, base_dir, visited);
        };

        log::debug!("{} -> {}", pointer, doc.path.display());
        let mut branch = visited.clone();
        branch.insert(pointer.to_string());
        let resolved = self.resolve(content, doc.dir(), &branch)?;
        let siblings = self.resolve_siblings(node, base_dir, visited)?;

        match registration_target(pointer, doc, content) {
            Some((kind, name)) => {
                let internal = internal_pointer(kind, &name);
                self.register(kind, &name, resolved);
                self.ref_map.insert(pointer, internal.clone());
                Ok(pointer_node(&internal, siblings))
            }
            None => Ok(inline(resolved, siblings)),
        }
    }

    fn break_cycle(
        &mut self,
        node: &Map<String, Value>,
        pointer: &str,
        base_dir: &Path,
        visited: &BranchVisited,
    ) -> Result<Value, MergeError> {
        // same placement the open ancestor will use when it returns
        let target = match self.find_target(pointer, base_dir) {
            Some((doc, content)) => registration_target(pointer, doc, content),
            None => component_target(pointer),
        };
        match target {
            Some((kind, name)) => {
                let internal = internal_pointer(kind, &name);
                self.diagnostics.warn(
                    DiagnosticKind::CycleDetected,
                    pointer,
                    format!("circular reference rewritten to {}", internal),
                );
                let siblings = self.resolve_siblings(node, base_dir, visited)?;
                Ok(pointer_node(&internal, siblings))
            }
            None => {
                self.diagnostics.warn(
                    DiagnosticKind::CycleDetected,
                    pointer,
                    "circular reference replaced by a placeholder",
                );
                Ok(cycle_placeholder(pointer))
            }
        }
    }

    fn unresolved(
        &mut self,
        node: &Map<String, Value>,
        pointer: &str,
        base_dir: &Path,
        visited: &BranchVisited,
    ) -> Result<Value, MergeError> {
        self.diagnostics.warn(
            DiagnosticKind::UnresolvedReference,
            pointer,
            format!("no loaded document matches (from {})", base_dir.display()),
        );

        let Some((kind, name)) = component_target(pointer) else {
            return Ok(Value::Object(node.clone()));
        };

        let internal = internal_pointer(kind, &name);
        if !self.registry.contains(kind, &name) {
            self.registry.register(kind, name.as_str(), unresolved_stub(pointer));
        }
        self.ref_map.insert(pointer, internal.clone());
        let siblings = self.resolve_siblings(node, base_dir, visited)?;
        Ok(pointer_node(&internal, siblings))
    }

    /// Look up the document and sub-document a pointer refers to.
    fn find_target(&self, pointer: &str, base_dir: &Path) -> Option<(&'a Document, &'a Value)> {
        let table: &'a DocumentTable = self.table;
        let (file, fragment) = split_pointer(pointer);
        let doc = table.lookup(file, base_dir)?;
        let content = match fragment {
            Some(fragment) => navigate_fragment(&doc.content, fragment)?,
            None => &doc.content,
        };
        Some((doc, content))
    }

    /// Register resolved content, reporting a collision when it replaces
    /// different content.
    fn register(&mut self, kind: ComponentKind, name: &str, content: Value) {
        let outcome = self.registry.register(kind, name, content);
        if let Registration::Replaced { previous } = outcome {
            if self.registry.get(kind, name) != Some(&previous) {
                self.diagnostics.warn(
                    DiagnosticKind::ComponentCollision,
                    name,
                    format!(
                        "different content registered twice under {}; keeping the last",
                        internal_pointer(kind, name)
                    ),
                );
            }
        }
    }

    fn resolve_siblings(
        &mut self,
        node: &Map<String, Value>,
        base_dir: &Path,
        visited: &BranchVisited,
    ) -> Result<Map<String, Value>, MergeError> {
        let mut siblings = Map::new();
        for (key, value) in node {
            if key != REF_KEY {
                siblings.insert(key.clone(), self.resolve(value, base_dir, visited)?);
            }
        }
        Ok(siblings)
    }
}

/// Collection and name for the target of a resolved pointer, or `None` when
/// the target is inlined.
fn registration_target(
    pointer: &str,
    doc: &Document,
    content: &Value,
) -> Option<(ComponentKind, String)> {
    if let Some(target) = explicit_target(pointer) {
        return Some(target);
    }
    let (_, fragment) = split_pointer(pointer);
    if fragment.is_none() {
        if let Some(target) = convention_component(&doc.path) {
            return Some(target);
        }
    }
    if has_operation_keys(content) {
        return None;
    }
    component_target(pointer)
}

fn pointer_node(internal: &str, siblings: Map<String, Value>) -> Value {
    let mut node = Map::with_capacity(siblings.len() + 1);
    node.insert(REF_KEY.to_string(), Value::String(internal.to_string()));
    node.extend(siblings);
    Value::Object(node)
}

/// Inline resolved content in place of a reference node. Keys set on the
/// reference node itself win over the target's.
fn inline(resolved: Value, siblings: Map<String, Value>) -> Value {
    match resolved {
        Value::Object(mut map) => {
            map.extend(siblings);
            Value::Object(map)
        }
        other => other,
    }
}

fn cycle_placeholder(pointer: &str) -> Value {
    json!({
        "description": format!("Circular reference to {} replaced", pointer),
        "x-circular-ref": pointer,
    })
}

fn unresolved_stub(pointer: &str) -> Value {
    json!({
        "description": format!("Unresolved reference: {}", pointer),
        "x-unresolved-ref": pointer,
    })
}
