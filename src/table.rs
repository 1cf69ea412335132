//! Document table: every input document, loaded once and indexed under the
//! many spellings a reference might use for it.
//!
//! Reference strings in the wild are not normalized, so
//! `./components/schemas/User.yaml`, `components/schemas/User.yaml` and
//! `components/schemas/User` must all land on the same document. Each
//! document is indexed under:
//!
//! - its absolute path
//! - the path exactly as given
//! - its path relative to the root document's directory, with and without `./`
//! - all of the above with a recognized extension stripped

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::MergeError;
use crate::loader::{load_document, strip_schema_extension};
use crate::naming::normalize_separators;
use crate::registry::ComponentRegistry;
use crate::types::{json_type_name, ComponentKind};

/// A loaded input document. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct Document {
    /// Absolute, lexically normalized path.
    pub path: PathBuf,
    pub content: Value,
}

impl Document {
    /// Directory relative references inside this document resolve against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

/// Lookup structure over all loaded documents.
#[derive(Debug, Clone)]
pub struct DocumentTable {
    documents: Vec<Document>,
    index: HashMap<String, usize>,
}

impl DocumentTable {
    /// Load every input and index it.
    ///
    /// The first path is the root document. Any other document that fails to
    /// load is skipped with a `FileUnreadable` diagnostic. Documents sitting
    /// directly in a component directory (`components/schemas/User.yaml`)
    /// are pre-registered into `registry` under their base name.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::NoInputs` for an empty list, and
    /// `MergeError::RootUnreadable` / `MergeError::InvalidRoot` when the root
    /// document can't be used.
    pub fn build(
        paths: &[PathBuf],
        registry: &mut ComponentRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, MergeError> {
        let (root_path, rest) = paths.split_first().ok_or(MergeError::NoInputs)?;

        let root_content = load_document(root_path).map_err(MergeError::RootUnreadable)?;
        if !root_content.is_object() {
            return Err(MergeError::InvalidRoot {
                path: root_path.clone(),
                actual: json_type_name(&root_content).to_string(),
            });
        }

        let mut table = DocumentTable {
            documents: Vec::with_capacity(paths.len()),
            index: HashMap::new(),
        };
        let root_abs = absolute_path(root_path);
        let root_dir = root_abs.parent().unwrap_or(Path::new("/")).to_path_buf();
        table.insert(root_path, root_abs, root_content, &root_dir);

        let mut seen: HashSet<PathBuf> = HashSet::new();
        seen.insert(table.documents[0].path.clone());

        for path in rest {
            let abs = absolute_path(path);
            if !seen.insert(abs.clone()) {
                continue;
            }

            let content = match load_document(path) {
                Ok(content) => content,
                Err(e) => {
                    diagnostics.warn(
                        DiagnosticKind::FileUnreadable,
                        path.display().to_string(),
                        e.to_string(),
                    );
                    continue;
                }
            };

            if let Some((kind, name)) = convention_component(&abs) {
                log::debug!(
                    "pre-registering {} as {}/{}",
                    abs.display(),
                    kind.container(),
                    name
                );
                registry.preregister(kind, name, content.clone(), abs.clone());
            }

            table.insert(path, abs, content, &root_dir);
        }

        Ok(table)
    }

    fn insert(&mut self, given: &Path, abs: PathBuf, content: Value, root_dir: &Path) {
        let idx = self.documents.len();
        let relative = path_key(&relative_to(&abs, root_dir));

        let mut keys = vec![
            path_key(&abs),
            normalize_separators(&given.to_string_lossy()),
            format!("./{}", relative.trim_start_matches("./")),
            relative.trim_start_matches("./").to_string(),
        ];
        let stripped: Vec<String> = keys
            .iter()
            .filter_map(|k| strip_schema_extension(k).map(str::to_string))
            .collect();
        keys.extend(stripped);

        for key in keys {
            // first document to claim a key keeps it
            self.index.entry(key).or_insert(idx);
        }
        self.documents.push(Document { path: abs, content });
    }

    /// The root document.
    pub fn root(&self) -> &Document {
        &self.documents[0]
    }

    /// Exact key lookup.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.index.get(key).map(|&idx| &self.documents[idx])
    }

    /// Find the document an external pointer's file part refers to.
    ///
    /// Tries the keys of [`candidate_keys`] in order; first match wins.
    pub fn lookup(&self, file: &str, base_dir: &Path) -> Option<&Document> {
        candidate_keys(file, base_dir)
            .iter()
            .find_map(|key| self.get(key))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Document by absolute path.
    pub fn by_path(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Ordered lookup keys for a pointer's file part.
///
/// 1. the pointer as given
/// 2. the pointer resolved against `base_dir`
/// 3. the pointer with its `./` prefix toggled
/// 4. steps 1-3 again with a recognized extension stripped
///
/// Duplicates are dropped, keeping the first position. Changing this order
/// changes which document a reference resolves to.
pub fn candidate_keys(file: &str, base_dir: &Path) -> Vec<String> {
    let file = normalize_separators(file);
    let mut keys = Vec::with_capacity(6);
    push_variants(&file, base_dir, &mut keys);
    if let Some(stripped) = strip_schema_extension(&file) {
        push_variants(stripped, base_dir, &mut keys);
    }

    let mut seen = HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

fn push_variants(file: &str, base_dir: &Path, keys: &mut Vec<String>) {
    keys.push(file.to_string());
    keys.push(path_key(&normalize_path(&base_dir.join(file))));
    keys.push(toggle_relative_prefix(file));
}

fn toggle_relative_prefix(file: &str) -> String {
    match file.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => format!("./{}", file),
    }
}

/// Kind and name for a document whose parent directory is a component
/// directory.
pub(crate) fn convention_component(path: &Path) -> Option<(ComponentKind, String)> {
    let parent = path.parent()?.file_name()?.to_str()?;
    let kind = ComponentKind::from_dir_name(parent)?;
    let file = path.file_name()?.to_str()?;
    let name = strip_schema_extension(file).unwrap_or(file);
    (!name.is_empty()).then(|| (kind, name.to_string()))
}

/// String form of a path used as a table key (`/` separators).
pub fn path_key(path: &Path) -> String {
    normalize_separators(&path.to_string_lossy())
}

/// Absolute, lexically normalized form of `path`.
pub fn absolute_path(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_path(&abs)
}

/// Remove `.` segments and fold `..` into their parent without touching the
/// filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Lexical path of `path` relative to `base`, using `..` where needed.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component.as_os_str());
    }
    out
}
