//! Core types for document merging.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key that marks a mapping as a reference node.
pub const REF_KEY: &str = "$ref";

/// Top-level container holding the component collections.
pub const COMPONENTS_KEY: &str = "components";

/// Top-level path table.
pub const PATHS_KEY: &str = "paths";

/// Operation keys of a path item. A mapping carrying any of these is an
/// operation collection, not a schema.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// File extensions recognized as schema documents.
pub const SCHEMA_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Default limit on nested external references.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default output location reported in the merge result.
pub const DEFAULT_OUTPUT: &str = "openapi.merged.yaml";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns the pointer string if `value` is a reference node.
pub fn ref_pointer(value: &Value) -> Option<&str> {
    value.as_object()?.get(REF_KEY)?.as_str()
}

/// Returns true if the mapping has any HTTP verb key.
pub fn has_operation_keys(value: &Value) -> bool {
    value
        .as_object()
        .map(|map| map.keys().any(|k| HTTP_METHODS.contains(&k.as_str())))
        .unwrap_or(false)
}

/// One of the nine reusable component collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl ComponentKind {
    /// All kinds in output order.
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::Schemas,
        ComponentKind::Responses,
        ComponentKind::Parameters,
        ComponentKind::Examples,
        ComponentKind::RequestBodies,
        ComponentKind::Headers,
        ComponentKind::SecuritySchemes,
        ComponentKind::Links,
        ComponentKind::Callbacks,
    ];

    /// Returns the key of this collection under `components`.
    pub fn container(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
        }
    }

    /// Match a directory name against the component-directory convention.
    ///
    /// Accepts the container key itself plus its kebab and snake spellings
    /// (`request-bodies`, `security_schemes`).
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.container().to_ascii_lowercase() == folded)
    }
}

/// Encoding of the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Infer the format from an output path (`.json` is JSON, everything else YAML).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Yaml,
        }
    }

    /// Parse a format name.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Options for a merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Where the merged document is meant to be written. Reported back in the
    /// result; the library itself never writes it.
    pub output: PathBuf,
    /// Maximum nesting of external references before the merge fails.
    pub max_depth: usize,
    /// Encoding of the merged document.
    pub format: OutputFormat,
}

impl MergeOptions {
    /// Create options for the given output location.
    ///
    /// The format is inferred from the output extension.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let format = OutputFormat::from_path(&output);
        Self {
            output,
            max_depth: DEFAULT_MAX_DEPTH,
            format,
        }
    }

    /// Set the maximum reference nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Override the inferred output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_kind_from_dir_name() {
        assert_eq!(
            ComponentKind::from_dir_name("schemas"),
            Some(ComponentKind::Schemas)
        );
        assert_eq!(
            ComponentKind::from_dir_name("requestBodies"),
            Some(ComponentKind::RequestBodies)
        );
        assert_eq!(
            ComponentKind::from_dir_name("request-bodies"),
            Some(ComponentKind::RequestBodies)
        );
        assert_eq!(
            ComponentKind::from_dir_name("security_schemes"),
            Some(ComponentKind::SecuritySchemes)
        );
        assert_eq!(ComponentKind::from_dir_name("paths"), None);
        assert_eq!(ComponentKind::from_dir_name("components"), None);
    }

    #[test]
    fn every_kind_round_trips_through_its_container() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_dir_name(kind.container()), Some(kind));
        }
    }

    #[test]
    fn ref_pointer_only_on_string_refs() {
        assert_eq!(ref_pointer(&json!({"$ref": "#/a"})), Some("#/a"));
        assert_eq!(ref_pointer(&json!({"$ref": 3})), None);
        assert_eq!(ref_pointer(&json!(["$ref"])), None);
    }

    #[test]
    fn operation_keys_detected() {
        assert!(has_operation_keys(&json!({"get": {}, "summary": "x"})));
        assert!(!has_operation_keys(&json!({"type": "object"})));
        assert!(!has_operation_keys(&json!("get")));
    }

    #[test]
    fn output_format_inferred_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/api.JSON")),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out/api.yml")),
            OutputFormat::Yaml
        );
        assert_eq!(OutputFormat::from_path(Path::new("api")), OutputFormat::Yaml);
    }

    #[test]
    fn merge_options_builder() {
        let opts = MergeOptions::new("dist/openapi.json").max_depth(8);
        assert_eq!(opts.format, OutputFormat::Json);
        assert_eq!(opts.max_depth, 8);

        let opts = MergeOptions::default().format(OutputFormat::Json);
        assert_eq!(opts.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(opts.format, OutputFormat::Json);
    }
}
