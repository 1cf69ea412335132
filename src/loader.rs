//! Document loading and encoding.
//!
//! Every document is parsed into an order-preserving `serde_json::Value`,
//! whether it was written as YAML or JSON. YAML is the default; only files
//! with a `.json` extension go through the JSON parser.

use std::path::Path;

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use crate::error::{LoadError, MergeError};
use crate::types::{OutputFormat, SCHEMA_EXTENSIONS};

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::ReadError` if it can't be read, or a parse error if the
/// content isn't valid YAML/JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    parse_document(&content, path)
}

/// Parse document text. `path` picks the parser and labels errors.
pub fn parse_document(content: &str, path: &Path) -> Result<Value, LoadError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        return serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
            path: path.to_path_buf(),
            source,
        });
    }

    let invalid = |source| LoadError::InvalidYaml {
        path: path.to_path_buf(),
        source,
    };
    let mut yaml: YamlValue = serde_yaml::from_str(content).map_err(invalid)?;
    yaml.apply_merge().map_err(invalid)?;
    Ok(yaml_to_json(yaml))
}

/// Convert a YAML tree into a JSON tree.
///
/// Non-string mapping keys (e.g. an unquoted `200:` status code) become their
/// string form. `.nan` and `.inf` have no JSON number form and are kept as
/// the strings `.nan`, `.inf` and `-.inf`. Tags are dropped.
pub fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(non_finite(f).to_string()))
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                map.insert(yaml_key(&k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// YAML spelling of a number JSON can't hold.
fn non_finite(f: f64) -> &'static str {
    if f.is_nan() {
        ".nan"
    } else if f.is_sign_negative() {
        "-.inf"
    } else {
        ".inf"
    }
}

fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Strip a recognized schema-file extension (`.yaml`, `.yml`, `.json`).
///
/// Returns `None` when the last path segment carries no recognized extension.
pub fn strip_schema_extension(path: &str) -> Option<&str> {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = path[file_start..].rfind('.')? + file_start;
    let ext = &path[dot + 1..];
    // ".yaml" on its own is a hidden file, not an extension
    if dot == file_start {
        return None;
    }
    SCHEMA_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
        .then(|| &path[..dot])
}

/// Navigate a JSON Pointer fragment (e.g. "#/components/schemas/Error").
///
/// Returns `None` if any segment is missing. An empty fragment (`#` or `#/`)
/// returns the document itself.
pub fn navigate_fragment<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Some(document);
    }

    let mut current = document;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Encode a merged document.
///
/// # Errors
///
/// Returns `MergeError::Encode` if serialization fails.
pub fn encode(document: &Value, format: OutputFormat) -> Result<String, MergeError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| MergeError::Encode {
                message: e.to_string(),
            }),
        OutputFormat::Yaml => serde_yaml::to_string(document).map_err(|e| MergeError::Encode {
            message: e.to_string(),
        }),
    }
}
