//! Merge orchestration and result assembly.
//!
//! One call builds a fresh document table, registry and memo, resolves the
//! root, normalizes the result and reports back. Nothing is shared between
//! calls, so independent merges can run side by side.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::MergeError;
use crate::loader::encode;
use crate::normalizer::normalize;
use crate::registry::ComponentRegistry;
use crate::resolver::{RefMap, Resolver};
use crate::table::DocumentTable;
use crate::types::MergeOptions;

/// Result of a merge run. Always produced, never an error.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Where the merged document is meant to go.
    pub output_location: PathBuf,
    pub success: bool,
    /// The merged document, present on success.
    pub document: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
    /// The fatal error, present on failure.
    pub error: Option<MergeError>,
}

/// Serializable view of a [`MergeOutcome`] without the document.
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub output_location: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeOutcome {
    /// Returns the exit code for this outcome (0 on success).
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map(MergeError::exit_code).unwrap_or(0)
    }

    /// Encode the merged document in the requested format.
    ///
    /// Returns `None` when the merge failed.
    pub fn encode(&self, options: &MergeOptions) -> Option<Result<String, MergeError>> {
        self.document
            .as_ref()
            .map(|document| encode(document, options.format))
    }

    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            output_location: self.output_location.clone(),
            success: self.success,
            error: self.error.as_ref().map(ToString::to_string),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Merge a set of documents into one self-contained document.
///
/// The first input is the root document. Fatal conditions (no inputs, an
/// unreadable or non-mapping root, references nested past
/// `options.max_depth`) produce an unsuccessful outcome; everything else is
/// reported through diagnostics.
pub fn merge(inputs: &[PathBuf], options: &MergeOptions) -> MergeOutcome {
    let mut diagnostics = Diagnostics::new();
    let result = try_merge(inputs, options, &mut diagnostics);

    match result {
        Ok(document) => {
            log::info!(
                "merged {} document(s) with {} warning(s)",
                inputs.len(),
                diagnostics.len()
            );
            MergeOutcome {
                output_location: options.output.clone(),
                success: true,
                document: Some(document),
                diagnostics: diagnostics.into_vec(),
                error: None,
            }
        }
        Err(error) => {
            log::error!("merge failed: {}", error);
            MergeOutcome {
                output_location: options.output.clone(),
                success: false,
                document: None,
                diagnostics: diagnostics.into_vec(),
                error: Some(error),
            }
        }
    }
}

fn try_merge(
    inputs: &[PathBuf],
    options: &MergeOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Value, MergeError> {
    let mut registry = ComponentRegistry::new();
    let mut ref_map = RefMap::new();

    let table = DocumentTable::build(inputs, &mut registry, diagnostics)?;
    log::debug!(
        "loaded {} document(s), {} pre-registered component(s)",
        table.len(),
        registry.len()
    );

    let resolved = {
        let mut resolver = Resolver::new(
            &table,
            &mut registry,
            &mut ref_map,
            diagnostics,
            options.max_depth,
        );
        let root = resolver.resolve_root()?;
        resolver.resolve_pending()?;
        root
    };
    log::debug!("{} external reference(s) rewritten", ref_map.len());

    Ok(normalize(resolved, registry, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_root_is_unsuccessful_result() {
        let outcome = merge(&[], &MergeOptions::default());
        assert!(!outcome.success);
        assert!(outcome.document.is_none());
        assert!(matches!(outcome.error, Some(MergeError::NoInputs)));
        assert_eq!(outcome.output_location, PathBuf::from("openapi.merged.yaml"));
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn unreadable_root_reports_location() {
        let dir = TempDir::new().unwrap();
        let options = MergeOptions::new(dir.path().join("out.json"));
        let outcome = merge(&[dir.path().join("openapi.yaml")], &options);

        assert!(!outcome.success);
        assert_eq!(outcome.output_location, dir.path().join("out.json"));
        assert_eq!(outcome.exit_code(), 3);
        assert!(outcome.encode(&options).is_none());
    }

    #[test]
    fn successful_merge_encodes_and_summarizes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("openapi.yaml");
        fs::write(&root, "openapi: 3.0.3\nx:\n  $ref: ./gone.yaml\n").unwrap();

        let options = MergeOptions::new("merged.json").format(OutputFormat::Json);
        let outcome = merge(&[root], &options);
        assert!(outcome.success);
        assert_eq!(outcome.exit_code(), 0);

        let encoded = outcome.encode(&options).unwrap().unwrap();
        assert!(encoded.contains("\"$ref\": \"#/components/schemas/gone\""));

        let summary = serde_json::to_value(outcome.summary()).unwrap();
        assert_eq!(summary["success"], true);
        assert!(summary.get("error").is_none());
        assert_eq!(summary["diagnostics"][0]["code"], "W002");
    }
}
