//! Error types for document loading and merging.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a single document from disk.
///
/// For any document but the root these are downgraded to diagnostics and the
/// document is left out of the table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    InvalidYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Fatal errors that stop a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no input documents given")]
    NoInputs,

    #[error("cannot load root document: {0}")]
    RootUnreadable(#[source] LoadError),

    #[error("root document {path} must be a mapping, got {actual}")]
    InvalidRoot { path: PathBuf, actual: String },

    #[error("reference nesting deeper than {max_depth} at {pointer}")]
    DepthExceeded { pointer: String, max_depth: usize },

    #[error("failed to encode merged document: {message}")]
    Encode { message: String },
}

impl MergeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MergeError::RootUnreadable(e) => e.exit_code(),
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("openapi.yaml"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidJson {
            path: PathBuf::from("openapi.json"),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn merge_error_exit_codes() {
        assert_eq!(MergeError::NoInputs.exit_code(), 2);

        let err = MergeError::RootUnreadable(LoadError::FileNotFound {
            path: PathBuf::from("missing.yaml"),
        });
        assert_eq!(err.exit_code(), 3);

        let err = MergeError::DepthExceeded {
            pointer: "./a.yaml".into(),
            max_depth: 4,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn root_unreadable_display_includes_path() {
        let err = MergeError::RootUnreadable(LoadError::FileNotFound {
            path: PathBuf::from("api/openapi.yaml"),
        });
        assert_eq!(
            err.to_string(),
            "cannot load root document: file not found: api/openapi.yaml"
        );
    }
}
