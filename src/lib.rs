//! OpenAPI Document Merger
//!
//! Consolidates an OpenAPI description split across many files into one
//! self-contained document. Every external `$ref` is either rewritten into an
//! internal pointer to a registered component or inlined in place.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use oas_merge::{merge, MergeOptions};
//!
//! let inputs = vec![
//!     PathBuf::from("api/openapi.yaml"),
//!     PathBuf::from("api/paths/users.yaml"),
//!     PathBuf::from("api/components/schemas/User.yaml"),
//! ];
//! let options = MergeOptions::new("dist/openapi.yaml");
//!
//! let outcome = merge(&inputs, &options);
//! if outcome.success {
//!     let text = outcome.encode(&options).unwrap().unwrap();
//!     std::fs::write(&outcome.output_location, text).unwrap();
//! }
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{}: {}", diagnostic.subject, diagnostic.message);
//! }
//! ```
//!
//! # Reference Handling
//!
//! | Reference | Result |
//! |-----------|--------|
//! | `#/...` | kept as is |
//! | file in a component directory (`components/schemas/User.yaml`) | `#/components/schemas/User` |
//! | sibling in a component directory (`./Shared.yaml` next to a response) | that directory's collection |
//! | file holding operations (`paths/users.yaml`) | inlined in place |
//! | any other file (`models/Pet.yaml`) | `#/components/schemas/Pet` |
//! | file with fragment (`common.yaml#/components/responses/Error`) | `#/components/responses/Error` |
//! | reference back into its own branch | internal pointer to the open ancestor |
//! | unknown file | stub component plus a warning |
//!
//! Every loaded document under a component directory is registered even when
//! nothing references it.

mod diagnostics;
mod error;
mod loader;
mod merge;
mod naming;
mod normalizer;
mod registry;
mod resolver;
mod table;
mod types;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{LoadError, MergeError};
pub use loader::{encode, load_document, navigate_fragment, parse_document};
pub use merge::{merge, MergeOutcome, MergeSummary};
pub use naming::{component_name, component_target, internal_pointer, is_valid_name, sanitize_name};
pub use normalizer::normalize;
pub use registry::{ComponentRegistry, PendingComponent, Registration};
pub use resolver::{BranchVisited, RefMap, Resolver};
pub use table::{candidate_keys, Document, DocumentTable};
pub use types::{ComponentKind, MergeOptions, OutputFormat, DEFAULT_MAX_DEPTH, HTTP_METHODS};
