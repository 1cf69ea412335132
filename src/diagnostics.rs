//! Structured diagnostics emitted while merging.
//!
//! None of these stop a merge. Each one is also logged at `warn` level as it
//! is recorded.

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An input document could not be read or parsed and was skipped.
    FileUnreadable,
    /// A reference matched no loaded document.
    UnresolvedReference,
    /// A reference pointed back into its own resolution branch.
    CycleDetected,
    /// A component name was not a valid identifier and got replaced.
    ComponentRenamed,
    /// Two different fragments registered under the same component name.
    ComponentCollision,
    /// An operation collection was moved out of the schema-like collection.
    Reclassified,
}

impl DiagnosticKind {
    /// Stable short code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::FileUnreadable => "W001",
            DiagnosticKind::UnresolvedReference => "W002",
            DiagnosticKind::CycleDetected => "W003",
            DiagnosticKind::ComponentRenamed => "W004",
            DiagnosticKind::ComponentCollision => "W005",
            DiagnosticKind::Reclassified => "W006",
        }
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub kind: DiagnosticKind,
    /// File path, pointer or component name the message is about.
    pub subject: String,
    pub message: String,
}

/// Ordered stream of diagnostics for one merge run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            code: kind.code(),
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        log::warn!(
            "[{}] {}: {}",
            diagnostic.code,
            diagnostic.subject,
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_records_code_and_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(
            DiagnosticKind::CycleDetected,
            "./a.yaml",
            "circular reference",
        );
        diagnostics.warn(DiagnosticKind::FileUnreadable, "b.yaml", "bad yaml");

        assert_eq!(diagnostics.len(), 2);
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.code, "W003");
        assert_eq!(first.subject, "./a.yaml");
        assert_eq!(diagnostics.of_kind(DiagnosticKind::FileUnreadable).count(), 1);
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(DiagnosticKind::ComponentRenamed, "{id}", "renamed to _id_");
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json[0]["kind"], "component_renamed");
        assert_eq!(json[0]["severity"], "warning");
        assert_eq!(json[0]["code"], "W004");
    }
}
