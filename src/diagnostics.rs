use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The class of problem a [`Diagnostic`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    UnbalancedParens,
    UnknownFunction,
    ArityMismatch,
    UnexpectedToken,
    EmptyExpression,
    /// The expression could not be tokenized.
    InvalidToken,
}

impl DiagnosticKind {
    /// A short, stable code for the kind (e.g. `unbalanced-parens`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnbalancedParens => "unbalanced-parens",
            Self::UnknownFunction => "unknown-function",
            Self::ArityMismatch => "arity-mismatch",
            Self::UnexpectedToken => "unexpected-token",
            Self::EmptyExpression => "empty-expression",
            Self::InvalidToken => "invalid-token",
        }
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.code())
    }
}

/// A single validation problem, located by the byte offset where it starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub position: usize,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, position: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position,
            kind,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "error[{}] at {}: {}",
            self.kind, self.position, self.message
        )
    }
}

/// The outcome of validating a rule expression.
///
/// Serializes to `{ "valid": bool, "errors": [{ "message", "position", "kind" }] }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Build a result from diagnostics in scan order; it is valid iff there are none.
    pub fn from_diagnostics(errors: Vec<Diagnostic>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn valid() -> Self {
        Self::from_diagnostics(Vec::new())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The diagnostics of the given kind, in scan order.
    pub fn errors_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .filter(move |diagnostic| diagnostic.kind == kind)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn be_valid_without_diagnostics() {
        let result = ValidationResult::from_diagnostics(vec![]);

        assert!(result.is_valid());
        assert_eq!(ValidationResult::valid(), result);
    }

    #[test]
    fn be_invalid_with_diagnostics() {
        let result = ValidationResult::from_diagnostics(vec![Diagnostic::new(
            DiagnosticKind::EmptyExpression,
            0,
            "expression is empty",
        )]);

        assert!(!result.is_valid());
    }

    #[test]
    fn serialize_to_the_ui_contract() {
        let result = ValidationResult::from_diagnostics(vec![Diagnostic::new(
            DiagnosticKind::ArityMismatch,
            0,
            "`NAV` expects no arguments, found 2",
        )]);

        let actual: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(
            json!({
                "valid": false,
                "errors": [{
                    "message": "`NAV` expects no arguments, found 2",
                    "position": 0,
                    "kind": "ArityMismatch"
                }]
            }),
            actual
        );
    }

    #[test]
    fn can_filter_diagnostics_by_kind() {
        let result = ValidationResult::from_diagnostics(vec![
            Diagnostic::new(DiagnosticKind::UnknownFunction, 0, "unknown function `FOO`"),
            Diagnostic::new(DiagnosticKind::UnexpectedToken, 7, "unexpected `,`"),
            Diagnostic::new(DiagnosticKind::UnknownFunction, 9, "unknown function `BAR`"),
        ]);

        let positions: Vec<_> = result
            .errors_of(DiagnosticKind::UnknownFunction)
            .map(|diagnostic| diagnostic.position)
            .collect();

        assert_eq!(vec![0, 9], positions);
    }

    #[test]
    fn display_kind_code_position_and_message() {
        let diagnostic = Diagnostic::new(DiagnosticKind::UnbalancedParens, 4, "unmatched `)`");

        assert_eq!(
            "error[unbalanced-parens] at 4: unmatched `)`",
            diagnostic.to_string()
        );
    }
}
