use crate::{
    diagnostics::{DiagnosticKind, ValidationResult},
    registry::FunctionRegistry,
};

pub fn a_registry() -> FunctionRegistry {
    FunctionRegistry::compliance()
}

/// The kind and position of every diagnostic, in scan order.
pub fn located(result: &ValidationResult) -> Vec<(DiagnosticKind, usize)> {
    result
        .errors
        .iter()
        .map(|diagnostic| (diagnostic.kind, diagnostic.position))
        .collect()
}

pub mod diagnostics {
    macro_rules! unbalanced_parens {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::UnbalancedParens, $position)
        };
    }

    macro_rules! unknown_function {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::UnknownFunction, $position)
        };
    }

    macro_rules! arity_mismatch {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::ArityMismatch, $position)
        };
    }

    macro_rules! unexpected_token {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::UnexpectedToken, $position)
        };
    }

    macro_rules! empty_expression {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::EmptyExpression, $position)
        };
    }

    macro_rules! invalid_token {
        ($position:expr) => {
            ($crate::diagnostics::DiagnosticKind::InvalidToken, $position)
        };
    }

    pub(crate) use arity_mismatch;
    pub(crate) use empty_expression;
    pub(crate) use invalid_token;
    pub(crate) use unbalanced_parens;
    pub(crate) use unexpected_token;
    pub(crate) use unknown_function;
}
